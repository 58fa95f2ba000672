// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use treetrans::copier::copy_subtree;
use treetrans::template::TemplateBaseline;
use treetrans::{
    ArrayData, AttrValue, AttributeMap, ContainerRead, ContainerWrite, MemoryContainer,
    MergePolicy, NodePath, TreeFileWriter,
};

// ============================================================================
// Paths
// ============================================================================

/// Parse a node path.
pub fn path(s: &str) -> NodePath {
    NodePath::parse(s).unwrap()
}

/// Temporary directory removed when the guard drops.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::Builder::new()
                .prefix("treetrans_test_")
                .tempdir()
                .unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a text file and return its path.
    pub fn write_text(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, text).unwrap();
        path
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Attribute map from key/value pairs.
pub fn attrs(pairs: &[(&str, AttrValue)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A small measurement tree:
///
/// ```text
/// /                       (title = "scan 7")
/// /raw                    (NX_class = "NXdata", origin = "detector")
/// /raw/counts  int32 (2, 3)
/// /raw/energy  float64 (3)   units = "keV"
/// /motors/x    float64 ()    units = "m"
/// /label       string (1)
/// ```
pub fn measurement() -> MemoryContainer {
    let mut source = MemoryContainer::new("measurement").with_chunk_len(4);
    source
        .add_group("/", attrs(&[("title", "scan 7".into())]))
        .unwrap()
        .add_group(
            "/raw",
            attrs(&[
                ("NX_class", "NXdata".into()),
                ("origin", "detector".into()),
            ]),
        )
        .unwrap()
        .add_dataset("/raw/counts", vec![2, 3], ArrayData::Int32(vec![1, 2, 3, 4, 5, 6]))
        .unwrap()
        .add_dataset_with(
            "/raw/energy",
            vec![3],
            ArrayData::Float64(vec![8.0, 9.0, 10.0]),
            attrs(&[("units", "keV".into())]),
        )
        .unwrap()
        .add_dataset_with(
            "/motors/x",
            vec![],
            ArrayData::Float64(vec![1.0]),
            attrs(&[("units", "m".into())]),
        )
        .unwrap()
        .add_dataset("/label", vec![1], ArrayData::String(vec!["sample".into()]))
        .unwrap();
    source
}

/// Store a container as a tree file.
pub fn save(container: &dyn ContainerRead, file: &Path) {
    let mut writer = TreeFileWriter::create(file).unwrap();
    copy_subtree(
        container,
        &NodePath::root(),
        &mut writer,
        &NodePath::root(),
        MergePolicy::SourceWins,
        &TemplateBaseline::empty(),
    )
    .unwrap();
    writer.finish().unwrap();
}

/// Node paths of a container in walk order.
pub fn node_paths(container: &dyn ContainerRead) -> Vec<String> {
    treetrans::container::walk_tree(container, &NodePath::root())
        .into_iter()
        .map(|(path, _)| path.to_string())
        .collect()
}

/// Attribute map of the node at `p`.
pub fn attrs_at(container: &dyn ContainerRead, p: &str) -> AttributeMap {
    container
        .lookup(&path(p))
        .unwrap_or_else(|| panic!("no node at {p}"))
        .attrs()
        .clone()
}

/// Shape of the dataset at `p`.
pub fn shape_at(container: &dyn ContainerRead, p: &str) -> Vec<usize> {
    container
        .lookup(&path(p))
        .and_then(|meta| meta.layout().map(|l| l.shape.clone()))
        .unwrap_or_else(|| panic!("no dataset at {p}"))
}

/// Consume a destination after finishing it.
pub fn finish(destination: &mut dyn ContainerWrite) {
    destination.finish().unwrap();
}
