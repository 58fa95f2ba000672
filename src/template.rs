// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Template seeding.
//!
//! Seeding copies the whole template tree into the destination before any
//! rule runs and remembers what the template declared. Later dataset writes
//! are validated against the declared shape and type, and template
//! attributes are kept unless a rule addresses them by name.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::attributes::MergePolicy;
use crate::container::{walk_tree, ContainerRead, ContainerWrite, DatasetLayout, NodeMeta};
use crate::copier::copy_subtree;
use crate::core::{format_shape, DataType, NodePath, Result, TranslateError};

/// What a template declared, keyed by destination path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateBaseline {
    datasets: BTreeMap<NodePath, DatasetLayout>,
    attributes: BTreeMap<NodePath, BTreeSet<String>>,
}

impl TemplateBaseline {
    /// Baseline with nothing declared (no template).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record the declarations of every node in `template`.
    pub fn from_container(template: &dyn ContainerRead) -> Self {
        let mut baseline = Self::default();
        for (path, meta) in walk_tree(template, &NodePath::root()) {
            if !meta.attrs().is_empty() {
                baseline
                    .attributes
                    .insert(path.clone(), meta.attrs().keys().cloned().collect());
            }
            if let NodeMeta::Dataset { layout, .. } = meta {
                baseline.datasets.insert(path, layout);
            }
        }
        baseline
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty() && self.attributes.is_empty()
    }

    /// Number of declared datasets.
    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    /// Declared layout of a placeholder dataset.
    pub fn placeholder(&self, path: &NodePath) -> Option<&DatasetLayout> {
        self.datasets.get(path)
    }

    /// Template attribute keys at `path` that `explicit` does not name.
    pub fn protected_keys(&self, path: &NodePath, explicit: &BTreeSet<String>) -> BTreeSet<String> {
        self.attributes
            .get(path)
            .map(|keys| keys.difference(explicit).cloned().collect())
            .unwrap_or_default()
    }

    /// Validate a write of `shape`/`dtype` at `path` against the template.
    pub fn check_write(&self, path: &NodePath, shape: &[usize], dtype: DataType) -> Result<()> {
        match self.datasets.get(path) {
            Some(declared) if declared.shape != shape || declared.dtype != dtype => {
                Err(TranslateError::template_mismatch(
                    path.to_string(),
                    declared.describe(),
                    format!("{dtype} {}", format_shape(shape)),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Copy the template into the destination root and return its baseline.
pub fn seed(
    template: &dyn ContainerRead,
    destination: &mut dyn ContainerWrite,
) -> Result<TemplateBaseline> {
    let root = NodePath::root();
    let stats = copy_subtree(
        template,
        &root,
        destination,
        &root,
        MergePolicy::SourceWins,
        &TemplateBaseline::empty(),
    )?;
    let baseline = TemplateBaseline::from_container(template);
    info!(
        template = template.label(),
        groups = stats.groups,
        datasets = stats.datasets,
        links = stats.links,
        "Seeded destination from template"
    );
    Ok(baseline)
}
