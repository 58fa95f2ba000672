// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory container.

use super::tree::{DatasetNode, Tree};
use super::{
    check_chunk, check_total, ContainerRead, ContainerWrite, DatasetLayout, LinkKind, NodeMeta,
    Rechunk, DEFAULT_CHUNK_LEN,
};
use crate::core::{element_count, ArrayData, AttributeMap, NodePath, Result, TranslateError};

/// Container holding decoded chunks in memory.
///
/// Used for tests and by producers that build a source tree in code.
///
/// # Example
///
/// ```
/// use treetrans::container::{ContainerRead, MemoryContainer};
/// use treetrans::core::{ArrayData, NodePath};
///
/// let mut source = MemoryContainer::new("source");
/// source
///     .add_dataset("/entry/x", vec![2], ArrayData::Float64(vec![1.0, 2.0]))
///     .unwrap();
/// let x = source.read_all(&NodePath::parse("/entry/x").unwrap()).unwrap();
/// assert_eq!(x.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryContainer {
    label: String,
    tree: Tree<ArrayData>,
    chunk_len: usize,
    finished: bool,
}

impl MemoryContainer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tree: Tree::new(),
            chunk_len: DEFAULT_CHUNK_LEN,
            finished: false,
        }
    }

    /// Chunk length used by [`add_dataset`](Self::add_dataset).
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }

    /// Access the underlying tree.
    pub fn tree(&self) -> &Tree<ArrayData> {
        &self.tree
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Create a group with attributes, merging into an existing one.
    pub fn add_group(&mut self, path: &str, attrs: AttributeMap) -> Result<&mut Self> {
        let path = NodePath::parse(path)?;
        let group = self.tree.require_group(&path)?;
        group.attrs.extend(attrs);
        Ok(self)
    }

    /// Create a dataset from a whole buffer.
    pub fn add_dataset(
        &mut self,
        path: &str,
        shape: Vec<usize>,
        data: ArrayData,
    ) -> Result<&mut Self> {
        self.add_dataset_with(path, shape, data, AttributeMap::new())
    }

    /// Create a dataset with attributes.
    pub fn add_dataset_with(
        &mut self,
        path: &str,
        shape: Vec<usize>,
        data: ArrayData,
        attrs: AttributeMap,
    ) -> Result<&mut Self> {
        let node_path = NodePath::parse(path)?;
        if element_count(&shape) != data.len() {
            return Err(TranslateError::invalid_rule(
                path,
                format!(
                    "shape {} needs {} elements, got {}",
                    crate::core::format_shape(&shape),
                    element_count(&shape),
                    data.len()
                ),
            ));
        }
        let layout = DatasetLayout::new(shape, data.dtype()).with_chunk_len(self.chunk_len);
        let mut chunks = std::iter::once(Ok::<_, TranslateError>(data));
        self.write_dataset(&node_path, layout, attrs, &mut chunks)?;
        Ok(self)
    }

    /// Set one attribute on an existing node.
    pub fn set_attribute(
        &mut self,
        path: &str,
        key: &str,
        value: impl Into<crate::core::AttrValue>,
    ) -> Result<&mut Self> {
        let node_path = NodePath::parse(path)?;
        let attrs = self
            .tree
            .attrs_mut(&node_path)
            .ok_or_else(|| TranslateError::source_not_found(path))?;
        attrs.insert(key.to_string(), value.into());
        Ok(self)
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.finished {
            return Err(TranslateError::io(
                format!("MemoryContainer::{operation}"),
                format!("container '{}' is already finished", self.label),
            ));
        }
        Ok(())
    }
}

impl ContainerRead for MemoryContainer {
    fn label(&self) -> &str {
        &self.label
    }

    fn lookup(&self, path: &NodePath) -> Option<NodeMeta> {
        self.tree.meta(path)
    }

    fn read_chunk(&self, path: &NodePath, index: usize) -> Result<ArrayData> {
        let dataset = self
            .tree
            .dataset(path)
            .ok_or_else(|| TranslateError::source_not_found(path.to_string()))?;
        dataset.chunks.get(index).cloned().ok_or_else(|| {
            TranslateError::io(
                "MemoryContainer::read_chunk",
                format!("'{path}' has no chunk {index}"),
            )
        })
    }
}

impl ContainerWrite for MemoryContainer {
    fn require_group(&mut self, path: &NodePath) -> Result<()> {
        self.ensure_open("require_group")?;
        self.tree.require_group(path).map(|_| ())
    }

    fn write_dataset(
        &mut self,
        path: &NodePath,
        layout: DatasetLayout,
        attrs: AttributeMap,
        chunks: &mut dyn Iterator<Item = Result<ArrayData>>,
    ) -> Result<u64> {
        self.ensure_open("write_dataset")?;
        self.tree.check_dataset_path(path)?;

        let mut stored = Vec::with_capacity(layout.chunk_count());
        let mut written = 0u64;
        for chunk in Rechunk::new(chunks, layout.chunk_len) {
            let chunk = chunk?;
            check_chunk(&layout, path, &chunk)?;
            written += chunk.len() as u64;
            stored.push(chunk);
        }
        check_total(&layout, path, written)?;

        self.tree.insert_dataset(
            path,
            DatasetNode {
                attrs,
                layout,
                chunks: stored,
            },
        )?;
        Ok(written)
    }

    fn set_attributes(&mut self, path: &NodePath, attrs: AttributeMap) -> Result<()> {
        self.ensure_open("set_attributes")?;
        let target = self
            .tree
            .attrs_mut(path)
            .ok_or_else(|| TranslateError::source_not_found(path.to_string()))?;
        *target = attrs;
        Ok(())
    }

    fn create_link(&mut self, path: &NodePath, target: &NodePath, kind: LinkKind) -> Result<()> {
        self.ensure_open("create_link")?;
        self.tree.link(path, target, kind)
    }

    fn remove(&mut self, path: &NodePath) -> Result<bool> {
        self.ensure_open("remove")?;
        Ok(self.tree.remove(path).is_some())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
