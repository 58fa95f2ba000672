// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Hierarchical containers.
//!
//! A container is a tree of groups and datasets, each carrying an attribute
//! map, plus soft links that name another node by path. Datasets store their elements in C order as a sequence of flat
//! chunks of `chunk_len` elements (the last one may be shorter), which keeps
//! reshapes metadata-only and lets every reader and writer stream one chunk
//! at a time.
//!
//! Two implementations share the [`ContainerRead`] / [`ContainerWrite`]
//! traits:
//! - [`MemoryContainer`] keeps decoded chunks in memory.
//! - [`TreeFileReader`] / [`TreeFileWriter`] use the single-file tree format.

pub mod compression;
pub mod encoding;
pub mod memory;
pub mod tree;
pub mod treefile;

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{element_count, ArrayData, AttributeMap, DataType, NodePath, Result, TranslateError};

pub use compression::Compression;
pub use memory::MemoryContainer;
pub use tree::{DatasetNode, GroupNode, LinkNode, Node, Tree};
pub use treefile::{TreeFileReader, TreeFileWriter};

/// Default number of elements per chunk.
pub const DEFAULT_CHUNK_LEN: usize = 65_536;

/// Longest chain of soft links followed before giving up.
pub const MAX_LINK_DEPTH: usize = 16;

/// Empty attribute map reported for links.
static NO_ATTRS: AttributeMap = AttributeMap::new();

/// Shape, element type and storage parameters of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetLayout {
    pub shape: Vec<usize>,
    pub dtype: DataType,
    /// Elements per stored chunk
    pub chunk_len: usize,
    #[serde(default)]
    pub compression: Compression,
}

impl DatasetLayout {
    /// Create a layout with the default chunk length and no compression.
    pub fn new(shape: Vec<usize>, dtype: DataType) -> Self {
        Self {
            shape,
            dtype,
            chunk_len: DEFAULT_CHUNK_LEN,
            compression: Compression::None,
        }
    }

    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        element_count(&self.shape)
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of stored chunks.
    pub fn chunk_count(&self) -> usize {
        self.element_count().div_ceil(self.chunk_len.max(1))
    }

    /// Flat element range covered by chunk `index`.
    pub fn chunk_range(&self, index: usize) -> Range<usize> {
        let chunk_len = self.chunk_len.max(1);
        let start = (index * chunk_len).min(self.element_count());
        let end = (start + chunk_len).min(self.element_count());
        start..end
    }

    /// Human-readable `dtype (shape)` summary.
    pub fn describe(&self) -> String {
        format!("{} {}", self.dtype, crate::core::format_shape(&self.shape))
    }
}

/// Kind of a node, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Dataset,
    Link,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Dataset => "dataset",
            NodeKind::Link => "link",
        }
    }
}

/// How a link node refers to its target.
///
/// A soft link stores the target path and is resolved when read, so it may
/// dangle. A hard link makes the destination a second name for the target's
/// stored content; in a tree file the two share chunk blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    #[default]
    Soft,
    Hard,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Soft => "soft",
            LinkKind::Hard => "hard",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkKind {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(LinkKind::Soft),
            "hard" => Ok(LinkKind::Hard),
            other => Err(TranslateError::invalid_rule(
                "link",
                format!("unknown link kind '{other}' (use soft or hard)"),
            )),
        }
    }
}

/// Metadata of one node as seen through a container handle.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeMeta {
    Group {
        attrs: AttributeMap,
        /// Child names in lexical order
        children: Vec<String>,
    },
    Dataset {
        attrs: AttributeMap,
        layout: DatasetLayout,
    },
    /// Soft link; carries no attributes of its own
    Link { target: NodePath },
}

impl NodeMeta {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeMeta::Group { .. } => NodeKind::Group,
            NodeMeta::Dataset { .. } => NodeKind::Dataset,
            NodeMeta::Link { .. } => NodeKind::Link,
        }
    }

    pub fn attrs(&self) -> &AttributeMap {
        match self {
            NodeMeta::Group { attrs, .. } | NodeMeta::Dataset { attrs, .. } => attrs,
            NodeMeta::Link { .. } => &NO_ATTRS,
        }
    }

    pub fn layout(&self) -> Option<&DatasetLayout> {
        match self {
            NodeMeta::Dataset { layout, .. } => Some(layout),
            NodeMeta::Group { .. } | NodeMeta::Link { .. } => None,
        }
    }

    /// Target path of a soft link.
    pub fn link_target(&self) -> Option<&NodePath> {
        match self {
            NodeMeta::Link { target } => Some(target),
            _ => None,
        }
    }
}

/// Read access to a container.
pub trait ContainerRead {
    /// Name used in log messages (usually the file path).
    fn label(&self) -> &str;

    /// Look up the node at `path`.
    fn lookup(&self, path: &NodePath) -> Option<NodeMeta>;

    /// Read chunk `index` of the dataset at `path`.
    fn read_chunk(&self, path: &NodePath, index: usize) -> Result<ArrayData>;

    /// Read a whole dataset into one buffer.
    fn read_all(&self, path: &NodePath) -> Result<ArrayData> {
        let layout = match self.lookup(path) {
            Some(NodeMeta::Dataset { layout, .. }) => layout,
            Some(meta) => {
                return Err(TranslateError::path_conflict(
                    path.to_string(),
                    "dataset",
                    meta.kind().as_str(),
                ))
            }
            None => return Err(TranslateError::source_not_found(path.to_string())),
        };
        let mut out = ArrayData::with_capacity(layout.dtype, layout.element_count());
        for index in 0..layout.chunk_count() {
            out.extend(self.read_chunk(path, index)?)?;
        }
        Ok(out)
    }
}

/// Write access to a container.
///
/// Writes addressing a path whose ancestors hold a dataset, or replacing a
/// node of the other kind, fail with `PathConflict`.
pub trait ContainerWrite: ContainerRead {
    /// Ensure a group exists at `path`, creating missing ancestors.
    fn require_group(&mut self, path: &NodePath) -> Result<()>;

    /// Create or replace the dataset at `path`.
    ///
    /// `chunks` yields the elements in C order; they are re-cut to
    /// `layout.chunk_len`. The dataset becomes visible only once every chunk
    /// has been stored; if the iterator yields an error the previous node at
    /// `path` is left untouched and the error is returned. Returns the number
    /// of elements written.
    fn write_dataset(
        &mut self,
        path: &NodePath,
        layout: DatasetLayout,
        attrs: AttributeMap,
        chunks: &mut dyn Iterator<Item = Result<ArrayData>>,
    ) -> Result<u64>;

    /// Replace the attribute map of an existing node.
    fn set_attributes(&mut self, path: &NodePath, attrs: AttributeMap) -> Result<()>;

    /// Create a link named `path` to `target`.
    ///
    /// A soft link may replace an existing link but never a group or
    /// dataset. A hard link needs an existing target that is not `path` or
    /// one of its ancestors.
    fn create_link(&mut self, path: &NodePath, target: &NodePath, kind: LinkKind) -> Result<()>;

    /// Delete the node at `path` and everything beneath it.
    ///
    /// Returns whether a node was removed.
    fn remove(&mut self, path: &NodePath) -> Result<bool>;

    /// Flush and close. Further writes are rejected.
    fn finish(&mut self) -> Result<()>;
}

/// Every node at or below `root` with its metadata, parents before children
/// and siblings in lexical order.
pub fn walk_tree(source: &dyn ContainerRead, root: &NodePath) -> Vec<(NodePath, NodeMeta)> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(path) = stack.pop() {
        let Some(meta) = source.lookup(&path) else {
            continue;
        };
        if let NodeMeta::Group { children, .. } = &meta {
            stack.extend(children.iter().rev().map(|name| path.join(name)));
        }
        out.push((path, meta));
    }
    out
}

/// Follow soft links from `path` to the node they end at.
///
/// Returns the final path and its metadata, or `None` when a link dangles,
/// the chain loops, or it is longer than [`MAX_LINK_DEPTH`].
pub fn resolve_links(
    container: &dyn ContainerRead,
    path: &NodePath,
) -> Option<(NodePath, NodeMeta)> {
    let mut current = path.clone();
    for _ in 0..=MAX_LINK_DEPTH {
        match container.lookup(&current)? {
            NodeMeta::Link { target } => current = target,
            meta => return Some((current, meta)),
        }
    }
    None
}

/// Re-cuts a stream of chunks into chunks of exactly `chunk_len` elements.
///
/// At most one chunk plus one incoming buffer is held at a time.
pub struct Rechunk<'a> {
    inner: &'a mut dyn Iterator<Item = Result<ArrayData>>,
    chunk_len: usize,
    pending: Option<ArrayData>,
    done: bool,
}

impl<'a> Rechunk<'a> {
    pub fn new(inner: &'a mut dyn Iterator<Item = Result<ArrayData>>, chunk_len: usize) -> Self {
        Self {
            inner,
            chunk_len: chunk_len.max(1),
            pending: None,
            done: false,
        }
    }

    fn take_front(&mut self) -> Option<ArrayData> {
        let pending = self.pending.as_ref()?;
        if pending.len() < self.chunk_len && !self.done {
            return None;
        }
        if pending.len() <= self.chunk_len {
            return self.pending.take().filter(|p| !p.is_empty());
        }
        let head = pending.slice(0..self.chunk_len);
        self.pending = Some(pending.slice(self.chunk_len..pending.len()));
        Some(head)
    }
}

impl Iterator for Rechunk<'_> {
    type Item = Result<ArrayData>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.take_front() {
                return Some(Ok(chunk));
            }
            if self.done {
                return None;
            }
            match self.inner.next() {
                Some(Ok(chunk)) => match self.pending.as_mut() {
                    Some(pending) => {
                        if let Err(e) = pending.extend(chunk) {
                            self.done = true;
                            self.pending = None;
                            return Some(Err(e));
                        }
                    }
                    None => self.pending = Some(chunk),
                },
                Some(Err(e)) => {
                    self.done = true;
                    self.pending = None;
                    return Some(Err(e));
                }
                None => self.done = true,
            }
        }
    }
}

/// Check that the chunks written for a dataset match its layout.
pub(crate) fn check_chunk(layout: &DatasetLayout, path: &NodePath, chunk: &ArrayData) -> Result<()> {
    if chunk.dtype() != layout.dtype {
        return Err(TranslateError::invalid_cast(
            chunk.dtype().as_str(),
            layout.dtype.as_str(),
            format!("chunk written to '{path}' does not match the dataset type"),
        ));
    }
    Ok(())
}

/// Check the element total once all chunks of a dataset are written.
pub(crate) fn check_total(layout: &DatasetLayout, path: &NodePath, written: u64) -> Result<()> {
    if written != layout.element_count() as u64 {
        return Err(TranslateError::transformation(
            "write",
            format!(
                "'{path}' received {written} elements but {} declares {}",
                layout.describe(),
                layout.element_count()
            ),
        ));
    }
    Ok(())
}
