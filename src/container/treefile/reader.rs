// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Memory-mapped tree file reader.

use std::fs::File;
use std::path::Path;

use super::{parse_index, ChunkRef};
use crate::container::encoding::decode;
use crate::container::tree::Tree;
use crate::container::{ContainerRead, DatasetLayout, NodeMeta};
use crate::core::{ArrayData, NodePath, Result, TranslateError};

/// Read-only view of a finished tree file.
pub struct TreeFileReader {
    path: String,
    mmap: memmap2::Mmap,
    tree: Tree<ChunkRef>,
}

impl TreeFileReader {
    /// Open and index a tree file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        let file = File::open(path_ref).map_err(|e| {
            TranslateError::io("TreeFileReader", format!("Failed to open '{path_str}': {e}"))
        })?;
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| {
            TranslateError::io("TreeFileReader", format!("Failed to mmap '{path_str}': {e}"))
        })?;

        let (tree, _) = parse_index(&mmap[..], "TreeFileReader")?;
        Ok(Self {
            path: path_str,
            mmap,
            tree,
        })
    }

    /// File path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File size in bytes.
    pub fn file_size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Access the index tree.
    pub fn tree(&self) -> &Tree<ChunkRef> {
        &self.tree
    }
}

/// Decode one chunk from the stored bytes of a file image.
pub(crate) fn load_chunk(
    stored: &[u8],
    chunk: &ChunkRef,
    layout: &DatasetLayout,
    context: &str,
) -> Result<ArrayData> {
    if crc32fast::hash(stored) != chunk.crc {
        return Err(TranslateError::io(
            context,
            format!("chunk at offset {} failed its checksum", chunk.offset),
        ));
    }
    let raw = layout.compression.decompress(stored, chunk.raw_len as usize)?;
    decode(layout.dtype, &raw, chunk.elements as usize)
}

impl ContainerRead for TreeFileReader {
    fn label(&self) -> &str {
        &self.path
    }

    fn lookup(&self, path: &NodePath) -> Option<NodeMeta> {
        self.tree.meta(path)
    }

    fn read_chunk(&self, path: &NodePath, index: usize) -> Result<ArrayData> {
        let dataset = self
            .tree
            .dataset(path)
            .ok_or_else(|| TranslateError::source_not_found(path.to_string()))?;
        let chunk = dataset.chunks.get(index).ok_or_else(|| {
            TranslateError::io(
                "TreeFileReader::read_chunk",
                format!("'{path}' has no chunk {index}"),
            )
        })?;
        let start = chunk.offset as usize;
        let end = start + chunk.stored_len as usize;
        let stored = self.mmap.get(start..end).ok_or_else(|| {
            TranslateError::io(
                "TreeFileReader::read_chunk",
                format!("chunk {start}..{end} exceeds file"),
            )
        })?;
        load_chunk(stored, chunk, &dataset.layout, "TreeFileReader::read_chunk")
    }
}
