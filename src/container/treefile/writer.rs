// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Tree file writer.
//!
//! Chunk blocks are appended to the data section as they arrive and the
//! dataset entry is added to the in-memory index only after its last chunk
//! is stored. A failed dataset write rewinds the write position, so its
//! blocks are overwritten by the next write. `finish` writes the index and
//! trailer and truncates anything left beyond them.
//!
//! Opening an existing file appends after its trailer. The old index and
//! trailer are never overwritten, and a handle dropped or abandoned before
//! `finish` truncates the file back to its committed length, so the file
//! reads exactly as it did before it was opened.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::reader::load_chunk;
use super::{header_bytes, index_bytes, read_index, ChunkRef, HEADER_LEN};
use crate::container::encoding::encode;
use crate::container::tree::{DatasetNode, Tree};
use crate::container::{
    check_chunk, check_total, ContainerRead, ContainerWrite, DatasetLayout, LinkKind, NodeMeta,
    Rechunk,
};
use crate::core::{ArrayData, AttributeMap, NodePath, Result, TranslateError};

/// Read-write handle on a tree file.
pub struct TreeFileWriter {
    path: String,
    file: File,
    tree: Tree<ChunkRef>,
    /// Length of the file as last finished; restored if the handle is abandoned
    committed_len: u64,
    /// Offset where the next chunk block goes
    position: u64,
    chunks_written: u64,
    bytes_written: u64,
    finished: bool,
}

impl TreeFileWriter {
    /// Create a new, empty file, truncating any existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())
            .map_err(|e| {
                TranslateError::io("TreeFileWriter", format!("Failed to create '{path_str}': {e}"))
            })?;
        file.write_all(&header_bytes()?)?;
        Ok(Self {
            path: path_str,
            file,
            tree: Tree::new(),
            committed_len: HEADER_LEN,
            position: HEADER_LEN,
            chunks_written: 0,
            bytes_written: 0,
            finished: false,
        })
    }

    /// Open an existing finished file to modify it.
    ///
    /// New chunk blocks go after the current trailer; `finish` writes a new
    /// index and trailer after them.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())
            .map_err(|e| {
                TranslateError::io("TreeFileWriter", format!("Failed to open '{path_str}': {e}"))
            })?;
        let (tree, index_offset) = read_index(&mut file, "TreeFileWriter::open")?;
        let committed_len = file.seek(SeekFrom::End(0))?;
        debug!(
            path = %path_str,
            index_offset,
            size = committed_len,
            "Opened tree file for update"
        );
        Ok(Self {
            path: path_str,
            file,
            tree,
            committed_len,
            position: committed_len,
            chunks_written: 0,
            bytes_written: 0,
            finished: false,
        })
    }

    /// Open `path` if it exists, otherwise create it.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Chunk blocks written through this handle.
    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }

    /// Stored bytes written through this handle.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Discard everything written since the file was opened or created.
    ///
    /// The file is truncated to its committed length and the handle is
    /// closed. Does nothing after `finish`.
    pub fn abandon(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.file.set_len(self.committed_len)?;
        self.file.sync_all().map_err(|e| {
            TranslateError::io("TreeFileWriter::abandon", format!("sync failed: {e}"))
        })?;
        warn!(
            path = %self.path,
            size = self.committed_len,
            "Discarded unfinished changes"
        );
        Ok(())
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.finished {
            return Err(TranslateError::io(
                format!("TreeFileWriter::{operation}"),
                format!("'{}' is already finished", self.path),
            ));
        }
        Ok(())
    }

    fn write_block(&mut self, stored: &[u8]) -> Result<u64> {
        let offset = self.position;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(stored).map_err(|e| {
            TranslateError::io("TreeFileWriter::write_block", format!("write failed: {e}"))
        })?;
        self.position += stored.len() as u64;
        Ok(offset)
    }

    /// Store every chunk of a dataset, returning refs and element count.
    fn store_chunks(
        &mut self,
        path: &NodePath,
        layout: &DatasetLayout,
        chunks: &mut dyn Iterator<Item = Result<ArrayData>>,
    ) -> Result<(Vec<ChunkRef>, u64)> {
        let mut refs = Vec::with_capacity(layout.chunk_count());
        let mut written = 0u64;
        for chunk in Rechunk::new(chunks, layout.chunk_len) {
            let chunk = chunk?;
            check_chunk(layout, path, &chunk)?;
            let raw = encode(&chunk)?;
            let stored = layout.compression.compress(&raw)?;
            let offset = self.write_block(&stored)?;
            refs.push(ChunkRef {
                offset,
                stored_len: stored.len() as u64,
                raw_len: raw.len() as u64,
                crc: crc32fast::hash(&stored),
                elements: chunk.len() as u64,
            });
            written += chunk.len() as u64;
        }
        check_total(layout, path, written)?;
        Ok((refs, written))
    }
}

impl ContainerRead for TreeFileWriter {
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
                "TreeFileWriter::read_chunk",
                format!("'{path}' has no chunk {index}"),
            )
        })?;
        let mut stored = vec![0u8; chunk.stored_len as usize];
        let mut handle = &self.file;
        handle.seek(SeekFrom::Start(chunk.offset))?;
        handle.read_exact(&mut stored)?;
        load_chunk(&stored, chunk, &dataset.layout, "TreeFileWriter::read_chunk")
    }
}

impl ContainerWrite for TreeFileWriter {
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

        let start = self.position;
        let (refs, written) = match self.store_chunks(path, &layout, chunks) {
            Ok(stored) => stored,
            Err(e) => {
                self.position = start;
                return Err(e);
            }
        };
        let stored_bytes = self.position - start;
        self.chunks_written += refs.len() as u64;
        self.bytes_written += stored_bytes;

        debug!(
            path = %path,
            layout = %layout.describe(),
            chunks = refs.len(),
            stored_bytes,
            "Stored dataset"
        );
        self.tree.insert_dataset(
            path,
            DatasetNode {
                attrs,
                layout,
                chunks: refs,
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
        if self.finished {
            return Ok(());
        }
        let footer = index_bytes(&self.tree, self.position)?;
        self.file.seek(SeekFrom::Start(self.position))?;
        self.file.write_all(&footer)?;
        let end = self.position + footer.len() as u64;
        self.file.set_len(end)?;
        self.file.sync_all().map_err(|e| {
            TranslateError::io("TreeFileWriter::finish", format!("sync failed: {e}"))
        })?;
        self.finished = true;
        self.committed_len = end;
        debug!(
            path = %self.path,
            size = end,
            chunks = self.chunks_written,
            "Finished tree file"
        );
        Ok(())
    }
}

impl Drop for TreeFileWriter {
    fn drop(&mut self) {
        if let Err(e) = self.abandon() {
            warn!(path = %self.path, error = %e, "Failed to discard unfinished changes");
        }
    }
}
