// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Single-file tree container format.
//!
//! # Layout
//!
//! ```text
//! header   "TREEFMT\0" | version: u32
//! data     chunk blocks (compressed, back to back)
//! index    JSON-encoded Tree<ChunkRef>
//! trailer  index_offset: u64 | index_len: u64 | index_crc: u32 | "TREEEND\0"
//! ```
//!
//! All integers are little-endian. Every chunk block carries a CRC32 of its
//! stored bytes in the index. The index is only written by
//! [`TreeFileWriter::finish`], so a file is readable only after a clean
//! finish.

mod reader;
mod writer;

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::tree::Tree;
use crate::core::{Result, TranslateError};

pub use reader::TreeFileReader;
pub use writer::TreeFileWriter;

/// File header magic.
pub const TREE_MAGIC: &[u8; 8] = b"TREEFMT\0";

/// Trailer magic.
pub const TREE_END_MAGIC: &[u8; 8] = b"TREEEND\0";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Header size in bytes.
pub const HEADER_LEN: u64 = 12;

/// Trailer size in bytes.
pub const TRAILER_LEN: u64 = 28;

/// Location of one stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    /// Absolute file offset of the block
    pub offset: u64,
    /// Stored (compressed) length
    pub stored_len: u64,
    /// Encoded length before compression
    pub raw_len: u64,
    /// CRC32 of the stored bytes
    pub crc: u32,
    /// Number of elements in the chunk
    pub elements: u64,
}

/// Parsed trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Trailer {
    pub index_offset: u64,
    pub index_len: u64,
    pub index_crc: u32,
}

impl Trailer {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(TRAILER_LEN as usize);
        out.write_u64::<LittleEndian>(self.index_offset)?;
        out.write_u64::<LittleEndian>(self.index_len)?;
        out.write_u32::<LittleEndian>(self.index_crc)?;
        out.extend_from_slice(TREE_END_MAGIC);
        Ok(out)
    }

    fn decode(bytes: &[u8], context: &str) -> Result<Self> {
        if bytes.len() != TRAILER_LEN as usize || &bytes[20..] != TREE_END_MAGIC {
            return Err(TranslateError::io(
                context,
                "missing trailer; file was not finished",
            ));
        }
        let mut cursor = Cursor::new(bytes);
        Ok(Self {
            index_offset: cursor.read_u64::<LittleEndian>()?,
            index_len: cursor.read_u64::<LittleEndian>()?,
            index_crc: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

pub(crate) fn header_bytes() -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN as usize);
    out.extend_from_slice(TREE_MAGIC);
    out.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    Ok(out)
}

pub(crate) fn check_header(bytes: &[u8], context: &str) -> Result<()> {
    if bytes.len() < HEADER_LEN as usize || &bytes[..8] != TREE_MAGIC {
        return Err(TranslateError::io(context, "not a tree container file"));
    }
    let mut cursor = Cursor::new(&bytes[8..12]);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(TranslateError::io(
            context,
            format!("unsupported format version {version}"),
        ));
    }
    Ok(())
}

/// Serialize the index and trailer that close a file.
pub(crate) fn index_bytes(tree: &Tree<ChunkRef>, index_offset: u64) -> Result<Vec<u8>> {
    let index = serde_json::to_vec(tree)
        .map_err(|e| TranslateError::io("TreeFile::index", format!("encode failed: {e}")))?;
    let trailer = Trailer {
        index_offset,
        index_len: index.len() as u64,
        index_crc: crc32fast::hash(&index),
    };
    let mut out = index;
    out.extend(trailer.encode()?);
    Ok(out)
}

/// Locate and parse the index of a complete file image.
pub(crate) fn parse_index(file: &[u8], context: &str) -> Result<(Tree<ChunkRef>, u64)> {
    check_header(file, context)?;
    let len = file.len() as u64;
    if len < HEADER_LEN + TRAILER_LEN {
        return Err(TranslateError::io(context, "file is truncated"));
    }
    let trailer = Trailer::decode(&file[(len - TRAILER_LEN) as usize..], context)?;
    let start = trailer.index_offset;
    let end = start.checked_add(trailer.index_len).unwrap_or(u64::MAX);
    if start < HEADER_LEN || end > len - TRAILER_LEN {
        return Err(TranslateError::io(context, "index lies outside the file"));
    }
    let index = &file[start as usize..end as usize];
    if crc32fast::hash(index) != trailer.index_crc {
        return Err(TranslateError::io(context, "index checksum mismatch"));
    }
    let tree = serde_json::from_slice(index)
        .map_err(|e| TranslateError::io(context, format!("invalid index: {e}")))?;
    Ok((tree, trailer.index_offset))
}

/// Read the index of a file through `Read`, without mapping it.
pub(crate) fn read_index<R: Read + std::io::Seek>(
    reader: &mut R,
    context: &str,
) -> Result<(Tree<ChunkRef>, u64)> {
    use std::io::SeekFrom;

    let len = reader.seek(SeekFrom::End(0))?;
    if len < HEADER_LEN + TRAILER_LEN {
        return Err(TranslateError::io(context, "file is truncated"));
    }
    let mut header = vec![0u8; HEADER_LEN as usize];
    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut header)?;
    check_header(&header, context)?;

    let mut tail = vec![0u8; TRAILER_LEN as usize];
    reader.seek(SeekFrom::Start(len - TRAILER_LEN))?;
    reader.read_exact(&mut tail)?;
    let trailer = Trailer::decode(&tail, context)?;

    let end = trailer.index_offset.checked_add(trailer.index_len).unwrap_or(u64::MAX);
    if trailer.index_offset < HEADER_LEN || end > len - TRAILER_LEN {
        return Err(TranslateError::io(context, "index lies outside the file"));
    }
    let mut index = vec![0u8; trailer.index_len as usize];
    reader.seek(SeekFrom::Start(trailer.index_offset))?;
    reader.read_exact(&mut index)?;
    if crc32fast::hash(&index) != trailer.index_crc {
        return Err(TranslateError::io(context, "index checksum mismatch"));
    }
    let tree = serde_json::from_slice(&index)
        .map_err(|e| TranslateError::io(context, format!("invalid index: {e}")))?;
    Ok((tree, trailer.index_offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_layout() {
        let trailer = Trailer {
            index_offset: 12,
            index_len: 34,
            index_crc: 0xDEAD_BEEF,
        };
        let bytes = trailer.encode().unwrap();
        assert_eq!(bytes.len() as u64, TRAILER_LEN);
        assert_eq!(&bytes[20..], TREE_END_MAGIC);
        assert_eq!(Trailer::decode(&bytes, "test").unwrap(), trailer);
    }

    #[test]
    fn test_index_image() {
        let tree: Tree<ChunkRef> = Tree::new();
        let mut file = header_bytes().unwrap();
        let offset = file.len() as u64;
        file.extend(index_bytes(&tree, offset).unwrap());
        let (parsed, at) = parse_index(&file, "test").unwrap();
        assert_eq!(parsed, tree);
        assert_eq!(at, HEADER_LEN);

        let (parsed, _) = read_index(&mut Cursor::new(&file), "test").unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_corrupt_index_detected() {
        let tree: Tree<ChunkRef> = Tree::new();
        let mut file = header_bytes().unwrap();
        file.extend(index_bytes(&tree, HEADER_LEN).unwrap());
        file[HEADER_LEN as usize] ^= 0xFF;
        let err = parse_index(&file, "test").unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_rejects_foreign_files() {
        assert!(check_header(b"GARBAGE\0\x01\0\0\0", "test").is_err());
        assert!(parse_index(b"TREEFMT\0\x01\0\0\0", "test").is_err());
    }
}
