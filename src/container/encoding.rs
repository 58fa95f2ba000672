// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte encoding of chunk buffers.
//!
//! Numeric elements are little-endian, booleans one byte each. Strings are a
//! u32 byte length followed by UTF-8 bytes.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::core::{ArrayData, DataType, Result, TranslateError};

macro_rules! put_all {
    ($out:expr, $values:expr, $method:ident) => {
        for v in $values {
            $out.$method::<LittleEndian>(*v)?;
        }
    };
}

macro_rules! get_all {
    ($cursor:expr, $count:expr, $method:ident) => {{
        let mut values = Vec::with_capacity($count);
        for _ in 0..$count {
            values.push($cursor.$method::<LittleEndian>()?);
        }
        values
    }};
}

/// Encode a chunk to bytes.
pub fn encode(data: &ArrayData) -> Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::with_capacity(data.byte_len() as usize);
    match data {
        ArrayData::Bool(v) => out.extend(v.iter().map(|&b| u8::from(b))),
        ArrayData::Int8(v) => out.extend(v.iter().map(|&x| x as u8)),
        ArrayData::UInt8(v) => out.extend_from_slice(v),
        ArrayData::Int16(v) => put_all!(out, v, write_i16),
        ArrayData::Int32(v) => put_all!(out, v, write_i32),
        ArrayData::Int64(v) => put_all!(out, v, write_i64),
        ArrayData::UInt16(v) => put_all!(out, v, write_u16),
        ArrayData::UInt32(v) => put_all!(out, v, write_u32),
        ArrayData::UInt64(v) => put_all!(out, v, write_u64),
        ArrayData::Float32(v) => put_all!(out, v, write_f32),
        ArrayData::Float64(v) => put_all!(out, v, write_f64),
        ArrayData::String(v) => {
            for s in v {
                let len = u32::try_from(s.len()).map_err(|_| {
                    TranslateError::io("encode", "string element exceeds 4 GiB")
                })?;
                out.write_u32::<LittleEndian>(len)?;
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
    Ok(out)
}

/// Decode `count` elements of `dtype` from bytes.
pub fn decode(dtype: DataType, bytes: &[u8], count: usize) -> Result<ArrayData> {
    if let Some(size) = dtype.element_size() {
        if bytes.len() != size * count {
            return Err(TranslateError::io(
                "decode",
                format!(
                    "{} bytes cannot hold {count} {dtype} elements",
                    bytes.len()
                ),
            ));
        }
    }

    let mut cursor = Cursor::new(bytes);
    let data = match dtype {
        DataType::Bool => ArrayData::Bool(bytes.iter().map(|&b| b != 0).collect()),
        DataType::Int8 => ArrayData::Int8(bytes.iter().map(|&b| b as i8).collect()),
        DataType::UInt8 => ArrayData::UInt8(bytes.to_vec()),
        DataType::Int16 => ArrayData::Int16(get_all!(cursor, count, read_i16)),
        DataType::Int32 => ArrayData::Int32(get_all!(cursor, count, read_i32)),
        DataType::Int64 => ArrayData::Int64(get_all!(cursor, count, read_i64)),
        DataType::UInt16 => ArrayData::UInt16(get_all!(cursor, count, read_u16)),
        DataType::UInt32 => ArrayData::UInt32(get_all!(cursor, count, read_u32)),
        DataType::UInt64 => ArrayData::UInt64(get_all!(cursor, count, read_u64)),
        DataType::Float32 => ArrayData::Float32(get_all!(cursor, count, read_f32)),
        DataType::Float64 => ArrayData::Float64(get_all!(cursor, count, read_f64)),
        DataType::String => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let len = cursor.read_u32::<LittleEndian>()? as usize;
                let start = cursor.position() as usize;
                let raw = bytes.get(start..start + len).ok_or_else(|| {
                    TranslateError::io("decode", "string element runs past chunk end")
                })?;
                let text = std::str::from_utf8(raw)
                    .map_err(|e| TranslateError::io("decode", format!("invalid UTF-8: {e}")))?;
                values.push(text.to_string());
                cursor.set_position((start + len) as u64);
            }
            if cursor.position() as usize != bytes.len() {
                return Err(TranslateError::io("decode", "trailing bytes after strings"));
            }
            ArrayData::String(values)
        }
    };
    Ok(data)
}
