// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk compression codecs.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Result, TranslateError};

/// Default zstd level.
const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Default bzip2 block size (1-9).
const DEFAULT_BZIP2_LEVEL: u32 = 6;

/// Compression applied to every chunk of a dataset.
///
/// Written as `none`, `zstd`, `zstd:<level>`, `lz4`, `bzip2` or
/// `bzip2:<level>`. `gzip` is accepted as an alias for zstd so that rule
/// files written for HDF5 (where gzip is the common filter) keep working.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Compression {
    #[default]
    None,
    Zstd { level: i32 },
    Lz4,
    Bzip2 { level: u32 },
}

impl Compression {
    /// Compress one chunk.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match *self {
            Compression::None => Ok(data.to_vec()),
            Compression::Zstd { level } => zstd::bulk::compress(data, level)
                .map_err(|e| TranslateError::io("zstd", format!("compression failed: {e}"))),
            Compression::Lz4 => Ok(lz4_flex::compress(data)),
            Compression::Bzip2 { level } => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(level));
                encoder
                    .write_all(data)
                    .map_err(|e| TranslateError::io("bzip2", format!("compression failed: {e}")))?;
                encoder
                    .finish()
                    .map_err(|e| TranslateError::io("bzip2", format!("compression failed: {e}")))
            }
        }
    }

    /// Decompress one chunk of known uncompressed size.
    pub fn decompress(&self, data: &[u8], raw_len: usize) -> Result<Vec<u8>> {
        let out = match *self {
            Compression::None => data.to_vec(),
            Compression::Zstd { .. } => zstd::bulk::decompress(data, raw_len)
                .map_err(|e| TranslateError::io("zstd", format!("decompression failed: {e}")))?,
            Compression::Lz4 => lz4_flex::decompress(data, raw_len)
                .map_err(|e| TranslateError::io("lz4", format!("decompression failed: {e}")))?,
            Compression::Bzip2 { .. } => {
                let mut decoder = bzip2::read::BzDecoder::new(data);
                let mut out = Vec::with_capacity(raw_len);
                decoder.read_to_end(&mut out).map_err(|e| {
                    TranslateError::io("bzip2", format!("decompression failed: {e}"))
                })?;
                out
            }
        };
        if out.len() != raw_len {
            return Err(TranslateError::io(
                "Compression::decompress",
                format!("expected {raw_len} bytes, got {}", out.len()),
            ));
        }
        Ok(out)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            Compression::Zstd { level } => write!(f, "zstd:{level}"),
            Compression::Lz4 => f.write_str("lz4"),
            Compression::Bzip2 { level } => write!(f, "bzip2:{level}"),
        }
    }
}

impl FromStr for Compression {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        let spec = s.trim().to_lowercase();
        let (name, level) = match spec.split_once(':') {
            Some((name, level)) => (name.trim(), Some(level.trim())),
            None => (spec.as_str(), None),
        };
        let bad_level = |level: &str| {
            TranslateError::invalid_rule(s, format!("invalid {name} level '{level}'"))
        };

        match (name, level) {
            ("" | "none" | "off", None) => Ok(Compression::None),
            ("zstd" | "zst" | "gzip", None) => Ok(Compression::Zstd {
                level: DEFAULT_ZSTD_LEVEL,
            }),
            ("zstd" | "zst" | "gzip", Some(level)) => level
                .parse::<i32>()
                .ok()
                .filter(|l| (1..=22).contains(l))
                .map(|level| Compression::Zstd { level })
                .ok_or_else(|| bad_level(level)),
            ("lz4", None) => Ok(Compression::Lz4),
            ("bzip2" | "bz2", None) => Ok(Compression::Bzip2 {
                level: DEFAULT_BZIP2_LEVEL,
            }),
            ("bzip2" | "bz2", Some(level)) => level
                .parse::<u32>()
                .ok()
                .filter(|l| (1..=9).contains(l))
                .map(|level| Compression::Bzip2 { level })
                .ok_or_else(|| bad_level(level)),
            _ => Err(TranslateError::invalid_rule(
                s,
                format!("unsupported compression '{s}'"),
            )),
        }
    }
}

impl TryFrom<String> for Compression {
    type Error = TranslateError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Compression> for String {
    fn from(value: Compression) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..4096u32).flat_map(|i| (i % 17).to_le_bytes()).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!(
            "zstd".parse::<Compression>().unwrap(),
            Compression::Zstd { level: 3 }
        );
        assert_eq!(
            "ZSTD:9".parse::<Compression>().unwrap(),
            Compression::Zstd { level: 9 }
        );
        assert_eq!("lz4".parse::<Compression>().unwrap(), Compression::Lz4);
        assert_eq!(
            "bz2:1".parse::<Compression>().unwrap(),
            Compression::Bzip2 { level: 1 }
        );
        assert_eq!(
            "gzip".parse::<Compression>().unwrap(),
            Compression::Zstd { level: 3 }
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("snappy".parse::<Compression>().is_err());
        assert!("zstd:99".parse::<Compression>().is_err());
        assert!("lz4:3".parse::<Compression>().is_err());
        assert!("bzip2:x".parse::<Compression>().is_err());
    }

    #[test]
    fn test_codecs_restore_input() {
        let data = sample();
        for codec in [
            Compression::None,
            Compression::Zstd { level: 3 },
            Compression::Lz4,
            Compression::Bzip2 { level: 6 },
        ] {
            let packed = codec.compress(&data).unwrap();
            assert_eq!(codec.decompress(&packed, data.len()).unwrap(), data, "{codec}");
        }
    }

    #[test]
    fn test_wrong_raw_len_is_io_error() {
        let packed = Compression::None.compress(b"abc").unwrap();
        let err = Compression::None.decompress(&packed, 4).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Compression::Zstd { level: 5 }).unwrap();
        assert_eq!(json, "\"zstd:5\"");
        let back: Compression = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Compression::Zstd { level: 5 });
        assert!(serde_json::from_str::<Compression>("\"brotli\"").is_err());
    }
}
