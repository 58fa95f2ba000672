// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed element buffers.
//!
//! [`ArrayData`] holds a contiguous run of elements in C order. It is the unit
//! of chunked I/O: datasets are stored, read, transformed and written one
//! `ArrayData` chunk at a time. Shape lives in the dataset layout, never here.

use std::ops::Range;

use super::error::{Result, TranslateError};
use super::value::DataType;

/// Contiguous, homogeneously typed elements.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

/// Evaluate `$body` with `$v` bound to the inner vector, whatever the variant.
macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => $body,
            ArrayData::Int8($v) => $body,
            ArrayData::Int16($v) => $body,
            ArrayData::Int32($v) => $body,
            ArrayData::Int64($v) => $body,
            ArrayData::UInt8($v) => $body,
            ArrayData::UInt16($v) => $body,
            ArrayData::UInt32($v) => $body,
            ArrayData::UInt64($v) => $body,
            ArrayData::Float32($v) => $body,
            ArrayData::Float64($v) => $body,
            ArrayData::String($v) => $body,
        }
    };
}

/// Like `with_vec!`, but rewraps the result in the same variant.
macro_rules! map_same {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => ArrayData::Bool($body),
            ArrayData::Int8($v) => ArrayData::Int8($body),
            ArrayData::Int16($v) => ArrayData::Int16($body),
            ArrayData::Int32($v) => ArrayData::Int32($body),
            ArrayData::Int64($v) => ArrayData::Int64($body),
            ArrayData::UInt8($v) => ArrayData::UInt8($body),
            ArrayData::UInt16($v) => ArrayData::UInt16($body),
            ArrayData::UInt32($v) => ArrayData::UInt32($body),
            ArrayData::UInt64($v) => ArrayData::UInt64($body),
            ArrayData::Float32($v) => ArrayData::Float32($body),
            ArrayData::Float64($v) => ArrayData::Float64($body),
            ArrayData::String($v) => ArrayData::String($body),
        }
    };
}

/// Intermediate scalar used by casts between arbitrary element types.
#[derive(Debug, Clone)]
enum Element {
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
}

impl Element {
    fn to_f64(&self) -> std::result::Result<f64, String> {
        match self {
            Element::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Element::Int(i) => Ok(*i as f64),
            Element::Float(f) => Ok(*f),
            Element::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{s}' is not a number")),
        }
    }

    fn to_i128(&self) -> std::result::Result<i128, String> {
        match self {
            Element::Bool(b) => Ok(i128::from(*b)),
            Element::Int(i) => Ok(*i),
            Element::Float(f) => float_to_i128(*f),
            Element::Str(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<i128>() {
                    Ok(v) => Ok(v),
                    Err(_) => trimmed
                        .parse::<f64>()
                        .map_err(|_| format!("'{s}' is not a number"))
                        .and_then(float_to_i128),
                }
            }
        }
    }

    fn to_bool(&self) -> std::result::Result<bool, String> {
        match self {
            Element::Bool(b) => Ok(*b),
            Element::Int(i) => Ok(*i != 0),
            Element::Float(f) => Ok(*f != 0.0),
            Element::Str(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(format!("'{s}' is not a boolean")),
            },
        }
    }

    fn into_string(self) -> String {
        match self {
            Element::Bool(b) => b.to_string(),
            Element::Int(i) => i.to_string(),
            Element::Float(f) => f.to_string(),
            Element::Str(s) => s,
        }
    }
}

/// Truncate toward zero, refusing values that cannot be represented.
fn float_to_i128(value: f64) -> std::result::Result<i128, String> {
    if !value.is_finite() {
        return Err(format!("{value} has no integer representation"));
    }
    let truncated = value.trunc();
    if truncated.abs() >= 1.0e38 {
        return Err(format!("{value} is out of integer range"));
    }
    Ok(truncated as i128)
}

fn narrow<T: TryFrom<i128>>(value: i128, target: DataType) -> std::result::Result<T, String> {
    T::try_from(value).map_err(|_| format!("{value} is out of range for {target}"))
}

impl ArrayData {
    /// Create an empty buffer of the given element type.
    pub fn empty(dtype: DataType) -> Self {
        Self::with_capacity(dtype, 0)
    }

    /// Create an empty buffer with room for `capacity` elements.
    pub fn with_capacity(dtype: DataType, capacity: usize) -> Self {
        match dtype {
            DataType::Bool => ArrayData::Bool(Vec::with_capacity(capacity)),
            DataType::Int8 => ArrayData::Int8(Vec::with_capacity(capacity)),
            DataType::Int16 => ArrayData::Int16(Vec::with_capacity(capacity)),
            DataType::Int32 => ArrayData::Int32(Vec::with_capacity(capacity)),
            DataType::Int64 => ArrayData::Int64(Vec::with_capacity(capacity)),
            DataType::UInt8 => ArrayData::UInt8(Vec::with_capacity(capacity)),
            DataType::UInt16 => ArrayData::UInt16(Vec::with_capacity(capacity)),
            DataType::UInt32 => ArrayData::UInt32(Vec::with_capacity(capacity)),
            DataType::UInt64 => ArrayData::UInt64(Vec::with_capacity(capacity)),
            DataType::Float32 => ArrayData::Float32(Vec::with_capacity(capacity)),
            DataType::Float64 => ArrayData::Float64(Vec::with_capacity(capacity)),
            DataType::String => ArrayData::String(Vec::with_capacity(capacity)),
        }
    }

    /// Element type of this buffer.
    pub fn dtype(&self) -> DataType {
        match self {
            ArrayData::Bool(_) => DataType::Bool,
            ArrayData::Int8(_) => DataType::Int8,
            ArrayData::Int16(_) => DataType::Int16,
            ArrayData::Int32(_) => DataType::Int32,
            ArrayData::Int64(_) => DataType::Int64,
            ArrayData::UInt8(_) => DataType::UInt8,
            ArrayData::UInt16(_) => DataType::UInt16,
            ArrayData::UInt32(_) => DataType::UInt32,
            ArrayData::UInt64(_) => DataType::UInt64,
            ArrayData::Float32(_) => DataType::Float32,
            ArrayData::Float64(_) => DataType::Float64,
            ArrayData::String(_) => DataType::String,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload size in bytes (UTF-8 length for strings).
    pub fn byte_len(&self) -> u64 {
        match self {
            ArrayData::String(v) => v.iter().map(|s| s.len() as u64).sum(),
            other => {
                let size = other.dtype().element_size().unwrap_or(0) as u64;
                other.len() as u64 * size
            }
        }
    }

    /// Copy out a sub-range of elements.
    pub fn slice(&self, range: Range<usize>) -> ArrayData {
        map_same!(self, v => v[range].to_vec())
    }

    /// Append another buffer of the same element type.
    pub fn extend(&mut self, other: ArrayData) -> Result<()> {
        let (to, from) = (self.dtype(), other.dtype());
        match (self, other) {
            (ArrayData::Bool(a), ArrayData::Bool(b)) => a.extend(b),
            (ArrayData::Int8(a), ArrayData::Int8(b)) => a.extend(b),
            (ArrayData::Int16(a), ArrayData::Int16(b)) => a.extend(b),
            (ArrayData::Int32(a), ArrayData::Int32(b)) => a.extend(b),
            (ArrayData::Int64(a), ArrayData::Int64(b)) => a.extend(b),
            (ArrayData::UInt8(a), ArrayData::UInt8(b)) => a.extend(b),
            (ArrayData::UInt16(a), ArrayData::UInt16(b)) => a.extend(b),
            (ArrayData::UInt32(a), ArrayData::UInt32(b)) => a.extend(b),
            (ArrayData::UInt64(a), ArrayData::UInt64(b)) => a.extend(b),
            (ArrayData::Float32(a), ArrayData::Float32(b)) => a.extend(b),
            (ArrayData::Float64(a), ArrayData::Float64(b)) => a.extend(b),
            (ArrayData::String(a), ArrayData::String(b)) => a.extend(b),
            _ => {
                return Err(TranslateError::invalid_cast(
                    from.as_str(),
                    to.as_str(),
                    "cannot concatenate buffers of different element types",
                ))
            }
        }
        Ok(())
    }

    /// Numeric elements widened to f64; `None` for bool and string buffers.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let out = match self {
            ArrayData::Int8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::Int16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::UInt8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::UInt16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::UInt32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::Float64(v) => v.clone(),
            ArrayData::Bool(_) | ArrayData::String(_) => return None,
        };
        Some(out)
    }

    /// Narrow f64 values back into a numeric element type.
    ///
    /// Integer targets round to nearest; values outside the target range fail.
    pub fn from_f64_vec(dtype: DataType, values: Vec<f64>) -> Result<ArrayData> {
        match dtype {
            DataType::Float64 => Ok(ArrayData::Float64(values)),
            DataType::Float32 => Ok(ArrayData::Float32(
                values.into_iter().map(|x| x as f32).collect(),
            )),
            t if t.is_integer() => {
                let elements = values
                    .into_iter()
                    .map(|x| Element::Float(x.round()))
                    .collect();
                Self::from_elements(t, elements, DataType::Float64)
            }
            other => Err(TranslateError::invalid_cast(
                "float64",
                other.as_str(),
                "target is not numeric",
            )),
        }
    }

    /// Cast every element to `target`.
    ///
    /// Float to integer truncates toward zero; out-of-range values, NaN and
    /// unparsable strings fail instead of wrapping.
    pub fn cast(&self, target: DataType) -> Result<ArrayData> {
        let from = self.dtype();
        if from == target {
            return Ok(self.clone());
        }
        if target.is_float() {
            if let Some(values) = self.to_f64_vec() {
                return Self::from_f64_vec(target, values);
            }
        }
        Self::from_elements(target, self.to_elements(), from)
    }

    fn to_elements(&self) -> Vec<Element> {
        match self {
            ArrayData::Bool(v) => v.iter().map(|&x| Element::Bool(x)).collect(),
            ArrayData::Int8(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::Int16(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::Int32(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::Int64(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::UInt8(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::UInt16(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::UInt32(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::UInt64(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
            ArrayData::Float32(v) => v.iter().map(|&x| Element::Float(x.into())).collect(),
            ArrayData::Float64(v) => v.iter().map(|&x| Element::Float(x)).collect(),
            ArrayData::String(v) => v.iter().cloned().map(Element::Str).collect(),
        }
    }

    fn from_elements(target: DataType, elements: Vec<Element>, from: DataType) -> Result<Self> {
        fn ints<T: TryFrom<i128>>(
            elements: Vec<Element>,
            target: DataType,
        ) -> std::result::Result<Vec<T>, String> {
            elements
                .iter()
                .map(|e| e.to_i128().and_then(|i| narrow::<T>(i, target)))
                .collect()
        }

        let converted: std::result::Result<ArrayData, String> = match target {
            DataType::Bool => elements
                .iter()
                .map(Element::to_bool)
                .collect::<std::result::Result<_, _>>()
                .map(ArrayData::Bool),
            DataType::Int8 => ints(elements, target).map(ArrayData::Int8),
            DataType::Int16 => ints(elements, target).map(ArrayData::Int16),
            DataType::Int32 => ints(elements, target).map(ArrayData::Int32),
            DataType::Int64 => ints(elements, target).map(ArrayData::Int64),
            DataType::UInt8 => ints(elements, target).map(ArrayData::UInt8),
            DataType::UInt16 => ints(elements, target).map(ArrayData::UInt16),
            DataType::UInt32 => ints(elements, target).map(ArrayData::UInt32),
            DataType::UInt64 => ints(elements, target).map(ArrayData::UInt64),
            DataType::Float32 => elements
                .iter()
                .map(|e| e.to_f64().map(|x| x as f32))
                .collect::<std::result::Result<_, _>>()
                .map(ArrayData::Float32),
            DataType::Float64 => elements
                .iter()
                .map(Element::to_f64)
                .collect::<std::result::Result<_, _>>()
                .map(ArrayData::Float64),
            DataType::String => Ok(ArrayData::String(
                elements.into_iter().map(Element::into_string).collect(),
            )),
        };
        converted.map_err(|message| TranslateError::invalid_cast(from.as_str(), target.as_str(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_bytes() {
        let data = ArrayData::Float64(vec![1.0, 2.0, 3.0]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.byte_len(), 24);
        let text = ArrayData::String(vec!["ab".into(), "cde".into()]);
        assert_eq!(text.byte_len(), 5);
    }

    #[test]
    fn test_slice_and_extend() {
        let data = ArrayData::Int32(vec![1, 2, 3, 4, 5]);
        let mut head = data.slice(0..2);
        head.extend(data.slice(2..5)).unwrap();
        assert_eq!(head, data);
        assert!(head.extend(ArrayData::Float64(vec![1.0])).is_err());
    }

    #[test]
    fn test_cast_float_to_int_truncates() {
        let data = ArrayData::Float64(vec![1.9, -1.9, 0.0]);
        assert_eq!(
            data.cast(DataType::Int16).unwrap(),
            ArrayData::Int16(vec![1, -1, 0])
        );
    }

    #[test]
    fn test_cast_out_of_range_fails() {
        let data = ArrayData::Int32(vec![300]);
        let err = data.cast(DataType::UInt8).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidCast { .. }));
        assert!(ArrayData::Float64(vec![f64::NAN]).cast(DataType::Int64).is_err());
    }

    #[test]
    fn test_cast_string_to_numbers() {
        let data = ArrayData::String(vec!["1".into(), " 2.5 ".into()]);
        assert_eq!(
            data.cast(DataType::Float64).unwrap(),
            ArrayData::Float64(vec![1.0, 2.5])
        );
        assert_eq!(
            data.cast(DataType::Int64).unwrap(),
            ArrayData::Int64(vec![1, 2])
        );
        let bad = ArrayData::String(vec!["abc".into()]);
        assert!(bad.cast(DataType::Float32).is_err());
    }

    #[test]
    fn test_cast_to_string_and_bool() {
        let data = ArrayData::Int8(vec![0, 7]);
        assert_eq!(
            data.cast(DataType::String).unwrap(),
            ArrayData::String(vec!["0".into(), "7".into()])
        );
        assert_eq!(
            data.cast(DataType::Bool).unwrap(),
            ArrayData::Bool(vec![false, true])
        );
    }

    #[test]
    fn test_from_f64_rounds_integers() {
        let data = ArrayData::from_f64_vec(DataType::Int32, vec![999.9999, -0.4]).unwrap();
        assert_eq!(data, ArrayData::Int32(vec![1000, 0]));
        assert!(ArrayData::from_f64_vec(DataType::UInt8, vec![1000.0]).is_err());
        assert!(ArrayData::from_f64_vec(DataType::String, vec![1.0]).is_err());
    }

    #[test]
    fn test_same_type_cast_is_clone() {
        let data = ArrayData::Float32(vec![0.1, 0.2]);
        assert_eq!(data.cast(DataType::Float32).unwrap(), data);
    }
}
