// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Rule default values.

use crate::core::{ArrayData, AttrValue};

/// Shape and elements of a rule's `default_value`.
///
/// Scalars become 0-d arrays and lists become 1-d arrays. A string that
/// holds a JSON array (`"[1, 2, 3]"`) is read as that array; any other
/// string is a string scalar.
pub fn default_array(value: &AttrValue) -> (Vec<usize>, ArrayData) {
    match value {
        AttrValue::Bool(v) => (vec![], ArrayData::Bool(vec![*v])),
        AttrValue::Int(v) => (vec![], ArrayData::Int64(vec![*v])),
        AttrValue::Float(v) => (vec![], ArrayData::Float64(vec![*v])),
        AttrValue::IntArray(v) => (vec![v.len()], ArrayData::Int64(v.clone())),
        AttrValue::FloatArray(v) => (vec![v.len()], ArrayData::Float64(v.clone())),
        AttrValue::StringArray(v) => (vec![v.len()], ArrayData::String(v.clone())),
        AttrValue::String(text) => {
            if text.trim_start().starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<AttrValue>(text) {
                    if matches!(
                        parsed,
                        AttrValue::IntArray(_) | AttrValue::FloatArray(_) | AttrValue::StringArray(_)
                    ) {
                        return default_array(&parsed);
                    }
                }
            }
            (vec![], ArrayData::String(vec![text.clone()]))
        }
    }
}
