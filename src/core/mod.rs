// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout treetrans.
//!
//! This module provides the foundational types for the library:
//! - [`TranslateError`] - Error kinds and fatal/per-rule classification
//! - [`DataType`] / [`ArrayData`] - Element types and typed chunk buffers
//! - [`AttrValue`] / [`AttributeMap`] - Node attributes
//! - [`NodePath`] - Normalized node addressing

pub mod array;
pub mod error;
pub mod path;
pub mod value;

pub use array::ArrayData;
pub use error::{Result, TranslateError};
pub use path::NodePath;
pub use value::{AttrValue, AttributeMap, DataType, ParseDataTypeError};

/// Number of elements described by a shape (1 for scalars).
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Render a shape the way diagnostics print it, e.g. `(10, 10)` or `()`.
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}
