// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Element-wise dataset transformations.
//!
//! A rule's `transformation` string names a chain of built-in operations,
//! resolved when the rule is parsed. No user code is ever evaluated.
//!
//! # Example
//!
//! ```
//! use treetrans::core::ArrayData;
//! use treetrans::transform::{ArrayTransform, TransformChain};
//!
//! let chain: TransformChain = "scale(2) | clip(0, 5)".parse().unwrap();
//! let out = chain.apply_chunk(&ArrayData::Float64(vec![1.0, 4.0])).unwrap();
//! assert_eq!(out, ArrayData::Float64(vec![2.0, 5.0]));
//! ```

pub mod ops;
pub mod pipeline;

use crate::core::{ArrayData, DataType, Result};

pub use ops::Transformation;
pub use pipeline::TransformChain;

/// A pure transformation over one dataset.
///
/// Shape and element type are resolved up front from the dataset layout;
/// element data is then pushed through [`apply_chunk`](Self::apply_chunk) one
/// chunk at a time, so implementations must not depend on chunk boundaries.
pub trait ArrayTransform: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> String;

    /// Shape of the output for an input of `shape`.
    fn output_shape(&self, shape: &[usize]) -> Result<Vec<usize>> {
        Ok(shape.to_vec())
    }

    /// Element type of the output for an input of `dtype`.
    fn output_dtype(&self, dtype: DataType) -> Result<DataType> {
        Ok(dtype)
    }

    /// Transform one chunk of elements.
    fn apply_chunk(&self, chunk: &ArrayData) -> Result<ArrayData>;
}
