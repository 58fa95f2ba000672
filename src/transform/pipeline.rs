// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Transformation chains.

use std::fmt;
use std::str::FromStr;

use super::{ArrayTransform, Transformation};
use crate::core::{ArrayData, DataType, Result, TranslateError};

/// Ordered sequence of transformations.
///
/// Parsed from a `|`-separated list such as `scale(0.5) | clip(0, 1)`. Each
/// step receives the previous step's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformChain {
    steps: Vec<Transformation>,
}

impl TransformChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step.
    pub fn push(&mut self, step: Transformation) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Transformation] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Final shape and element type for an input layout.
    pub fn resolve(&self, shape: &[usize], dtype: DataType) -> Result<(Vec<usize>, DataType)> {
        let mut shape = shape.to_vec();
        let mut dtype = dtype;
        for step in &self.steps {
            shape = step.output_shape(&shape)?;
            dtype = step.output_dtype(dtype)?;
        }
        Ok((shape, dtype))
    }
}

impl ArrayTransform for TransformChain {
    fn name(&self) -> String {
        self.to_string()
    }

    fn output_shape(&self, shape: &[usize]) -> Result<Vec<usize>> {
        self.steps
            .iter()
            .try_fold(shape.to_vec(), |acc, step| step.output_shape(&acc))
    }

    fn output_dtype(&self, dtype: DataType) -> Result<DataType> {
        self.steps
            .iter()
            .try_fold(dtype, |acc, step| step.output_dtype(acc))
    }

    fn apply_chunk(&self, chunk: &ArrayData) -> Result<ArrayData> {
        let mut current = chunk.clone();
        for step in &self.steps {
            current = step.apply_chunk(&current)?;
        }
        Ok(current)
    }
}

impl fmt::Display for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.steps.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join(" | "))
    }
}

impl FromStr for TransformChain {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(TranslateError::invalid_rule(s, "empty transformation"));
        }
        let steps = s
            .split('|')
            .map(str::parse)
            .collect::<Result<Vec<Transformation>>>()?;
        Ok(Self { steps })
    }
}

impl From<Transformation> for TransformChain {
    fn from(step: Transformation) -> Self {
        Self { steps: vec![step] }
    }
}
