// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Physical unit conversion.
//!
//! Unit expressions are parsed with a small Pest grammar, resolved against a
//! [`UnitRegistry`] to an SI scale, offset and dimension, and turned into a
//! [`Conversion`] that is applied element-wise to chunk data.
//!
//! # Example
//!
//! ```
//! use treetrans::core::ArrayData;
//! use treetrans::units::convert;
//!
//! let out = convert(&ArrayData::Float64(vec![1.0]), "m", "mm").unwrap();
//! assert_eq!(out, ArrayData::Float64(vec![1000.0]));
//! ```

pub mod parser;
pub mod registry;

use std::fmt;

use crate::core::{ArrayData, Result, TranslateError};

pub use registry::{Dimension, ResolvedUnit, UnitDef, UnitRegistry};

/// Errors from parsing or resolving unit expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitError {
    /// Expression is not valid unit syntax
    Parse { unit: String, message: String },
    /// A symbol in the expression is not registered
    Unknown { symbol: String, unit: String },
    /// Units resolve to different dimensions
    Incompatible {
        from: String,
        to: String,
        from_dim: Dimension,
        to_dim: Dimension,
    },
    /// Offset unit used inside a compound expression
    OffsetCompound { unit: String },
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::Parse { unit, message } => {
                write!(f, "cannot parse '{unit}': {message}")
            }
            UnitError::Unknown { symbol, unit } => {
                write!(f, "unknown symbol '{symbol}' in '{unit}'")
            }
            UnitError::Incompatible {
                from,
                to,
                from_dim,
                to_dim,
            } => write!(f, "'{from}' is {from_dim} but '{to}' is {to_dim}"),
            UnitError::OffsetCompound { unit } => write!(
                f,
                "offset unit in '{unit}' cannot be combined with other units or powers"
            ),
        }
    }
}

impl std::error::Error for UnitError {}

impl From<UnitError> for TranslateError {
    fn from(err: UnitError) -> Self {
        match &err {
            UnitError::Parse { unit, .. }
            | UnitError::Unknown { unit, .. }
            | UnitError::OffsetCompound { unit } => {
                TranslateError::unknown_unit(unit.clone(), err.to_string())
            }
            UnitError::Incompatible {
                from,
                to,
                from_dim,
                to_dim,
            } => TranslateError::unit_mismatch(
                from.clone(),
                to.clone(),
                format!("{from_dim} vs {to_dim}"),
            ),
        }
    }
}

/// Affine map `out = value * scale + offset` between two units.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    from: String,
    to: String,
    scale: f64,
    offset: f64,
}

impl Conversion {
    /// The identity conversion for a unit.
    pub fn identity(unit: &str) -> Self {
        Self {
            from: unit.to_string(),
            to: unit.to_string(),
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Check if applying this conversion leaves values unchanged.
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    /// Convert a single value.
    pub fn apply_scalar(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Convert every element of a chunk, keeping its element type.
    ///
    /// Integer chunks are converted in f64 and rounded back; results outside
    /// the integer range fail with `InvalidCast`.
    pub fn apply(&self, data: &ArrayData) -> Result<ArrayData> {
        let Some(values) = data.to_f64_vec() else {
            return Err(TranslateError::unit_mismatch(
                self.from.clone(),
                self.to.clone(),
                format!("{} data cannot carry units", data.dtype()),
            ));
        };
        if self.is_identity() {
            return Ok(data.clone());
        }
        let converted = values.into_iter().map(|v| self.apply_scalar(v)).collect();
        ArrayData::from_f64_vec(data.dtype(), converted)
    }
}

impl UnitRegistry {
    /// Build the conversion from `from` to `to`.
    ///
    /// Identical expressions short-circuit to the identity without a lookup.
    pub fn conversion(&self, from: &str, to: &str) -> std::result::Result<Conversion, UnitError> {
        if from.trim() == to.trim() {
            return Ok(Conversion::identity(from.trim()));
        }
        let a = self.resolve(from)?;
        let b = self.resolve(to)?;
        if a.dimension != b.dimension {
            return Err(UnitError::Incompatible {
                from: from.to_string(),
                to: to.to_string(),
                from_dim: a.dimension,
                to_dim: b.dimension,
            });
        }
        Ok(Conversion {
            from: from.to_string(),
            to: to.to_string(),
            scale: a.scale / b.scale,
            offset: (a.offset - b.offset) / b.scale,
        })
    }
}

/// Convert a chunk between unit expressions using the shared registry.
pub fn convert(values: &ArrayData, from: &str, to: &str) -> Result<ArrayData> {
    let conversion = UnitRegistry::shared().conversion(from, to)?;
    conversion.apply(values)
}

/// Check that a unit expression parses and resolves.
pub fn validate(expression: &str) -> Result<()> {
    UnitRegistry::shared().resolve(expression)?;
    Ok(())
}
