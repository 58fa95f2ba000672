// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Single-dataset pipeline: transformation, unit conversion, cast, rank.
//!
//! Shapes and element types are resolved up front from the source layout,
//! then every chunk is pushed through the element-wise stages on its way to
//! the destination writer.

use tracing::debug;

use crate::container::{Compression, DatasetLayout};
use crate::core::{ArrayData, DataType, NodePath, Result, TranslateError};
use crate::rules::TranslationRule;
use crate::shape::normalize;
use crate::template::TemplateBaseline;
use crate::transform::{ArrayTransform, TransformChain};
use crate::units::{Conversion, UnitRegistry};

/// Element-wise stages applied to each chunk.
pub(crate) struct ChunkStages<'r> {
    chain: Option<&'r TransformChain>,
    conversion: Option<Conversion>,
    cast: Option<DataType>,
}

impl ChunkStages<'_> {
    pub(crate) fn apply(&self, chunk: ArrayData) -> Result<ArrayData> {
        let mut chunk = match self.chain {
            Some(chain) => chain.apply_chunk(&chunk)?,
            None => chunk,
        };
        if let Some(conversion) = &self.conversion {
            chunk = conversion.apply(&chunk)?;
        }
        if let Some(target) = self.cast {
            chunk = chunk.cast(target)?;
        }
        Ok(chunk)
    }
}

/// Resolved output of a dataset rule.
pub(crate) struct DatasetPlan<'r> {
    pub layout: DatasetLayout,
    pub stages: ChunkStages<'r>,
}

/// Resolve the destination layout and chunk stages for `rule`.
pub(crate) fn plan<'r>(
    rule: &'r TranslationRule,
    shape: &[usize],
    dtype: DataType,
    chunk_len: usize,
    baseline: &TemplateBaseline,
    registry: &UnitRegistry,
) -> Result<DatasetPlan<'r>> {
    let (mut shape, dtype) = match &rule.transformation {
        Some(chain) => chain.resolve(shape, dtype)?,
        None => (shape.to_vec(), dtype),
    };

    let conversion = match &rule.units {
        Some(units) => {
            let conversion = registry.conversion(&units.source, &units.destination)?;
            if conversion.is_identity() {
                None
            } else if !dtype.is_numeric() {
                return Err(TranslateError::unit_mismatch(
                    units.source.clone(),
                    units.destination.clone(),
                    format!("{dtype} data cannot carry units"),
                ));
            } else {
                Some(conversion)
            }
        }
        None => None,
    };

    let target = rule.data_type.unwrap_or(dtype);
    let cast = (target != dtype).then_some(target);
    if let Some(rank) = rule.minimum_dimensionality {
        shape = normalize(&shape, rank as i64)?;
    }

    let destination = &rule.destination_path;
    baseline.check_write(destination, &shape, target)?;
    let compression = rule
        .compression
        .or_else(|| baseline.placeholder(destination).map(|l| l.compression))
        .unwrap_or(Compression::None);

    let layout = DatasetLayout::new(shape, target)
        .with_chunk_len(chunk_len)
        .with_compression(compression);
    debug!(
        destination = %destination,
        layout = %layout.describe(),
        compression = %layout.compression,
        "Planned dataset"
    );
    Ok(DatasetPlan {
        layout,
        stages: ChunkStages {
            chain: rule.transformation.as_ref(),
            conversion,
            cast,
        },
    })
}

/// Warn when a dataset's own `units` attribute disagrees with the rule.
///
/// The rule's source units still drive the conversion; the attribute is
/// only compared, never used in their place.
pub(crate) fn declared_units_differ(path: &NodePath, declared: Option<&str>, rule: &str) -> bool {
    match declared {
        Some(units) if units.trim() != rule.trim() => {
            tracing::warn!(
                source = %path,
                attribute = units,
                rule = rule,
                "Source units attribute differs from the rule; using the rule"
            );
            true
        }
        _ => false,
    }
}
