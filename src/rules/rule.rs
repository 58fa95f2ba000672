// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Translation rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::container::Compression;
use crate::core::{AttrValue, AttributeMap, DataType, NodePath, Result, TranslateError};
use crate::shape::check_rank;
use crate::transform::TransformChain;
use crate::units;

/// A rule as written in a configuration document.
///
/// Unknown keys are rejected so a misspelled option cannot silently turn
/// the rule into a plain copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(alias = "source")]
    pub source_path: String,
    #[serde(alias = "destination")]
    pub destination_path: String,
    #[serde(default, alias = "datatype")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub source_units: Option<String>,
    #[serde(default)]
    pub destination_units: Option<String>,
    #[serde(default)]
    pub minimum_dimensionality: Option<i64>,
    #[serde(default)]
    pub compression: Option<String>,
    #[serde(default)]
    pub transformation: Option<String>,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default)]
    pub default_value: Option<AttrValue>,
}

/// A `tree_copy` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeCopySpec {
    #[serde(alias = "source_path")]
    pub source: String,
    #[serde(alias = "destination_path")]
    pub destination: String,
}

/// Declared source and destination unit of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPair {
    pub source: String,
    pub destination: String,
}

/// A validated translation rule.
///
/// Rules are immutable once built; the executor only reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRule {
    pub source_path: NodePath,
    pub destination_path: NodePath,
    pub data_type: Option<DataType>,
    pub units: Option<UnitPair>,
    pub minimum_dimensionality: Option<usize>,
    pub compression: Option<Compression>,
    pub transformation: Option<TransformChain>,
    /// Attributes set on the destination, overriding merged ones
    pub attributes: AttributeMap,
    /// Written when the source is missing or cannot be cast
    pub default_value: Option<AttrValue>,
}

impl TranslationRule {
    /// Plain copy rule from `source` to `destination`.
    pub fn new(source: &str, destination: &str) -> Result<Self> {
        Ok(Self {
            source_path: NodePath::parse(source)?,
            destination_path: NodePath::parse(destination)?,
            data_type: None,
            units: None,
            minimum_dimensionality: None,
            compression: None,
            transformation: None,
            attributes: AttributeMap::new(),
            default_value: None,
        })
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_units(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.units = Some(UnitPair {
            source: source.into(),
            destination: destination.into(),
        });
        self
    }

    pub fn with_minimum_dimensionality(mut self, rank: usize) -> Self {
        self.minimum_dimensionality = Some(rank);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_transformation(mut self, chain: TransformChain) -> Self {
        self.transformation = Some(chain);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Build a rule from its document form, validating every field.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self> {
        let label = format!("{} -> {}", spec.source_path, spec.destination_path);
        if spec.destination_path.trim().is_empty() {
            return Err(TranslateError::invalid_rule(label, "destination is required"));
        }
        let mut rule = Self::new(&spec.source_path, &spec.destination_path)?;

        if let Some(name) = non_empty(&spec.data_type) {
            rule.data_type = Some(
                name.parse()
                    .map_err(|e| TranslateError::invalid_rule(&label, format!("{e}")))?,
            );
        }
        match (non_empty(&spec.source_units), non_empty(&spec.destination_units)) {
            (Some(source), Some(destination)) => {
                units::validate(source)?;
                units::validate(destination)?;
                rule = rule.with_units(source, destination);
            }
            (None, None) => {}
            _ => {
                return Err(TranslateError::invalid_rule(
                    label,
                    "source_units and destination_units must be given together",
                ))
            }
        }
        if let Some(rank) = spec.minimum_dimensionality {
            rule.minimum_dimensionality = Some(check_rank(rank)?);
        }
        if let Some(codec) = &spec.compression {
            rule.compression = Some(codec.parse()?);
        }
        if let Some(expression) = non_empty(&spec.transformation) {
            rule.transformation = Some(expression.parse()?);
        }
        rule.attributes = spec.attributes.clone();
        rule.default_value = spec.default_value.clone();
        Ok(rule)
    }

    /// Attributes the rule sets on its destination, including `units`.
    pub fn explicit_attributes(&self) -> AttributeMap {
        let mut attrs = self.attributes.clone();
        if let Some(units) = &self.units {
            attrs.insert("units".to_string(), AttrValue::from(units.destination.as_str()));
        }
        attrs
    }

    /// Whether any dataset-only field is set.
    pub fn has_dataset_options(&self) -> bool {
        self.data_type.is_some()
            || self.units.is_some()
            || self.minimum_dimensionality.is_some()
            || self.transformation.is_some()
    }
}

impl fmt::Display for TranslationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source_path, self.destination_path)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
