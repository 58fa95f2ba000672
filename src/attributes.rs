// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Attribute merging between source and destination nodes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{AttributeMap, Result, TranslateError};

/// Which side wins when a key exists on both nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Imported values replace existing ones
    #[default]
    SourceWins,
    /// Existing values are kept
    DestinationWins,
    /// Differing values on both sides are an error
    UnionFailOnConflict,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::SourceWins => "source_wins",
            MergePolicy::DestinationWins => "destination_wins",
            MergePolicy::UnionFailOnConflict => "union_fail_on_conflict",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "source_wins" | "source" => Ok(MergePolicy::SourceWins),
            "destination_wins" | "destination" => Ok(MergePolicy::DestinationWins),
            "union_fail_on_conflict" | "strict" => Ok(MergePolicy::UnionFailOnConflict),
            other => Err(TranslateError::invalid_rule(
                "merge_policy",
                format!("unknown merge policy '{other}'"),
            )),
        }
    }
}

/// Merge `source` into `destination` under `policy`.
pub fn merge(
    source: &AttributeMap,
    destination: &AttributeMap,
    policy: MergePolicy,
) -> Result<AttributeMap> {
    merge_with_baseline(source, destination, policy, &BTreeSet::new())
}

/// Merge with a set of baseline keys that keep their destination value.
///
/// Baseline keys are template-seeded attributes the current rule does not
/// address explicitly. If they already exist in `destination`, the source
/// value is ignored whatever the policy.
pub fn merge_with_baseline(
    source: &AttributeMap,
    destination: &AttributeMap,
    policy: MergePolicy,
    baseline: &BTreeSet<String>,
) -> Result<AttributeMap> {
    let mut merged = destination.clone();
    for (key, value) in source {
        let Some(existing) = destination.get(key) else {
            merged.insert(key.clone(), value.clone());
            continue;
        };
        if baseline.contains(key) || existing == value {
            continue;
        }
        match policy {
            MergePolicy::SourceWins => {
                merged.insert(key.clone(), value.clone());
            }
            MergePolicy::DestinationWins => {}
            MergePolicy::UnionFailOnConflict => {
                return Err(TranslateError::AttributeConflict { key: key.clone() });
            }
        }
    }
    Ok(merged)
}
