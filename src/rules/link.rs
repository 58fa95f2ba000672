// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Link rules.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::container::LinkKind;
use crate::core::{NodePath, Result, TranslateError};

/// Where a link's target lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkScope {
    /// Target is a node of the destination
    #[default]
    Internal,
    /// Target is a node of the source (or an alternate) file
    External,
}

/// A `link_list` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    #[serde(alias = "source")]
    pub source_path: String,
    #[serde(alias = "destination")]
    pub destination_path: String,
    #[serde(default)]
    pub internal_or_external: LinkScope,
    #[serde(default)]
    pub soft_or_hard_link: LinkKind,
    #[serde(default)]
    pub alternate_source_file: Option<PathBuf>,
}

/// A validated link, created after the prune step.
///
/// Internal links point at a destination node. External links copy a node
/// out of the source file, or `alternate_source` when given, into the
/// destination; an external soft link is copied the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRule {
    pub target: NodePath,
    pub destination: NodePath,
    pub scope: LinkScope,
    pub kind: LinkKind,
    pub alternate_source: Option<PathBuf>,
}

impl LinkRule {
    /// Internal link at `destination` pointing at `target`.
    pub fn internal(target: &str, destination: &str, kind: LinkKind) -> Result<Self> {
        let destination = NodePath::parse(destination)?;
        if destination.is_root() {
            return Err(TranslateError::invalid_rule(
                format!("{target} -> /"),
                "a link cannot replace the root group",
            ));
        }
        Ok(Self {
            target: NodePath::parse(target)?,
            destination,
            scope: LinkScope::Internal,
            kind,
            alternate_source: None,
        })
    }

    /// Build a link from its document form.
    pub fn from_spec(spec: &LinkSpec) -> Result<Self> {
        let mut rule = Self::internal(
            &spec.source_path,
            &spec.destination_path,
            spec.soft_or_hard_link,
        )?;
        rule.scope = spec.internal_or_external;
        rule.alternate_source = spec.alternate_source_file.clone();
        if rule.scope == LinkScope::Internal && rule.alternate_source.is_some() {
            return Err(TranslateError::invalid_rule(
                rule.to_string(),
                "alternate_source_file only applies to external links",
            ));
        }
        Ok(rule)
    }
}

impl fmt::Display for LinkRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({}", self.destination, self.target, self.kind)?;
        match (&self.scope, &self.alternate_source) {
            (LinkScope::Internal, _) => f.write_str(")"),
            (LinkScope::External, None) => f.write_str(", external)"),
            (LinkScope::External, Some(file)) => write!(f, ", external {})", file.display()),
        }
    }
}
