// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Rule documents.
//!
//! A rule document has five sections, all optional:
//!
//! ```yaml
//! tree_copy:
//!   - source: /raw
//!     destination: /entry/
//! data_copy:
//!   - source: /raw/x
//!     destination: /entry/x
//!     source_units: m
//!     destination_units: mm
//!     minimum_dimensionality: 2
//! attributes:
//!   /entry:
//!     NX_class: NXentry
//! prune_list:
//!   - /entry/raw/scratch
//! link_list:
//!   - source_path: /entry/x
//!     destination_path: /entry/sample/x
//!     soft_or_hard_link: soft
//! ```
//!
//! `tree_copy` entries run before `data_copy` entries, in document order.
//! `attributes`, `prune_list` and `link_list` are applied in that order
//! after every rule. Documents may be YAML, TOML or JSON; the format follows
//! the file extension. Unknown keys are rejected.

mod default;
mod link;
mod rule;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::copier::tree_destination;
use crate::core::{AttributeMap, NodePath, Result, TranslateError};

pub use default::default_array;
pub use link::{LinkRule, LinkScope, LinkSpec};
pub use rule::{RuleSpec, TranslationRule, TreeCopySpec, UnitPair};

/// Serialization format of a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        ext.parse().map_err(|_| {
            TranslateError::invalid_rule(
                path.display().to_string(),
                format!("unsupported config extension '{ext}' (use .yaml, .toml or .json)"),
            )
        })
    }
}

impl FromStr for ConfigFormat {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            other => Err(TranslateError::invalid_rule(
                "config",
                format!("unknown config format '{other}'"),
            )),
        }
    }
}

/// Raw rule document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    #[serde(default)]
    pub tree_copy: Vec<TreeCopySpec>,
    #[serde(default)]
    pub data_copy: Vec<RuleSpec>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeMap>,
    #[serde(default)]
    pub prune_list: Vec<String>,
    #[serde(default)]
    pub link_list: Vec<LinkSpec>,
}

impl RuleDocument {
    /// Parse a document from text.
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        let parsed = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        // An empty YAML file is a valid, empty document.
        match parsed {
            Ok(doc) => Ok(doc),
            Err(_) if text.trim().is_empty() => Ok(Self::default()),
            Err(e) => Err(TranslateError::invalid_rule("config", e)),
        }
    }
}

/// Validated rules plus the post-run attribute and prune steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    /// Rules in execution order
    pub rules: Vec<TranslationRule>,
    /// Attributes applied to nodes after all rules
    pub attributes: BTreeMap<NodePath, AttributeMap>,
    /// Nodes removed after the attributes are applied
    pub prune_list: Vec<NodePath>,
    /// Links created after pruning
    pub links: Vec<LinkRule>,
}

impl RuleSet {
    /// Rule set with only `rules`.
    pub fn new(rules: Vec<TranslationRule>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Load and validate a rule document from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path).map_err(|e| {
            TranslateError::invalid_rule(
                path.display().to_string(),
                format!("cannot read config: {e}"),
            )
        })?;
        Self::parse(&text, format)
    }

    /// Parse and validate a rule document from text.
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        Self::from_document(&RuleDocument::parse(text, format)?)
    }

    /// Validate a parsed document.
    pub fn from_document(doc: &RuleDocument) -> Result<Self> {
        let mut rules = Vec::with_capacity(doc.tree_copy.len() + doc.data_copy.len());
        for entry in &doc.tree_copy {
            let source = NodePath::parse(&entry.source)?;
            let destination = tree_destination(&entry.destination, &source)?;
            rules.push(TranslationRule {
                destination_path: destination,
                ..TranslationRule::new(&entry.source, "/")?
            });
        }
        for spec in &doc.data_copy {
            rules.push(TranslationRule::from_spec(spec)?);
        }

        let attributes = doc
            .attributes
            .iter()
            .map(|(path, attrs)| Ok((NodePath::parse(path)?, attrs.clone())))
            .collect::<Result<_>>()?;
        let prune_list = doc
            .prune_list
            .iter()
            .map(|p| NodePath::parse(p))
            .collect::<Result<_>>()?;
        let links = doc
            .link_list
            .iter()
            .map(LinkRule::from_spec)
            .collect::<Result<_>>()?;

        Ok(Self {
            rules,
            attributes,
            prune_list,
            links,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttrValue, DataType};

    const YAML: &str = r#"
tree_copy:
  - source: /raw
    destination: /entry/
data_copy:
  - source: /raw/x
    destination: /entry/x
    data_type: float32
    source_units: m
    destination_units: mm
    minimum_dimensionality: 2
    attributes:
      long_name: position
  - source_path: /missing
    destination_path: /entry/y
    default_value: "[1, 2]"
attributes:
  /entry:
    NX_class: NXentry
prune_list:
  - /entry/raw/scratch
link_list:
  - source_path: /entry/x
    destination_path: /entry/sample/x
  - source: /raw/y
    destination: /entry/y
    internal_or_external: external
    soft_or_hard_link: hard
"#;

    #[test]
    fn test_parse_yaml() {
        let set = RuleSet::parse(YAML, ConfigFormat::Yaml).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.rules[0].destination_path.to_string(), "/entry/raw");
        assert!(!set.rules[0].has_dataset_options());
        assert_eq!(set.rules[1].data_type, Some(DataType::Float32));
        assert_eq!(
            set.rules[1].attributes["long_name"],
            AttrValue::from("position")
        );
        assert_eq!(set.rules[2].default_value, Some(AttrValue::from("[1, 2]")));
        let entry = NodePath::parse("/entry").unwrap();
        assert_eq!(set.attributes[&entry]["NX_class"], AttrValue::from("NXentry"));
        assert_eq!(set.prune_list[0].to_string(), "/entry/raw/scratch");
        assert_eq!(set.links.len(), 2);
        assert_eq!(set.links[0].kind, crate::container::LinkKind::Soft);
        assert_eq!(set.links[1].scope, LinkScope::External);
        assert_eq!(set.links[1].kind, crate::container::LinkKind::Hard);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let misspelled = "data_copy:\n  - source: /a\n    destination: /b\n    \
                          source_units: m\n    destination_unit: mm\n";
        let err = RuleSet::parse(misspelled, ConfigFormat::Yaml).unwrap_err();
        assert_eq!(err.kind(), "InvalidRuleError");
        assert!(err.to_string().contains("destination_unit"));

        let json = r#"{"tree_copy": [{"source": "/a", "destination": "/b", "recursive": true}]}"#;
        assert!(RuleSet::parse(json, ConfigFormat::Json).is_err());
        let toml_doc = "prune = [\"/a\"]\n";
        assert!(RuleSet::parse(toml_doc, ConfigFormat::Toml).is_err());
        let link = "link_list:\n  - source: /a\n    destination: /b\n    kind: soft\n";
        assert!(RuleSet::parse(link, ConfigFormat::Yaml).is_err());
        let bad_kind = "link_list:\n  - source: /a\n    destination: /b\n    soft_or_hard_link: symbolic\n";
        assert!(RuleSet::parse(bad_kind, ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_datatype_alias() {
        let doc = "data_copy:\n  - source: /a\n    destination: /b\n    datatype: float32\n";
        let set = RuleSet::parse(doc, ConfigFormat::Yaml).unwrap();
        assert_eq!(set.rules[0].data_type, Some(DataType::Float32));
    }

    #[test]
    fn test_parse_toml_and_json() {
        let toml_doc = r#"
[[data_copy]]
source = "/a"
destination = "/b"
compression = "lz4"
"#;
        let set = RuleSet::parse(toml_doc, ConfigFormat::Toml).unwrap();
        assert_eq!(set.rules[0].destination_path.to_string(), "/b");

        let json_doc = r#"{"data_copy": [{"source": "/a", "destination": "/b", "transformation": "abs"}]}"#;
        let set = RuleSet::parse(json_doc, ConfigFormat::Json).unwrap();
        assert!(set.rules[0].transformation.is_some());
    }

    #[test]
    fn test_empty_document() {
        assert!(RuleSet::parse("", ConfigFormat::Yaml).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_documents() {
        let bad_rank = "data_copy:\n  - source: /a\n    destination: /b\n    minimum_dimensionality: -2\n";
        assert_eq!(
            RuleSet::parse(bad_rank, ConfigFormat::Yaml).unwrap_err().kind(),
            "InvalidRankError"
        );
        let missing_destination = "data_copy:\n  - source: /a\n";
        assert_eq!(
            RuleSet::parse(missing_destination, ConfigFormat::Yaml)
                .unwrap_err()
                .kind(),
            "InvalidRuleError"
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("rules.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(ConfigFormat::from_path(Path::new("rules.xlsx")).is_err());
    }
}
