// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Normalized node paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{Result, TranslateError};

/// Absolute path of a node inside a container.
///
/// Parsing collapses repeated and trailing slashes and `.` components, so
/// `"/a//b/"`, `"a/b"` and `"/a/./b"` all address the same node. The root
/// group has no components and displays as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath {
    components: Vec<String>,
}

impl NodePath {
    /// The root group.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path.
    pub fn parse(path: &str) -> Result<Self> {
        let mut components = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    return Err(TranslateError::invalid_rule(
                        path,
                        "'..' is not allowed in node paths",
                    ))
                }
                name => components.push(name.to_string()),
            }
        }
        Ok(Self { components })
    }

    /// Check if this is the root group.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Path components from the root down.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Last component; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Path of a direct child.
    pub fn join(&self, name: &str) -> NodePath {
        let mut components = self.components.clone();
        components.push(name.to_string());
        Self { components }
    }

    /// Check if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.components.starts_with(&prefix.components)
    }

    /// Move this path from under `from` to under `to`.
    ///
    /// Returns `None` if `from` is not a prefix of this path.
    pub fn rebase(&self, from: &NodePath, to: &NodePath) -> Option<NodePath> {
        let rest = self.components.strip_prefix(from.components.as_slice())?;
        let mut components = to.components.clone();
        components.extend_from_slice(rest);
        Some(Self { components })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

impl FromStr for NodePath {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodePath {
    type Error = TranslateError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let a = NodePath::parse("/entry//data/").unwrap();
        let b = NodePath::parse("entry/./data").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/entry/data");
        assert_eq!(a.depth(), 2);
    }

    #[test]
    fn test_root() {
        let root = NodePath::parse("/").unwrap();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "/");
        assert_eq!(root.parent(), None);
        assert_eq!(root.name(), None);
    }

    #[test]
    fn test_parent_join_name() {
        let path = NodePath::parse("/a/b/c").unwrap();
        assert_eq!(path.name(), Some("c"));
        assert_eq!(path.parent().unwrap().to_string(), "/a/b");
        assert_eq!(path.parent().unwrap().join("c"), path);
        assert!(path.starts_with(&NodePath::parse("/a").unwrap()));
        assert!(!path.starts_with(&NodePath::parse("/b").unwrap()));
    }

    #[test]
    fn test_rebase() {
        let path = NodePath::parse("/raw/det/x").unwrap();
        let moved = path
            .rebase(&NodePath::parse("/raw").unwrap(), &NodePath::parse("/entry/raw").unwrap())
            .unwrap();
        assert_eq!(moved.to_string(), "/entry/raw/det/x");
        assert!(path.rebase(&NodePath::parse("/other").unwrap(), &NodePath::root()).is_none());
        assert_eq!(path.rebase(&path, &NodePath::root()), Some(NodePath::root()));
    }

    #[test]
    fn test_rejects_parent_component() {
        assert!(NodePath::parse("/a/../b").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let path = NodePath::parse("entry//x").unwrap();
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"/entry/x\"");
        let back: NodePath = serde_json::from_str("\"/entry/x/\"").unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<NodePath>("\"/a/../b\"").is_err());
    }
}
