// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Node tree shared by container implementations.
//!
//! `C` is the per-chunk payload: decoded buffers in memory, chunk references
//! in the tree file index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DatasetLayout, LinkKind, NodeKind, NodeMeta, MAX_LINK_DEPTH};
use crate::core::{AttributeMap, NodePath, Result, TranslateError};

/// A group, a dataset or a soft link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node<C> {
    Group(GroupNode<C>),
    Dataset(DatasetNode<C>),
    Link(LinkNode),
}

/// Named children plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode<C> {
    #[serde(default)]
    pub attrs: AttributeMap,
    #[serde(default = "BTreeMap::new")]
    pub children: BTreeMap<String, Node<C>>,
}

impl<C> Default for GroupNode<C> {
    fn default() -> Self {
        Self {
            attrs: AttributeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

/// Layout, attributes and stored chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetNode<C> {
    #[serde(default)]
    pub attrs: AttributeMap,
    pub layout: DatasetLayout,
    pub chunks: Vec<C>,
}

/// Path of the node a soft link points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkNode {
    pub target: NodePath,
}

impl<C> Node<C> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Group(_) => NodeKind::Group,
            Node::Dataset(_) => NodeKind::Dataset,
            Node::Link(_) => NodeKind::Link,
        }
    }

    /// Attribute map of a group or dataset. Links have none.
    pub fn attrs_mut(&mut self) -> Option<&mut AttributeMap> {
        match self {
            Node::Group(g) => Some(&mut g.attrs),
            Node::Dataset(d) => Some(&mut d.attrs),
            Node::Link(_) => None,
        }
    }

    /// Metadata view without chunk payloads.
    pub fn meta(&self) -> NodeMeta {
        match self {
            Node::Group(g) => NodeMeta::Group {
                attrs: g.attrs.clone(),
                children: g.children.keys().cloned().collect(),
            },
            Node::Dataset(d) => NodeMeta::Dataset {
                attrs: d.attrs.clone(),
                layout: d.layout.clone(),
            },
            Node::Link(l) => NodeMeta::Link {
                target: l.target.clone(),
            },
        }
    }
}

/// Rooted tree of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree<C> {
    pub root: GroupNode<C>,
}

impl<C> Default for Tree<C> {
    fn default() -> Self {
        Self {
            root: GroupNode::default(),
        }
    }
}

impl<C> Tree<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node metadata at `path`; the root is reported as a group.
    pub fn meta(&self, path: &NodePath) -> Option<NodeMeta> {
        if path.is_root() {
            return Some(NodeMeta::Group {
                attrs: self.root.attrs.clone(),
                children: self.root.children.keys().cloned().collect(),
            });
        }
        self.get(path).map(Node::meta)
    }

    /// Node at a non-root path.
    pub fn get(&self, path: &NodePath) -> Option<&Node<C>> {
        let (last, parents) = path.components().split_last()?;
        let mut group = &self.root;
        for name in parents {
            match group.children.get(name)? {
                Node::Group(g) => group = g,
                Node::Dataset(_) | Node::Link(_) => return None,
            }
        }
        group.children.get(last)
    }

    /// Dataset at `path`, if that is what lives there.
    pub fn dataset(&self, path: &NodePath) -> Option<&DatasetNode<C>> {
        match self.get(path)? {
            Node::Dataset(d) => Some(d),
            Node::Group(_) | Node::Link(_) => None,
        }
    }

    /// Attribute map at `path`, including the root.
    pub fn attrs_mut(&mut self, path: &NodePath) -> Option<&mut AttributeMap> {
        if path.is_root() {
            return Some(&mut self.root.attrs);
        }
        let (last, parents) = path.components().split_last()?;
        let mut group = &mut self.root;
        for name in parents {
            match group.children.get_mut(name)? {
                Node::Group(g) => group = g,
                Node::Dataset(_) | Node::Link(_) => return None,
            }
        }
        group.children.get_mut(last).and_then(Node::attrs_mut)
    }

    /// Group at `path`, creating it and any missing ancestors.
    pub fn require_group(&mut self, path: &NodePath) -> Result<&mut GroupNode<C>> {
        let mut group = &mut self.root;
        let mut walked = NodePath::root();
        for name in path.components() {
            walked = walked.join(name);
            let child = group
                .children
                .entry(name.clone())
                .or_insert_with(|| Node::Group(GroupNode::default()));
            match child {
                Node::Group(g) => group = g,
                other => {
                    return Err(TranslateError::path_conflict(
                        walked.to_string(),
                        "group",
                        other.kind().as_str(),
                    ))
                }
            }
        }
        Ok(group)
    }

    /// Check that a dataset could be placed at `path` without touching it.
    pub fn check_dataset_path(&self, path: &NodePath) -> Result<()> {
        let Some((_, parents)) = path.components().split_last() else {
            return Err(TranslateError::path_conflict("/", "dataset", "group"));
        };
        let mut group = &self.root;
        let mut walked = NodePath::root();
        for name in parents {
            walked = walked.join(name);
            match group.children.get(name) {
                Some(Node::Group(g)) => group = g,
                Some(other) => {
                    return Err(TranslateError::path_conflict(
                        walked.to_string(),
                        "group",
                        other.kind().as_str(),
                    ))
                }
                None => return Ok(()),
            }
        }
        match self.get(path) {
            Some(Node::Group(_)) => Err(TranslateError::path_conflict(
                path.to_string(),
                "dataset",
                "group",
            )),
            _ => Ok(()),
        }
    }

    /// Place a dataset at `path`, replacing any dataset or link already there.
    ///
    /// Returns the replaced dataset.
    pub fn insert_dataset(
        &mut self,
        path: &NodePath,
        dataset: DatasetNode<C>,
    ) -> Result<Option<DatasetNode<C>>> {
        self.check_dataset_path(path)?;
        let (last, _) = path
            .components()
            .split_last()
            .ok_or_else(|| TranslateError::path_conflict("/", "dataset", "group"))?;
        let parent = path.parent().unwrap_or_default();
        let group = self.require_group(&parent)?;
        match group.children.insert(last.clone(), Node::Dataset(dataset)) {
            Some(Node::Dataset(old)) => Ok(Some(old)),
            _ => Ok(None),
        }
    }

    /// Detach the node at a non-root path.
    pub fn remove(&mut self, path: &NodePath) -> Option<Node<C>> {
        let (last, parents) = path.components().split_last()?;
        let mut group = &mut self.root;
        for name in parents {
            match group.children.get_mut(name)? {
                Node::Group(g) => group = g,
                Node::Dataset(_) | Node::Link(_) => return None,
            }
        }
        group.children.remove(last)
    }

    /// Follow soft links from `path` to a group or dataset path.
    pub fn resolve(&self, path: &NodePath) -> Option<NodePath> {
        let mut current = path.clone();
        for _ in 0..=MAX_LINK_DEPTH {
            if current.is_root() {
                return Some(current);
            }
            match self.get(&current)? {
                Node::Link(l) => current = l.target.clone(),
                _ => return Some(current),
            }
        }
        None
    }

    /// Place `node` at a non-root `path` that holds nothing or a link.
    fn insert_node(&mut self, path: &NodePath, node: Node<C>) -> Result<()> {
        let Some((last, _)) = path.components().split_last() else {
            return Err(TranslateError::path_conflict("/", "link", "group"));
        };
        if let Some(existing) = self.get(path) {
            if existing.kind() != NodeKind::Link {
                return Err(TranslateError::path_conflict(
                    path.to_string(),
                    "link",
                    existing.kind().as_str(),
                ));
            }
        }
        let parent = path.parent().unwrap_or_default();
        let group = self.require_group(&parent)?;
        group.children.insert(last.clone(), node);
        Ok(())
    }

    /// Create a soft link at `path`. The target need not exist.
    pub fn insert_link(&mut self, path: &NodePath, target: &NodePath) -> Result<()> {
        self.insert_node(
            path,
            Node::Link(LinkNode {
                target: target.clone(),
            }),
        )
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        fn count<C>(group: &GroupNode<C>) -> usize {
            group
                .children
                .values()
                .map(|child| match child {
                    Node::Group(g) => 1 + count(g),
                    _ => 1,
                })
                .sum()
        }
        count(&self.root)
    }

    /// Visit every dataset in lexical path order.
    pub fn for_each_dataset<'a>(&'a self, mut visit: impl FnMut(NodePath, &'a DatasetNode<C>)) {
        fn walk<'a, C>(
            group: &'a GroupNode<C>,
            at: &NodePath,
            visit: &mut dyn FnMut(NodePath, &'a DatasetNode<C>),
        ) {
            for (name, child) in &group.children {
                let path = at.join(name);
                match child {
                    Node::Group(g) => walk(g, &path, visit),
                    Node::Dataset(d) => visit(path, d),
                    Node::Link(_) => {}
                }
            }
        }
        walk(&self.root, &NodePath::root(), &mut visit);
    }
}

impl<C: Clone> Tree<C> {
    /// Create a soft or hard link at `path`.
    ///
    /// A hard link copies the resolved target node, so both names share the
    /// same chunk payloads.
    pub fn link(&mut self, path: &NodePath, target: &NodePath, kind: LinkKind) -> Result<()> {
        match kind {
            LinkKind::Soft => self.insert_link(path, target),
            LinkKind::Hard => {
                let resolved = self
                    .resolve(target)
                    .ok_or_else(|| TranslateError::source_not_found(target.to_string()))?;
                if path.starts_with(&resolved) {
                    return Err(TranslateError::invalid_rule(
                        path.to_string(),
                        format!("hard link target '{resolved}' contains the link itself"),
                    ));
                }
                let node = self
                    .get(&resolved)
                    .cloned()
                    .ok_or_else(|| TranslateError::source_not_found(resolved.to_string()))?;
                self.insert_node(path, node)
            }
        }
    }
}
