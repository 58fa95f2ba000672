// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Subtree copy.
//!
//! Copies a group (or a single dataset) and everything beneath it from one
//! container into another, verbatim: element types, shapes and compression
//! are preserved and chunks are streamed one at a time. Attributes of every
//! visited node are merged into the destination under a [`MergePolicy`].
//! Soft links are recreated as links; a target inside the copied subtree is
//! moved along with it.
//!
//! The whole subtree is checked before the first write, so a copy that
//! fails on a path conflict, template mismatch or attribute conflict leaves
//! the destination unchanged.

use std::collections::BTreeSet;

use tracing::debug;

use crate::attributes::{merge_with_baseline, MergePolicy};
use crate::container::{walk_tree, ContainerRead, ContainerWrite, LinkKind, NodeKind, NodeMeta};
use crate::core::{AttributeMap, NodePath, Result, TranslateError};
use crate::template::TemplateBaseline;

/// Counters accumulated by a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub groups: usize,
    pub datasets: usize,
    pub links: usize,
    pub elements: u64,
    pub bytes: u64,
}

impl CopyStats {
    /// Add the counters of another copy.
    pub fn absorb(&mut self, other: CopyStats) {
        self.groups += other.groups;
        self.datasets += other.datasets;
        self.links += other.links;
        self.elements += other.elements;
        self.bytes += other.bytes;
    }
}

/// One node of the planned copy.
struct CopyStep {
    from: NodePath,
    to: NodePath,
    meta: NodeMeta,
    attrs: AttributeMap,
    /// Attributes already match and the group exists
    unchanged: bool,
}

/// Resolve a tree-copy destination.
///
/// A trailing slash means "copy into": `"/entry/"` with source `/raw` gives
/// `/entry/raw`. Without it the source's contents land at the path itself.
pub fn tree_destination(raw: &str, source: &NodePath) -> Result<NodePath> {
    let destination = NodePath::parse(raw)?;
    match source.name() {
        Some(name) if raw.trim_end().ends_with('/') => Ok(destination.join(name)),
        _ => Ok(destination),
    }
}

/// Copy the node at `from` in `source` to `to` in `destination`.
///
/// Template-seeded attribute keys in `baseline` keep their destination
/// value. Template placeholder datasets must match the copied dataset's
/// shape and element type.
pub fn copy_subtree(
    source: &dyn ContainerRead,
    from: &NodePath,
    destination: &mut dyn ContainerWrite,
    to: &NodePath,
    policy: MergePolicy,
    baseline: &TemplateBaseline,
) -> Result<CopyStats> {
    let steps = plan(source, from, &*destination, to, policy, baseline)?;
    let mut stats = CopyStats::default();

    for step in steps {
        match &step.meta {
            NodeMeta::Group { .. } => {
                stats.groups += 1;
                if step.unchanged {
                    continue;
                }
                destination.require_group(&step.to)?;
                destination.set_attributes(&step.to, step.attrs)?;
            }
            NodeMeta::Dataset { layout, .. } => {
                let mut bytes = 0u64;
                let written = {
                    let mut chunks = (0..layout.chunk_count())
                        .map(|index| source.read_chunk(&step.from, index))
                        .inspect(|chunk| {
                            if let Ok(chunk) = chunk {
                                bytes += chunk.byte_len();
                            }
                        });
                    destination.write_dataset(&step.to, layout.clone(), step.attrs, &mut chunks)?
                };
                debug!(
                    from = %step.from,
                    to = %step.to,
                    elements = written,
                    "Copied dataset"
                );
                stats.datasets += 1;
                stats.elements += written;
                stats.bytes += bytes;
            }
            NodeMeta::Link { target } => {
                let target = target.rebase(from, to).unwrap_or_else(|| target.clone());
                destination.create_link(&step.to, &target, LinkKind::Soft)?;
                stats.links += 1;
            }
        }
    }
    Ok(stats)
}

/// Walk the source subtree and validate every destination node.
fn plan(
    source: &dyn ContainerRead,
    from: &NodePath,
    destination: &dyn ContainerWrite,
    to: &NodePath,
    policy: MergePolicy,
    baseline: &TemplateBaseline,
) -> Result<Vec<CopyStep>> {
    if source.lookup(from).is_none() {
        return Err(TranslateError::source_not_found(from.to_string()));
    }

    let mut ancestor = to.parent();
    while let Some(path) = ancestor {
        if let Some(meta) = destination.lookup(&path) {
            if meta.kind() != NodeKind::Group {
                return Err(TranslateError::path_conflict(
                    path.to_string(),
                    "group",
                    meta.kind().as_str(),
                ));
            }
        }
        ancestor = path.parent();
    }

    let none = BTreeSet::new();
    let mut steps = Vec::new();
    for (path, meta) in walk_tree(source, from) {
        let Some(target) = path.rebase(from, to) else {
            continue;
        };
        let existing = destination.lookup(&target);
        match (meta.kind(), existing.as_ref().map(NodeMeta::kind)) {
            (NodeKind::Group, Some(found @ (NodeKind::Dataset | NodeKind::Link)))
            | (NodeKind::Dataset, Some(found @ NodeKind::Group))
            | (NodeKind::Link, Some(found @ (NodeKind::Group | NodeKind::Dataset))) => {
                return Err(TranslateError::path_conflict(
                    target.to_string(),
                    meta.kind().as_str(),
                    found.as_str(),
                ))
            }
            _ => {}
        }
        if let Some(layout) = meta.layout() {
            baseline.check_write(&target, &layout.shape, layout.dtype)?;
        }

        let current = existing
            .as_ref()
            .map(|m| m.attrs().clone())
            .unwrap_or_default();
        let protected = baseline.protected_keys(&target, &none);
        let attrs = merge_with_baseline(meta.attrs(), &current, policy, &protected)?;
        let unchanged = existing.is_some() && attrs == current;
        steps.push(CopyStep {
            from: path,
            to: target,
            meta,
            attrs,
            unchanged,
        });
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Compression, DatasetLayout, MemoryContainer};
    use crate::core::{ArrayData, AttrValue, DataType};
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn source() -> MemoryContainer {
        let mut s = MemoryContainer::new("source").with_chunk_len(3);
        s.add_dataset("/raw/x", vec![2, 4], ArrayData::Float64((0..8).map(f64::from).collect()))
            .unwrap();
        s.add_dataset("/raw/det/counts", vec![5], ArrayData::UInt32(vec![1, 2, 3, 4, 5]))
            .unwrap();
        s.add_dataset("/other", vec![], ArrayData::Int8(vec![1])).unwrap();
        s.set_attribute("/raw", "NX_class", "NXcollection").unwrap();
        s.set_attribute("/raw/x", "units", "mm").unwrap();
        s
    }

    #[test]
    fn test_copy_group() {
        let src = source();
        let mut dest = MemoryContainer::new("dest");
        let stats = copy_subtree(
            &src,
            &path("/raw"),
            &mut dest,
            &path("/entry/raw"),
            MergePolicy::SourceWins,
            &TemplateBaseline::empty(),
        )
        .unwrap();
        assert_eq!(stats.datasets, 2);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.elements, 13);
        assert_eq!(stats.bytes, 8 * 8 + 5 * 4);

        assert_eq!(
            dest.read_all(&path("/entry/raw/x")).unwrap(),
            src.read_all(&path("/raw/x")).unwrap()
        );
        let meta = dest.lookup(&path("/entry/raw/x")).unwrap();
        assert_eq!(meta.layout().unwrap().shape, vec![2, 4]);
        assert_eq!(meta.attrs()["units"], AttrValue::from("mm"));
        assert!(dest.lookup(&path("/entry/other")).is_none());
    }

    #[test]
    fn test_copy_recreates_links() {
        let mut src = source();
        src.create_link(&path("/raw/alias"), &path("/raw/x"), LinkKind::Soft)
            .unwrap();
        src.create_link(&path("/raw/outside"), &path("/other"), LinkKind::Soft)
            .unwrap();
        let mut dest = MemoryContainer::new("dest");
        dest.add_group("/entry/raw/outside", AttributeMap::new()).unwrap();
        let copy = |dest: &mut MemoryContainer| {
            copy_subtree(
                &src,
                &path("/raw"),
                dest,
                &path("/entry/raw"),
                MergePolicy::SourceWins,
                &TemplateBaseline::empty(),
            )
        };
        let err = copy(&mut dest).unwrap_err();
        assert_eq!(err, TranslateError::path_conflict("/entry/raw/outside", "link", "group"));

        dest.remove(&path("/entry/raw/outside")).unwrap();
        let stats = copy(&mut dest).unwrap();
        assert_eq!(stats.links, 2);
        let target = |p: &str| dest.lookup(&path(p)).unwrap().link_target().cloned();
        assert_eq!(target("/entry/raw/alias"), Some(path("/entry/raw/x")));
        assert_eq!(target("/entry/raw/outside"), Some(path("/other")));
    }

    #[test]
    fn test_copy_preserves_compression() {
        let mut src = MemoryContainer::new("source");
        let layout = DatasetLayout::new(vec![4], DataType::Int16)
            .with_compression(Compression::Lz4);
        let mut chunks = std::iter::once(Ok::<_, TranslateError>(ArrayData::Int16(vec![1, 2, 3, 4])));
        src.write_dataset(&path("/g/d"), layout, AttributeMap::new(), &mut chunks)
            .unwrap();
        let mut dest = MemoryContainer::new("dest");
        copy_subtree(
            &src,
            &path("/g"),
            &mut dest,
            &path("/g"),
            MergePolicy::SourceWins,
            &TemplateBaseline::empty(),
        )
        .unwrap();
        let meta = dest.lookup(&path("/g/d")).unwrap();
        assert_eq!(meta.layout().unwrap().compression, Compression::Lz4);
    }

    #[test]
    fn test_copy_is_idempotent() {
        let src = source();
        let mut once = MemoryContainer::new("dest");
        let run = |dest: &mut MemoryContainer| {
            copy_subtree(
                &src,
                &NodePath::root(),
                dest,
                &NodePath::root(),
                MergePolicy::SourceWins,
                &TemplateBaseline::empty(),
            )
            .unwrap();
        };
        run(&mut once);
        let mut twice = once.clone();
        run(&mut twice);
        assert_eq!(once.tree(), twice.tree());
    }

    #[test]
    fn test_kind_conflict_leaves_destination_unchanged() {
        let src = source();
        let mut dest = MemoryContainer::new("dest");
        dest.add_dataset("/raw/det", vec![1], ArrayData::Int8(vec![0]))
            .unwrap();
        let before = dest.tree().clone();
        let err = copy_subtree(
            &src,
            &path("/raw"),
            &mut dest,
            &path("/raw"),
            MergePolicy::SourceWins,
            &TemplateBaseline::empty(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "PathConflictError");
        assert_eq!(dest.tree(), &before);
    }

    #[test]
    fn test_dataset_ancestor_conflict() {
        let src = source();
        let mut dest = MemoryContainer::new("dest");
        dest.add_dataset("/blocked", vec![], ArrayData::Int8(vec![0]))
            .unwrap();
        let err = copy_subtree(
            &src,
            &path("/raw"),
            &mut dest,
            &path("/blocked/raw"),
            MergePolicy::SourceWins,
            &TemplateBaseline::empty(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "PathConflictError");
    }

    #[test]
    fn test_missing_source() {
        let mut dest = MemoryContainer::new("dest");
        let err = copy_subtree(
            &source(),
            &path("/nope"),
            &mut dest,
            &path("/x"),
            MergePolicy::SourceWins,
            &TemplateBaseline::empty(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "SourceNotFoundError");
    }

    #[test]
    fn test_template_attributes_are_kept() {
        let mut template = MemoryContainer::new("template");
        template.add_group("/raw", AttributeMap::new()).unwrap();
        template.set_attribute("/raw", "NX_class", "NXdata").unwrap();
        let mut dest = MemoryContainer::new("dest");
        let baseline = crate::template::seed(&template, &mut dest).unwrap();

        copy_subtree(
            &source(),
            &path("/raw"),
            &mut dest,
            &path("/raw"),
            MergePolicy::SourceWins,
            &baseline,
        )
        .unwrap();
        assert_eq!(
            dest.lookup(&path("/raw")).unwrap().attrs()["NX_class"],
            AttrValue::from("NXdata")
        );
    }

    #[test]
    fn test_tree_destination() {
        let raw = path("/raw");
        assert_eq!(tree_destination("/entry/", &raw).unwrap(), path("/entry/raw"));
        assert_eq!(tree_destination("/entry", &raw).unwrap(), path("/entry"));
        assert_eq!(tree_destination("/", &raw).unwrap(), path("/raw"));
        assert_eq!(
            tree_destination("/entry/", &NodePath::root()).unwrap(),
            path("/entry")
        );
    }
}
