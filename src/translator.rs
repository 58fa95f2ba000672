// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! End-to-end translation of one source container into one destination.
//!
//! A run seeds the destination from the template (if any), executes the
//! rules, applies the document's global attributes, removes the pruned
//! paths, creates the listed links and finally finishes the destination.
//! A cancelled run skips the attribute, prune and link steps.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use crate::attributes::MergePolicy;
use crate::container::{
    resolve_links, ContainerRead, ContainerWrite, LinkKind, TreeFileReader, TreeFileWriter,
};
use crate::copier::copy_subtree;
use crate::core::{AttributeMap, NodePath, Result, TranslateError};
use crate::engine::{Executor, ExecutorBuilder, RunReport};
use crate::rules::{LinkRule, LinkScope, RuleSet};
use crate::template::{seed, TemplateBaseline};

/// How the destination file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DestinationMode {
    /// Add to an existing file, or create it
    #[default]
    Append,
    /// Start from an empty file
    Overwrite,
}

/// Runs rule sets against containers.
pub struct Translator {
    executor: Executor,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(ExecutorBuilder::new().build())
    }
}

impl Translator {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Translate between open containers. The destination is not finished.
    pub fn translate(
        &self,
        rules: &RuleSet,
        source: &dyn ContainerRead,
        destination: &mut dyn ContainerWrite,
        template: Option<&dyn ContainerRead>,
    ) -> Result<RunReport> {
        let mut report = RunReport::new();
        self.translate_into(rules, source, destination, template, &mut report)?;
        Ok(report)
    }

    /// Like [`translate`](Self::translate), recording outcomes into a
    /// caller-owned report that keeps them when the run aborts.
    pub fn translate_into(
        &self,
        rules: &RuleSet,
        source: &dyn ContainerRead,
        destination: &mut dyn ContainerWrite,
        template: Option<&dyn ContainerRead>,
        report: &mut RunReport,
    ) -> Result<()> {
        let baseline = match template {
            Some(template) => seed(template, destination)?,
            None => TemplateBaseline::empty(),
        };
        self.executor
            .run(&rules.rules, source, destination, &baseline, report)?;
        if report.was_cancelled() {
            warn!(
                not_attempted = report.not_attempted(),
                "Run cancelled; skipping attributes, pruning and links"
            );
            return Ok(());
        }
        apply_attributes(destination, &rules.attributes)?;
        prune(destination, &rules.prune_list)?;
        let links = apply_links(
            destination,
            source,
            &rules.links,
            self.executor.merge_policy(),
            &baseline,
        )?;
        info!(
            rules = rules.len(),
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            links,
            status = %report.status(),
            "Translation finished"
        );
        Ok(())
    }

    /// Translate tree files on disk and finish the destination.
    ///
    /// With a template the destination always starts empty.
    pub fn translate_files(
        &self,
        rules: &RuleSet,
        source: &Path,
        destination: &Path,
        template: Option<&Path>,
        mode: DestinationMode,
    ) -> Result<RunReport> {
        let mut report = RunReport::new();
        self.translate_files_into(rules, source, destination, template, mode, &mut report)?;
        Ok(report)
    }

    /// Like [`translate_files`](Self::translate_files) with a caller-owned
    /// report.
    ///
    /// If the run aborts, the destination is rolled back: an appended file
    /// reads as it did before the run.
    pub fn translate_files_into(
        &self,
        rules: &RuleSet,
        source: &Path,
        destination: &Path,
        template: Option<&Path>,
        mode: DestinationMode,
        report: &mut RunReport,
    ) -> Result<()> {
        let source = TreeFileReader::open(source)?;
        let template = template.map(TreeFileReader::open).transpose()?;

        let mut writer = match (mode, &template) {
            (DestinationMode::Append, None) => TreeFileWriter::open_or_create(destination)?,
            (DestinationMode::Overwrite, _) | (_, Some(_)) => {
                if destination.exists() {
                    warn!(destination = %destination.display(), "Overwriting destination");
                }
                TreeFileWriter::create(destination)?
            }
        };

        let result = self.translate_into(
            rules,
            &source,
            &mut writer,
            template.as_ref().map(|t| t as &dyn ContainerRead),
            report,
        );
        match result {
            Ok(()) => writer.finish(),
            Err(e) => {
                if let Err(cleanup) = writer.abandon() {
                    warn!(
                        destination = %destination.display(),
                        error = %cleanup,
                        "Failed to roll back destination"
                    );
                }
                Err(e)
            }
        }
    }
}

/// Merge attributes into nodes, creating groups for missing paths.
pub fn apply_attributes(
    destination: &mut dyn ContainerWrite,
    attributes: &BTreeMap<NodePath, AttributeMap>,
) -> Result<()> {
    for (path, attrs) in attributes {
        let mut current = match destination.lookup(path) {
            Some(meta) => meta.attrs().clone(),
            None => {
                destination.require_group(path)?;
                AttributeMap::new()
            }
        };
        current.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        info!(path = %path, count = attrs.len(), "Setting attributes");
        destination.set_attributes(path, current)?;
    }
    Ok(())
}

/// Remove the listed nodes; missing paths are skipped.
pub fn prune(destination: &mut dyn ContainerWrite, paths: &[NodePath]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        if destination.remove(path)? {
            info!(path = %path, "Pruned");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Create the listed links and return how many were made.
///
/// A link that cannot be made is logged and skipped; container I/O errors
/// abort. External links copy their target out of `source` or the link's
/// alternate file.
pub fn apply_links(
    destination: &mut dyn ContainerWrite,
    source: &dyn ContainerRead,
    links: &[LinkRule],
    policy: MergePolicy,
    baseline: &TemplateBaseline,
) -> Result<usize> {
    let mut created = 0;
    for link in links {
        let result = match link.scope {
            LinkScope::Internal => {
                destination.create_link(&link.destination, &link.target, link.kind)
            }
            LinkScope::External => copy_external(destination, source, link, policy, baseline),
        };
        match result {
            Ok(()) => {
                info!(link = %link, "Created link");
                created += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(link = %link, kind = e.kind(), error = %e, "Link skipped"),
        }
    }
    Ok(created)
}

fn copy_external(
    destination: &mut dyn ContainerWrite,
    source: &dyn ContainerRead,
    link: &LinkRule,
    policy: MergePolicy,
    baseline: &TemplateBaseline,
) -> Result<()> {
    if link.kind == LinkKind::Soft {
        warn!(link = %link, "External soft links are copied like hard links");
    }
    let alternate = link
        .alternate_source
        .as_ref()
        .map(TreeFileReader::open)
        .transpose()?;
    let origin: &dyn ContainerRead = match &alternate {
        Some(reader) => reader,
        None => source,
    };
    let (from, _) = resolve_links(origin, &link.target)
        .ok_or_else(|| TranslateError::source_not_found(link.target.to_string()))?;
    copy_subtree(origin, &from, destination, &link.destination, policy, baseline)?;
    Ok(())
}
