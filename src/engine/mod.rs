// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Rule execution.
//!
//! The [`Executor`] applies rules strictly in order. Each rule moves through
//!
//! ```text
//! PENDING -> RESOLVING_SOURCE -> GROUP_COPY | DATASET_PIPELINE -> ATTRIBUTE_MERGE -> DONE
//! ```
//!
//! or ends in `FAILED`. A failed rule is recorded in the [`RunReport`] and
//! execution continues with the next rule. Only container I/O errors abort
//! the run.
//!
//! # Example
//!
//! ```
//! use treetrans::container::{ContainerRead, MemoryContainer};
//! use treetrans::core::{ArrayData, NodePath};
//! use treetrans::engine::{ExecutorBuilder, RunStatus};
//! use treetrans::rules::TranslationRule;
//! use treetrans::template::TemplateBaseline;
//!
//! let mut source = MemoryContainer::new("source");
//! source.add_dataset("/a", vec![], ArrayData::Float64(vec![1.0])).unwrap();
//! let mut destination = MemoryContainer::new("destination");
//!
//! let rules = vec![TranslationRule::new("/a", "/b")
//!     .unwrap()
//!     .with_units("m", "mm")
//!     .with_minimum_dimensionality(2)];
//! let report = ExecutorBuilder::new()
//!     .build()
//!     .execute(&rules, &source, &mut destination, &TemplateBaseline::empty())
//!     .unwrap();
//!
//! assert_eq!(report.status(), RunStatus::AllOk);
//! let b = NodePath::parse("/b").unwrap();
//! assert_eq!(destination.read_all(&b).unwrap(), ArrayData::Float64(vec![1000.0]));
//! ```

mod pipeline;
mod report;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::attributes::{merge_with_baseline, MergePolicy};
use crate::container::{
    resolve_links, ContainerRead, ContainerWrite, NodeKind, NodeMeta, DEFAULT_CHUNK_LEN,
};
use crate::copier::copy_subtree;
use crate::core::{ArrayData, AttributeMap, DataType, NodePath, Result, TranslateError};
use crate::rules::{default_array, TranslationRule};
use crate::template::TemplateBaseline;
use crate::units::UnitRegistry;

pub use report::{RuleOutcome, RuleState, RunReport, RunStatus};

/// Callback invoked with every recorded outcome.
pub type OutcomeObserver = Arc<dyn Fn(&RuleOutcome) + Send + Sync>;

/// Builder for [`Executor`].
#[derive(Clone)]
pub struct ExecutorBuilder {
    chunk_len: usize,
    policy: MergePolicy,
    cancel: Option<Arc<AtomicBool>>,
    observer: Option<OutcomeObserver>,
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self {
            chunk_len: DEFAULT_CHUNK_LEN,
            policy: MergePolicy::SourceWins,
            cancel: None,
            observer: None,
        }
    }

    /// Elements per chunk of every dataset the executor writes.
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }

    /// Attribute merge policy for rule and subtree copies.
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Flag checked between rules; setting it stops the run.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Observe outcomes as they are recorded, e.g. to drive progress output.
    pub fn with_observer(mut self, observer: OutcomeObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Executor {
        Executor {
            chunk_len: self.chunk_len,
            policy: self.policy,
            cancel: self.cancel,
            observer: self.observer,
            registry: UnitRegistry::shared(),
        }
    }
}

/// What a rule produced before its attributes were merged.
struct Applied {
    kind: Option<NodeKind>,
    used_default: bool,
    elements: u64,
    bytes: u64,
}

/// Applies rules to a source/destination container pair.
pub struct Executor {
    chunk_len: usize,
    policy: MergePolicy,
    cancel: Option<Arc<AtomicBool>>,
    observer: Option<OutcomeObserver>,
    registry: &'static UnitRegistry,
}

impl Executor {
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.policy
    }

    /// Run `rules` and return a fresh report.
    pub fn execute(
        &self,
        rules: &[TranslationRule],
        source: &dyn ContainerRead,
        destination: &mut dyn ContainerWrite,
        baseline: &TemplateBaseline,
    ) -> Result<RunReport> {
        let mut report = RunReport::new();
        self.run(rules, source, destination, baseline, &mut report)?;
        Ok(report)
    }

    /// Run `rules`, appending one outcome per attempted rule to `report`.
    ///
    /// Per-rule failures are recorded and skipped over. A container I/O
    /// error is recorded for its rule and then returned.
    pub fn run(
        &self,
        rules: &[TranslationRule],
        source: &dyn ContainerRead,
        destination: &mut dyn ContainerWrite,
        baseline: &TemplateBaseline,
        report: &mut RunReport,
    ) -> Result<()> {
        for (index, rule) in rules.iter().enumerate() {
            if self.is_cancelled() {
                let remaining = rules.len() - index;
                warn!(remaining, "Run cancelled");
                report.mark_cancelled(remaining);
                break;
            }
            trace_state(index, RuleState::Pending);

            let outcome = match self.apply_rule(index, rule, source, destination, baseline) {
                Ok(applied) => {
                    trace_state(index, RuleState::Done);
                    info!(
                        rule = index,
                        source = %rule.source_path,
                        destination = %rule.destination_path,
                        elements = applied.elements,
                        "Rule applied"
                    );
                    RuleOutcome {
                        index,
                        source: rule.source_path.clone(),
                        destination: rule.destination_path.clone(),
                        kind: applied.kind,
                        state: RuleState::Done,
                        used_default: applied.used_default,
                        error: None,
                        elements: applied.elements,
                        bytes: applied.bytes,
                    }
                }
                Err(error) => {
                    trace_state(index, RuleState::Failed);
                    warn!(
                        rule = index,
                        source = %rule.source_path,
                        destination = %rule.destination_path,
                        kind = error.kind(),
                        error = %error,
                        "Rule failed"
                    );
                    let fatal = error.is_fatal().then(|| error.clone());
                    let outcome = RuleOutcome {
                        index,
                        source: rule.source_path.clone(),
                        destination: rule.destination_path.clone(),
                        kind: source.lookup(&rule.source_path).map(|m| m.kind()),
                        state: RuleState::Failed,
                        used_default: false,
                        error: Some(error),
                        elements: 0,
                        bytes: 0,
                    };
                    self.record(report, outcome);
                    if let Some(error) = fatal {
                        return Err(error);
                    }
                    continue;
                }
            };
            self.record(report, outcome);
        }
        Ok(())
    }

    fn record(&self, report: &mut RunReport, outcome: RuleOutcome) {
        if let Some(observer) = &self.observer {
            observer(&outcome);
        }
        report.record(outcome);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn apply_rule(
        &self,
        index: usize,
        rule: &TranslationRule,
        source: &dyn ContainerRead,
        destination: &mut dyn ContainerWrite,
        baseline: &TemplateBaseline,
    ) -> Result<Applied> {
        trace_state(index, RuleState::ResolvingSource);
        let resolved = resolve_links(source, &rule.source_path);
        if let Some((path, _)) = &resolved {
            if *path != rule.source_path {
                debug!(
                    rule = index,
                    source = %rule.source_path,
                    resolved = %path,
                    "Followed soft link"
                );
            }
        }
        let applied = match resolved {
            Some((from, NodeMeta::Group { .. })) => {
                trace_state(index, RuleState::GroupCopy);
                if rule.has_dataset_options() {
                    debug!(
                        rule = index,
                        "Unit, type, rank and transformation options do not apply to group rules"
                    );
                }
                let stats = copy_subtree(
                    source,
                    &from,
                    destination,
                    &rule.destination_path,
                    self.policy,
                    baseline,
                )?;
                Applied {
                    kind: Some(NodeKind::Group),
                    used_default: false,
                    elements: stats.elements,
                    bytes: stats.bytes,
                }
            }
            Some((from, NodeMeta::Dataset { attrs, layout })) => {
                trace_state(index, RuleState::DatasetPipeline);
                if let Some(units) = &rule.units {
                    pipeline::declared_units_differ(
                        &rule.source_path,
                        attrs.get("units").and_then(|v| v.as_str()),
                        &units.source,
                    );
                }
                let input = DatasetInput {
                    shape: layout.shape.clone(),
                    dtype: layout.dtype,
                    attrs,
                    chunks: Box::new(
                        (0..layout.chunk_count()).map(move |i| source.read_chunk(&from, i)),
                    ),
                };
                match self.write_dataset(rule, input, destination, baseline) {
                    Err(e @ TranslateError::InvalidCast { .. }) if rule.default_value.is_some() => {
                        warn!(
                            rule = index,
                            error = %e,
                            "Cast failed; writing the default value"
                        );
                        self.write_default(rule, destination, baseline)?
                    }
                    other => {
                        let (elements, bytes) = other?;
                        Applied {
                            kind: Some(NodeKind::Dataset),
                            used_default: false,
                            elements,
                            bytes,
                        }
                    }
                }
            }
            // resolve_links never ends at a link
            Some((_, NodeMeta::Link { .. })) | None if rule.default_value.is_some() => {
                trace_state(index, RuleState::DatasetPipeline);
                warn!(
                    rule = index,
                    source = %rule.source_path,
                    "Source not found; writing the default value"
                );
                self.write_default(rule, destination, baseline)?
            }
            Some((_, NodeMeta::Link { .. })) | None => {
                return Err(TranslateError::source_not_found(
                    rule.source_path.to_string(),
                ))
            }
        };

        trace_state(index, RuleState::AttributeMerge);
        let explicit = rule.explicit_attributes();
        if !explicit.is_empty() {
            let mut attrs = destination
                .lookup(&rule.destination_path)
                .map(|m| m.attrs().clone())
                .unwrap_or_default();
            attrs.extend(explicit);
            destination.set_attributes(&rule.destination_path, attrs)?;
        }
        Ok(applied)
    }

    fn write_default(
        &self,
        rule: &TranslationRule,
        destination: &mut dyn ContainerWrite,
        baseline: &TemplateBaseline,
    ) -> Result<Applied> {
        let value = rule
            .default_value
            .as_ref()
            .ok_or_else(|| TranslateError::source_not_found(rule.source_path.to_string()))?;
        let (shape, data) = default_array(value);
        let input = DatasetInput {
            shape,
            dtype: data.dtype(),
            attrs: AttributeMap::new(),
            chunks: Box::new(std::iter::once(Ok(data))),
        };
        let (elements, bytes) = self.write_dataset(rule, input, destination, baseline)?;
        Ok(Applied {
            kind: None,
            used_default: true,
            elements,
            bytes,
        })
    }

    /// Stream one dataset through the pipeline into the destination.
    fn write_dataset(
        &self,
        rule: &TranslationRule,
        input: DatasetInput<'_>,
        destination: &mut dyn ContainerWrite,
        baseline: &TemplateBaseline,
    ) -> Result<(u64, u64)> {
        let plan = pipeline::plan(
            rule,
            &input.shape,
            input.dtype,
            self.chunk_len,
            baseline,
            self.registry,
        )?;

        let target = &rule.destination_path;
        let existing = destination
            .lookup(target)
            .map(|m| m.attrs().clone())
            .unwrap_or_default();
        let explicit: BTreeSet<String> = rule.explicit_attributes().into_keys().collect();
        let protected = baseline.protected_keys(target, &explicit);
        let attrs = merge_with_baseline(&input.attrs, &existing, self.policy, &protected)?;

        let stages = &plan.stages;
        let mut bytes = 0u64;
        let elements = {
            let mut chunks = input
                .chunks
                .map(|chunk| chunk.and_then(|c| stages.apply(c)))
                .inspect(|chunk| {
                    if let Ok(chunk) = chunk {
                        bytes += chunk.byte_len();
                    }
                });
            destination.write_dataset(target, plan.layout.clone(), attrs, &mut chunks)?
        };
        Ok((elements, bytes))
    }
}

/// A dataset entering the pipeline.
struct DatasetInput<'a> {
    shape: Vec<usize>,
    dtype: DataType,
    attrs: AttributeMap,
    chunks: Box<dyn Iterator<Item = Result<ArrayData>> + 'a>,
}

fn trace_state(index: usize, state: RuleState) {
    debug!(rule = index, state = %state, "Rule state");
}
