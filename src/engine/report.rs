// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-rule outcomes and the run report.

use std::fmt;

use crate::container::NodeKind;
use crate::core::{NodePath, TranslateError};

/// Lifecycle state of a rule inside the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    Pending,
    ResolvingSource,
    GroupCopy,
    DatasetPipeline,
    AttributeMerge,
    Done,
    Failed,
}

impl RuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleState::Pending => "PENDING",
            RuleState::ResolvingSource => "RESOLVING_SOURCE",
            RuleState::GroupCopy => "GROUP_COPY",
            RuleState::DatasetPipeline => "DATASET_PIPELINE",
            RuleState::AttributeMerge => "ATTRIBUTE_MERGE",
            RuleState::Done => "DONE",
            RuleState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one rule. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// Position of the rule in the rule set
    pub index: usize,
    pub source: NodePath,
    pub destination: NodePath,
    /// Kind of the resolved source node, if it was found
    pub kind: Option<NodeKind>,
    /// `Done` or `Failed`
    pub state: RuleState,
    /// The rule's `default_value` was written instead of source data
    pub used_default: bool,
    pub error: Option<TranslateError>,
    pub elements: u64,
    pub bytes: u64,
}

impl RuleOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RuleState::Done
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} -> {}: {}",
            self.index, self.source, self.destination, self.state
        )?;
        match &self.error {
            Some(e) => write!(f, " ({}: {e})", e.kind()),
            None if self.used_default => write!(f, " (default value)"),
            None => write!(f, " ({} elements)", self.elements),
        }
    }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every rule was attempted and succeeded
    AllOk,
    PartialFailure { failed: usize },
    /// The run stopped before `remaining` rules were attempted
    Cancelled { remaining: usize, failed: usize },
}

impl RunStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, RunStatus::AllOk)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::AllOk => f.write_str("ALL_OK"),
            RunStatus::PartialFailure { failed } => write!(f, "PARTIAL_FAILURE ({failed} failed)"),
            RunStatus::Cancelled { remaining, failed } => {
                write!(f, "CANCELLED ({remaining} not attempted, {failed} failed)")
            }
        }
    }
}

/// Ordered outcomes of a run.
///
/// The caller owns the report and hands it to the executor, so outcomes
/// recorded before a fatal error remain available.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    outcomes: Vec<RuleOutcome>,
    /// Rules left unattempted by a cancellation
    cancelled: Option<usize>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, outcome: RuleOutcome) {
        self.outcomes.push(outcome);
    }

    pub(crate) fn mark_cancelled(&mut self, remaining: usize) {
        self.cancelled = Some(remaining);
    }

    pub fn outcomes(&self) -> &[RuleOutcome] {
        &self.outcomes
    }

    /// Whether the run stopped early on a cancellation request.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }

    /// Rules a cancellation left unattempted.
    pub fn not_attempted(&self) -> usize {
        self.cancelled.unwrap_or(0)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.len() - self.failed_count()
    }

    pub fn total_elements(&self) -> u64 {
        self.outcomes.iter().map(|o| o.elements).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }

    /// `AllOk` only when no rule failed and none was skipped by cancellation.
    pub fn status(&self) -> RunStatus {
        match (self.cancelled, self.failed_count()) {
            (Some(remaining), failed) => RunStatus::Cancelled { remaining, failed },
            (None, 0) => RunStatus::AllOk,
            (None, failed) => RunStatus::PartialFailure { failed },
        }
    }
}
