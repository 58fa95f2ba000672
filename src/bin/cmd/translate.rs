// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Translate command - run a rule document against a source file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use treetrans::engine::{ExecutorBuilder, RunReport};
use treetrans::translator::{DestinationMode, Translator};
use treetrans::{MergePolicy, RuleSet};

use crate::common::{exit_code, format_bytes, ProgressBar, Result};

/// Translate a source file into a destination file.
#[derive(Args, Clone, Debug)]
pub struct TranslateCmd {
    /// Source tree file
    #[arg(short = 'I', long = "input", value_name = "FILE")]
    input: PathBuf,

    /// Destination tree file
    #[arg(short = 'O', long = "output", value_name = "FILE")]
    output: PathBuf,

    /// Rule document (.yaml, .toml or .json)
    #[arg(short = 'C', long = "config", value_name = "FILE")]
    config: PathBuf,

    /// Template file seeded into the destination first
    #[arg(short = 'T', long = "template", value_name = "FILE")]
    template: Option<PathBuf>,

    /// Replace the destination instead of appending to it
    #[arg(short = 'd', long = "delete")]
    delete: bool,

    /// Elements per stored chunk
    #[arg(long, value_name = "N", default_value_t = treetrans::container::DEFAULT_CHUNK_LEN)]
    chunk_len: usize,

    /// Attribute merge policy (source_wins, destination_wins, union_fail_on_conflict)
    #[arg(long, value_name = "POLICY", default_value = "source_wins")]
    merge_policy: MergePolicy,
}

impl TranslateCmd {
    /// Returns the process exit code.
    pub fn run(self) -> Result<i32> {
        let rules = RuleSet::load(&self.config)?;
        println!("=== {} -> {} ===", self.input.display(), self.output.display());
        println!("Rules: {} ({})", rules.len(), self.config.display());
        if let Some(template) = &self.template {
            println!("Template: {}", template.display());
        }

        let progress = Arc::new(ProgressBar::new(rules.len() as u64, "translate"));
        let observer = {
            let progress = Arc::clone(&progress);
            Arc::new(move |outcome: &treetrans::RuleOutcome| {
                progress.set_message(outcome.destination.to_string());
                progress.inc(1);
            })
        };
        let executor = ExecutorBuilder::new()
            .with_chunk_len(self.chunk_len)
            .with_merge_policy(self.merge_policy)
            .with_observer(observer)
            .build();

        let mode = if self.delete {
            DestinationMode::Overwrite
        } else {
            DestinationMode::Append
        };
        let mut report = RunReport::new();
        let result = Translator::new(executor).translate_files_into(
            &rules,
            &self.input,
            &self.output,
            self.template.as_deref(),
            mode,
            &mut report,
        );
        let status = match &result {
            Ok(()) => report.status().to_string(),
            Err(_) => "ABORTED".to_string(),
        };
        progress.finish_with_message(status.clone());

        println!();
        println!("Succeeded: {}", report.succeeded_count());
        println!("Failed: {}", report.failed_count());
        if report.was_cancelled() {
            println!("Not attempted: {}", report.not_attempted());
        }
        println!("Elements: {}", report.total_elements());
        println!("Data: {}", format_bytes(report.total_bytes()));

        let failed: Vec<_> = report.failed().collect();
        if !failed.is_empty() {
            println!();
            println!("Failed rules:");
            for outcome in failed {
                println!("  {outcome}");
            }
        }
        println!();
        println!("Status: {status}");

        result?;
        Ok(exit_code(report.status()))
    }
}
