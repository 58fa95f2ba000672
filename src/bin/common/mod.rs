// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::fs::File;
use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{fmt, EnvFilter, Layer as _};
use treetrans::engine::RunStatus;

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Exit code of a run in which at least one rule failed.
pub const EXIT_PARTIAL_FAILURE: i32 = 2;

/// Exit code of a run stopped before all rules were attempted.
pub const EXIT_CANCELLED: i32 = 3;

/// Process exit code for a finished run.
pub fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::AllOk => 0,
        RunStatus::PartialFailure { .. } => EXIT_PARTIAL_FAILURE,
        RunStatus::Cancelled { .. } => EXIT_CANCELLED,
    }
}

/// Default level for a `-v` count.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Resolve the log file path. A directory gets a timestamped file name.
pub fn log_file_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        path.join(format!("translate_{stamp}.log"))
    } else {
        path.to_path_buf()
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `-v` level.
pub fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = log_level(verbose);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let stderr_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    let file_layer = match log_file {
        Some(path) => {
            let path = log_file_path(path);
            let file = File::create(&path)
                .map_err(|e| anyhow::anyhow!("Cannot create log file {}: {e}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

/// Format a byte count with a binary unit suffix.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Progress bar wrapper for consistent progress reporting.
pub struct ProgressBar {
    inner: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a new progress bar. Hidden when stderr is not a terminal.
    pub fn new(total: u64, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let inner = if std::io::stderr().is_terminal() {
            let pb = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_prefix(prefix);
            Some(pb)
        } else {
            None
        };

        Self { inner }
    }

    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.inner {
            pb.inc(delta);
        }
    }

    pub fn set_message(&self, msg: String) {
        if let Some(pb) = &self.inner {
            pb.set_message(msg);
        }
    }

    /// Finish the progress bar with a message.
    pub fn finish_with_message(&self, msg: String) {
        if let Some(pb) = &self.inner {
            pb.finish_with_message(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(RunStatus::AllOk), 0);
        assert_eq!(exit_code(RunStatus::PartialFailure { failed: 1 }), 2);
        assert_eq!(
            exit_code(RunStatus::Cancelled {
                remaining: 3,
                failed: 0
            }),
            EXIT_CANCELLED
        );
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "info");
        assert_eq!(log_level(5), "debug");
    }

    #[test]
    fn test_log_file_path_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_file_path(dir.path());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("translate_"));
        assert!(name.ends_with(".log"));

        let file = dir.path().join("run.log");
        assert_eq!(log_file_path(&file), file);
    }
}
