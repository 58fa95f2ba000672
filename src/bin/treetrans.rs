// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Treetrans CLI
//!
//! Rule-driven translation between tree files.
//!
//! ## Usage
//!
//! ```sh
//! # Translate with a rule document, seeding from a template
//! treetrans translate -I scan.tree -O scan_nx.tree -C rules.yaml -T template.tree
//!
//! # Print the node tree with attributes
//! treetrans inspect scan_nx.tree -a
//!
//! # Copy one group into another file
//! treetrans copy-tree scan.tree merged.tree --from /raw --to /entry/
//! ```

mod cmd;
mod common;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use cmd::{CopyTreeCmd, InspectCmd, TranslateCmd};
use common::Result;

/// Treetrans - rule-driven tree file translator
///
/// Copies, converts and reshapes datasets from a source file into a
/// destination file according to a rule document.
#[derive(Parser, Clone)]
#[command(name = "treetrans")]
#[command(about = "Rule-driven translator for hierarchical data files", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file (or a timestamped file in this directory)
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Translate a file with a rule document
    Translate(TranslateCmd),

    /// Print the node tree of a file
    Inspect(InspectCmd),

    /// Copy a subtree between files
    CopyTree(CopyTreeCmd),
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Translate(cmd) => cmd.run(),
        Commands::Inspect(cmd) => cmd.run().map(|()| 0),
        Commands::CopyTree(cmd) => cmd.run().map(|()| 0),
    }
}

fn main() {
    match run() {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
