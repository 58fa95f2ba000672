// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Copy-tree command - copy one subtree between files without rules.

use std::path::PathBuf;

use clap::Args;
use treetrans::copier::{copy_subtree, tree_destination};
use treetrans::template::TemplateBaseline;
use treetrans::{ContainerWrite, MergePolicy, NodePath, TreeFileReader, TreeFileWriter};

use crate::common::{format_bytes, Result};

/// Copy a group or dataset from one tree file into another.
#[derive(Args, Clone, Debug)]
pub struct CopyTreeCmd {
    /// Source tree file
    #[arg(value_name = "SRC")]
    input: PathBuf,

    /// Destination tree file (appended to unless --overwrite)
    #[arg(value_name = "DST")]
    output: PathBuf,

    /// Source path
    #[arg(long, value_name = "PATH", default_value = "/")]
    from: String,

    /// Destination path; a trailing '/' copies into it
    #[arg(long, value_name = "PATH", default_value = "/")]
    to: String,

    /// Replace the destination file
    #[arg(long)]
    overwrite: bool,

    /// Attribute merge policy
    #[arg(long, value_name = "POLICY", default_value = "source_wins")]
    merge_policy: MergePolicy,
}

impl CopyTreeCmd {
    pub fn run(self) -> Result<()> {
        let source = TreeFileReader::open(&self.input)?;
        let from = NodePath::parse(&self.from)?;
        let to = tree_destination(&self.to, &from)?;

        let mut writer = if self.overwrite {
            TreeFileWriter::create(&self.output)?
        } else {
            TreeFileWriter::open_or_create(&self.output)?
        };
        let stats = copy_subtree(
            &source,
            &from,
            &mut writer,
            &to,
            self.merge_policy,
            &TemplateBaseline::empty(),
        )?;
        writer.finish()?;

        println!(
            "Copied {}:{} -> {}:{}",
            self.input.display(),
            from,
            self.output.display(),
            to
        );
        println!("Groups: {}", stats.groups);
        println!("Datasets: {}", stats.datasets);
        if stats.links > 0 {
            println!("Links: {}", stats.links);
        }
        println!("Elements: {}", stats.elements);
        println!("Data: {}", format_bytes(stats.bytes));
        Ok(())
    }
}
