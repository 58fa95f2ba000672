// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - print the node tree of a file.

use std::path::PathBuf;

use clap::Args;
use treetrans::container::{walk_tree, NodeMeta};
use treetrans::{NodePath, TreeFileReader};

use crate::common::{format_bytes, Result};

/// Show the groups, datasets and attributes of a tree file.
#[derive(Args, Clone, Debug)]
pub struct InspectCmd {
    /// Input tree file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Only show nodes beneath this path
    #[arg(short, long, value_name = "PATH", default_value = "/")]
    path: String,

    /// Show attributes
    #[arg(short, long)]
    attributes: bool,
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        let reader = TreeFileReader::open(&self.input)?;
        let root = NodePath::parse(&self.path)?;
        let nodes = walk_tree(&reader, &root);
        if nodes.is_empty() {
            anyhow::bail!("No node at {root} in {}", self.input.display());
        }

        println!("=== {} ===", self.input.display());
        println!("Size: {}", format_bytes(reader.file_size()));
        println!();

        let mut groups = 0usize;
        let mut datasets = 0usize;
        let mut links = 0usize;
        let mut elements = 0usize;
        for (path, meta) in &nodes {
            let depth = path.depth().saturating_sub(root.depth());
            let indent = "  ".repeat(depth);
            let name = if depth == 0 {
                path.to_string()
            } else {
                path.name().unwrap_or_default().to_string()
            };
            match meta {
                NodeMeta::Group { .. } => {
                    groups += 1;
                    println!("{indent}{name}/");
                }
                NodeMeta::Dataset { layout, .. } => {
                    datasets += 1;
                    elements += layout.element_count();
                    println!(
                        "{indent}{name}  {} | {} chunks | {}",
                        layout.describe(),
                        layout.chunk_count(),
                        layout.compression
                    );
                }
                NodeMeta::Link { target } => {
                    links += 1;
                    println!("{indent}{name} -> {target}");
                }
            }
            if self.attributes {
                for (key, value) in meta.attrs() {
                    println!("{indent}  @{key} = {value}");
                }
            }
        }

        println!();
        println!("Groups: {groups}");
        println!("Datasets: {datasets}");
        if links > 0 {
            println!("Links: {links}");
        }
        println!("Elements: {elements}");
        Ok(())
    }
}
