// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Treetrans
//!
//! Rule-driven translation between hierarchical data containers.
//!
//! A translation copies nodes from a source container into a destination
//! container under an ordered list of rules. Each rule maps one source path
//! to one destination path and may convert units, cast the element type,
//! pad the dimensionality, pick a compression codec and apply an
//! element-wise transformation. Group sources are copied as whole subtrees.
//! The destination may first be seeded from a template whose datasets then
//! fix the shape and type of later writes.
//!
//! ## Architecture
//!
//! - `core/` - Errors, element types, chunk buffers, attributes, node paths
//! - `units/` - Unit registry and unit expression parser
//! - `shape` / `attributes` - Dimensionality padding and attribute merging
//! - `transform/` - Built-in element-wise transformations
//! - `container/` - Container traits, in-memory and single-file containers
//! - `copier` / `template` - Subtree copy and template seeding
//! - `rules/` - Rule documents (YAML, TOML, JSON)
//! - `engine/` - Rule executor and run report
//! - `translator` - File-level facade
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use treetrans::rules::RuleSet;
//! use treetrans::translator::{DestinationMode, Translator};
//!
//! let rules = RuleSet::load("rules.yaml")?;
//! let report = Translator::default().translate_files(
//!     &rules,
//!     "measurement.tree".as_ref(),
//!     "processed.tree".as_ref(),
//!     None,
//!     DestinationMode::Overwrite,
//! )?;
//! for outcome in report.failed() {
//!     eprintln!("{outcome}");
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

pub use core::{ArrayData, AttrValue, AttributeMap, DataType, NodePath, Result, TranslateError};

// Leaf components
pub mod attributes;
pub mod shape;
pub mod transform;
pub mod units;

// Containers
pub mod container;

pub use container::{ContainerRead, ContainerWrite, MemoryContainer, TreeFileReader, TreeFileWriter};

// Copy, seed and execute
pub mod copier;
pub mod engine;
pub mod rules;
pub mod template;
pub mod translator;

pub use attributes::MergePolicy;
pub use engine::{Executor, ExecutorBuilder, RuleOutcome, RunReport, RunStatus};
pub use rules::{RuleSet, TranslationRule};
pub use translator::Translator;
