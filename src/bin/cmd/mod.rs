// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod copy_tree;
mod inspect;
mod translate;

pub use copy_tree::CopyTreeCmd;
pub use inspect::InspectCmd;
pub use translate::TranslateCmd;
