// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI integration tests.
//!
//! These tests run the actual treetrans binary and verify its behavior.

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{measurement, path, save, Workspace};
use treetrans::{ArrayData, ContainerRead, TreeFileReader};

/// Run treetrans with arguments
fn run(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_treetrans");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("Failed to run {bin:?}"))
}

/// Run treetrans and assert success
fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "Command failed: {:?}\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run treetrans and assert failure
fn run_err(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        !output.status.success(),
        "Command should have failed but succeeded: {:?}",
        args
    );
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let output = run_ok(&["--help"]);
    assert!(output.contains("translate"));
    assert!(output.contains("inspect"));
    assert!(output.contains("copy-tree"));
}

#[test]
fn test_cli_version() {
    let output = run_ok(&["--version"]);
    assert!(output.contains("treetrans"));
}

#[test]
fn test_cli_invalid_subcommand() {
    let stderr = run_err(&["nonexistent"]);
    assert!(stderr.contains("unrecognized") || stderr.contains("unknown"));
}

// ============================================================================
// Translate Tests
// ============================================================================

#[test]
fn test_translate_all_ok() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.yaml",
        "data_copy:\n  - source: /motors/x\n    destination: /entry/x\n    \
         source_units: m\n    destination_units: mm\n",
    );

    let stdout = run_ok(&[
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&output),
        "-C",
        arg(&config),
    ]);
    assert!(stdout.contains("Status: ALL_OK"));

    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(
        reader.read_all(&path("/entry/x")).unwrap(),
        ArrayData::Float64(vec![1000.0])
    );
}

#[test]
fn test_translate_partial_failure_exit_code() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.json",
        r#"{"data_copy": [
            {"source_path": "/missing", "destination_path": "/a"},
            {"source_path": "/label", "destination_path": "/b"}
        ]}"#,
    );

    let result = run(&[
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&output),
        "-C",
        arg(&config),
    ]);
    assert_eq!(result.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("SourceNotFoundError"));
    assert!(stdout.contains("PARTIAL_FAILURE (1 failed)"));

    let reader = TreeFileReader::open(&output).unwrap();
    assert!(reader.lookup(&path("/b")).is_some());
}

#[test]
fn test_translate_invalid_config() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.toml",
        "[[data_copy]]\nsource = \"/a\"\ndestination = \"/b\"\nminimum_dimensionality = -1\n",
    );

    let output = run(&[
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&ws.path("out.tree")),
        "-C",
        arg(&config),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_translate_rejects_unknown_rule_key() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.yaml",
        "data_copy:\n  - source: /motors/x\n    destination: /x\n    destination_unit: mm\n",
    );

    let output = run(&[
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&ws.path("out.tree")),
        "-C",
        arg(&config),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("destination_unit"));
}

#[test]
fn test_translate_abort_prints_collected_outcomes() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);
    let offset = {
        let reader = TreeFileReader::open(&input).unwrap();
        reader.tree().dataset(&path("/label")).unwrap().chunks[0].offset as usize
    };
    let mut bytes = std::fs::read(&input).unwrap();
    bytes[offset] ^= 0xff;
    std::fs::write(&input, bytes).unwrap();
    let config = ws.write_text(
        "rules.yaml",
        "data_copy:\n  - source: /motors/x\n    destination: /x\n\
         \x20 - source: /label\n    destination: /label\n",
    );

    let result = run(&[
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&output),
        "-C",
        arg(&config),
    ]);
    assert_eq!(result.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Succeeded: 1"));
    assert!(stdout.contains("Failed: 1"));
    assert!(stdout.contains("Status: ABORTED"));
}

#[test]
fn test_translate_writes_log_file() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let log = ws.path("run.log");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.yaml",
        "tree_copy:\n  - source: /raw\n    destination: /\n",
    );

    run_ok(&[
        "-v",
        "--log-file",
        arg(&log),
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&ws.path("out.tree")),
        "-C",
        arg(&config),
    ]);
    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("Rule applied"));
}

// ============================================================================
// Inspect and Copy-Tree Tests
// ============================================================================

#[test]
fn test_inspect_tree() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    save(&measurement(), &input);

    let stdout = run_ok(&["inspect", arg(&input), "-a"]);
    assert!(stdout.contains("raw/"));
    assert!(stdout.contains("counts  int32 (2, 3)"));
    assert!(stdout.contains("@units = \"keV\""));
    assert!(stdout.contains("Datasets: 4"));
}

#[test]
fn test_inspect_shows_links() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.yaml",
        "tree_copy:\n  - source: /raw\n    destination: /entry/\n\
         link_list:\n  - source: /entry/raw/energy\n    destination: /entry/energy\n",
    );
    run_ok(&[
        "translate",
        "-I",
        arg(&input),
        "-O",
        arg(&output),
        "-C",
        arg(&config),
    ]);

    let stdout = run_ok(&["inspect", arg(&output)]);
    assert!(stdout.contains("energy -> /entry/raw/energy"));
    assert!(stdout.contains("Links: 1"));
}

#[test]
fn test_inspect_nonexistent_file() {
    let ws = Workspace::new();
    let stderr = run_err(&["inspect", arg(&ws.path("missing.tree"))]);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_copy_tree_into_group() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);

    let stdout = run_ok(&[
        "copy-tree",
        arg(&input),
        arg(&output),
        "--from",
        "/raw",
        "--to",
        "/entry/",
    ]);
    assert!(stdout.contains("Datasets: 2"));

    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(
        reader.read_all(&path("/entry/raw/counts")).unwrap(),
        ArrayData::Int32(vec![1, 2, 3, 4, 5, 6])
    );
}
