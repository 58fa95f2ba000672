// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Tree file integration tests.
//!
//! Tests cover:
//! - Translating between files on disk
//! - Append and overwrite destination modes
//! - Template files
//! - Compression and chunking surviving a reopen
//! - Rollback of an aborted append
//! - Links

mod common;

use common::{attrs_at, measurement, node_paths, path, save, shape_at, Workspace};
use pretty_assertions::assert_eq;
use treetrans::container::{Compression, NodeMeta};
use treetrans::translator::{DestinationMode, Translator};
use treetrans::{
    ArrayData, AttrValue, ContainerRead, ExecutorBuilder, MemoryContainer, RuleSet, RunReport,
    RunStatus, TreeFileReader,
};

/// Flip one byte of the first stored chunk of the dataset at `p`.
fn corrupt_first_chunk(file: &std::path::Path, p: &str) {
    let offset = {
        let reader = TreeFileReader::open(file).unwrap();
        reader.tree().dataset(&path(p)).unwrap().chunks[0].offset
    };
    let mut bytes = std::fs::read(file).unwrap();
    bytes[offset as usize] ^= 0xff;
    std::fs::write(file, bytes).unwrap();
}

const RULES: &str = "\
tree_copy:
  - source: /raw
    destination: /entry/
data_copy:
  - source: /motors/x
    destination: /entry/sample/x
    source_units: m
    destination_units: mm
    minimum_dimensionality: 1
    compression: zstd:3
  - source: /raw/counts
    destination: /entry/counts_f
    data_type: float32
    compression: lz4
attributes:
  /entry:
    NX_class: NXentry
";

#[test]
fn test_translate_files_round_trip() {
    let ws = Workspace::new();
    let input = ws.path("scan.tree");
    let output = ws.path("scan_nx.tree");
    save(&measurement(), &input);
    let config = ws.write_text("rules.yaml", RULES);

    let rules = RuleSet::load(&config).unwrap();
    let report = Translator::default()
        .translate_files(&rules, &input, &output, None, DestinationMode::Overwrite)
        .unwrap();
    assert_eq!(report.status(), RunStatus::AllOk);

    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(
        reader.read_all(&path("/entry/sample/x")).unwrap(),
        ArrayData::Float64(vec![1000.0])
    );
    assert_eq!(shape_at(&reader, "/entry/sample/x"), vec![1]);
    assert_eq!(
        reader.read_all(&path("/entry/counts_f")).unwrap(),
        ArrayData::Float32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    );
    assert_eq!(
        reader.read_all(&path("/entry/raw/energy")).unwrap(),
        ArrayData::Float64(vec![8.0, 9.0, 10.0])
    );

    let layout = |p: &str| reader.lookup(&path(p)).unwrap().layout().cloned().unwrap();
    assert_eq!(layout("/entry/sample/x").compression, Compression::Zstd { level: 3 });
    assert_eq!(layout("/entry/counts_f").compression, Compression::Lz4);
    assert_eq!(layout("/entry/raw/counts").compression, Compression::None);

    assert_eq!(attrs_at(&reader, "/entry")["NX_class"], AttrValue::from("NXentry"));
    assert_eq!(attrs_at(&reader, "/entry/raw")["origin"], AttrValue::from("detector"));
    assert_eq!(attrs_at(&reader, "/entry/sample/x")["units"], AttrValue::from("mm"));
}

#[test]
fn test_small_chunks_survive_reopen() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    let mut source = MemoryContainer::new("source");
    source
        .add_dataset(
            "/series",
            vec![10, 3],
            ArrayData::Int64((0..30).collect()),
        )
        .unwrap();
    save(&source, &input);

    let rules = RuleSet::new(vec![treetrans::TranslationRule::new("/series", "/series")
        .unwrap()
        .with_transformation("offset(1)".parse().unwrap())]);
    let executor = ExecutorBuilder::new().with_chunk_len(7).build();
    Translator::new(executor)
        .translate_files(&rules, &input, &output, None, DestinationMode::Overwrite)
        .unwrap();

    let reader = TreeFileReader::open(&output).unwrap();
    let layout = reader.lookup(&path("/series")).unwrap().layout().cloned().unwrap();
    assert_eq!(layout.chunk_len, 7);
    assert_eq!(layout.chunk_count(), 5);
    assert_eq!(
        reader.read_all(&path("/series")).unwrap(),
        ArrayData::Int64((1..31).collect())
    );
}

#[test]
fn test_append_keeps_existing_content() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);

    let mut existing = MemoryContainer::new("existing");
    existing
        .add_dataset("/keep", vec![1], ArrayData::Int32(vec![9]))
        .unwrap();
    save(&existing, &output);

    let rules = RuleSet::new(vec![treetrans::TranslationRule::new("/label", "/label").unwrap()]);
    Translator::default()
        .translate_files(&rules, &input, &output, None, DestinationMode::Append)
        .unwrap();
    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(node_paths(&reader), vec!["/", "/keep", "/label"]);
    assert_eq!(
        reader.read_all(&path("/keep")).unwrap(),
        ArrayData::Int32(vec![9])
    );

    Translator::default()
        .translate_files(&rules, &input, &output, None, DestinationMode::Overwrite)
        .unwrap();
    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(node_paths(&reader), vec!["/", "/label"]);
}

#[test]
fn test_template_file_seeds_destination() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let template_file = ws.path("template.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);

    let mut template = MemoryContainer::new("template");
    template
        .add_group("/entry", common::attrs(&[("NX_class", "NXentry".into())]))
        .unwrap()
        .add_dataset("/entry/energy", vec![3], ArrayData::Float32(vec![0.0; 3]))
        .unwrap();
    save(&template, &template_file);

    let rules = RuleSet::new(vec![
        treetrans::TranslationRule::new("/raw/energy", "/entry/energy").unwrap(),
        treetrans::TranslationRule::new("/raw/counts", "/entry/energy").unwrap(),
    ]);
    let report = Translator::default()
        .translate_files(
            &rules,
            &input,
            &output,
            Some(&template_file),
            DestinationMode::Append,
        )
        .unwrap();

    // float64 data does not fit the float32 placeholder; (2, 3) does not fit (3)
    assert_eq!(report.failed_count(), 2);
    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(
        reader.read_all(&path("/entry/energy")).unwrap(),
        ArrayData::Float32(vec![0.0; 3])
    );
    assert_eq!(attrs_at(&reader, "/entry")["NX_class"], AttrValue::from("NXentry"));
}

#[test]
fn test_template_placeholder_accepts_cast_rule() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let template_file = ws.path("template.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);

    let mut template = MemoryContainer::new("template");
    template
        .add_dataset("/entry/energy", vec![3], ArrayData::Float32(vec![0.0; 3]))
        .unwrap();
    save(&template, &template_file);

    let rules = RuleSet::new(vec![treetrans::TranslationRule::new(
        "/raw/energy",
        "/entry/energy",
    )
    .unwrap()
    .with_data_type(treetrans::DataType::Float32)]);
    let report = Translator::default()
        .translate_files(
            &rules,
            &input,
            &output,
            Some(&template_file),
            DestinationMode::Overwrite,
        )
        .unwrap();
    assert_eq!(report.status(), RunStatus::AllOk);

    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(
        reader.read_all(&path("/entry/energy")).unwrap(),
        ArrayData::Float32(vec![8.0, 9.0, 10.0])
    );
}

#[test]
fn test_missing_input_is_fatal() {
    let ws = Workspace::new();
    let rules = RuleSet::default();
    let err = Translator::default()
        .translate_files(
            &rules,
            &ws.path("missing.tree"),
            &ws.path("out.tree"),
            None,
            DestinationMode::Overwrite,
        )
        .err()
        .unwrap();
    assert!(err.is_fatal());
    assert!(!ws.path("out.tree").exists());
}

#[test]
fn test_aborted_append_leaves_destination_untouched() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);
    corrupt_first_chunk(&input, "/label");

    let mut existing = MemoryContainer::new("existing");
    existing
        .add_dataset("/keep", vec![1], ArrayData::Int32(vec![9]))
        .unwrap();
    save(&existing, &output);
    let before = std::fs::read(&output).unwrap();

    let rules = RuleSet::new(vec![
        treetrans::TranslationRule::new("/raw/counts", "/counts").unwrap(),
        treetrans::TranslationRule::new("/label", "/label").unwrap(),
    ]);
    let mut report = RunReport::new();
    let err = Translator::default()
        .translate_files_into(
            &rules,
            &input,
            &output,
            None,
            DestinationMode::Append,
            &mut report,
        )
        .unwrap_err();
    assert!(err.is_fatal());

    // The rule before the failure is still reported.
    assert_eq!(report.outcomes().len(), 2);
    assert!(report.outcomes()[0].is_success());
    assert!(!report.outcomes()[1].is_success());

    assert_eq!(std::fs::read(&output).unwrap(), before);
    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(node_paths(&reader), vec!["/", "/keep"]);
    assert_eq!(
        reader.read_all(&path("/keep")).unwrap(),
        ArrayData::Int32(vec![9])
    );
}

#[test]
fn test_link_list_survives_reopen() {
    let ws = Workspace::new();
    let input = ws.path("in.tree");
    let output = ws.path("out.tree");
    save(&measurement(), &input);
    let config = ws.write_text(
        "rules.yaml",
        "\
tree_copy:
  - source: /raw
    destination: /entry/data
link_list:
  - source_path: /entry/data/energy
    destination_path: /entry/energy
  - source_path: /entry/data/counts
    destination_path: /entry/counts
    soft_or_hard_link: hard
",
    );

    let rules = RuleSet::load(&config).unwrap();
    let report = Translator::default()
        .translate_files(&rules, &input, &output, None, DestinationMode::Overwrite)
        .unwrap();
    assert_eq!(report.status(), RunStatus::AllOk);

    let reader = TreeFileReader::open(&output).unwrap();
    assert_eq!(
        reader.lookup(&path("/entry/energy")),
        Some(NodeMeta::Link {
            target: path("/entry/data/energy")
        })
    );
    assert_eq!(
        reader.read_all(&path("/entry/counts")).unwrap(),
        ArrayData::Int32(vec![1, 2, 3, 4, 5, 6])
    );
    let offsets = |p: &str| reader.tree().dataset(&path(p)).unwrap().chunks[0].offset;
    assert_eq!(offsets("/entry/counts"), offsets("/entry/data/counts"));
}
