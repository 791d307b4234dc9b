use std::fs;
use std::path::PathBuf;

use indexpack_core::batch::{run_batch, BatchError, FailurePolicy};
use indexpack_core::builder::UnitBuilder;
use indexpack_core::compdb::{CompDbEntry, InvocationOptions};
use indexpack_core::corpus::CorpusMap;
use indexpack_core::digest::Sha256Hasher;
use indexpack_core::discover::FilepathsDiscoverer;
use indexpack_core::pack::IndexPackWriter;
use tempfile::{tempdir, TempDir};

/// Two well-formed translation units plus one whose dependency listing is
/// missing.
fn scaffold() -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("src");
    let build_dir = src.join("out/Debug");
    fs::create_dir_all(&build_dir).expect("create build dir");

    fs::write(src.join("shared.h"), "#pragma once\n").expect("write shared.h");
    for name in ["a", "b"] {
        fs::write(src.join(format!("{name}.cc")), format!("// {name}\n")).expect("write source");
        fs::write(
            src.join(format!("{name}.cc.filepaths")),
            format!("../../{name}.cc\n../../shared.h\n"),
        )
        .expect("write filepaths");
    }
    fs::write(src.join("bad.cc"), "// bad\n").expect("write bad.cc");

    (dir, build_dir)
}

fn entry(build_dir: &PathBuf, name: &str) -> CompDbEntry {
    CompDbEntry {
        directory: build_dir.to_string_lossy().to_string(),
        command: Some(format!("clang++ -c {name}.cc -o {name}.o")),
        arguments: vec![],
        file: format!("../../{name}.cc"),
        output: None,
    }
}

fn builder() -> UnitBuilder {
    UnitBuilder::new(CorpusMap::new("chromium-test"), "src/out/Debug")
}

#[test]
fn best_effort_skips_failed_units_and_reports_them() {
    let (dir, build_dir) = scaffold();
    let entries = vec![
        entry(&build_dir, "a"),
        entry(&build_dir, "bad"),
        entry(&build_dir, "b"),
    ];

    let mut writer = IndexPackWriter::create(dir.path().join("pack")).expect("create writer");
    let report = run_batch(
        entries,
        &InvocationOptions::default(),
        &builder(),
        &FilepathsDiscoverer::default(),
        &Sha256Hasher,
        &mut writer,
        FailurePolicy::BestEffort,
    )
    .expect("batch succeeds in best-effort mode");

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.written[0].source_file, "../../a.cc");
    assert_eq!(report.written[1].source_file, "../../b.cc");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_file, "../../bad.cc");
    assert!(report.failures[0].error.contains("bad.cc.filepaths"));

    // a.cc, b.cc, and shared.h (stored once).
    assert_eq!(report.data_files, 3);
}

#[test]
fn fail_fast_aborts_before_writing_anything() {
    let (dir, build_dir) = scaffold();
    let entries = vec![entry(&build_dir, "a"), entry(&build_dir, "bad")];

    let pack_root = dir.path().join("pack");
    let mut writer = IndexPackWriter::create(&pack_root).expect("create writer");
    let err = run_batch(
        entries,
        &InvocationOptions::default(),
        &builder(),
        &FilepathsDiscoverer::default(),
        &Sha256Hasher,
        &mut writer,
        FailurePolicy::FailFast,
    )
    .unwrap_err();

    match err {
        BatchError::Unit { source_file, .. } => assert_eq!(source_file, "../../bad.cc"),
        other => panic!("expected Unit error, got {other}"),
    }

    let units: Vec<_> = fs::read_dir(pack_root.join("units")).expect("read units").collect();
    assert!(units.is_empty(), "fail-fast must not write partial packs");
}

#[test]
fn repeated_compdb_entries_produce_one_unit() {
    let (dir, build_dir) = scaffold();
    let entries = vec![entry(&build_dir, "a"), entry(&build_dir, "a"), entry(&build_dir, "a")];

    let mut writer = IndexPackWriter::create(dir.path().join("pack")).expect("create writer");
    let report = run_batch(
        entries,
        &InvocationOptions::default(),
        &builder(),
        &FilepathsDiscoverer::default(),
        &Sha256Hasher,
        &mut writer,
        FailurePolicy::FailFast,
    )
    .expect("batch");

    assert_eq!(report.written.len(), 1);
}

#[test]
fn identical_units_across_runs_share_their_digest() {
    let (dir, build_dir) = scaffold();

    let mut digests = Vec::new();
    for run in 0..2 {
        let mut writer =
            IndexPackWriter::create(dir.path().join(format!("pack{run}"))).expect("create writer");
        let report = run_batch(
            vec![entry(&build_dir, "a")],
            &InvocationOptions::default(),
            &builder(),
            &FilepathsDiscoverer::default(),
            &Sha256Hasher,
            &mut writer,
            FailurePolicy::FailFast,
        )
        .expect("batch");
        digests.push(report.written[0].unit_digest.clone());
    }

    assert_eq!(digests[0], digests[1]);
}
