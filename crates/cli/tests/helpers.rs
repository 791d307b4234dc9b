use std::fs;

use index_packer::{canonicalize_or_current, load_corpus_map, timestamp};
use tempfile::tempdir;

#[test]
fn existing_paths_are_canonicalized() {
    let dir = tempdir().expect("tempdir");
    let resolved =
        canonicalize_or_current(dir.path().to_str().expect("utf8 path")).expect("canonicalize");
    assert_eq!(resolved, dir.path().canonicalize().expect("canonical tempdir"));
}

#[test]
fn missing_paths_are_joined_onto_the_current_directory() {
    let resolved = canonicalize_or_current("does-not-exist-yet.kzip").expect("resolve");
    assert!(resolved.is_absolute());
    assert!(resolved.ends_with("does-not-exist-yet.kzip"));
}

#[test]
fn corpus_map_loads_from_yaml() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corpus.yaml");
    fs::write(
        &path,
        "corpus: chromium\nroot: linux\nmappings:\n  - prefix: src/sdk\n    corpus: sdk\n    root: src/sdk\n",
    )
    .expect("write yaml");

    let map = load_corpus_map(&path).expect("load yaml");
    assert_eq!(map.corpus, "chromium");
    assert_eq!(map.root, "linux");
    assert_eq!(map.mappings.len(), 1);
    assert_eq!(map.mappings[0].prefix, "src/sdk");
}

#[test]
fn corpus_map_loads_from_json() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corpus.json");
    fs::write(&path, r#"{"corpus": "chromium", "mappings": []}"#).expect("write json");

    let map = load_corpus_map(&path).expect("load json");
    assert_eq!(map.corpus, "chromium");
    assert!(map.root.is_empty());
    assert!(map.mappings.is_empty());
}

#[test]
fn corpus_map_rejects_other_extensions() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corpus.ini");
    fs::write(&path, "corpus=chromium").expect("write ini");

    let err = load_corpus_map(&path).unwrap_err();
    assert!(err.to_string().contains("Unsupported corpus config extension 'ini'"));
}

#[test]
fn timestamps_are_wall_clock_formatted() {
    let stamp = timestamp();
    assert_eq!(stamp.len(), 8);
    assert_eq!(stamp.matches(':').count(), 2);
}
