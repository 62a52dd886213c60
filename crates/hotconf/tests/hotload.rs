//! Integration tests for checksum-driven hotloading of indexed sources.

#![allow(clippy::pedantic)]

use hotconf::source::{ConfigSource, IndexedSource, MemoryReader, PreloadStep};
use hotconf::{ConfigFileInfo, Error};

fn store(files: &[(&str, &str)]) -> MemoryReader {
    let reader = MemoryReader::new();
    for (name, text) in files {
        reader.insert(*name, *text);
    }
    reader
}

fn preloaded(reader: &MemoryReader) -> IndexedSource<MemoryReader> {
    let mut source = IndexedSource::new(reader.clone()).with_hotload(true);
    source.preload().unwrap();
    source
}

fn hotload(source: &mut IndexedSource<MemoryReader>) -> Vec<String> {
    let mut changed = Vec::new();
    source.hotload(&mut changed).unwrap();
    changed
}

fn same_tree(a: &ConfigFileInfo, b: &ConfigFileInfo) -> bool {
    match (a.parsed().as_yaml(), b.parsed().as_yaml()) {
        (Some(a), Some(b)) => a.shares_document(b),
        _ => false,
    }
}

// ============================================================================
// Change detection
// ============================================================================

#[test]
fn test_single_changed_member() {
    let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
    let mut source = preloaded(&reader);
    let b_before = source.file("b").unwrap().clone();

    reader.insert("a", "x: 2");
    assert_eq!(hotload(&mut source), ["a"]);

    let a = source.file("a").unwrap().parsed();
    assert_eq!(a.get("x").unwrap().string_value().unwrap(), "2");

    // untouched sibling keeps its record and parsed tree
    let b_after = source.file("b").unwrap();
    assert_eq!(b_after.checksum(), b_before.checksum());
    assert!(same_tree(&b_before, b_after));
}

#[test]
fn test_index_change_reloads_everything() {
    let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
    let mut source = preloaded(&reader);

    reader.insert("c", "z: 3");
    reader.insert("index", "[index, a, b, c]");

    let mut changed = hotload(&mut source);
    changed.sort();
    assert_eq!(changed, ["a", "b", "c"]);
    assert_eq!(source.members(), ["a", "b", "c"]);
    assert!(source.file("c").is_some());
}

#[test]
fn test_no_changes_reports_nothing() {
    let reader = store(&[("index", "[index, a]"), ("a", "x: 1")]);
    let mut source = preloaded(&reader);
    assert!(hotload(&mut source).is_empty());

    // rewriting identical text is not a change
    reader.insert("a", "x: 1");
    assert!(hotload(&mut source).is_empty());
}

#[test]
fn test_member_disappears_and_returns() {
    let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
    let mut source = preloaded(&reader);

    reader.remove("b");
    assert_eq!(hotload(&mut source), ["b"]);
    assert!(source.file("b").is_none());

    reader.insert("b", "y: 3");
    assert_eq!(hotload(&mut source), ["b"]);
    assert!(source.file("b").is_some());
}

#[test]
fn test_removed_from_index_is_reported() {
    let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
    let mut source = preloaded(&reader);

    reader.insert("index", "[index, a]");
    let mut changed = hotload(&mut source);
    changed.sort();
    assert_eq!(changed, ["a", "b"]);
    assert!(source.file("b").is_none());
}

#[test]
fn test_failed_hotload_keeps_cache() {
    let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
    let mut source = preloaded(&reader);

    reader.insert("a", "x: 5");
    reader.insert("b", "y: [unclosed");
    let mut changed = Vec::new();
    assert!(matches!(source.hotload(&mut changed), Err(Error::Parse { .. })));
    assert!(changed.is_empty());

    let a = source.file("a").unwrap().parsed();
    assert_eq!(a.get("x").unwrap().string_value().unwrap(), "1");
}

#[test]
fn test_missing_index_on_hotload_is_fatal() {
    let reader = store(&[("index", "[index, a]"), ("a", "x: 1")]);
    let mut source = preloaded(&reader);

    reader.remove("index");
    let mut changed = Vec::new();
    assert!(matches!(source.hotload(&mut changed), Err(Error::IndexMissing { .. })));
}

// ============================================================================
// Preload
// ============================================================================

#[test]
fn test_missing_member_is_skipped() {
    let reader = store(&[("index", "[index, a, ghost]"), ("a", "x: 1")]);
    let mut source = IndexedSource::new(reader);

    let steps: Vec<_> = source.step_preload().map(Result::unwrap).collect();
    assert_eq!(
        steps,
        [
            PreloadStep::Started,
            PreloadStep::Loaded("a".into()),
            PreloadStep::Skipped("ghost".into()),
        ]
    );
    assert!(source.is_preloaded());
    assert_eq!(source.sorted_filenames(), ["a"]);
}

#[test]
fn test_index_must_be_a_list_of_names() {
    for index in ["name: a", "[index, [a]]"] {
        let reader = store(&[("index", index)]);
        let mut source = IndexedSource::new(reader);
        assert!(matches!(source.preload(), Err(Error::InvalidIndex { .. })));
    }
}

#[test]
fn test_abandoned_preload_is_not_ready() {
    let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
    let mut source = IndexedSource::new(reader);

    let mut steps = source.step_preload();
    assert_eq!(steps.next().unwrap().unwrap(), PreloadStep::Started);
    assert!(steps.next().unwrap().is_ok());
    drop(steps);
    assert!(!source.is_preloaded());

    source.preload().unwrap();
    assert!(source.is_preloaded());
    assert_eq!(source.sorted_filenames(), ["a", "b"]);
}

#[test]
fn test_sources_without_hotload_flag() {
    let reader = store(&[("index", "[index]")]);
    let source = IndexedSource::new(reader);
    assert!(!source.can_hotload());
}
