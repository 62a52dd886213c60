//! Integration tests for the directory-scanning source.

#![allow(clippy::pedantic)]

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use hotconf::regex::Regex;
use hotconf::source::{ConfigSource, FileSource};
use hotconf::{ConfigFileManager, Error};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn hotload(source: &mut FileSource) -> Vec<String> {
    let mut changed = Vec::new();
    source.hotload(&mut changed).unwrap();
    changed.sort();
    changed
}

#[test]
fn test_preload_walks_recursively() {
    let dir = tempdir().unwrap();
    write(dir.path(), "server.yaml", "port: 80");
    write(dir.path(), "items/sword.yaml", "damage: 5");
    write(dir.path(), "items/notes.txt", "not config");

    let mut source = FileSource::new(dir.path());
    source.preload().unwrap();

    assert_eq!(source.sorted_filenames(), ["items/sword", "server"]);
    let server = source.file("server").unwrap().parsed();
    assert_eq!(server.get("port").unwrap().string_value().unwrap(), "80");
    assert!(server.source_information().contains("server.yaml"));
}

#[test]
fn test_custom_extensions() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.yml", "x: 1");
    write(dir.path(), "b.conf", "y: 2");
    write(dir.path(), "c.yaml", "z: 3");

    let mut source = FileSource::new(dir.path()).extensions([".yml", ".conf"]);
    source.preload().unwrap();
    assert_eq!(source.sorted_filenames(), ["a", "b"]);
}

#[test]
fn test_ignore_pattern() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep.yaml", "x: 1");
    write(dir.path(), "drafts/skip.yaml", "x: 2");

    let mut source = FileSource::new(dir.path()).ignore_pattern(Regex::new("^drafts/").unwrap());
    source.preload().unwrap();
    assert_eq!(source.sorted_filenames(), ["keep"]);
}

#[test]
fn test_hotload_new_changed_and_deleted() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.yaml", "x: 1");
    write(dir.path(), "b.yaml", "y: 2");
    write(dir.path(), "c.yaml", "z: 3");

    let mut source = FileSource::new(dir.path()).with_hotload(true);
    source.preload().unwrap();
    assert!(hotload(&mut source).is_empty());

    write(dir.path(), "a.yaml", "x: 100");
    fs::remove_file(dir.path().join("b.yaml")).unwrap();
    write(dir.path(), "d.yaml", "w: 4");

    assert_eq!(hotload(&mut source), ["a", "b", "d"]);
    assert_eq!(source.sorted_filenames(), ["a", "c", "d"]);
    let a = source.file("a").unwrap().parsed();
    assert_eq!(a.get("x").unwrap().string_value().unwrap(), "100");
}

#[test]
fn test_touched_file_with_same_contents_is_unchanged() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.yaml", "x: 1");

    let mut source = FileSource::new(dir.path()).with_hotload(true);
    source.preload().unwrap();
    let checksum = source.file("a").unwrap().checksum();

    let later = SystemTime::now() + Duration::from_secs(3600);
    File::options()
        .write(true)
        .open(dir.path().join("a.yaml"))
        .unwrap()
        .set_modified(later)
        .unwrap();

    assert!(hotload(&mut source).is_empty());
    assert_eq!(source.file("a").unwrap().checksum(), checksum);
}

#[test]
fn test_checksum_match_restores_mtime() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.yaml", "x: 1");
    let path = dir.path().join("a.yaml");

    let mut source = FileSource::new(dir.path())
        .with_hotload(true)
        .set_modified_time_on_checksum_match(true);
    source.preload().unwrap();
    let original = source.file("a").unwrap().modified().unwrap();

    let later = SystemTime::now() + Duration::from_secs(3600);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(later)
        .unwrap();

    assert!(hotload(&mut source).is_empty());
    let on_disk = fs::metadata(&path).unwrap().modified().unwrap();
    assert!(on_disk < later - Duration::from_secs(1800));
    assert!(on_disk >= original - Duration::from_secs(1));
}

#[test]
fn test_parse_error_names_the_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "broken.yaml", "a: [1, 2");

    let mut source = FileSource::new(dir.path());
    match source.preload() {
        Err(Error::Parse { file, .. }) => assert!(file.ends_with("broken.yaml"), "{file}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_invalid_utf8_is_read_lossily() {
    let dir = tempdir().unwrap();
    write(dir.path(), "good.yaml", "a: 1");
    fs::write(dir.path().join("bad.yaml"), b"b: \xff\xfe").unwrap();

    let mut source = FileSource::new(dir.path()).with_hotload(true);
    source.preload().unwrap();
    assert_eq!(source.sorted_filenames(), ["bad", "good"]);

    let bad = source.file("bad").unwrap();
    assert_eq!(bad.size(), 5);
    assert_eq!(
        bad.parsed().get("b").unwrap().string_value().unwrap(),
        "\u{fffd}\u{fffd}"
    );
    assert!(hotload(&mut source).is_empty());

    // force the checksum path; the bytes are the same
    let later = SystemTime::now() + Duration::from_secs(3600);
    File::options()
        .write(true)
        .open(dir.path().join("bad.yaml"))
        .unwrap()
        .set_modified(later)
        .unwrap();
    assert!(hotload(&mut source).is_empty());

    fs::write(dir.path().join("bad.yaml"), b"b: \xff").unwrap();
    assert_eq!(hotload(&mut source), ["bad"]);
}

#[test]
fn test_missing_directory() {
    let dir = tempdir().unwrap();
    let mut source = FileSource::new(dir.path().join("nope"));
    assert!(matches!(source.preload(), Err(Error::SourceDirMissing { .. })));
}

#[test]
fn test_manager_over_directory() {
    let dir = tempdir().unwrap();
    write(dir.path(), "levels/1.yaml", "[a, b]");
    write(dir.path(), "levels/2.yaml", "[c]");

    let mut manager = ConfigFileManager::default();
    manager.add_source(FileSource::new(dir.path()).with_hotload(true));
    manager.preload().unwrap();

    manager
        .parse_files_as_list("levels/*", |levels| levels.len().unwrap() > 0)
        .unwrap();
    assert_eq!(manager.parse_file("levels/*_file").unwrap().to_string(), "[a, b, c]");

    write(dir.path(), "levels/3.yaml", "[d, e]");
    let changed = manager.do_immediate_hotload().unwrap();
    assert_eq!(changed, ["levels/3"]);
}
