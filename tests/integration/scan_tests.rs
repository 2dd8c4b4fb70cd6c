use std::fs;
use std::sync::Arc;

use cataloguer::catalogue::Workspace;
use cataloguer::duplicates::{DuplicateFinder, FinderConfig};
use cataloguer::scanner::{ScanError, WalkerConfig};
use tempfile::tempdir;

use super::support::{write, ByExtension};

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut ws = Workspace::new();

    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    let (groups, stats) = DuplicateFinder::default().find_in(&mut ws, index);

    assert!(ws.index(index).is_empty());
    assert!(groups.is_empty());
    assert_eq!(stats.input_files, 0);
}

#[test]
fn test_scan_nested_duplicates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"duplicate");
    write(dir.path(), "sub/deeper/b.txt", b"duplicate");
    write(dir.path(), "c.txt", b"different");

    let mut ws = Workspace::new();
    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    let (groups, stats) = DuplicateFinder::default().find_in(&mut ws, index);

    assert_eq!(ws.index(index).len(), 3);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(stats.duplicate_files, 1);
    assert_eq!(stats.reclaimable_space, 9);
    assert!(ws.verify_index(index).is_empty());
}

#[test]
fn test_same_size_different_content() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.bin", b"aaaa");
    write(dir.path(), "b.bin", b"bbbb");

    let mut ws = Workspace::new();
    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    let (groups, stats) = DuplicateFinder::default().find_in(&mut ws, index);

    assert!(groups.is_empty());
    assert_eq!(stats.size_candidates, 2);
    assert_eq!(stats.partial_hashed, 2);
    assert_eq!(stats.full_hashed, 0);
}

#[test]
fn test_empty_files_are_duplicates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one", b"");
    write(dir.path(), "two", b"");

    let mut ws = Workspace::new();
    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    let (groups, _) = DuplicateFinder::default().find_in(&mut ws, index);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 0);
}

#[test]
fn test_shared_prefix_split_by_full_fingerprint() {
    let dir = tempdir().unwrap();
    let mut a = vec![7u8; 4096];
    let mut b = a.clone();
    a[4000] = 1;
    b[4000] = 2;
    write(dir.path(), "a.bin", &a);
    write(dir.path(), "b.bin", &b);

    let mut ws = Workspace::new();
    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    let (groups, stats) = DuplicateFinder::default().find_in(&mut ws, index);

    assert!(groups.is_empty());
    assert_eq!(stats.full_hashed, 2);
}

#[test]
fn test_media_only_skips_other_buckets() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jpg", b"same picture");
    write(dir.path(), "b.jpg", b"same picture");
    write(dir.path(), "a.txt", b"same text");
    write(dir.path(), "b.txt", b"same text");

    let mut ws = Workspace::new();
    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_media_only(true)
            .with_classifier(Arc::new(ByExtension)),
    );
    let (groups, _) = finder.find_in(&mut ws, index);

    assert_eq!(groups.len(), 1);
    let name = ws.file(groups[0].files[0]).file_name().unwrap();
    assert!(name.ends_with(".jpg"));
}

#[test]
fn test_find_between_reports_cross_groups_only() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    write(left.path(), "shared.bin", b"in both trees");
    write(left.path(), "left1.bin", b"only on the left");
    write(left.path(), "left2.bin", b"only on the left");
    write(right.path(), "copy.bin", b"in both trees");

    let mut ws = Workspace::new();
    let a = ws.scan(left.path(), &WalkerConfig::default(), None).unwrap();
    let b = ws.scan(right.path(), &WalkerConfig::default(), None).unwrap();
    let (groups, _) = DuplicateFinder::default().find_between(&mut ws, a, b);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 13);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_skip_hidden_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), ".hidden.jpg", b"x");
    write(dir.path(), "visible.jpg", b"x");

    let mut ws = Workspace::new();
    let index = ws
        .scan(dir.path(), &WalkerConfig::new(false, true), None)
        .unwrap();

    assert_eq!(ws.index(index).len(), 1);
}

#[test]
fn test_scan_missing_root() {
    let dir = tempdir().unwrap();
    let mut ws = Workspace::new();

    let result = ws.scan(&dir.path().join("absent"), &WalkerConfig::default(), None);

    assert!(matches!(result, Err(ScanError::NotFound(_))));
}

#[test]
fn test_scan_file_is_not_a_directory() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "file.jpg", b"x");
    let mut ws = Workspace::new();

    let result = ws.scan(&file, &WalkerConfig::default(), None);

    assert!(matches!(result, Err(ScanError::NotADirectory(_))));
}

#[test]
fn test_unreadable_file_reported_as_failure() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.bin", b"twin");
    let gone = write(dir.path(), "b.bin", b"twin");

    let mut ws = Workspace::new();
    let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
    fs::remove_file(&gone).unwrap();
    let (groups, stats) = DuplicateFinder::default().find_in(&mut ws, index);

    assert!(groups.is_empty());
    assert_eq!(stats.failed_files.len(), 1);
    assert!(stats.failed_files[0].ends_with("b.bin"));
}
