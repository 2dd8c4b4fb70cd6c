use std::fs;

use cataloguer::catalogue::{Catalogue, Storage, StorageError, Workspace};
use cataloguer::duplicates::DuplicateFinder;
use cataloguer::naming::Template;
use cataloguer::scanner::WalkerConfig;
use tempfile::tempdir;

use super::support::write;

fn create(ws: &mut Workspace, name: &str, root: &std::path::Path) -> Catalogue {
    Catalogue::create(
        ws,
        name,
        root,
        Template::parse("%Y/%m/{file}").unwrap(),
        None,
        &WalkerConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_save_and_load_keeps_fingerprints() {
    let root = tempdir().unwrap();
    let storage_dir = tempdir().unwrap();
    write(root.path(), "a.jpg", b"picture");
    write(root.path(), "b/a.jpg", b"picture");

    let storage = Storage::new(storage_dir.path());
    let mut ws = Workspace::new();
    let catalogue = create(&mut ws, "photos", root.path());
    DuplicateFinder::default().find_in(&mut ws, catalogue.index);
    storage.save(&ws, &catalogue).unwrap();

    let mut fresh = Workspace::new();
    let loaded = storage
        .load(&mut fresh, "photos", &WalkerConfig::default(), false)
        .unwrap()
        .unwrap();

    assert_eq!(loaded.info.root, root.path().canonicalize().unwrap());
    assert_eq!(loaded.info.format_pattern.as_str(), "%Y/%m/{file}");
    let files = fresh.index(loaded.index).files().to_vec();
    assert_eq!(files.len(), 2);
    for id in files {
        assert!(fresh.file(id).full_fingerprint().is_some());
        assert!(fresh.file(id).partial_fingerprint().is_some());
    }
}

#[test]
fn test_snapshot_layout() {
    let root = tempdir().unwrap();
    let storage_dir = tempdir().unwrap();
    write(root.path(), "2020/a.jpg", b"aaa");

    let storage = Storage::new(storage_dir.path());
    let mut ws = Workspace::new();
    let catalogue = create(&mut ws, "photos", root.path());
    storage.save(&ws, &catalogue).unwrap();

    let raw = fs::read_to_string(storage_dir.path().join("photos.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["name"], "photos");
    assert_eq!(value["format_pattern"], "%Y/%m/{file}");
    assert_eq!(value["hash_algorithm"], "blake3");
    assert_eq!(value["files"][0]["path"], "2020/a.jpg");
    assert_eq!(value["files"][0]["size"], 3);
    assert!(value["files"][0]["hash"].is_null());
}

#[test]
fn test_load_rescans_when_file_count_changes() {
    let root = tempdir().unwrap();
    let storage_dir = tempdir().unwrap();
    write(root.path(), "a.jpg", b"a");

    let storage = Storage::new(storage_dir.path());
    let mut ws = Workspace::new();
    let catalogue = create(&mut ws, "photos", root.path());
    storage.save(&ws, &catalogue).unwrap();

    write(root.path(), "new.jpg", b"new");
    let mut fresh = Workspace::new();
    let loaded = storage
        .load(&mut fresh, "photos", &WalkerConfig::default(), false)
        .unwrap()
        .unwrap();

    assert_eq!(fresh.index(loaded.index).len(), 2);
}

#[test]
fn test_load_missing_catalogue() {
    let storage_dir = tempdir().unwrap();
    let storage = Storage::new(storage_dir.path());
    let mut ws = Workspace::new();

    let loaded = storage
        .load(&mut ws, "nothing", &WalkerConfig::default(), false)
        .unwrap();

    assert!(loaded.is_none());
}

#[test]
fn test_corrupt_snapshot_treated_as_missing() {
    let storage_dir = tempdir().unwrap();
    fs::write(storage_dir.path().join("broken.json"), "{ not json").unwrap();
    let storage = Storage::new(storage_dir.path());
    let mut ws = Workspace::new();

    let loaded = storage
        .load(&mut ws, "broken", &WalkerConfig::default(), false)
        .unwrap();

    assert!(loaded.is_none());
    assert!(matches!(
        storage.read("broken"),
        Err(StorageError::Corrupt { .. })
    ));
}

#[test]
fn test_invalid_names_rejected() {
    let storage = Storage::new("/tmp/unused");

    for name in ["", "../escape", "a/b", ".hidden"] {
        assert!(matches!(
            storage.catalogue_path(name),
            Err(StorageError::InvalidName(_))
        ));
    }
}

#[test]
fn test_delete_leaves_files() {
    let root = tempdir().unwrap();
    let storage_dir = tempdir().unwrap();
    let photo = write(root.path(), "a.jpg", b"a");

    let storage = Storage::new(storage_dir.path());
    let mut ws = Workspace::new();
    let catalogue = create(&mut ws, "photos", root.path());
    storage.save(&ws, &catalogue).unwrap();

    storage.delete("photos").unwrap();

    assert!(!storage.exists("photos"));
    assert!(photo.exists());
    assert!(matches!(
        storage.delete("photos"),
        Err(StorageError::NotFound(_))
    ));
}
