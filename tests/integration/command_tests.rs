use cataloguer::actions::{Operation, PlanError};
use cataloguer::catalogue::Storage;
use cataloguer::cli::{
    CreateArgs, DeleteCatalogueArgs, DeleteDuplicatesArgs, InspectArgs, OutputFormat,
    TransferArgs,
};
use cataloguer::commands::{
    create_catalogue, delete_catalogue, delete_duplicates, inspect, transfer, CommandError,
};
use cataloguer::config::Config;
use cataloguer::error::ExitCode;
use tempfile::{tempdir, TempDir};

use super::support::{arg, config, context, tree, write};

fn library() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jpg", b"picture a");
    write(dir.path(), "2020/a.jpg", b"picture a");
    write(dir.path(), "copies/a_copy.jpg", b"picture a");
    write(dir.path(), "b.png", b"picture b, larger");
    write(dir.path(), "b_again.png", b"picture b, larger");
    write(dir.path(), "notes.txt", b"twin text file");
    write(dir.path(), "notes2.txt", b"twin text file");
    dir
}

fn create(config: Config, name: &str, root: &TempDir) -> (ExitCode, String) {
    let mut ctx = context(config);
    let mut out = Vec::new();
    let args = CreateArgs {
        name: name.to_string(),
        src: Some(root.path().to_path_buf()),
    };
    let code = create_catalogue(&mut ctx, &args, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_inspect_directory_media_only() {
    yansi::disable();
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let mut out = Vec::new();
    let args = InspectArgs {
        src: arg(dir.path()),
        all: false,
        output: OutputFormat::Json,
    };

    let code = inspect(&mut ctx, &args, &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(json["inspect"]["catalogue"].is_null());
    let duplicates = json["inspect"]["duplicates"].as_array().unwrap();
    assert_eq!(duplicates.len(), 2);
    assert_eq!(duplicates[0]["size"], 17);
    assert_eq!(duplicates[1]["paths"][0], "a.jpg");
    assert_eq!(duplicates[1]["paths"].as_array().unwrap().len(), 3);
    let rows = json["inspect"]["summary"]["rows"].as_array().unwrap();
    assert!(rows.iter().all(|r| r["media_type"] == "image"));
}

#[test]
fn test_inspect_all_includes_other_files() {
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let mut out = Vec::new();
    let args = InspectArgs {
        src: arg(dir.path()),
        all: true,
        output: OutputFormat::Json,
    };

    inspect(&mut ctx, &args, &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(json["inspect"]["duplicates"].as_array().unwrap().len(), 3);
    assert_eq!(json["inspect"]["stats"]["input_files"], 7);
}

#[test]
fn test_inspect_text_lists_groups() {
    yansi::disable();
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let mut out = Vec::new();
    let args = InspectArgs {
        src: arg(dir.path()),
        all: false,
        output: OutputFormat::Text,
    };

    inspect(&mut ctx, &args, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("image"));
    assert!(text.contains("copies/a_copy.jpg"));
}

#[test]
fn test_inspect_rejects_single_file() {
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let args = InspectArgs {
        src: arg(&dir.path().join("a.jpg")),
        all: false,
        output: OutputFormat::Text,
    };

    let err = inspect(&mut ctx, &args, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::NotAnIndex(_))
    ));
}

#[test]
fn test_create_inspect_and_delete_catalogue() {
    yansi::disable();
    let (dir, storage) = (library(), tempdir().unwrap());

    let (code, text) = create(config(storage.path(), "%Y/{file}"), "photos", &dir);
    assert_eq!(code, ExitCode::Success);
    assert!(text.contains("Catalogue name: photos"));
    assert!(text.contains("format_pattern: %Y/{file}"));
    assert!(Storage::new(storage.path()).exists("photos"));

    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let mut out = Vec::new();
    let args = InspectArgs {
        src: "photos".to_string(),
        all: false,
        output: OutputFormat::Json,
    };
    inspect(&mut ctx, &args, &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["inspect"]["catalogue"], "photos");

    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let code = delete_catalogue(
        &mut ctx,
        &DeleteCatalogueArgs {
            name: "photos".to_string(),
        },
        &mut Vec::new(),
    )
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(!Storage::new(storage.path()).exists("photos"));
    assert_eq!(tree(dir.path()).len(), 7);
}

#[test]
fn test_create_catalogue_twice_fails() {
    let (dir, storage) = (library(), tempdir().unwrap());
    create(config(storage.path(), "%Y/{file}"), "photos", &dir);

    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let args = CreateArgs {
        name: "photos".to_string(),
        src: Some(dir.path().to_path_buf()),
    };
    let err = create_catalogue(&mut ctx, &args, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::CatalogueExists { .. })
    ));
}

#[test]
fn test_create_catalogue_requires_format_pattern() {
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut config = config(storage.path(), "%Y/{file}");
    config.format_pattern = None;
    let mut ctx = context(config);
    let args = CreateArgs {
        name: "photos".to_string(),
        src: Some(dir.path().to_path_buf()),
    };

    let err = create_catalogue(&mut ctx, &args, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::NoFormatPattern)
    ));
}

#[test]
fn test_delete_unknown_catalogue() {
    let storage = tempdir().unwrap();
    let mut ctx = context(config(storage.path(), "%Y/{file}"));

    let err = delete_catalogue(
        &mut ctx,
        &DeleteCatalogueArgs {
            name: "ghost".to_string(),
        },
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::CatalogueNotFound(_))
    ));
}

#[test]
fn test_copy_into_catalogue_updates_snapshot() {
    let (src, dst, storage) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    write(src.path(), "new.jpg", b"fresh picture");
    write(dst.path(), "2019/old.jpg", b"old");
    create(config(storage.path(), "%m/{file}"), "archive", &dst);

    // The catalogue's own pattern applies when none is configured.
    let mut config = config(storage.path(), "%Y/{file}");
    config.format_pattern = None;
    let mut ctx = context(config);
    let args = TransferArgs {
        src: arg(src.path()),
        dst: "archive".to_string(),
        dry_run: false,
        output: OutputFormat::Json,
    };
    let code = transfer(&mut ctx, Operation::Copy, &args, &mut Vec::new()).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["06/new.jpg", "2019/old.jpg"]);
    let snapshot = Storage::new(storage.path()).read("archive").unwrap();
    assert_eq!(snapshot.files.len(), 2);
}

#[test]
fn test_delete_duplicates_within_source() {
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let mut out = Vec::new();
    let args = DeleteDuplicatesArgs {
        src: arg(dir.path()),
        dst: None,
        dry_run: false,
        trash: false,
        output: OutputFormat::Json,
    };

    let code = delete_duplicates(&mut ctx, &args, &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(json["transfer"]["applied"], 3);
    assert_eq!(
        tree(dir.path()),
        vec!["a.jpg", "b.png", "notes.txt", "notes2.txt"]
    );
}

#[test]
fn test_delete_duplicates_dry_run() {
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let args = DeleteDuplicatesArgs {
        src: arg(dir.path()),
        dst: None,
        dry_run: true,
        trash: false,
        output: OutputFormat::Json,
    };

    delete_duplicates(&mut ctx, &args, &mut Vec::new()).unwrap();

    assert_eq!(tree(dir.path()).len(), 7);
}

#[test]
fn test_delete_duplicates_against_destination() {
    let (src, dst, storage) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    write(src.path(), "keep.jpg", b"shared picture");
    write(dst.path(), "2021/keep.jpg", b"shared picture");
    write(dst.path(), "2021/other.jpg", b"unrelated one");
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let args = DeleteDuplicatesArgs {
        src: arg(src.path()),
        dst: Some(arg(dst.path())),
        dry_run: false,
        trash: false,
        output: OutputFormat::Json,
    };

    let code = delete_duplicates(&mut ctx, &args, &mut Vec::new()).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(tree(src.path()), vec!["keep.jpg"]);
    assert_eq!(tree(dst.path()), vec!["2021/other.jpg"]);
}

#[test]
fn test_delete_duplicates_file_needs_destination() {
    let (dir, storage) = (library(), tempdir().unwrap());
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let args = DeleteDuplicatesArgs {
        src: arg(&dir.path().join("a.jpg")),
        dst: None,
        dry_run: false,
        trash: false,
        output: OutputFormat::Text,
    };

    let err = delete_duplicates(&mut ctx, &args, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::FileWithoutDestination(_))
    ));
}

#[test]
fn test_delete_duplicates_file_inside_destination_rejected() {
    let (dst, storage) = (tempdir().unwrap(), tempdir().unwrap());
    write(dst.path(), "only.jpg", b"single copy");
    write(dst.path(), "other.jpg", b"something else");
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let args = DeleteDuplicatesArgs {
        src: arg(&dst.path().join("only.jpg")),
        dst: Some(arg(dst.path())),
        dry_run: false,
        trash: false,
        output: OutputFormat::Json,
    };

    let err = delete_duplicates(&mut ctx, &args, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PlanError>(),
        Some(PlanError::Overlap { .. })
    ));
    assert_eq!(tree(dst.path()), vec!["only.jpg", "other.jpg"]);
}
