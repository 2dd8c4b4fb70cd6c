use std::fs;

use cataloguer::actions::{Operation, PlanError};
use cataloguer::cli::{OutputFormat, TransferArgs};
use cataloguer::commands::{transfer, CommandError};
use cataloguer::error::ExitCode;
use cataloguer::naming::Template;
use chrono::Utc;
use tempfile::{tempdir, TempDir};

use super::support::{arg, config, context, tree, write};

/// Source with a duplicated picture, a video and a text file.
fn source() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jpg", b"picture a");
    write(dir.path(), "nested/bb.jpg", b"picture a");
    write(dir.path(), "c.mp4", b"video clip c");
    write(dir.path(), "notes.txt", b"some plain notes");
    dir
}

fn args(src: &TempDir, dst: &TempDir, dry_run: bool) -> TransferArgs {
    TransferArgs {
        src: arg(src.path()),
        dst: arg(dst.path()),
        dry_run,
        output: OutputFormat::Json,
    }
}

fn run(
    storage: &TempDir,
    operation: Operation,
    args: &TransferArgs,
) -> (anyhow::Result<ExitCode>, serde_json::Value) {
    let mut ctx = context(config(storage.path(), "%Y/{file}"));
    let mut out = Vec::new();
    let result = transfer(&mut ctx, operation, args, &mut out);
    let json = serde_json::from_slice(&out).unwrap_or(serde_json::Value::Null);
    (result, json)
}

#[test]
fn test_copy_media_into_dated_layout() {
    let (src, dst, storage) = (source(), tempdir().unwrap(), tempdir().unwrap());

    let (result, json) = run(&storage, Operation::Copy, &args(&src, &dst, false));

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["2021/a.jpg", "2021/c.mp4"]);
    assert_eq!(json["transfer"]["applied"], 2);
    assert_eq!(json["transfer"]["different_names"][0]["paths"][0], "a.jpg");
    assert_eq!(tree(src.path()).len(), 4);
}

#[test]
fn test_copy_again_skips_everything() {
    let (src, dst, storage) = (source(), tempdir().unwrap(), tempdir().unwrap());
    run(&storage, Operation::Copy, &args(&src, &dst, false))
        .0
        .unwrap();
    let before = tree(dst.path());

    let (result, json) = run(&storage, Operation::Copy, &args(&src, &dst, false));

    assert_eq!(result.unwrap(), ExitCode::NothingToDo);
    assert_eq!(json["transfer"]["applied"], 0);
    assert_eq!(
        json["transfer"]["duplicates_skipped"].as_array().unwrap().len(),
        2
    );
    assert_eq!(tree(dst.path()), before);
}

#[test]
fn test_move_removes_sources() {
    let (src, dst, storage) = (source(), tempdir().unwrap(), tempdir().unwrap());

    let (result, _) = run(&storage, Operation::Move, &args(&src, &dst, false));

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["2021/a.jpg", "2021/c.mp4"]);
    assert_eq!(tree(src.path()), vec!["nested/bb.jpg", "notes.txt"]);
}

#[test]
fn test_dry_run_touches_nothing() {
    let (src, dst, storage) = (source(), tempdir().unwrap(), tempdir().unwrap());

    let (result, json) = run(&storage, Operation::Move, &args(&src, &dst, true));

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(json["transfer"]["dry_run"], true);
    assert_eq!(json["transfer"]["applied"], 2);
    assert!(tree(dst.path()).is_empty());
    assert_eq!(tree(src.path()).len(), 4);
}

#[test]
fn test_collision_gets_numbered_name() {
    let (src, dst, storage) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    write(src.path(), "a.jpg", b"new picture");
    write(dst.path(), "2021/a.jpg", b"old picture");

    let (result, json) = run(&storage, Operation::Copy, &args(&src, &dst, false));

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["2021/a.jpg", "2021/a_1.jpg"]);
    assert_eq!(fs::read(dst.path().join("2021/a.jpg")).unwrap(), b"old picture");
    assert_eq!(json["transfer"]["renamed"], 1);
    assert_eq!(json["transfer"]["files"][0]["state"], "APPLIED");
}

#[test]
fn test_undated_files_skipped_without_fallback() {
    let (src, dst, storage) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    write(src.path(), "undated.jpg", b"no exif");
    write(src.path(), "dated.jpg", b"has a date");

    let (result, json) = run(&storage, Operation::Copy, &args(&src, &dst, false));

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["2021/dated.jpg"]);
    assert_eq!(json["transfer"]["skipped"], 1);
}

#[test]
fn test_undated_files_use_fallback() {
    let (src, dst, storage) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    write(src.path(), "undated.jpg", b"no exif");
    let mut config = config(storage.path(), "%Y/{file}");
    config.unknown_format_pattern = Some(Template::parse("unknown/{file}").unwrap());
    let mut ctx = context(config);

    let code = transfer(
        &mut ctx,
        Operation::Copy,
        &args(&src, &dst, false),
        &mut Vec::new(),
    )
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["unknown/undated.jpg"]);
}

#[test]
fn test_fallback_renders_utc_start_time() {
    let (src, dst, storage) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    write(src.path(), "undated.jpg", b"no exif");
    let mut config = config(storage.path(), "%Y/{file}");
    config.unknown_format_pattern = Some(Template::parse("%Y-%m-%d %H/{file}").unwrap());
    let before = Utc::now().naive_utc();
    let mut ctx = context(config);
    let after = Utc::now().naive_utc();
    assert!(before <= ctx.started_at && ctx.started_at <= after);

    let code = transfer(
        &mut ctx,
        Operation::Copy,
        &args(&src, &dst, false),
        &mut Vec::new(),
    )
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let expected = format!("{}/undated.jpg", ctx.started_at.format("%Y-%m-%d %H"));
    assert_eq!(tree(dst.path()), vec![expected]);
}

#[test]
fn test_single_file_source() {
    let (src, dst, storage) = (source(), tempdir().unwrap(), tempdir().unwrap());
    let args = TransferArgs {
        src: arg(&src.path().join("c.mp4")),
        dst: arg(dst.path()),
        dry_run: false,
        output: OutputFormat::Json,
    };

    let (result, _) = run(&storage, Operation::Copy, &args);

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(tree(dst.path()), vec!["2021/c.mp4"]);
}

#[test]
fn test_overlapping_trees_rejected() {
    let (src, storage) = (source(), tempdir().unwrap());
    let inner = src.path().join("nested");
    let args = TransferArgs {
        src: arg(src.path()),
        dst: arg(&inner),
        dry_run: false,
        output: OutputFormat::Json,
    };

    let (result, _) = run(&storage, Operation::Copy, &args);

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PlanError>(),
        Some(PlanError::Overlap { .. })
    ));
    assert_eq!(tree(src.path()).len(), 4);
}

#[test]
fn test_missing_destination_rejected() {
    let (src, storage) = (source(), tempdir().unwrap());
    let args = TransferArgs {
        src: arg(src.path()),
        dst: arg(&src.path().join("absent")),
        dry_run: false,
        output: OutputFormat::Json,
    };

    let (result, _) = run(&storage, Operation::Copy, &args);

    assert!(matches!(
        result.unwrap_err().downcast_ref::<CommandError>(),
        Some(CommandError::NotAnIndex(_))
    ));
}
