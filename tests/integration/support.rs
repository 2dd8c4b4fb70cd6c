//! Shared fixtures: extension-based media detection and fixed capture dates,
//! so tests do not depend on real image headers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cataloguer::commands::Context;
use cataloguer::config::Config;
use cataloguer::media::{Classifier, DateExtractor, MediaType};
use cataloguer::naming::Template;
use cataloguer::signal::ShutdownHandler;
use chrono::{NaiveDate, NaiveDateTime};

pub struct ByExtension;

impl Classifier for ByExtension {
    fn classify(&self, path: &Path) -> MediaType {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jpg") => MediaType::new("image", "jpeg"),
            Some("png") => MediaType::new("image", "png"),
            Some("mp4") => MediaType::new("video", "mp4"),
            _ => MediaType::new("text", "plain"),
        }
    }
}

/// Every file was captured on 2021-06-15, except those whose name starts
/// with `undated`.
pub struct FixedDates;

impl DateExtractor for FixedDates {
    fn creation_date(&self, path: &Path, _media: &MediaType) -> Option<NaiveDateTime> {
        let name = path.file_name()?.to_string_lossy();
        if name.starts_with("undated") {
            return None;
        }
        NaiveDate::from_ymd_opt(2021, 6, 15)?.and_hms_opt(10, 0, 0)
    }
}

/// Write `content` at `root/relative`, creating parents.
pub fn write(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn config(storage: &Path, format_pattern: &str) -> Config {
    Config {
        format_pattern: Some(Template::parse(format_pattern).unwrap()),
        storage_location: storage.to_path_buf(),
        ..Config::default()
    }
}

/// A non-interactive context using the fixtures above.
pub fn context(config: Config) -> Context {
    Context::new(config, ShutdownHandler::new())
        .with_assume_yes(true)
        .with_media(Arc::new(ByExtension), Box::new(FixedDates))
}

/// Relative paths of every file below `root`, sorted.
pub fn tree(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Path as a command argument.
pub fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
