//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing directories and
//! collecting the `(path, size)` pairs an index is built from. Traversal is
//! sequential and sorted by file name, so two scans of an unchanged tree yield
//! files in the same order.
//!
//! Unreadable entries are yielded as [`ScanError`] values rather than stopping
//! iteration; callers log them and carry on.
//!
//! # Example
//!
//! ```no_run
//! use cataloguer::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Root directory this walker starts from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Returns an iterator over [`FileEntry`] results. Errors are yielded
    /// as [`ScanError`] values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let skip_hidden = self.config.skip_hidden;

        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && Self::is_hidden(entry)))
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => Some(self.handle_walkdir_error(e)),
            })
    }

    /// Turn a walkdir entry into a FileEntry if it is a regular file.
    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }

        if entry.path_is_symlink() && !self.config.follow_symlinks {
            log::trace!("Skipping symlink: {}", entry.path().display());
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata unavailable"));
                return Some(self.handle_io_error(entry.path(), source));
            }
        };

        if !metadata.is_file() {
            return None;
        }

        Some(Ok(FileEntry::new(entry.path().to_path_buf(), metadata.len())))
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> Result<FileEntry, ScanError> {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                Err(ScanError::PermissionDenied(path.to_path_buf()))
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                Err(ScanError::NotFound(path.to_path_buf()))
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                Err(ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                })
            }
        }
    }

    /// Handle walkdir errors (unreadable directories, symlink loops).
    fn handle_walkdir_error(&self, error: walkdir::Error) -> Result<FileEntry, ScanError> {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        match error.into_io_error() {
            Some(io) => self.handle_io_error(&path, io),
            None => {
                log::warn!("Walker error for {}: filesystem loop", path.display());
                Err(ScanError::Io {
                    path,
                    source: std::io::Error::other("filesystem loop detected"),
                })
            }
        }
    }
}

/// Count the regular files below `root` with the same rules the walker uses.
///
/// Used to decide whether a persisted snapshot still matches the live tree.
#[must_use]
pub fn count_files(root: &Path, config: &WalkerConfig) -> usize {
    Walker::new(root, config.clone())
        .walk()
        .filter(Result::is_ok)
        .count()
}
