//! Confirmed duplicate groups.
//!
//! # Overview
//!
//! A [`DuplicateGroup`] lists two or more files that share one full-content
//! fingerprint. Groups are recomputed on demand and never persisted.
//!
//! When a group is reduced to a single copy, the copy with the shortest
//! name is kept: files are ordered by file-name length, then by full path
//! length, and the first one survives.

use std::path::PathBuf;

use crate::catalogue::{File, FileId, Workspace};
use crate::scanner::Fingerprint;

/// Files with byte-identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Full fingerprint shared by every file
    pub fingerprint: Fingerprint,
    /// File size in bytes (shared by every file)
    pub size: u64,
    /// Member files, in detection order until sorted
    pub files: Vec<FileId>,
}

impl DuplicateGroup {
    #[must_use]
    pub fn new(fingerprint: Fingerprint, size: u64, files: Vec<FileId>) -> Self {
        Self {
            fingerprint,
            size,
            files,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all copies.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Space held by every copy but one.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of redundant copies.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Order members shortest name first. Ties keep detection order.
    pub fn sort_shortest_name_first(&mut self, ws: &Workspace) {
        self.files.sort_by_key(|&id| name_key(ws.file(id)));
    }

    /// First member; after sorting, the copy to keep.
    #[must_use]
    pub fn keeper(&self) -> Option<FileId> {
        self.files.first().copied()
    }

    /// Every member except the [`keeper`](Self::keeper).
    #[must_use]
    pub fn discards(&self) -> &[FileId] {
        self.files.get(1..).unwrap_or(&[])
    }

    /// Whether the members do not all share one file name.
    #[must_use]
    pub fn has_different_names(&self, ws: &Workspace) -> bool {
        let mut names = self.files.iter().map(|&id| ws.file(id).file_name());
        match names.next() {
            Some(first) => names.any(|name| name != first),
            None => false,
        }
    }

    /// Current paths of the members, skipping deleted ones.
    #[must_use]
    pub fn paths(&self, ws: &Workspace) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter_map(|&id| ws.file(id).path().map(PathBuf::from))
            .collect()
    }
}

/// Sort key picking the copy to keep: file-name length, then path length.
#[must_use]
pub fn name_key(file: &File) -> (usize, usize) {
    let name_len = file.file_name().map_or(usize::MAX, |n| n.chars().count());
    let path_len = file
        .path()
        .map_or(usize::MAX, |p| p.as_os_str().len());
    (name_len, path_len)
}
