//! The file entity tracked by indexes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::media::MediaType;
use crate::scanner::Fingerprint;

use super::IndexId;

/// Handle to a [`File`] owned by a [`Workspace`](super::Workspace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

/// One filesystem object.
///
/// Identity is the current path (absent once deleted), the size recorded at
/// discovery and the two lazily computed fingerprints. Fingerprints are only
/// filled in through the workspace, which notifies every subscribed index
/// before the value changes.
#[derive(Debug, Clone)]
pub struct File {
    pub(crate) path: Option<PathBuf>,
    pub(crate) size: u64,
    pub(crate) partial: Option<Fingerprint>,
    pub(crate) full: Option<Fingerprint>,
    pub(crate) media: Option<MediaType>,
    pub(crate) observers: BTreeSet<IndexId>,
}

impl File {
    pub(crate) fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path: Some(path),
            size,
            partial: None,
            full: None,
            media: None,
            observers: BTreeSet::new(),
        }
    }

    /// Current location, `None` for a deleted file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Partial fingerprint if it has been computed or restored.
    #[must_use]
    pub fn partial_fingerprint(&self) -> Option<&Fingerprint> {
        self.partial.as_ref()
    }

    /// Full fingerprint if it has been computed or restored.
    #[must_use]
    pub fn full_fingerprint(&self) -> Option<&Fingerprint> {
        self.full.as_ref()
    }

    /// Cached classification, if requested before.
    #[must_use]
    pub fn media(&self) -> Option<&MediaType> {
        self.media.as_ref()
    }

    /// Whether the file has been deleted.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.path.is_none()
    }

    /// Final path component.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Indexes currently subscribed to this file.
    pub fn observers(&self) -> impl Iterator<Item = IndexId> + '_ {
        self.observers.iter().copied()
    }
}

/// An identity-affecting change, delivered to subscribed indexes before it
/// is applied to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// The path is about to change; `None` means the file is being deleted.
    PathChanged(Option<PathBuf>),
    /// The partial fingerprint is about to be set.
    PartialFingerprint(Fingerprint),
    /// The full fingerprint is about to be set.
    FullFingerprint(Fingerprint),
}

/// Split a file name into stem and extension at the last dot.
///
/// `"a.old.txt"` gives `("a.old", "txt")`, `"name"` gives `("name", "")` and
/// `".txt"` gives `("", "txt")`.
#[must_use]
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (file_name, ""),
    }
}
