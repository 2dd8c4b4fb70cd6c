//! The in-memory catalogue model.
//!
//! # Architecture
//!
//! - [`file`]: [`File`] entities and the [`FileEvent`]s their mutations emit
//! - [`index`]: [`Index`], the reactive multi-key lookup over files
//! - [`workspace`]: [`Workspace`], the arena owning both and routing events
//! - [`snapshot`]: the persisted JSON form of a catalogue
//! - [`storage`]: one snapshot file per catalogue in a storage directory
//!
//! A *catalogue* is an index with a name and naming templates attached. A
//! command operates on a [`Target`]: a single file, a plain directory or a
//! catalogue.

pub mod file;
pub mod index;
pub mod snapshot;
pub mod storage;
pub mod workspace;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::naming::Template;
use crate::scanner::{ScanError, WalkerConfig};

pub use file::{split_extension, File, FileEvent, FileId};
pub use index::{Index, IndexId};
pub use snapshot::{CatalogueSnapshot, FileRecord};
pub use storage::{Storage, StorageError};
pub use workspace::Workspace;

/// Everything that identifies a catalogue besides its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueInfo {
    /// Unique key in storage
    pub name: String,
    /// Absolute root directory
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Template applied to files copied or moved into the catalogue
    pub format_pattern: Template,
    /// Template for files without a capture date
    pub unknown_format_pattern: Option<Template>,
}

/// A named index.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub info: CatalogueInfo,
    pub index: IndexId,
}

impl Catalogue {
    /// Scan `root` and wrap it as a new catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if `root` cannot be walked.
    pub fn create(
        ws: &mut Workspace,
        name: &str,
        root: &Path,
        format_pattern: Template,
        unknown_format_pattern: Option<Template>,
        walker: &WalkerConfig,
    ) -> Result<Self, ScanError> {
        let index = ws.scan(root, walker, None)?;
        let info = CatalogueInfo {
            name: name.to_string(),
            root: ws.index(index).root().to_path_buf(),
            created_at: Utc::now(),
            format_pattern,
            unknown_format_pattern,
        };
        Ok(Self { info, index })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }
}

/// What a command argument resolved to.
#[derive(Debug, Clone)]
pub enum Target {
    /// A single existing file, not part of any index
    File(FileId),
    /// A scanned directory
    Directory(IndexId),
    /// A catalogue loaded from storage
    Catalogue(Catalogue),
}

impl Target {
    /// Index behind a directory or catalogue.
    #[must_use]
    pub fn index(&self) -> Option<IndexId> {
        match self {
            Self::File(_) => None,
            Self::Directory(index) => Some(*index),
            Self::Catalogue(catalogue) => Some(catalogue.index),
        }
    }

    /// Root directory: the index root, or the parent of a single file.
    #[must_use]
    pub fn root(&self, ws: &Workspace) -> PathBuf {
        match self {
            Self::File(id) => ws
                .file(*id)
                .path()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            Self::Directory(index) => ws.index(*index).root().to_path_buf(),
            Self::Catalogue(catalogue) => catalogue.info.root.clone(),
        }
    }

    #[must_use]
    pub fn as_catalogue(&self) -> Option<&Catalogue> {
        match self {
            Self::Catalogue(catalogue) => Some(catalogue),
            _ => None,
        }
    }

    /// Short label for messages: `file`, `directory` or `catalogue`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Directory(_) => "directory",
            Self::Catalogue(_) => "catalogue",
        }
    }
}
