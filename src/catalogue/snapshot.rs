//! Persisted form of a catalogue.
//!
//! ```json
//! {
//!   "name": "photos",
//!   "path": "/home/me/Pictures/catalogue",
//!   "creation_date": "2024-03-01T10:00:00+00:00",
//!   "format_pattern": "%Y/%m/{file}",
//!   "unknown_format_pattern": null,
//!   "hash_algorithm": "blake3",
//!   "files": [{"path": "2024/03/a.jpg", "size": 1024, "hash": "…", "short_hash": "…"}]
//! }
//! ```
//!
//! File paths are relative to the catalogue root. Fingerprints are only
//! trusted when `hash_algorithm` matches the one this build computes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming::Template;
use crate::scanner::{count_files, Fingerprint, WalkerConfig, HASH_ALGORITHM};

use super::storage::StorageError;
use super::{Catalogue, CatalogueInfo, Workspace};

/// One file of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative to the catalogue root
    pub path: PathBuf,
    pub size: u64,
    /// Full fingerprint
    #[serde(default)]
    pub hash: Option<Fingerprint>,
    /// Partial fingerprint
    #[serde(default)]
    pub short_hash: Option<Fingerprint>,
}

/// A catalogue as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueSnapshot {
    pub name: String,
    pub path: PathBuf,
    pub creation_date: DateTime<Utc>,
    pub format_pattern: String,
    #[serde(default)]
    pub unknown_format_pattern: Option<String>,
    #[serde(default)]
    pub hash_algorithm: Option<String>,
    pub files: Vec<FileRecord>,
}

impl CatalogueSnapshot {
    /// Record the current state of `catalogue`.
    #[must_use]
    pub fn capture(ws: &Workspace, catalogue: &Catalogue) -> Self {
        let root = &catalogue.info.root;
        let files = ws
            .index(catalogue.index)
            .files()
            .iter()
            .filter_map(|&id| {
                let file = ws.file(id);
                let path = file.path()?.strip_prefix(root).ok()?.to_path_buf();
                Some(FileRecord {
                    path,
                    size: file.size(),
                    hash: file.full_fingerprint().cloned(),
                    short_hash: file.partial_fingerprint().cloned(),
                })
            })
            .collect();

        Self {
            name: catalogue.info.name.clone(),
            path: root.clone(),
            creation_date: catalogue.info.created_at,
            format_pattern: catalogue.info.format_pattern.as_str().to_string(),
            unknown_format_pattern: catalogue
                .info
                .unknown_format_pattern
                .as_ref()
                .map(|t| t.as_str().to_string()),
            hash_algorithm: Some(HASH_ALGORITHM.to_string()),
            files,
        }
    }

    /// Rebuild the catalogue inside `ws`.
    ///
    /// The stored file list is used as-is unless `force_reload` is set or
    /// the number of files under the root changed, in which case the root
    /// is rescanned.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the root no longer exists, a stored
    /// template is invalid, or the rescan fails.
    pub fn restore(
        self,
        ws: &mut Workspace,
        walker: &WalkerConfig,
        force_reload: bool,
    ) -> Result<Catalogue, StorageError> {
        let root = self
            .path
            .canonicalize()
            .map_err(|source| StorageError::MissingRoot {
                path: self.path.clone(),
                source,
            })?;
        let format_pattern = Template::parse(&self.format_pattern)?;
        let unknown_format_pattern = self
            .unknown_format_pattern
            .as_deref()
            .map(Template::parse)
            .transpose()?;

        let info = CatalogueInfo {
            name: self.name,
            root: root.clone(),
            created_at: self.creation_date,
            format_pattern,
            unknown_format_pattern,
        };

        let live = count_files(&root, walker);
        log::debug!(
            "Catalogue files: {} vs filesystem files {}",
            self.files.len(),
            live
        );
        if force_reload || live != self.files.len() {
            log::info!("Rescanning catalogue {:?}", info.name);
            let index = ws.scan(&root, walker, None)?;
            return Ok(Catalogue { info, index });
        }

        let trust_hashes = self.hash_algorithm.as_deref() == Some(HASH_ALGORITHM);
        if !trust_hashes {
            log::info!(
                "Catalogue {:?} was hashed with {}, fingerprints will be recomputed",
                info.name,
                self.hash_algorithm.as_deref().unwrap_or("an unknown algorithm")
            );
        }

        let index = ws.create_index(root.clone());
        for record in self.files {
            let id = ws.insert_file(root.join(&record.path), record.size);
            if trust_hashes {
                if let Some(fp) = record.short_hash {
                    ws.set_partial(id, fp);
                }
                if let Some(fp) = record.hash {
                    ws.set_full(id, fp);
                }
            }
            if !ws.add(index, id) {
                log::warn!(
                    "Ignoring stored entry {} of catalogue {:?}",
                    record.path.display(),
                    info.name
                );
            }
        }

        Ok(Catalogue { info, index })
    }
}
