//! Catalogue storage: one JSON snapshot per catalogue.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::naming::TemplateError;
use crate::scanner::{ScanError, WalkerConfig};

use super::snapshot::CatalogueSnapshot;
use super::{Catalogue, Workspace};

/// Errors raised by catalogue storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Names become file names, so separators and leading dots are refused.
    #[error("invalid catalogue name {0:?}")]
    InvalidName(String),

    #[error("catalogue {0:?} already exists")]
    AlreadyExists(String),

    #[error("catalogue {0:?} does not exist")]
    NotFound(String),

    /// The directory a snapshot points at is gone.
    #[error("catalogue root {path} is not accessible: {source}")]
    MissingRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid template in catalogue: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("catalogue file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Directory holding `<name>.json` snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot file of catalogue `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidName`] for names that are not plain
    /// file names.
    pub fn catalogue_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.trim().is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.chars().any(char::is_control);
        if !valid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.path.join(format!("{name}.json")))
    }

    /// Whether a snapshot named `name` is stored.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.catalogue_path(name).is_ok_and(|p| p.is_file())
    }

    /// Read the raw snapshot of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if it is not stored,
    /// [`StorageError::Corrupt`] if it cannot be parsed.
    pub fn read(&self, name: &str) -> Result<CatalogueSnapshot, StorageError> {
        let path = self.catalogue_path(name)?;
        let content = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|source| StorageError::Corrupt { path, source })
    }

    /// Load catalogue `name` into `ws`.
    ///
    /// A missing catalogue yields `Ok(None)`. A snapshot that cannot be read
    /// or restored is logged and also treated as missing.
    ///
    /// # Errors
    ///
    /// Only [`StorageError::InvalidName`] is returned.
    pub fn load(
        &self,
        ws: &mut Workspace,
        name: &str,
        walker: &WalkerConfig,
        force_reload: bool,
    ) -> Result<Option<Catalogue>, StorageError> {
        let snapshot = match self.read(name) {
            Ok(snapshot) => snapshot,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e @ StorageError::InvalidName(_)) => return Err(e),
            Err(e) => {
                log::warn!("Error loading catalogue {:?}: {}", name, e);
                return Ok(None);
            }
        };

        match snapshot.restore(ws, walker, force_reload) {
            Ok(catalogue) => {
                log::debug!(
                    "Loaded catalogue {:?} with {} files",
                    name,
                    ws.index(catalogue.index).len()
                );
                Ok(Some(catalogue))
            }
            Err(e) => {
                log::warn!("Error loading catalogue {:?}: {}", name, e);
                Ok(None)
            }
        }
    }

    /// Write the snapshot of `catalogue`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be written.
    pub fn save(&self, ws: &Workspace, catalogue: &Catalogue) -> Result<(), StorageError> {
        let path = self.catalogue_path(catalogue.name())?;
        fs::create_dir_all(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;

        let snapshot = CatalogueSnapshot::capture(ws, catalogue);
        let json = serde_json::to_string_pretty(&snapshot).map_err(|source| {
            StorageError::Corrupt {
                path: path.clone(),
                source,
            }
        })?;

        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };
        let mut file = fs::File::create(&path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        log::debug!(
            "Saved catalogue {:?} ({} files) to {}",
            catalogue.name(),
            snapshot.files.len(),
            path.display()
        );
        Ok(())
    }

    /// Remove the snapshot of `name`. The catalogue's files are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no such catalogue is stored.
    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.catalogue_path(name)?;
        fs::remove_file(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::Io { path, source }
            }
        })
    }
}
