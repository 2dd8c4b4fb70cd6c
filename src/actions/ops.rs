//! Raw filesystem operations behind the [`FileOps`] trait.
//!
//! # Overview
//!
//! The catalogue core never touches the filesystem directly when applying an
//! operation. It calls into a [`FileOps`] implementation:
//! - [`StdFileOps`]: the real thing, built on `std::fs` and the `trash` crate
//! - test doubles that record or fail calls
//!
//! # Safety
//!
//! [`StdFileOps`] never overwrites: a copy or move onto an existing file is
//! refused with [`OpError::DestinationExists`]. Parent directories of the
//! destination are created on demand.
//!
//! # Example
//!
//! ```no_run
//! use cataloguer::actions::{FileOps, StdFileOps};
//! use std::path::Path;
//!
//! let ops = StdFileOps::default();
//! ops.copy(Path::new("/photos/a.jpg"), Path::new("/archive/2020/a.jpg"))?;
//! # Ok::<(), cataloguer::actions::OpError>(())
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for a single file operation.
#[derive(Debug, Error)]
pub enum OpError {
    /// Source file was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied on the source or destination.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Something already lives at the destination on disk.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// The file was deleted earlier in this run.
    #[error("file has been deleted")]
    Deleted,

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OpError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::DestinationExists(p) => Some(p),
            Self::TrashFailed { path, .. } | Self::Io { path, .. } => Some(path),
            Self::Deleted => None,
        }
    }

    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::DestinationExists(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Content-level filesystem calls the executor depends on.
pub trait FileOps {
    /// Copy `src` to `dst`, creating missing parent directories.
    fn copy(&self, src: &Path, dst: &Path) -> Result<(), OpError>;

    /// Move `src` to `dst`, creating missing parent directories.
    fn move_file(&self, src: &Path, dst: &Path) -> Result<(), OpError>;

    /// Remove `path`.
    fn delete(&self, path: &Path) -> Result<(), OpError>;
}

/// [`FileOps`] on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileOps {
    /// Send deleted files to the system trash instead of unlinking them.
    pub use_trash: bool,
}

impl StdFileOps {
    /// Operations that delete through the system trash.
    #[must_use]
    pub fn trash() -> Self {
        Self { use_trash: true }
    }

    fn prepare_destination(dst: &Path) -> Result<(), OpError> {
        if dst.symlink_metadata().is_ok() {
            log::warn!("Refusing to overwrite {}", dst.display());
            return Err(OpError::DestinationExists(dst.to_path_buf()));
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| OpError::from_io(parent, e))?;
        }
        Ok(())
    }

    fn ensure_source(src: &Path) -> Result<(), OpError> {
        fs::metadata(src)
            .map(|_| ())
            .map_err(|e| OpError::from_io(src, e))
    }
}

impl FileOps for StdFileOps {
    fn copy(&self, src: &Path, dst: &Path) -> Result<(), OpError> {
        Self::ensure_source(src)?;
        Self::prepare_destination(dst)?;

        let bytes = fs::copy(src, dst).map_err(|e| OpError::from_io(dst, e))?;
        log::debug!("Copied {} -> {} ({} bytes)", src.display(), dst.display(), bytes);
        Ok(())
    }

    fn move_file(&self, src: &Path, dst: &Path) -> Result<(), OpError> {
        Self::ensure_source(src)?;
        Self::prepare_destination(dst)?;

        match fs::rename(src, dst) {
            Ok(()) => {
                log::debug!("Moved {} -> {}", src.display(), dst.display());
                Ok(())
            }
            Err(e) => {
                // Renames across filesystems fail; fall back to copy + remove.
                log::debug!(
                    "Rename {} -> {} failed ({}), copying instead",
                    src.display(),
                    dst.display(),
                    e
                );
                fs::copy(src, dst).map_err(|e| OpError::from_io(dst, e))?;
                fs::remove_file(src).map_err(|e| OpError::from_io(src, e))?;
                log::debug!("Moved {} -> {} by copy", src.display(), dst.display());
                Ok(())
            }
        }
    }

    fn delete(&self, path: &Path) -> Result<(), OpError> {
        Self::ensure_source(path)?;

        if self.use_trash {
            trash::delete(path).map_err(|e| {
                log::error!("Trash operation failed for {}: {}", path.display(), e);
                OpError::TrashFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            log::debug!("Moved to trash: {}", path.display());
        } else {
            fs::remove_file(path).map_err(|e| OpError::from_io(path, e))?;
            log::debug!("Permanently deleted: {}", path.display());
        }
        Ok(())
    }
}
