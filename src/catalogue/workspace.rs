//! Arena owning every [`File`] and [`Index`] of one run.
//!
//! # Overview
//!
//! Files and indexes refer to each other: an index lists the files it owns,
//! and a file remembers which indexes are subscribed to it. Both live in a
//! [`Workspace`] and are addressed through [`FileId`] / [`IndexId`] handles.
//!
//! Every identity-affecting mutation goes through the workspace, which
//! first delivers a [`FileEvent`] to each subscribed index and only then
//! applies the change. An index that answers "no longer mine" is
//! unsubscribed.
//!
//! # Example
//!
//! ```no_run
//! use cataloguer::catalogue::Workspace;
//! use cataloguer::scanner::WalkerConfig;
//! use std::path::Path;
//!
//! let mut ws = Workspace::new();
//! let index = ws.scan(Path::new("/photos"), &WalkerConfig::default(), None)?;
//! for id in ws.index(index).files().to_vec() {
//!     let fp = ws.ensure_partial(id);
//!     println!("{:?}: {:?}", ws.file(id).path(), fp);
//! }
//! # Ok::<(), cataloguer::scanner::ScanError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::actions::{FileOps, OpError};
use crate::media::{Classifier, MediaType};
use crate::progress::ProgressCallback;
use crate::scanner::{Fingerprint, HashError, Hasher, ScanError, Walker, WalkerConfig};

use super::file::{File, FileEvent, FileId};
use super::index::{Index, IndexId};

/// Owner of all files and indexes.
#[derive(Debug, Default)]
pub struct Workspace {
    files: Vec<File>,
    indexes: Vec<Index>,
    hasher: Hasher,
}

impl Workspace {
    /// Empty workspace with the default hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty workspace fingerprinting with `hasher`.
    #[must_use]
    pub fn with_hasher(hasher: Hasher) -> Self {
        Self {
            files: Vec::new(),
            indexes: Vec::new(),
            hasher,
        }
    }

    #[must_use]
    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.0]
    }

    /// Every file ever created in this workspace, tombstones included.
    #[must_use]
    pub fn files(&self) -> &[File] {
        &self.files
    }

    #[must_use]
    pub fn index(&self, id: IndexId) -> &Index {
        &self.indexes[id.0]
    }

    pub fn index_mut(&mut self, id: IndexId) -> &mut Index {
        &mut self.indexes[id.0]
    }

    /// Create an empty index rooted at `root`.
    pub fn create_index(&mut self, root: PathBuf) -> IndexId {
        let id = IndexId(self.indexes.len());
        log::debug!("Created index {:?} at {}", id, root.display());
        self.indexes.push(Index::new(root));
        id
    }

    /// Create an unowned file.
    pub fn insert_file(&mut self, path: PathBuf, size: u64) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(File::new(path, size));
        id
    }

    /// Put `file` under `index`. Adding a file that is already owned, has
    /// been deleted, or lies outside the index root is a no-op returning
    /// `false`.
    pub fn add(&mut self, index: IndexId, file: FileId) -> bool {
        let target = &mut self.indexes[index.0];
        let entry = &mut self.files[file.0];

        match entry.path() {
            Some(path) if target.covers(path) => {}
            Some(path) => {
                log::debug!(
                    "Not adding {} to index at {}: outside its root",
                    path.display(),
                    target.root().display()
                );
                return false;
            }
            None => return false,
        }

        if !target.insert(file, entry) {
            return false;
        }
        entry.observers.insert(index);
        true
    }

    /// Walk `root` into a fresh index.
    ///
    /// The root is canonicalized so every stored path is absolute.
    /// Unreadable entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`] when
    /// `root` cannot be walked at all.
    pub fn scan(
        &mut self,
        root: &Path,
        config: &WalkerConfig,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<IndexId, ScanError> {
        let metadata = root.metadata().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(root.to_path_buf()),
            _ => ScanError::Io {
                path: root.to_path_buf(),
                source: e,
            },
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|e| ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;

        log::info!("Scanning {}", root.display());
        if let Some(p) = progress {
            p.on_phase_start("scan", 0);
        }

        let index = self.create_index(root.clone());
        let walker = Walker::new(&root, config.clone());
        let mut skipped = 0usize;
        let mut found = 0usize;

        for entry in walker.walk() {
            match entry {
                Ok(entry) => {
                    found += 1;
                    if let Some(p) = progress {
                        p.on_progress(found, &entry.path.to_string_lossy());
                        p.on_item_completed(entry.size);
                    }
                    let id = self.insert_file(entry.path, entry.size);
                    self.add(index, id);
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    skipped += 1;
                }
            }
        }

        if let Some(p) = progress {
            p.on_phase_end("scan");
        }
        log::info!(
            "Found {} files under {} ({} skipped)",
            found,
            root.display(),
            skipped
        );
        Ok(index)
    }

    /// Deliver `event` to every subscribed index, dropping subscriptions
    /// the index declines.
    fn notify(&mut self, id: FileId, event: &FileEvent) {
        let observers: Vec<IndexId> = self.files[id.0].observers().collect();
        let mut dropped = Vec::new();

        for index in observers {
            let file = &self.files[id.0];
            if !self.indexes[index.0].on_file_event(id, file, event) {
                dropped.push(index);
            }
        }

        let file = &mut self.files[id.0];
        for index in dropped {
            file.observers.remove(&index);
        }
    }

    /// Change (or clear, for a deletion) the path of a file.
    pub fn set_path(&mut self, id: FileId, path: Option<PathBuf>) {
        self.notify(id, &FileEvent::PathChanged(path.clone()));
        self.files[id.0].path = path;
    }

    /// Record a known partial fingerprint without reading the file.
    pub fn set_partial(&mut self, id: FileId, fingerprint: Fingerprint) {
        self.notify(id, &FileEvent::PartialFingerprint(fingerprint.clone()));
        self.files[id.0].partial = Some(fingerprint);
    }

    /// Record a known full fingerprint without reading the file.
    pub fn set_full(&mut self, id: FileId, fingerprint: Fingerprint) {
        self.notify(id, &FileEvent::FullFingerprint(fingerprint.clone()));
        self.files[id.0].full = Some(fingerprint);
    }

    /// Partial fingerprint, computed on first use.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file is deleted or unreadable.
    pub fn ensure_partial(&mut self, id: FileId) -> Result<Fingerprint, HashError> {
        let file = &self.files[id.0];
        if let Some(fp) = file.partial_fingerprint() {
            return Ok(fp.clone());
        }
        let path = file.path().ok_or(HashError::Deleted)?;
        let fp = self.hasher.partial_fingerprint(path)?;
        self.set_partial(id, fp.clone());
        Ok(fp)
    }

    /// Full fingerprint, computed on first use.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file is deleted or unreadable.
    pub fn ensure_full(&mut self, id: FileId) -> Result<Fingerprint, HashError> {
        let file = &self.files[id.0];
        if let Some(fp) = file.full_fingerprint() {
            return Ok(fp.clone());
        }
        let path = file.path().ok_or(HashError::Deleted)?;
        let fp = self.hasher.full_fingerprint(path)?;
        self.set_full(id, fp.clone());
        Ok(fp)
    }

    /// Media classification, cached on the file after the first call.
    pub fn media_type(&mut self, id: FileId, classifier: &dyn Classifier) -> MediaType {
        let file = &mut self.files[id.0];
        if let Some(media) = &file.media {
            return media.clone();
        }
        let media = match file.path() {
            Some(path) => classifier.classify(path),
            None => MediaType::unknown(),
        };
        file.media = Some(media.clone());
        media
    }

    /// Copy a file's content to `dst` and return the new file.
    ///
    /// The copy shares size, fingerprints and media type with the original
    /// and belongs to no index yet.
    ///
    /// # Errors
    ///
    /// Returns [`OpError`] if the copy fails; nothing is recorded then.
    pub fn clone_file(
        &mut self,
        ops: &dyn FileOps,
        id: FileId,
        dst: PathBuf,
    ) -> Result<FileId, OpError> {
        let source = &self.files[id.0];
        let src = source.path().ok_or(OpError::Deleted)?;
        ops.copy(src, &dst)?;

        let mut copy = File::new(dst, source.size);
        copy.partial = source.partial.clone();
        copy.full = source.full.clone();
        copy.media = source.media.clone();

        let new_id = FileId(self.files.len());
        self.files.push(copy);
        Ok(new_id)
    }

    /// Move a file's content to `dst`, keeping its identity.
    ///
    /// # Errors
    ///
    /// Returns [`OpError`] if the move fails; the path is unchanged then.
    pub fn relocate(&mut self, ops: &dyn FileOps, id: FileId, dst: PathBuf) -> Result<(), OpError> {
        let src = self.files[id.0].path().ok_or(OpError::Deleted)?;
        ops.move_file(src, &dst)?;
        self.set_path(id, Some(dst));
        Ok(())
    }

    /// Remove a file's content and turn it into a tombstone.
    ///
    /// # Errors
    ///
    /// Returns [`OpError`] if the removal fails; the file is unchanged then.
    pub fn delete(&mut self, ops: &dyn FileOps, id: FileId) -> Result<(), OpError> {
        let path = self.files[id.0].path().ok_or(OpError::Deleted)?;
        ops.delete(path)?;
        self.set_path(id, None);
        Ok(())
    }

    /// Consistency violations of one index; empty when consistent.
    #[must_use]
    pub fn verify_index(&self, id: IndexId) -> Vec<String> {
        self.indexes[id.0].verify(&self.files)
    }
}
