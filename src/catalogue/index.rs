//! Reactive multi-key index over files below one root directory.
//!
//! # Overview
//!
//! An [`Index`] keeps four lookup views consistent with the files it owns:
//!
//! | view        | key                 | value            |
//! |-------------|---------------------|------------------|
//! | `by_path`   | absolute path       | one file         |
//! | `by_size`   | size in bytes       | files, in order  |
//! | `by_partial`| partial fingerprint | files            |
//! | `by_full`   | full fingerprint    | files            |
//!
//! The index never mutates files. The owning
//! [`Workspace`](super::Workspace) delivers a [`FileEvent`] to every
//! subscribed index *before* applying a mutation, so handlers still see the
//! old state next to the new value. Handlers are idempotent: delivering the
//! same event twice leaves the views unchanged.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::scanner::Fingerprint;

use super::file::{split_extension, File, FileEvent, FileId};

/// Handle to an [`Index`] owned by a [`Workspace`](super::Workspace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub(crate) usize);

/// Lookup views over the files below `root`.
#[derive(Debug, Clone)]
pub struct Index {
    root: PathBuf,
    files: Vec<FileId>,
    members: HashSet<FileId>,
    by_path: HashMap<PathBuf, FileId>,
    by_size: BTreeMap<u64, Vec<FileId>>,
    by_partial: HashMap<Fingerprint, Vec<FileId>>,
    by_full: HashMap<Fingerprint, Vec<FileId>>,
    reserved: HashSet<PathBuf>,
}

impl Index {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            files: Vec::new(),
            members: HashSet::new(),
            by_path: HashMap::new(),
            by_size: BTreeMap::new(),
            by_partial: HashMap::new(),
            by_full: HashMap::new(),
            reserved: HashSet::new(),
        }
    }

    /// Directory every owned file lives under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Owned files in insertion order.
    #[must_use]
    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: FileId) -> bool {
        self.members.contains(&id)
    }

    /// File owning exactly this path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    /// Whether `path` lies inside this index's root.
    #[must_use]
    pub fn covers(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Size buckets, smallest size first.
    #[must_use]
    pub fn files_by_size(&self) -> &BTreeMap<u64, Vec<FileId>> {
        &self.by_size
    }

    /// Files registered under a partial fingerprint.
    #[must_use]
    pub fn files_with_partial(&self, fingerprint: &Fingerprint) -> &[FileId] {
        self.by_partial
            .get(fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Files registered under a full fingerprint.
    #[must_use]
    pub fn files_with_full(&self, fingerprint: &Fingerprint) -> &[FileId] {
        self.by_full
            .get(fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of the sizes of all owned files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.by_size
            .iter()
            .map(|(size, ids)| size * ids.len() as u64)
            .sum()
    }

    /// Register a file. Returns `false` if it was already owned, has no
    /// path, or its path belongs to another file.
    pub(crate) fn insert(&mut self, id: FileId, file: &File) -> bool {
        let Some(path) = file.path() else {
            return false;
        };
        if self.members.contains(&id) {
            return false;
        }
        if let Some(owner) = self.by_path.get(path) {
            log::warn!(
                "Not adding {:?}: {} is already owned by {:?}",
                id,
                path.display(),
                owner
            );
            return false;
        }

        self.members.insert(id);
        self.by_path.insert(path.to_path_buf(), id);
        self.reserved.remove(path);
        self.files.push(id);
        self.by_size.entry(file.size).or_default().push(id);
        if let Some(fp) = &file.partial {
            push_unique(self.by_partial.entry(fp.clone()).or_default(), id);
        }
        if let Some(fp) = &file.full {
            push_unique(self.by_full.entry(fp.clone()).or_default(), id);
        }
        true
    }

    /// React to a change that is about to be applied to `file`.
    ///
    /// Returns `false` when the file has left this index and the
    /// subscription should be dropped.
    pub(crate) fn on_file_event(&mut self, id: FileId, file: &File, event: &FileEvent) -> bool {
        if !self.members.contains(&id) {
            return false;
        }

        match event {
            FileEvent::PathChanged(new_path) => {
                if let Some(old) = file.path() {
                    if self.by_path.get(old) == Some(&id) {
                        self.by_path.remove(old);
                    }
                }
                let taken = new_path
                    .as_ref()
                    .and_then(|p| self.by_path.get(p))
                    .is_some_and(|owner| *owner != id);
                if taken {
                    log::warn!(
                        "File {:?} moved onto a path owned by another file; dropping it from {}",
                        id,
                        self.root.display()
                    );
                    self.remove_entry(id, file);
                    return false;
                }
                match new_path {
                    Some(new_path) if self.covers(new_path) => {
                        self.reserved.remove(new_path);
                        self.by_path.insert(new_path.clone(), id);
                        true
                    }
                    _ => {
                        log::trace!("File {:?} left index {}", id, self.root.display());
                        self.remove_entry(id, file);
                        false
                    }
                }
            }
            FileEvent::PartialFingerprint(fp) => {
                rebucket(&mut self.by_partial, id, file.partial.as_ref(), fp);
                true
            }
            FileEvent::FullFingerprint(fp) => {
                rebucket(&mut self.by_full, id, file.full.as_ref(), fp);
                true
            }
        }
    }

    /// Remove a file from every view. Missing entries are ignored.
    fn remove_entry(&mut self, id: FileId, file: &File) {
        self.members.remove(&id);
        self.files.retain(|f| *f != id);
        if let Some(path) = file.path() {
            if self.by_path.get(path) == Some(&id) {
                self.by_path.remove(path);
            }
        }
        self.by_size.remove_id(&file.size, id);
        if let Some(fp) = &file.partial {
            self.by_partial.remove_id(fp, id);
        }
        if let Some(fp) = &file.full {
            self.by_full.remove_id(fp, id);
        }
    }

    /// True iff no file owns `path` and it has not been reserved.
    #[must_use]
    pub fn is_path_available(&self, path: &Path) -> bool {
        !self.by_path.contains_key(path) && !self.reserved.contains(path)
    }

    /// Mark `path` as taken without a file owning it (dry runs).
    pub fn reserve(&mut self, path: PathBuf) {
        self.reserved.insert(path);
    }

    /// Paths reserved so far.
    pub fn reserved_paths(&self) -> impl Iterator<Item = &Path> {
        self.reserved.iter().map(PathBuf::as_path)
    }

    /// First free alternative to `path`: `{stem}_1.{ext}`, `{stem}_2.{ext}`, …
    ///
    /// Callers check [`is_path_available`](Self::is_path_available) first;
    /// this always returns a numbered name. Nothing is reserved, so calling
    /// it again before the suggestion is registered returns the same path.
    #[must_use]
    pub fn find_new_path(&self, path: &Path) -> PathBuf {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = split_extension(&file_name);

        (1u64..)
            .map(|i| {
                let name = if ext.is_empty() {
                    format!("{stem}_{i}")
                } else {
                    format!("{stem}_{i}.{ext}")
                };
                parent.join(name)
            })
            .find(|candidate| self.is_path_available(candidate))
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Check the consistency invariant against the current file states.
    ///
    /// Returns a description of every violation; empty means consistent.
    #[must_use]
    pub fn verify(&self, files: &[File]) -> Vec<String> {
        let mut problems = Vec::new();

        for (key, id) in &self.by_path {
            match files.get(id.0).and_then(File::path) {
                Some(path) if path == key => {}
                other => problems.push(format!(
                    "path entry {} points to {:?} whose path is {:?}",
                    key.display(),
                    id,
                    other
                )),
            }
            if !self.members.contains(id) {
                problems.push(format!("path entry {} is not a member", key.display()));
            }
        }

        let mut size_memberships: HashMap<FileId, usize> = HashMap::new();
        for (size, ids) in &self.by_size {
            if ids.is_empty() {
                problems.push(format!("empty size bucket {size}"));
            }
            for id in ids {
                *size_memberships.entry(*id).or_default() += 1;
                if files.get(id.0).map(File::size) != Some(*size) {
                    problems.push(format!("{id:?} is in size bucket {size} with another size"));
                }
            }
        }

        for id in &self.files {
            let Some(file) = files.get(id.0) else {
                problems.push(format!("{id:?} does not exist"));
                continue;
            };
            match file.path() {
                Some(path) => {
                    if self.by_path.get(path) != Some(id) {
                        problems.push(format!("{} is not mapped to {:?}", path.display(), id));
                    }
                }
                None => problems.push(format!("deleted file {id:?} is still owned")),
            }
            let count = size_memberships.get(id).copied().unwrap_or(0);
            if count != 1 {
                problems.push(format!("{id:?} appears in {count} size buckets"));
            }
        }

        if self.files.len() != self.members.len() {
            problems.push("file list and member set disagree".to_string());
        }

        problems
    }
}

fn push_unique(bucket: &mut Vec<FileId>, id: FileId) {
    if !bucket.contains(&id) {
        bucket.push(id);
    }
}

/// Move `id` from its previous bucket (if any) into the bucket for `new`.
fn rebucket(
    map: &mut HashMap<Fingerprint, Vec<FileId>>,
    id: FileId,
    old: Option<&Fingerprint>,
    new: &Fingerprint,
) {
    if let Some(old) = old {
        if old != new {
            map.remove_id(old, id);
        }
    }
    push_unique(map.entry(new.clone()).or_default(), id);
}

/// Removal of one id from a bucket, dropping the bucket when it empties.
trait Buckets<K> {
    fn remove_id(&mut self, key: &K, id: FileId);
}

impl Buckets<u64> for BTreeMap<u64, Vec<FileId>> {
    fn remove_id(&mut self, key: &u64, id: FileId) {
        if let Some(bucket) = self.get_mut(key) {
            bucket.retain(|f| *f != id);
            if bucket.is_empty() {
                self.remove(key);
            }
        }
    }
}

impl Buckets<Fingerprint> for HashMap<Fingerprint, Vec<FileId>> {
    fn remove_id(&mut self, key: &Fingerprint, id: FileId) {
        if let Some(bucket) = self.get_mut(key) {
            bucket.retain(|f| *f != id);
            if bucket.is_empty() {
                self.remove(key);
            }
        }
    }
}
