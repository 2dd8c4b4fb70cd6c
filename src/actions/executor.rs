//! Batch execution of copy, move and delete operations.
//!
//! # Overview
//!
//! Each file of a batch walks through a small state machine:
//!
//! ```text
//! PENDING ─┬─> SKIPPED                       (no destination could be resolved)
//!          └─> RESOLVED ─┬─> DIRECT ──────┬─> APPLIED
//!                        └─> COLLISION_RENAMED ┴─> FAILED
//! ```
//!
//! Deletions go straight from `PENDING` to `APPLIED` or `FAILED`.
//!
//! A failure only affects its own file; the batch carries on. The shutdown
//! flag is checked between files, and a batch that stops early is marked as
//! interrupted.
//!
//! In a dry run every decision is made exactly as in a real run, but instead
//! of touching the filesystem the destination path is reserved in the
//! destination index, so later files of the same batch see it as taken.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::catalogue::{FileId, IndexId, Workspace};
use crate::media::Classifier;
use crate::naming::PathResolver;
use crate::progress::ProgressCallback;

use super::FileOps;

/// What a batch does to its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Copy,
    Move,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Delete => "delete",
        })
    }
}

/// Processing state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Pending,
    Resolved,
    Skipped,
    CollisionRenamed,
    Direct,
    Applied,
    Failed,
}

impl FileState {
    /// Whether `next` is a legal successor of this state.
    #[must_use]
    pub fn can_advance_to(self, next: FileState) -> bool {
        use FileState::*;
        matches!(
            (self, next),
            (Pending, Resolved | Skipped | Applied | Failed)
                | (Resolved, CollisionRenamed | Direct | Failed)
                | (CollisionRenamed | Direct, Applied | Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Applied | Self::Failed)
    }
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Where the file was before the batch
    pub source: PathBuf,
    /// Final destination for copies and moves
    pub destination: Option<PathBuf>,
    /// Final state: skipped, applied or failed
    pub state: FileState,
    /// Whether the destination was renamed to avoid a collision
    pub renamed: bool,
    /// Failure or skip reason
    pub error: Option<String>,
}

impl FileReport {
    fn new(source: PathBuf) -> Self {
        Self {
            source,
            destination: None,
            state: FileState::Pending,
            renamed: false,
            error: None,
        }
    }

    fn advance(&mut self, next: FileState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    fn fail(mut self, error: impl fmt::Display) -> Self {
        log::warn!("Failed to process {}: {}", self.source.display(), error);
        self.error = Some(error.to_string());
        self.advance(FileState::Failed);
        self
    }
}

/// Result of running a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub operation: Operation,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    /// The shutdown flag stopped the batch before every file was handled
    pub interrupted: bool,
}

impl BatchReport {
    fn new(operation: Operation, dry_run: bool) -> Self {
        Self {
            operation,
            dry_run,
            files: Vec::new(),
            interrupted: false,
        }
    }

    fn count(&self, state: FileState) -> usize {
        self.files.iter().filter(|f| f.state == state).count()
    }

    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(FileState::Applied)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(FileState::Skipped)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(FileState::Failed)
    }

    #[must_use]
    pub fn renamed(&self) -> usize {
        self.files.iter().filter(|f| f.renamed).count()
    }
}

/// Applies batches through a [`FileOps`] implementation.
pub struct Executor<'a> {
    ops: &'a dyn FileOps,
    classifier: &'a dyn Classifier,
    dry_run: bool,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(ops: &'a dyn FileOps, classifier: &'a dyn Classifier) -> Self {
        Self {
            ops,
            classifier,
            dry_run: false,
            shutdown_flag: None,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Copy or move `files` into the `destination` index.
    ///
    /// Destinations are resolved relative to the destination root, with
    /// `relative_path` computed against `source_root`.
    ///
    /// # Panics
    ///
    /// Debug builds panic if called with [`Operation::Delete`].
    pub fn transfer(
        &self,
        ws: &mut Workspace,
        operation: Operation,
        files: &[FileId],
        source_root: &Path,
        destination: IndexId,
        resolver: &PathResolver<'_>,
    ) -> BatchReport {
        debug_assert_ne!(operation, Operation::Delete);
        let mut report = BatchReport::new(operation, self.dry_run);
        let destination_root = ws.index(destination).root().to_path_buf();

        self.start(files.len());
        for (i, &id) in files.iter().enumerate() {
            if self.is_shutdown_requested() {
                report.interrupted = true;
                break;
            }
            let entry = self.transfer_one(
                ws,
                operation,
                id,
                source_root,
                destination,
                &destination_root,
                resolver,
            );
            self.step(i + 1, &entry.source);
            report.files.push(entry);
        }
        self.finish();

        log_summary(&report);
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer_one(
        &self,
        ws: &mut Workspace,
        operation: Operation,
        id: FileId,
        source_root: &Path,
        destination: IndexId,
        destination_root: &Path,
        resolver: &PathResolver<'_>,
    ) -> FileReport {
        let Some(source) = ws.file(id).path().map(Path::to_path_buf) else {
            return FileReport::new(PathBuf::new()).fail("file has been deleted");
        };
        let mut entry = FileReport::new(source.clone());

        let media = ws.media_type(id, self.classifier);
        let relative = match resolver.resolve(&source, &media, source_root) {
            Ok(Some(relative)) => relative,
            Ok(None) => {
                log::debug!("No destination for {}", source.display());
                entry.error = Some("no capture date and no fallback template".to_string());
                entry.advance(FileState::Skipped);
                return entry;
            }
            Err(e) => return entry.fail(e),
        };
        entry.advance(FileState::Resolved);

        let desired = destination_root.join(relative);
        let index = ws.index(destination);
        if index.get(&desired) == Some(id) {
            log::debug!("{} is already in place", source.display());
            entry.advance(FileState::Direct);
            entry.destination = Some(desired);
            entry.advance(FileState::Applied);
            return entry;
        }
        let target = if index.is_path_available(&desired) {
            entry.advance(FileState::Direct);
            desired
        } else {
            let renamed = index.find_new_path(&desired);
            log::debug!(
                "Path {} not available, using {}",
                desired.display(),
                renamed.display()
            );
            entry.advance(FileState::CollisionRenamed);
            entry.renamed = true;
            renamed
        };
        entry.destination = Some(target.clone());
        log::debug!("{} -> {}", source.display(), target.display());

        if self.dry_run {
            ws.index_mut(destination).reserve(target);
            entry.advance(FileState::Applied);
            return entry;
        }

        let applied = match operation {
            Operation::Copy => ws
                .clone_file(self.ops, id, target)
                .map(|copy| ws.add(destination, copy)),
            Operation::Move => ws
                .relocate(self.ops, id, target)
                .map(|()| ws.add(destination, id)),
            Operation::Delete => return entry.fail("delete is not a transfer"),
        };
        match applied {
            Ok(_) => {
                entry.advance(FileState::Applied);
                entry
            }
            Err(e) => entry.fail(e),
        }
    }

    /// Delete `files`, turning each into a tombstone.
    pub fn delete(&self, ws: &mut Workspace, files: &[FileId]) -> BatchReport {
        let mut report = BatchReport::new(Operation::Delete, self.dry_run);

        self.start(files.len());
        for (i, &id) in files.iter().enumerate() {
            if self.is_shutdown_requested() {
                report.interrupted = true;
                break;
            }
            let entry = self.delete_one(ws, id);
            self.step(i + 1, &entry.source);
            report.files.push(entry);
        }
        self.finish();

        log_summary(&report);
        report
    }

    fn delete_one(&self, ws: &mut Workspace, id: FileId) -> FileReport {
        let Some(source) = ws.file(id).path().map(Path::to_path_buf) else {
            return FileReport::new(PathBuf::new()).fail("file has been deleted");
        };
        let mut entry = FileReport::new(source);
        log::debug!("Deleting {}", entry.source.display());

        if self.dry_run {
            entry.advance(FileState::Applied);
            return entry;
        }
        match ws.delete(self.ops, id) {
            Ok(()) => {
                entry.advance(FileState::Applied);
                entry
            }
            Err(e) => entry.fail(e),
        }
    }

    fn start(&self, total: usize) {
        if let Some(p) = &self.progress {
            p.on_phase_start("apply", total);
        }
    }

    fn step(&self, current: usize, path: &Path) {
        if let Some(p) = &self.progress {
            p.on_progress(current, &path.to_string_lossy());
        }
    }

    fn finish(&self) {
        if let Some(p) = &self.progress {
            p.on_phase_end("apply");
        }
    }
}

fn log_summary(report: &BatchReport) {
    log::info!(
        "{} batch{}: {} applied, {} skipped, {} failed{}",
        report.operation,
        if report.dry_run { " (dry run)" } else { "" },
        report.applied(),
        report.skipped(),
        report.failed(),
        if report.interrupted { ", interrupted" } else { "" }
    );
}
