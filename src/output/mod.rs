//! Report formatting.
//!
//! Commands first build a plain report ([`InspectReport`], [`TransferReport`])
//! with paths relative to the relevant root, then hand it to one of the
//! formatters:
//!
//! - [`text`]: coloured tables for the terminal
//! - [`json`]: machine-readable output for scripting

pub mod json;
pub mod text;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::actions::{BatchReport, FileState, OperationPlan};
use crate::catalogue::{FileId, Workspace};
use crate::duplicates::{DuplicateGroup, FunnelStats};
use crate::media::Classifier;

pub use json::{JsonOutput, JsonOutputError, JsonReport};

/// Counts for one media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRow {
    pub media_type: String,
    pub size: u64,
    pub files: usize,
    /// Duplicate groups whose first file has this type
    pub duplicates: usize,
}

impl MediaRow {
    #[must_use]
    pub fn is_media(&self) -> bool {
        matches!(self.media_type.as_str(), "image" | "video")
    }
}

/// Per-media-type table of a set of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub name: String,
    /// Rows in order of first appearance
    pub rows: Vec<MediaRow>,
}

impl Summary {
    /// Tabulate `files` and `groups` by media type.
    pub fn build(
        ws: &mut Workspace,
        name: impl Into<String>,
        files: &[FileId],
        groups: &[DuplicateGroup],
        classifier: &dyn Classifier,
    ) -> Self {
        let mut rows: Vec<MediaRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        let mut row_for = |kind: String, rows: &mut Vec<MediaRow>| -> usize {
            *positions.entry(kind.clone()).or_insert_with(|| {
                rows.push(MediaRow {
                    media_type: kind,
                    size: 0,
                    files: 0,
                    duplicates: 0,
                });
                rows.len() - 1
            })
        };

        for &id in files {
            let kind = ws.media_type(id, classifier).kind;
            let at = row_for(kind, &mut rows);
            rows[at].files += 1;
            rows[at].size += ws.file(id).size();
        }
        for group in groups {
            if let Some(first) = group.files.first() {
                let kind = ws.media_type(*first, classifier).kind;
                let at = row_for(kind, &mut rows);
                rows[at].duplicates += 1;
            }
        }

        Self {
            name: name.into(),
            rows,
        }
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.rows.iter().map(|r| r.size).sum()
    }

    #[must_use]
    pub fn total_files(&self) -> usize {
        self.rows.iter().map(|r| r.files).sum()
    }

    #[must_use]
    pub fn total_duplicates(&self) -> usize {
        self.rows.iter().map(|r| r.duplicates).sum()
    }
}

/// A duplicate group as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupListing {
    pub size: u64,
    pub fingerprint: String,
    /// Member paths relative to the listing root, kept copy first
    pub paths: Vec<PathBuf>,
}

impl GroupListing {
    #[must_use]
    pub fn new(ws: &Workspace, group: &DuplicateGroup, root: &Path) -> Self {
        Self {
            size: group.size,
            fingerprint: group.fingerprint.as_str().to_string(),
            paths: group
                .paths(ws)
                .iter()
                .map(|p| relative_to(p, root))
                .collect(),
        }
    }

    /// Listings for `groups`, largest files first.
    #[must_use]
    pub fn sorted(ws: &Workspace, groups: &[DuplicateGroup], root: &Path) -> Vec<Self> {
        let mut listings: Vec<Self> = groups.iter().map(|g| Self::new(ws, g, root)).collect();
        listings.sort_by(|a, b| b.size.cmp(&a.size));
        listings
    }
}

/// Everything `inspect` prints.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    /// Catalogue name, if the target was a catalogue
    pub catalogue: Option<String>,
    pub root: PathBuf,
    pub summary: Summary,
    pub duplicates: Vec<GroupListing>,
    pub stats: FunnelStats,
}

/// One processed file, relative to its roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub state: FileState,
    pub renamed: bool,
    pub error: Option<String>,
}

/// Everything `copy`, `move` and `delete-duplicates` print.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    #[serde(flatten)]
    pub batch: BatchSummary,
    pub files: Vec<ProcessedFile>,
    /// Source files whose content was already in the destination
    pub duplicates_skipped: Vec<PathBuf>,
    /// Duplicate groups with differing names; the shortest name was kept
    pub different_names: Vec<GroupListing>,
}

/// Headline numbers of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub operation: String,
    pub dry_run: bool,
    pub interrupted: bool,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub renamed: usize,
}

impl TransferReport {
    /// Combine a plan and the batch that executed it.
    ///
    /// Source paths are shown relative to `source_root`, destinations
    /// relative to `destination_root`.
    #[must_use]
    pub fn new(
        ws: &Workspace,
        plan: &OperationPlan,
        batch: &BatchReport,
        source_root: &Path,
        destination_root: &Path,
    ) -> Self {
        let files = batch
            .files
            .iter()
            .map(|f| ProcessedFile {
                source: relative_to(&f.source, source_root),
                destination: f.destination.as_deref().map(|d| relative_to(d, destination_root)),
                state: f.state,
                renamed: f.renamed,
                error: f.error.clone(),
            })
            .collect();

        let duplicates_skipped = plan
            .duplicates_skipped
            .iter()
            .filter_map(|&id| ws.file(id).path().map(|p| relative_to(p, source_root)))
            .collect();

        Self {
            batch: BatchSummary {
                operation: batch.operation.to_string(),
                dry_run: batch.dry_run,
                interrupted: batch.interrupted,
                applied: batch.applied(),
                skipped: batch.skipped(),
                failed: batch.failed(),
                renamed: batch.renamed(),
            },
            files,
            duplicates_skipped,
            different_names: GroupListing::sorted(ws, &plan.different_names, source_root),
        }
    }

    /// Files in `state`.
    pub fn in_state(&self, state: FileState) -> impl Iterator<Item = &ProcessedFile> {
        self.files.iter().filter(move |f| f.state == state)
    }
}

/// `path` relative to `root`, or unchanged when it lies elsewhere.
#[must_use]
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
