//! The size → partial fingerprint → full fingerprint funnel.
//!
//! # Overview
//!
//! 1. **Size**: files are taken from an index's size buckets; buckets with
//!    fewer than two files are dropped without any I/O.
//! 2. **Partial**: the first 1024 bytes of each remaining file are
//!    fingerprinted and files are regrouped within their size bucket.
//! 3. **Full**: files still sharing a partial fingerprint are fingerprinted
//!    completely; every full group of two or more is a [`DuplicateGroup`].
//!
//! Fingerprints are computed through the [`Workspace`], so they are cached
//! on the files and indexed for later runs. Unreadable files are logged,
//! counted in [`FunnelStats`] and left out; detection continues.
//!
//! # Example
//!
//! ```no_run
//! use cataloguer::catalogue::Workspace;
//! use cataloguer::duplicates::{DuplicateFinder, FinderConfig};
//! use cataloguer::scanner::WalkerConfig;
//! use std::path::Path;
//!
//! let mut ws = Workspace::new();
//! let index = ws.scan(Path::new("/photos"), &WalkerConfig::default(), None)?;
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let (groups, stats) = finder.find_in(&mut ws, index);
//! println!("{} groups, {} bytes reclaimable", groups.len(), stats.reclaimable_space);
//! # Ok::<(), cataloguer::scanner::ScanError>(())
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::catalogue::{FileId, IndexId, Workspace};
use crate::media::{Classifier, SystemMedia};
use crate::progress::ProgressCallback;
use crate::scanner::HashError;

use super::DuplicateGroup;

/// Configuration for a [`DuplicateFinder`].
#[derive(Clone)]
pub struct FinderConfig {
    /// Only consider size buckets whose first file is an image or a video.
    pub media_only: bool,
    /// Content classifier used by the media filter.
    pub classifier: Arc<dyn Classifier>,
    /// Optional shutdown flag checked between files.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            media_only: false,
            classifier: Arc::new(SystemMedia),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("media_only", &self.media_only)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress_callback", &self.progress_callback.is_some())
            .finish_non_exhaustive()
    }
}

impl FinderConfig {
    #[must_use]
    pub fn with_media_only(mut self, media_only: bool) -> Self {
        self.media_only = media_only;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Counters from one run of the funnel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunnelStats {
    /// Files in the buckets handed to the funnel
    pub input_files: usize,
    /// Files sharing their size with another file
    pub size_candidates: usize,
    /// Partial fingerprints obtained
    pub partial_hashed: usize,
    /// Full fingerprints obtained
    pub full_hashed: usize,
    /// Files that could not be read and were left out
    pub failed_files: Vec<PathBuf>,
    /// Confirmed groups
    pub duplicate_groups: usize,
    /// Redundant copies across all groups
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
    /// Whether the shutdown flag stopped the run early
    pub interrupted: bool,
}

/// Runs the funnel over indexes of a [`Workspace`].
#[derive(Debug, Clone, Default)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Duplicates among the files of one index.
    pub fn find_in(
        &self,
        ws: &mut Workspace,
        index: IndexId,
    ) -> (Vec<DuplicateGroup>, FunnelStats) {
        let buckets = self.size_buckets(ws, index);
        let input_files = ws.index(index).len();
        self.run(ws, buckets, input_files)
    }

    /// Duplicates between an index and a list of files.
    ///
    /// Only size buckets present on both sides are examined, and only groups
    /// pairing an `index` file with a different file from `files` are
    /// reported. The media filter applies to the index's buckets.
    pub fn find_against(
        &self,
        ws: &mut Workspace,
        index: IndexId,
        files: &[FileId],
    ) -> (Vec<DuplicateGroup>, FunnelStats) {
        let own = self.size_buckets(ws, index);

        let mut given: BTreeMap<u64, Vec<FileId>> = BTreeMap::new();
        for &id in files {
            let file = ws.file(id);
            let Some(path) = file.path() else {
                continue;
            };
            // A second handle on a file the index already owns is the same
            // file, never a copy of it.
            if ws.index(index).get(path).is_some_and(|owner| owner != id) {
                log::debug!("{} is already part of the index, ignoring it", path.display());
                continue;
            }
            given.entry(file.size()).or_default().push(id);
        }

        let buckets: Vec<(u64, Vec<FileId>)> = own
            .into_iter()
            .filter_map(|(size, mut ids)| {
                let theirs = given.get(&size)?;
                for id in theirs {
                    if !ids.contains(id) {
                        ids.push(*id);
                    }
                }
                Some((size, ids))
            })
            .collect();

        let input_files = ws.index(index).len() + files.len();
        let (groups, mut stats) = self.run(ws, buckets, input_files);

        let members = ws.index(index);
        let given: HashSet<FileId> = files.iter().copied().collect();
        let groups: Vec<DuplicateGroup> = groups
            .into_iter()
            .filter(|group| spans_both_sides(group, |id| members.contains(id), &given))
            .collect();
        stats.set_group_totals(&groups);
        (groups, stats)
    }

    /// Duplicates between two indexes.
    pub fn find_between(
        &self,
        ws: &mut Workspace,
        index: IndexId,
        other: IndexId,
    ) -> (Vec<DuplicateGroup>, FunnelStats) {
        let files = ws.index(other).files().to_vec();
        self.find_against(ws, index, &files)
    }

    /// Size buckets of `index`, media-filtered if configured.
    fn size_buckets(&self, ws: &mut Workspace, index: IndexId) -> Vec<(u64, Vec<FileId>)> {
        let buckets: Vec<(u64, Vec<FileId>)> = ws
            .index(index)
            .files_by_size()
            .iter()
            .map(|(size, ids)| (*size, ids.clone()))
            .collect();

        if !self.config.media_only {
            return buckets;
        }

        let classifier = Arc::clone(&self.config.classifier);
        buckets
            .into_iter()
            .filter(|(_, ids)| {
                ids.first()
                    .is_some_and(|&first| ws.media_type(first, classifier.as_ref()).is_media())
            })
            .collect()
    }

    fn run(
        &self,
        ws: &mut Workspace,
        buckets: Vec<(u64, Vec<FileId>)>,
        input_files: usize,
    ) -> (Vec<DuplicateGroup>, FunnelStats) {
        let mut stats = FunnelStats {
            input_files,
            ..FunnelStats::default()
        };
        let progress = self.config.progress_callback.as_deref();

        // Phase 1: size
        let candidates: Vec<(u64, Vec<FileId>)> = buckets
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .collect();
        stats.size_candidates = candidates.iter().map(|(_, ids)| ids.len()).sum();
        log::debug!(
            "Size phase: {} files → {} candidates",
            input_files,
            stats.size_candidates
        );

        // Phase 2: partial fingerprints, regrouped within each size bucket
        if let Some(p) = progress {
            p.on_phase_start("partial", stats.size_candidates);
        }
        let mut done = 0usize;
        let mut partial_groups: Vec<(u64, Vec<FileId>)> = Vec::new();
        'partial: for (size, ids) in candidates {
            let mut grouped = Grouping::default();
            for id in ids {
                if self.config.is_shutdown_requested() {
                    stats.interrupted = true;
                    break 'partial;
                }
                done += 1;
                self.report(ws, id, done);
                match ws.ensure_partial(id) {
                    Ok(fp) => {
                        stats.partial_hashed += 1;
                        grouped.push(fp, id);
                    }
                    Err(e) => record_failure(ws, id, &e, &mut stats),
                }
            }
            partial_groups.extend(
                grouped
                    .into_groups()
                    .filter(|ids| ids.len() > 1)
                    .map(|ids| (size, ids)),
            );
        }
        if let Some(p) = progress {
            p.on_phase_end("partial");
        }

        // Phase 3: full fingerprints
        let total: usize = partial_groups.iter().map(|(_, ids)| ids.len()).sum();
        log::debug!("Partial phase: {} candidates remain", total);
        if let Some(p) = progress {
            p.on_phase_start("full", total);
        }
        let mut done = 0usize;
        let mut groups = Vec::new();
        'full: for (size, ids) in partial_groups {
            if stats.interrupted {
                break;
            }
            let mut grouped = Grouping::default();
            for id in ids {
                if self.config.is_shutdown_requested() {
                    stats.interrupted = true;
                    break 'full;
                }
                done += 1;
                self.report(ws, id, done);
                match ws.ensure_full(id) {
                    Ok(fp) => {
                        stats.full_hashed += 1;
                        grouped.push(fp, id);
                    }
                    Err(e) => record_failure(ws, id, &e, &mut stats),
                }
                if let Some(p) = progress {
                    p.on_item_completed(size);
                }
            }
            groups.extend(
                grouped
                    .entries
                    .into_iter()
                    .filter(|(_, ids)| ids.len() > 1)
                    .map(|(fp, ids)| DuplicateGroup::new(fp, size, ids)),
            );
        }
        if let Some(p) = progress {
            p.on_phase_end("full");
        }

        if stats.interrupted {
            log::info!("Duplicate detection interrupted by shutdown signal");
        }

        stats.set_group_totals(&groups);
        log::info!(
            "Found {} duplicate groups ({} redundant files, {} bytes reclaimable)",
            stats.duplicate_groups,
            stats.duplicate_files,
            stats.reclaimable_space
        );
        (groups, stats)
    }

    fn report(&self, ws: &Workspace, id: FileId, current: usize) {
        if let Some(p) = &self.config.progress_callback {
            let path = ws
                .file(id)
                .path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            p.on_progress(current, &path);
        }
    }
}

impl FunnelStats {
    fn set_group_totals(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    }
}

fn record_failure(ws: &Workspace, id: FileId, error: &HashError, stats: &mut FunnelStats) {
    let path = ws.file(id).path().map(PathBuf::from).unwrap_or_default();
    log::warn!("Failed to fingerprint {}: {}", path.display(), error);
    stats.failed_files.push(path);
}

/// Whether some file of `b_side` shares the group with a different file of
/// the `a_side`.
fn spans_both_sides(
    group: &DuplicateGroup,
    a_side: impl Fn(FileId) -> bool,
    b_side: &HashSet<FileId>,
) -> bool {
    group.files.iter().any(|&b| {
        b_side.contains(&b) && group.files.iter().any(|&a| a != b && a_side(a))
    })
}

/// Insertion-ordered grouping by key.
struct Grouping<K> {
    positions: HashMap<K, usize>,
    entries: Vec<(K, Vec<FileId>)>,
}

impl<K> Default for Grouping<K> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> Grouping<K> {
    fn push(&mut self, key: K, id: FileId) {
        match self.positions.get(&key) {
            Some(&i) => self.entries[i].1.push(id),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![id]));
            }
        }
    }

    fn into_groups(self) -> impl Iterator<Item = Vec<FileId>> {
        self.entries.into_iter().map(|(_, ids)| ids)
    }
}
