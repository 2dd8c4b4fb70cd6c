//! Turning a command's source and destination into a list of files to process.
//!
//! A directory or catalogue source is first deduplicated: within each
//! duplicate group the shortest name is kept and the other copies are
//! discarded. What happens next depends on the operation:
//!
//! - copy / move: the kept media files, minus those whose content already
//!   exists in the destination
//! - delete without destination: the discarded copies
//! - delete with destination: destination files whose content also exists
//!   in the source

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalogue::{FileId, IndexId, Target, Workspace};
use crate::duplicates::{DuplicateFinder, DuplicateGroup, FunnelStats};

use super::Operation;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// One tree contains the other.
    #[error("{source_root} and {destination_root} overlap; one cannot be inside the other")]
    Overlap {
        source_root: PathBuf,
        destination_root: PathBuf,
    },
}

/// A source split into duplicates and files worth operating on.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Intra-source duplicate groups, each ordered shortest name first
    pub groups: Vec<DuplicateGroup>,
    /// Every group member but the first
    pub discarded: Vec<FileId>,
    /// Media files that were not discarded, or the single file source
    pub to_operate: Vec<FileId>,
    /// Funnel statistics; `None` for a single file source
    pub stats: Option<FunnelStats>,
}

/// Files a command will process, and why others were left out.
#[derive(Debug, Clone)]
pub struct OperationPlan {
    pub operation: Operation,
    pub extraction: Extraction,
    /// Files to hand to the executor, in order
    pub to_process: Vec<FileId>,
    /// Source files whose content is already in the destination
    pub duplicates_skipped: Vec<FileId>,
    /// Duplicate groups with differing names that touch `to_process`
    pub different_names: Vec<DuplicateGroup>,
}

impl OperationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_process.is_empty()
    }
}

/// Split `source` into duplicate groups, discarded copies and files to
/// operate on.
pub fn extract_files(ws: &mut Workspace, source: &Target, finder: &DuplicateFinder) -> Extraction {
    let Some(index) = source.index() else {
        return match source {
            Target::File(id) => Extraction {
                to_operate: vec![*id],
                ..Extraction::default()
            },
            _ => Extraction::default(),
        };
    };

    let (mut groups, stats) = finder.find_in(ws, index);
    for group in &mut groups {
        group.sort_shortest_name_first(ws);
    }

    let discarded: Vec<FileId> = groups
        .iter()
        .flat_map(|g| g.discards().iter().copied())
        .collect();
    let skip: HashSet<FileId> = discarded.iter().copied().collect();

    let classifier = finder.config().classifier.clone();
    let candidates = ws.index(index).files().to_vec();
    let to_operate = candidates
        .into_iter()
        .filter(|id| !skip.contains(id))
        .filter(|&id| ws.media_type(id, classifier.as_ref()).is_media())
        .collect();

    Extraction {
        groups,
        discarded,
        to_operate,
        stats: Some(stats),
    }
}

/// Refuse sources and destinations where one tree contains the other.
///
/// A single file source overlaps when the file lies inside the destination.
///
/// # Errors
///
/// Returns [`PlanError::Overlap`] when the trees overlap.
pub fn check_overlap(ws: &Workspace, source: &Target, destination: &Target) -> Result<(), PlanError> {
    if destination.index().is_none() {
        return Ok(());
    }
    let destination_root = destination.root(ws);
    if let Target::File(id) = source {
        return match ws.file(*id).path() {
            Some(path) if path.starts_with(&destination_root) => Err(PlanError::Overlap {
                source_root: path.to_path_buf(),
                destination_root,
            }),
            _ => Ok(()),
        };
    }
    let source_root = source.root(ws);
    if source_root.starts_with(&destination_root) || destination_root.starts_with(&source_root) {
        return Err(PlanError::Overlap {
            source_root,
            destination_root,
        });
    }
    Ok(())
}

/// Plan a copy or move of `source` into `destination`.
pub fn plan_transfer(
    ws: &mut Workspace,
    finder: &DuplicateFinder,
    operation: Operation,
    source: &Target,
    destination: IndexId,
) -> OperationPlan {
    let extraction = extract_files(ws, source, finder);

    let (cross, _) = finder.find_against(ws, destination, &extraction.to_operate);
    let present: HashSet<FileId> = cross.iter().flat_map(|g| g.files.iter().copied()).collect();

    let (duplicates_skipped, to_process): (Vec<FileId>, Vec<FileId>) = extraction
        .to_operate
        .iter()
        .copied()
        .partition(|id| present.contains(id));
    if !duplicates_skipped.is_empty() {
        log::info!(
            "{} files already exist in the destination",
            duplicates_skipped.len()
        );
    }

    let different_names = groups_with_different_names(ws, &extraction.groups, &to_process);
    OperationPlan {
        operation,
        extraction,
        to_process,
        duplicates_skipped,
        different_names,
    }
}

/// Plan a deletion.
///
/// Without a destination the discarded copies inside `source` are deleted.
/// With one, destination files whose content is also in `source` are.
pub fn plan_delete(
    ws: &mut Workspace,
    finder: &DuplicateFinder,
    source: &Target,
    destination: Option<IndexId>,
) -> OperationPlan {
    let extraction = extract_files(ws, source, finder);

    let (to_process, different_names) = match destination {
        Some(destination) => {
            let (cross, _) = finder.find_against(ws, destination, &extraction.to_operate);
            let members = ws.index(destination);
            let mut seen = HashSet::new();
            let to_process: Vec<FileId> = cross
                .iter()
                .flat_map(|g| g.files.iter().copied())
                .filter(|&id| members.contains(id) && seen.insert(id))
                .collect();
            (to_process, Vec::new())
        }
        None => {
            let classifier = finder.config().classifier.clone();
            let discarded = extraction.discarded.clone();
            let to_process: Vec<FileId> = discarded
                .into_iter()
                .filter(|&id| ws.media_type(id, classifier.as_ref()).is_media())
                .collect();
            let different_names = groups_with_different_names(ws, &extraction.groups, &to_process);
            (to_process, different_names)
        }
    };

    OperationPlan {
        operation: Operation::Delete,
        extraction,
        to_process,
        duplicates_skipped: Vec::new(),
        different_names,
    }
}

/// Groups whose members do not share one name and that contain at least
/// one file about to be processed.
fn groups_with_different_names(
    ws: &Workspace,
    groups: &[DuplicateGroup],
    to_process: &[FileId],
) -> Vec<DuplicateGroup> {
    let processed: HashSet<FileId> = to_process.iter().copied().collect();
    groups
        .iter()
        .filter(|g| g.has_different_names(ws))
        .filter(|g| g.files.iter().any(|id| processed.contains(id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::FinderConfig;
    use crate::media::{Classifier, MediaType};
    use crate::scanner::WalkerConfig;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// `.jpg` files are images, everything else is unknown.
    struct ByExtension;
    impl Classifier for ByExtension {
        fn classify(&self, path: &Path) -> MediaType {
            if path.extension().is_some_and(|e| e == "jpg") {
                MediaType::new("image", "jpeg")
            } else {
                MediaType::unknown()
            }
        }
    }

    fn finder() -> DuplicateFinder {
        DuplicateFinder::new(
        FinderConfig::default()
            .with_media_only(true)
            .with_classifier(Arc::new(ByExtension)),
    )
    }

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn names(ws: &Workspace, ids: &[FileId]) -> Vec<String> {
        let mut names: Vec<String> = ids
            .iter()
            .filter_map(|&id| ws.file(id).file_name())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_extract_keeps_shortest_name() {
        let dir = tree(&[
            ("a.jpg", "same"),
            ("a copy.jpg", "same"),
            ("b.jpg", "other"),
            ("notes.txt", "some notes"),
        ]);
        let mut ws = Workspace::new();
        let index = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();

        let extraction = extract_files(&mut ws, &Target::Directory(index), &finder());

        assert_eq!(extraction.groups.len(), 1);
        assert_eq!(names(&ws, &extraction.discarded), vec!["a copy.jpg"]);
        assert_eq!(names(&ws, &extraction.to_operate), vec!["a.jpg", "b.jpg"]);
        assert!(extraction.stats.is_some());
    }

    #[test]
    fn test_extract_single_file() {
        let dir = tree(&[("a.txt", "x")]);
        let mut ws = Workspace::new();
        let id = ws.insert_file(dir.path().join("a.txt"), 1);

        let extraction = extract_files(&mut ws, &Target::File(id), &finder());

        assert_eq!(extraction.to_operate, vec![id]);
        assert!(extraction.groups.is_empty());
        assert!(extraction.stats.is_none());
    }

    #[test]
    fn test_overlap_both_directions() {
        let dir = tree(&[("inner/a.jpg", "a")]);
        let mut ws = Workspace::new();
        let outer = ws.scan(dir.path(), &WalkerConfig::default(), None).unwrap();
        let inner = ws
            .scan(&dir.path().join("inner"), &WalkerConfig::default(), None)
            .unwrap();

        let outer = Target::Directory(outer);
        let inner = Target::Directory(inner);
        assert!(check_overlap(&ws, &outer, &inner).is_err());
        assert!(check_overlap(&ws, &inner, &outer).is_err());
        assert!(check_overlap(&ws, &outer, &outer).is_err());

        let other = tree(&[]);
        let other = Target::Directory(ws.scan(other.path(), &WalkerConfig::default(), None).unwrap());
        assert_eq!(check_overlap(&ws, &outer, &other), Ok(()));
    }

    #[test]
    fn test_overlap_file_inside_destination() {
        let dir = tree(&[("inner/a.jpg", "a")]);
        let mut ws = Workspace::new();
        let root = dir.path().canonicalize().unwrap();
        let destination = Target::Directory(ws.scan(&root, &WalkerConfig::default(), None).unwrap());

        let inside = Target::File(ws.insert_file(root.join("inner/a.jpg"), 1));
        assert!(matches!(
            check_overlap(&ws, &inside, &destination),
            Err(PlanError::Overlap { .. })
        ));

        let other = tree(&[("b.jpg", "b")]);
        let outside = Target::File(ws.insert_file(other.path().join("b.jpg"), 1));
        assert_eq!(check_overlap(&ws, &outside, &destination), Ok(()));
    }

    #[test]
    fn test_transfer_skips_content_already_present() {
        let src = tree(&[("a.jpg", "one"), ("b.jpg", "two"), ("b2.jpg", "two")]);
        let dst = tree(&[("archive/old-a.jpg", "one")]);
        let mut ws = Workspace::new();
        let source = ws.scan(src.path(), &WalkerConfig::default(), None).unwrap();
        let destination = ws.scan(dst.path(), &WalkerConfig::default(), None).unwrap();

        let plan = plan_transfer(
            &mut ws,
            &finder(),
            Operation::Copy,
            &Target::Directory(source),
            destination,
        );

        assert_eq!(names(&ws, &plan.to_process), vec!["b.jpg"]);
        assert_eq!(names(&ws, &plan.duplicates_skipped), vec!["a.jpg"]);
        assert_eq!(plan.different_names.len(), 1);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_delete_without_destination() {
        let src = tree(&[("a.jpg", "one"), ("copy/a.jpg", "one"), ("b.jpg", "two")]);
        let mut ws = Workspace::new();
        let source = ws.scan(src.path(), &WalkerConfig::default(), None).unwrap();

        let plan = plan_delete(&mut ws, &finder(), &Target::Directory(source), None);

        assert_eq!(plan.to_process.len(), 1);
        let doomed = ws.file(plan.to_process[0]).path().unwrap();
        assert!(doomed.ends_with("copy/a.jpg"));
        assert!(plan.different_names.is_empty());
    }

    #[test]
    fn test_delete_with_destination_only_touches_destination() {
        let src = tree(&[("a.jpg", "one"), ("c.jpg", "three")]);
        let dst = tree(&[("x/a.jpg", "one"), ("y/a-again.jpg", "one"), ("b.jpg", "two")]);
        let mut ws = Workspace::new();
        let source = ws.scan(src.path(), &WalkerConfig::default(), None).unwrap();
        let destination = ws.scan(dst.path(), &WalkerConfig::default(), None).unwrap();

        let plan = plan_delete(
            &mut ws,
            &finder(),
            &Target::Directory(source),
            Some(destination),
        );

        assert_eq!(names(&ws, &plan.to_process), vec!["a-again.jpg", "a.jpg"]);
        for &id in &plan.to_process {
            assert!(ws.index(destination).contains(id));
        }
    }
}
