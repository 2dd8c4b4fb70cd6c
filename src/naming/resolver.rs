//! Destination path resolution.
//!
//! [`PathResolver`] turns a source file into a path relative to the
//! destination root:
//!
//! 1. A template without date directives is rendered directly; no metadata
//!    is read.
//! 2. Otherwise the capture date is looked up through the [`DateExtractor`]
//!    and the primary template is rendered with it.
//! 3. Without a date the fallback template, if any, is rendered with the
//!    operation start time.
//! 4. Otherwise there is no destination and the file is skipped.

use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::catalogue::split_extension;
use crate::media::{DateExtractor, MediaType};

use super::template::{Template, TemplateValues};

/// Parent directory names preserved in `{file}` (camera sequence folders).
pub const PARENT_MARKERS: &[&str] = &["Time Lapse", "Burst Sequence"];

/// Why a rendered destination was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("destination {rendered:?} for {source_path} is absolute")]
    Absolute {
        source_path: PathBuf,
        rendered: String,
    },

    #[error("destination {rendered:?} for {source_path} leaves the destination directory")]
    EscapesDestination {
        source_path: PathBuf,
        rendered: String,
    },

    #[error("destination for {0} renders to an empty path")]
    Empty(PathBuf),
}

/// Computes destinations from a primary and an optional fallback template.
pub struct PathResolver<'a> {
    primary: &'a Template,
    fallback: Option<&'a Template>,
    started_at: NaiveDateTime,
    dates: &'a dyn DateExtractor,
}

impl<'a> PathResolver<'a> {
    #[must_use]
    pub fn new(
        primary: &'a Template,
        fallback: Option<&'a Template>,
        started_at: NaiveDateTime,
        dates: &'a dyn DateExtractor,
    ) -> Self {
        Self {
            primary,
            fallback,
            started_at,
            dates,
        }
    }

    /// Destination of `path` relative to the destination root, or `None`
    /// when no template can be rendered.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the rendered path is absolute, climbs
    /// out with `..`, or is empty.
    pub fn resolve(
        &self,
        path: &Path,
        media: &MediaType,
        source_root: &Path,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let values = template_values(path, media, source_root);

        let rendered = if !self.primary.requires_date() {
            self.primary.render(&values, None)
        } else if let Some(date) = self.dates.creation_date(path, media) {
            log::trace!("{} was captured {}", path.display(), date);
            self.primary.render(&values, Some(&date))
        } else if let Some(fallback) = self.fallback {
            log::debug!(
                "No capture date for {}, using fallback template",
                path.display()
            );
            fallback.render(&values, Some(&self.started_at))
        } else {
            log::debug!("No capture date for {}, skipping", path.display());
            return Ok(None);
        };

        normalize(path, &rendered).map(Some)
    }
}

/// Parent directory name kept in `{file}`, if it is a sequence marker.
#[must_use]
pub fn parent_marker(path: &Path) -> Option<String> {
    let parent = path.parent()?.file_name()?.to_string_lossy();
    PARENT_MARKERS
        .iter()
        .any(|marker| parent.starts_with(marker))
        .then(|| parent.into_owned())
}

/// Substitution values for a file below `source_root`.
#[must_use]
pub fn template_values(path: &Path, media: &MediaType, source_root: &Path) -> TemplateValues {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, extension) = split_extension(&name);

    let file = match parent_marker(path) {
        Some(marker) => Path::new(&marker).join(&name).to_string_lossy().into_owned(),
        None => name.clone(),
    };

    let relative_path = path
        .strip_prefix(source_root)
        .ok()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| ".".to_string(), |p| p.to_string_lossy().into_owned());

    TemplateValues {
        file,
        file_extension: extension.to_string(),
        file_name: stem.to_string(),
        media_type: media.kind.clone(),
        media_format: media.format.clone(),
        relative_path,
    }
}

/// Drop `.` components and reject anything that is not a plain relative
/// path.
fn normalize(source: &Path, rendered: &str) -> Result<PathBuf, ResolveError> {
    let mut out = PathBuf::new();
    for component in Path::new(rendered).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ResolveError::EscapesDestination {
                    source_path: source.to_path_buf(),
                    rendered: rendered.to_string(),
                })
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ResolveError::Absolute {
                    source_path: source.to_path_buf(),
                    rendered: rendered.to_string(),
                })
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(ResolveError::Empty(source.to_path_buf()));
    }
    Ok(out)
}
