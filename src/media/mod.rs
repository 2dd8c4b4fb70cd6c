//! Media classification and capture-date extraction.
//!
//! Both concerns sit behind small traits so the rest of the crate (the
//! duplicate finder's media filter, the path resolver) can be driven by test
//! doubles:
//!
//! - [`Classifier`]: content-based MIME detection, split into
//!   `media_type/media_format` (e.g. `image` / `jpeg`).
//! - [`DateExtractor`]: capture date from embedded EXIF data, falling back to
//!   date-like patterns in the path.
//!
//! [`SystemMedia`] is the production implementation of both.

pub mod classify;
pub mod date;

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use classify::classify_path;
pub use date::{date_from_exif, date_from_path};

/// A file's MIME type split at the first `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaType {
    /// Top-level type, e.g. `image`, `video`, `text`
    pub kind: String,
    /// Subtype, e.g. `jpeg`, `mp4`, `plain`
    pub format: String,
}

impl MediaType {
    /// Build from its two halves.
    #[must_use]
    pub fn new(kind: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            format: format.into(),
        }
    }

    /// Parse a MIME string; everything after the first `/` is the format.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.split_once('/') {
            Some((kind, format)) => Self::new(kind, format),
            None => Self::new(mime, ""),
        }
    }

    /// Used when the content cannot be identified.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new("application", "octet-stream")
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == "image"
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        self.kind == "video"
    }

    /// Images and videos are the files a catalogue manages.
    #[must_use]
    pub fn is_media(&self) -> bool {
        self.is_image() || self.is_video()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.format)
    }
}

/// Determines what kind of content a file holds.
pub trait Classifier {
    /// Classify by inspecting content (not the extension).
    fn classify(&self, path: &Path) -> MediaType;
}

/// Finds when a file was captured.
pub trait DateExtractor {
    /// Capture date, or `None` when neither metadata nor path reveal one.
    fn creation_date(&self, path: &Path, media: &MediaType) -> Option<NaiveDateTime>;
}

/// Production classifier and date extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMedia;

impl Classifier for SystemMedia {
    fn classify(&self, path: &Path) -> MediaType {
        classify_path(path)
    }
}

impl DateExtractor for SystemMedia {
    fn creation_date(&self, path: &Path, media: &MediaType) -> Option<NaiveDateTime> {
        let embedded = if media.is_media() {
            date_from_exif(path)
        } else {
            None
        };
        embedded.or_else(|| date_from_path(path))
    }
}
