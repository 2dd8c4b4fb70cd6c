//! Content-based media classification via `tree_magic_mini`.

use std::path::Path;

use super::MediaType;

/// Classify a file by sniffing its content.
///
/// Unreadable or unrecognised files come back as
/// `application/octet-stream`, which is never treated as media.
#[must_use]
pub fn classify_path(path: &Path) -> MediaType {
    match tree_magic_mini::from_filepath(path) {
        Some(mime) => {
            log::trace!("Classified {} as {}", path.display(), mime);
            MediaType::from_mime(mime)
        }
        None => {
            log::debug!("Could not classify {}", path.display());
            MediaType::unknown()
        }
    }
}
