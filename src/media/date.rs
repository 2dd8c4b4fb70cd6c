//! Capture-date extraction from EXIF metadata and path patterns.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use regex::Regex;

/// Folder and camera file-name conventions that carry a date.
static PATH_DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})",
        r"/IMG_(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})_",
        r"/VID_(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})_",
        r"/IMG-(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})-",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static SLASHED_DATE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})").ok()
});

const EXIF_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
];

fn date_from_captures(captures: &regex::Captures<'_>) -> Option<NaiveDateTime> {
    let year = captures.name("year")?.as_str().parse().ok()?;
    let month = captures.name("month")?.as_str().parse().ok()?;
    let day = captures.name("day")?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Date encoded in a folder name (`2021-06-30`) or a camera file name
/// (`IMG_20210630_...`). Impossible dates are ignored and the next pattern
/// is tried.
#[must_use]
pub fn date_from_path(path: &Path) -> Option<NaiveDateTime> {
    let normalized = if cfg!(windows) {
        path.to_string_lossy().replace('\\', "/")
    } else {
        path.to_string_lossy().into_owned()
    };
    let haystack = format!("/{normalized}");

    PATH_DATE_PATTERNS.iter().find_map(|regex| {
        regex
            .captures_iter(&haystack)
            .find_map(|captures| date_from_captures(&captures))
    })
}

/// Parse the textual forms EXIF date fields show up in.
#[must_use]
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim_end_matches('\0').trim();
    if value.is_empty() {
        return None;
    }

    EXIF_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            log::debug!("Attempting to parse unusual EXIF date {:?}", value);
            let regex = SLASHED_DATE.as_ref()?;
            date_from_captures(&regex.captures(value)?)
        })
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        Value::Undefined(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// `DateTimeOriginal`, else `DateTime`, from embedded EXIF data.
///
/// Files without a readable EXIF container yield `None`.
#[must_use]
pub fn date_from_exif(path: &Path) -> Option<NaiveDateTime> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("Cannot open {} for metadata: {}", path.display(), e);
            return None;
        }
    };
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("Cannot get exif metadata for {}: {}", path.display(), e);
            return None;
        }
    };

    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
        .filter_map(|field| field_text(&field.value))
        .find_map(|text| parse_exif_datetime(&text))
}
