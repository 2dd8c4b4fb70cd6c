//! JSON output for scripting.
//!
//! # Output Schema
//!
//! `inspect`:
//!
//! ```json
//! {
//!   "inspect": {
//!     "catalogue": "photos",
//!     "root": "/srv/photos",
//!     "summary": { "name": "photos", "rows": [ { "media_type": "image", "size": 2048, "files": 2, "duplicates": 1 } ] },
//!     "duplicates": [ { "size": 1024, "fingerprint": "af13...", "paths": ["a.jpg", "b/a.jpg"] } ],
//!     "stats": { "input_files": 2, "failed_files": [], "interrupted": false }
//!   },
//!   "exit_code": 0,
//!   "exit_code_name": "CT000"
//! }
//! ```
//!
//! `copy`, `move` and `delete-duplicates`:
//!
//! ```json
//! {
//!   "transfer": {
//!     "operation": "copy", "dry_run": false, "interrupted": false,
//!     "applied": 1, "skipped": 0, "failed": 0, "renamed": 0,
//!     "files": [ { "source": "a.jpg", "destination": "2020/a.jpg", "state": "APPLIED", "renamed": false, "error": null } ],
//!     "duplicates_skipped": [],
//!     "different_names": []
//!   },
//!   "exit_code": 0,
//!   "exit_code_name": "CT000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::error::ExitCode;

use super::{InspectReport, TransferReport};

/// What the JSON document describes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonReport {
    Inspect(InspectReport),
    Transfer(TransferReport),
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    #[serde(flatten)]
    pub report: JsonReport,
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "CT000")
    pub exit_code_name: String,
}

impl JsonOutput {
    #[must_use]
    pub fn new(report: JsonReport, exit_code: ExitCode) -> Self {
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
