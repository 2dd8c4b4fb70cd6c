//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//! Two fingerprints are computed per file:
//! - a *partial* fingerprint over at most the first [`PARTIAL_SIZE`] bytes,
//!   cheap enough to run on every same-size candidate;
//! - a *full* fingerprint over the whole content, read in [`CHUNK_SIZE`]
//!   chunks so memory stays bounded regardless of file size.
//!
//! Both are rendered as lowercase hex so they can be persisted in catalogue
//! snapshots as plain strings.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::HashError;

/// Number of leading bytes covered by the partial fingerprint.
pub const PARTIAL_SIZE: usize = 1024;

/// Read size used when streaming the full content.
pub const CHUNK_SIZE: usize = 1024;

/// Name recorded in snapshots next to stored fingerprints.
pub const HASH_ALGORITHM: &str = "blake3";

/// Hex-encoded content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already hex-encoded digest (e.g. one restored from a snapshot).
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }
}

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Use a different read size for full fingerprints.
    ///
    /// The digest does not depend on the chunk size, only memory use does.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fingerprint of at most the first [`PARTIAL_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn partial_fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut buffer = Vec::with_capacity(PARTIAL_SIZE);
        file.take(PARTIAL_SIZE as u64)
            .read_to_end(&mut buffer)
            .map_err(|e| HashError::from_io(path, e))?;

        log::trace!("Partial fingerprint over {} bytes: {}", buffer.len(), path.display());
        Ok(blake3::hash(&buffer).into())
    }

    /// Fingerprint of the entire content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut reader = BufReader::new(file);
        let mut hasher = blake3::Hasher::new();
        let mut chunk = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&chunk[..read]);
            total += read as u64;
        }

        log::trace!("Full fingerprint over {} bytes: {}", total, path.display());
        Ok(hasher.finalize().into())
    }
}
