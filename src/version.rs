//! Version manifest handling.
//!
//! The manifest is a small JSON file pairing a build counter with the
//! changelist it was built from.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur reading or writing the version manifest.
#[derive(thiserror::Error, Debug)]
pub enum VersionError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A build counter and the changelist it corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Monotonic build counter.
    pub build: u64,
    /// Changelist the build was cut from.
    pub cl: i64,
}

impl Version {
    /// The next version: build counter incremented, changelist replaced.
    #[must_use]
    pub fn bumped(self, cl: i64) -> Self {
        Self {
            build: self.build + 1,
            cl,
        }
    }
}

/// Read the version manifest from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn read(path: &Path) -> Result<Version, VersionError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write the version manifest to disk as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write(path: &Path, version: &Version) -> Result<(), VersionError> {
    let json = serde_json::to_string_pretty(version)?;
    std::fs::write(path, json)?;
    Ok(())
}
