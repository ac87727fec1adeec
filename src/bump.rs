//! The version-bump flow.
//!
//! Finds the latest submitted change under the configured depot path, opens
//! the version manifest for edit in a fresh changelist, and bumps the build
//! counter. The changelist is left pending; submitting it is the caller's
//! decision.

use std::path::PathBuf;

use crate::config::BumpConfig;
use crate::perforce::{Perforce, PerforceError};
use crate::version::{self, Version, VersionError};

/// Errors that can occur during the bump flow.
#[derive(thiserror::Error, Debug)]
pub enum BumpError {
    /// A p4 operation failed.
    #[error(transparent)]
    Perforce(#[from] PerforceError),

    /// The version manifest could not be read or written.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Nothing has ever been submitted under the configured depot path.
    #[error("No submitted changes found under {0}")]
    NoChanges(String),

    /// The configured version file path has no usable file name.
    #[error("Version file path has no file name: {}", .0.display())]
    BadVersionPath(PathBuf),
}

/// Result of a successful bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BumpOutcome {
    /// The pending changelist holding the manifest edit.
    pub changelist: i64,
    /// The new manifest contents.
    pub version: Version,
}

/// Run the bump flow against a configured client.
///
/// # Errors
///
/// Fails if the user is not logged in, no change exists under the depot
/// path, or any p4 or manifest step fails. Steps are sequential; nothing is
/// rolled back on failure, so a half-finished bump may leave a pending
/// changelist to revert.
pub async fn run(p4: &Perforce, config: &BumpConfig) -> Result<BumpOutcome, BumpError> {
    let user = p4.check_login().await?;
    tracing::info!(user = %user, "Logged in");

    let depot_recursive = format!("{}/...", config.depot.trim_end_matches('/'));
    let latest = p4
        .latest_change(&depot_recursive)
        .await?
        .ok_or_else(|| BumpError::NoChanges(depot_recursive.clone()))?;
    tracing::info!(change = latest.change, "Latest submitted change");

    if config.sync {
        let target = format!("{depot_recursive}@{}", latest.change);
        p4.sync(&config.workspace, &target, true).await?;
    }

    let version = version::read(&config.version_file)?.bumped(latest.change);

    let description = format!("Updated version file for build {}", version.build);
    let changelist = p4
        .new_changelist(Some(&config.workspace), &description, None)
        .await?;

    let file_name = config
        .version_file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BumpError::BadVersionPath(config.version_file.clone()))?;
    let depot_file = format!("{}/{file_name}", config.depot.trim_end_matches('/'));
    p4.mark_for_edit(&config.workspace, changelist, &depot_file)
        .await?;

    version::write(&config.version_file, &version)?;
    tracing::info!(changelist, build = version.build, "Version bumped");

    Ok(BumpOutcome {
        changelist,
        version,
    })
}
