//! The public Perforce client operations.

use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;

use crate::ztag::{self, Entry};

use super::error::PerforceError;
use super::invoker::{CommandRecord, Invoker};

/// Confirmation sentence printed by `p4 change -i`.
static CREATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Change (\d+) created\.").unwrap_or_else(|e| panic!("invalid change regex: {e}"))
});

/// A blank line followed by a field marker would corrupt the change form.
static FORM_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\n\.\.\.\s").unwrap_or_else(|e| panic!("invalid marker regex: {e}"))
});

/// A submitted changelist, identified by its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    /// Changelist number.
    pub change: i64,
}

/// Perforce command client.
///
/// Stateless between calls apart from the in-flight command registry and
/// the username cached by [`Perforce::check_login`]. Callers are
/// responsible for sequencing dependent operations; distinct operations may
/// run concurrently.
#[derive(Debug)]
pub struct Perforce {
    invoker: Invoker,
    username: Mutex<Option<String>>,
}

impl Default for Perforce {
    fn default() -> Self {
        Self::new()
    }
}

impl Perforce {
    /// Create a client using the platform's p4 executable.
    #[must_use]
    pub fn new() -> Self {
        let executable = if cfg!(windows) { "p4.exe" } else { "p4" };
        Self::with_executable(executable)
    }

    /// Create a client using a custom executable (configuration override or
    /// a test stub).
    #[must_use]
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            invoker: Invoker::new(executable),
            username: Mutex::new(None),
        }
    }

    /// Log every command line, including quiet ones.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.invoker.set_verbose(verbose);
    }

    /// Snapshot of the commands currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> Vec<CommandRecord> {
        self.invoker.registry().snapshot()
    }

    /// The username cached by the last successful [`Perforce::check_login`].
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.username
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Check login state and cache the session username.
    ///
    /// # Errors
    ///
    /// Returns [`PerforceError::NotLoggedIn`] when the login status record
    /// carries no `User` field, or a command error if `p4 login -s` fails.
    pub async fn check_login(&self) -> Result<String, PerforceError> {
        let output = self
            .invoker
            .run(None, &["-ztag", "login", "-s"], None, false)
            .await?;

        let username = ztag::parse(&output, false)
            .first()
            .and_then(Entry::as_record)
            .and_then(|record| record.text("User"))
            .map(str::to_string)
            .ok_or(PerforceError::NotLoggedIn)?;

        *self
            .username
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(username.clone());
        Ok(username)
    }

    /// The newest submitted change under `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `changes` query fails.
    pub async fn latest_change(&self, path: &str) -> Result<Option<Change>, PerforceError> {
        let changes = self.changes(path, 0, 1).await?;
        Ok(changes.first().copied())
    }

    /// List submitted changes under `path`, newest first.
    ///
    /// When `since` is positive the query is scoped to changes strictly
    /// after that number via the `@>` revision-range suffix. A `limit` of 0
    /// means no limit. Descriptions may span multiple lines, so the output
    /// is parsed in multi-line mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the `changes` command fails.
    pub async fn changes(
        &self,
        path: &str,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Change>, PerforceError> {
        let path = if since > 0 {
            format!("{path}@>{since}")
        } else {
            path.to_string()
        };

        let mut args = vec!["-ztag", "changes", "-ssubmitted"];
        let limit_arg;
        if limit > 0 {
            limit_arg = format!("-m{limit}");
            args.push(&limit_arg);
        }
        args.push(&path);

        let output = self.invoker.run(None, &args, None, true).await?;
        let changes = ztag::parse(&output, true)
            .iter()
            .filter_map(Entry::as_record)
            .filter_map(|record| record.integer("change"))
            .map(|change| Change { change })
            .collect();
        Ok(changes)
    }

    /// Sync a depot path into the workspace, optionally forced.
    ///
    /// An "up-to-date." result is a success, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error for any other sync failure.
    pub async fn sync(
        &self,
        workspace: &str,
        depot_path: &str,
        force: bool,
    ) -> Result<(), PerforceError> {
        let mut args = vec!["sync"];
        if force {
            args.push("-f");
        }
        args.push(depot_path);

        match self.invoker.run(Some(workspace), &args, None, false).await {
            Ok(_) => Ok(()),
            Err(err) => match err.failure_output() {
                Some(text) if text.trim().ends_with("up-to-date.") => Ok(()),
                _ => Err(err),
            },
        }
    }

    /// Create a new pending changelist and return its number.
    ///
    /// Builds a minimal change form and feeds it to `p4 change -i`; the
    /// description is sanitized so it cannot be mistaken for form fields.
    ///
    /// # Errors
    ///
    /// Returns [`PerforceError::ChangeNumberMissing`] when the confirmation
    /// sentence cannot be found in the output, or a command error if the
    /// invocation fails.
    pub async fn new_changelist(
        &self,
        workspace: Option<&str>,
        description: &str,
        files: Option<&[String]>,
    ) -> Result<i64, PerforceError> {
        let form = build_change_form(workspace, description, files);

        tracing::info!(
            "Executing: '{} change -i' to create a new changelist",
            self.invoker.executable()
        );
        let output = self
            .invoker
            .run(workspace, &["change", "-i"], Some(&form), true)
            .await?;

        parse_created_change(&output)
            .ok_or_else(|| PerforceError::ChangeNumberMissing(output))
    }

    /// Submit a pending changelist, allowing unchanged files.
    ///
    /// Returns the final submitted changelist number, or `0` when the
    /// submit must be retried (merges still pending, out-of-date files);
    /// the retry decision and backoff belong to the caller. A changelist
    /// with no files is deleted and also reported as `0`.
    ///
    /// # Errors
    ///
    /// Any failure outside the known soft conditions is surfaced with full
    /// diagnostics. A submit that reports success without a
    /// `submittedChange` field is a protocol violation and yields
    /// [`PerforceError::SubmittedChangeMissing`].
    pub async fn submit_changelist(
        &self,
        workspace: &str,
        changelist: i64,
    ) -> Result<i64, PerforceError> {
        let cl = changelist.to_string();
        let args = [
            "-ztag",
            "submit",
            "-f",
            "submitunchanged",
            "-c",
            cl.as_str(),
        ];

        let output = match self.invoker.run(Some(workspace), &args, None, false).await {
            Ok(output) => output,
            Err(err) => match err.failure_output().map(str::trim) {
                Some(text)
                    if text.starts_with("Merges still pending --")
                        || text.starts_with("Out of date files must be resolved or reverted") =>
                {
                    // Concurrent edits; the caller should try again.
                    return Ok(0);
                }
                Some(text) if text.starts_with("No files to submit.") => {
                    self.delete_changelist(workspace, changelist).await?;
                    return Ok(0);
                }
                _ => return Err(err),
            },
        };

        ztag::parse(&output, false)
            .iter()
            .rev()
            .find_map(Entry::as_record)
            .and_then(|record| record.integer("submittedChange"))
            .ok_or_else(|| PerforceError::SubmittedChangeMissing(output))
    }

    /// Delete a pending (expected-empty) changelist.
    ///
    /// # Errors
    ///
    /// Returns an error if the `change -d` command fails.
    pub async fn delete_changelist(
        &self,
        workspace: &str,
        changelist: i64,
    ) -> Result<String, PerforceError> {
        let cl = changelist.to_string();
        self.invoker
            .run(Some(workspace), &["change", "-d", cl.as_str()], None, false)
            .await
    }

    /// Revert all files in a changelist, deleting files opened for add.
    ///
    /// A changelist with nothing to revert is a success.
    ///
    /// # Errors
    ///
    /// Returns an error for any other revert failure.
    pub async fn revert_changelist(
        &self,
        workspace: &str,
        changelist: i64,
    ) -> Result<(), PerforceError> {
        let cl = changelist.to_string();
        let args = ["revert", "-w", "-c", cl.as_str(), "//..."];

        match self.invoker.run(Some(workspace), &args, None, false).await {
            Ok(_) => Ok(()),
            Err(err) => match err.failure_output() {
                Some(text) if text.contains("file(s) not opened on this client.") => Ok(()),
                _ => Err(err),
            },
        }
    }

    /// Open a file for edit within the given changelist.
    ///
    /// # Errors
    ///
    /// Returns an error if the `edit` command fails.
    pub async fn mark_for_edit(
        &self,
        workspace: &str,
        changelist: i64,
        file_path: &str,
    ) -> Result<String, PerforceError> {
        let cl = changelist.to_string();
        self.invoker
            .run(
                Some(workspace),
                &["edit", "-c", cl.as_str(), file_path],
                None,
                false,
            )
            .await
    }
}

/// Build the minimal change-specification form fed to `p4 change -i`.
fn build_change_form(
    workspace: Option<&str>,
    description: &str,
    files: Option<&[String]>,
) -> String {
    let mut form = String::from("Change:\tnew\nStatus:\tnew\nType:\tpublic\n");
    if let Some(client) = workspace {
        form.push_str("Client:\t");
        form.push_str(client);
        form.push('\n');
    }
    if let Some(files) = files {
        form.push_str("Files:\n");
        for file in files {
            form.push('\t');
            form.push_str(file);
            form.push('\n');
        }
    }
    form.push_str("Description:\n\t");
    form.push_str(&sanitize_description(description));
    form
}

/// Defuse embedded field markers and tab-indent continuation lines so the
/// description stays inside the form's Description field.
fn sanitize_description(description: &str) -> String {
    FORM_MARKER_RE
        .replace_all(description.trim(), "\n\n ... ")
        .replace('\n', "\n\t")
}

/// Extract the changelist number from a `Change <n> created.` sentence.
fn parse_created_change(output: &str) -> Option<i64> {
    CREATED_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
