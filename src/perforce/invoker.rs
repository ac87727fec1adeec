//! External command invocation with in-flight tracking.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::PerforceError;

/// One in-flight external command: the exact command line executed and when
/// it started.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    /// Full command line, executable included.
    pub cmd: String,
    /// When the command was launched.
    pub start: DateTime<Utc>,
}

/// Concurrency-safe registry of in-flight commands.
///
/// Every record corresponds to a currently-executing process; the registry
/// is empty whenever the client is idle. Removal happens on every
/// completion path, including spawn failure.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    next_id: Arc<AtomicU64>,
    running: Arc<Mutex<HashMap<u64, CommandRecord>>>,
}

impl CommandRegistry {
    /// Register a command and get a guard that removes it when dropped.
    fn register(&self, cmd: String) -> InFlightGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = CommandRecord {
            cmd,
            start: Utc::now(),
        };
        self.lock().insert(id, record);
        InFlightGuard {
            registry: self.clone(),
            id,
        }
    }

    /// Snapshot of the currently in-flight commands.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CommandRecord> {
        self.lock().values().cloned().collect()
    }

    /// Number of commands currently in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no commands are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, CommandRecord>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its command record from the registry on drop, so a record is
/// never orphaned regardless of how the invocation ends.
struct InFlightGuard {
    registry: CommandRegistry,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}

/// Executes p4 commands and captures their output.
#[derive(Debug, Clone)]
pub struct Invoker {
    executable: String,
    registry: CommandRegistry,
    verbose: bool,
}

impl Invoker {
    /// Create an invoker for the given executable.
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            registry: CommandRegistry::default(),
            verbose: false,
        }
    }

    /// Enable logging of every command, including quiet ones.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// The in-flight command registry.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// The executable this invoker runs.
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Run a p4 command to completion and capture its output.
    ///
    /// When `workspace` is set, `-c <workspace>` is prepended so every
    /// command is scoped to an explicit client rather than ambient p4
    /// configuration. When `stdin` is set, it is written to the process and
    /// the stream is closed; a write failure is only logged, since the
    /// eventual exit error is authoritative.
    ///
    /// Captured output has all line endings normalized to `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`PerforceError::CommandFailed`] when the process exits
    /// non-zero or writes anything to stderr. Perforce frequently reports
    /// warnings on stderr with a success exit status; treating that as
    /// failure defers the soft/hard decision to the calling operation.
    pub async fn run(
        &self,
        workspace: Option<&str>,
        args: &[&str],
        stdin: Option<&str>,
        quiet: bool,
    ) -> Result<String, PerforceError> {
        let mut argv: Vec<String> = Vec::with_capacity(args.len() + 2);
        if let Some(client) = workspace {
            argv.push("-c".to_string());
            argv.push(client.to_string());
        }
        argv.extend(args.iter().map(ToString::to_string));

        let cmd_line = format!("{} {}", self.executable, argv.join(" "));
        if !quiet || self.verbose {
            tracing::info!(cmd = %cmd_line, "Executing");
        }

        let _guard = self.registry.register(cmd_line.clone());

        let mut command = Command::new(&self.executable);
        command
            .args(&argv)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| PerforceError::Spawn {
            executable: self.executable.clone(),
            source,
        })?;

        if let Some(input) = stdin {
            if let Some(mut sink) = child.stdin.take() {
                // Usually means the process exited immediately; the exit
                // error below is authoritative.
                if let Err(e) = sink.write_all(input.as_bytes()).await {
                    tracing::warn!(cmd = %cmd_line, error = %e, "Failed to write stdin");
                }
                drop(sink);
            }
        }

        let output = child.wait_with_output().await?;
        if self.verbose {
            tracing::debug!(cmd = %cmd_line, "Command completed");
        }

        let stdout = normalize_newlines(&String::from_utf8_lossy(&output.stdout));
        let stderr = normalize_newlines(&String::from_utf8_lossy(&output.stderr));

        if !stderr.is_empty() {
            let mut message = format!("P4 Error: {cmd_line}\n");
            message.push_str(&format!("STDERR:\n{stderr}\n"));
            message.push_str(&format!("STDOUT:\n{stdout}\n"));
            if let Some(input) = stdin {
                message.push_str(&format!("STDIN:\n{input}\n"));
            }
            return Err(PerforceError::CommandFailed {
                message,
                output: stderr,
            });
        }

        if !output.status.success() {
            let mut message = format!("P4 Error: {cmd_line}\n{}\n", output.status);
            if !stdout.is_empty() {
                message.push_str(&format!("STDOUT:\n{stdout}\n"));
            }
            if let Some(input) = stdin {
                message.push_str(&format!("STDIN:\n{input}\n"));
            }
            return Err(PerforceError::CommandFailed {
                message,
                output: stdout,
            });
        }

        Ok(stdout)
    }
}

/// Collapse `\r\n` and bare `\r` to `\n` so downstream parsing never
/// special-cases platform line endings.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines(""), "");
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = CommandRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_registry_guard_removes_on_drop() {
        let registry = CommandRegistry::default();
        let guard = registry.register("p4 login -s".to_string());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].cmd, "p4 login -s");
        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_concurrent_records() {
        let registry = CommandRegistry::default();
        let a = registry.register("p4 changes".to_string());
        let b = registry.register("p4 sync".to_string());
        assert_eq!(registry.len(), 2);
        drop(a);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].cmd, "p4 sync");
        drop(b);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure_clears_registry() {
        let invoker = Invoker::new("p4bump-no-such-binary");
        let result = invoker.run(None, &["login", "-s"], None, true).await;
        assert!(matches!(result, Err(PerforceError::Spawn { .. })));
        assert!(invoker.registry().is_empty());
    }
}
