//! Perforce client error types.

/// Errors that can occur while running p4 operations.
#[derive(thiserror::Error, Debug)]
pub enum PerforceError {
    /// The p4 command exited non-zero or wrote to stderr.
    ///
    /// `message` is the full diagnostic (command line, stderr, stdout, and
    /// stdin if any was supplied); `output` is the raw text used for
    /// soft-failure classification.
    #[error("{message}")]
    CommandFailed {
        /// Synthesized diagnostic message.
        message: String,
        /// Raw stderr (or stdout when stderr was empty) for classification.
        output: String,
    },

    /// The p4 executable could not be spawned.
    #[error("Failed to spawn {executable}: {source}")]
    Spawn {
        /// Executable name that failed to launch.
        executable: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No user field in the login status output.
    #[error("Not logged in to Perforce")]
    NotLoggedIn,

    /// `change -i` succeeded but no `Change <n> created.` sentence was found.
    #[error("Unable to parse changelist number from change output:\n{0}")]
    ChangeNumberMissing(String),

    /// `submit` reported success but no `submittedChange` field was present.
    #[error("Unable to find submittedChange in p4 results:\n{0}")]
    SubmittedChangeMissing(String),

    /// Other I/O error while talking to the child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PerforceError {
    /// The raw failure text for soft-condition matching, if this error
    /// carries one.
    #[must_use]
    pub fn failure_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
