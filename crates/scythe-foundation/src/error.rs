//! Error handling for the scythe inspection service

use thiserror::Error;

/// Core error type used throughout the scythe system.
///
/// Request-validation variants (`MalformedRequest`, `AlreadyExists`,
/// `Locked`, `NotFound`, `RepositoryNotFound`) are raised synchronously
/// and surfaced to the
/// caller. Pipeline variants (`Download`, `ProcessTimeout`, `ProcessExit`,
/// `QueueFull`, `Io`) are caught inside the asynchronous pipeline and
/// converted into a FAILED state transition, never propagated.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScytheError {
    #[error("Malformed request: {message}")]
    MalformedRequest { message: String },

    #[error("An inspection for {repo} on branch {branch} already exists")]
    AlreadyExists { repo: String, branch: String },

    #[error("Inspection {id} is locked in state {state}")]
    Locked { id: String, state: String },

    #[error("No inspection found with id {id}")]
    NotFound { id: String },

    #[error("No inspections recorded for repository {repo}")]
    RepositoryNotFound { repo: String },

    #[error("Repository download failed: {message}")]
    Download { message: String },

    #[error("Command `{command}` timed out after {timeout_secs}s and was killed")]
    ProcessTimeout { command: String, timeout_secs: u64 },

    #[error("Command `{command}` exited with code {code}: {stderr}")]
    ProcessExit {
        command: String,
        /// Exit code of the process; -1 when it was terminated by a signal.
        code: i32,
        stderr: String,
    },

    #[error("Analysis queue is full, inspection rejected")]
    QueueFull,

    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl ScytheError {
    /// Create a new malformed request error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
        }
    }

    /// Create a new download failure error
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
        }
    }

    /// Create a new locked error for the given inspection id and state
    pub fn locked(id: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::Locked {
            id: id.into(),
            state: state.to_string(),
        }
    }

    /// Create a new not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new not found error for a repository with no inspections
    pub fn repository_not_found(repo: impl Into<String>) -> Self {
        Self::RepositoryNotFound { repo: repo.into() }
    }

    /// Create a new I/O error without an underlying source
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// True for errors raised by process execution (timeout or exit status)
    pub fn is_process_failure(&self) -> bool {
        matches!(self, Self::ProcessTimeout { .. } | Self::ProcessExit { .. })
    }
}

impl From<std::io::Error> for ScytheError {
    fn from(err: std::io::Error) -> Self {
        ScytheError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type alias for convenience
pub type ScytheResult<T> = Result<T, ScytheError>;
