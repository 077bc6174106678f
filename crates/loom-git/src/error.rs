//! Error types for repository and command operations.
//!
//! [`GitError`] is returned by every [`GitRepo`](crate::GitRepo) and
//! [`CommandExecutor`](crate::CommandExecutor) method. Callers match on the
//! variants instead of parsing messages.

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) and
/// [`CommandExecutor`](crate::CommandExecutor) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object, ref, or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// An OID string could not be parsed.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// An I/O error occurred (file system, process spawn, pipe write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned command exited non-zero where success was required.
    #[error("`{program} {}` failed (exit code {exit_code}): {stderr}", args.join(" "))]
    CommandFailed {
        /// Program that was run.
        program: String,
        /// Arguments passed to it.
        args: Vec<String>,
        /// Exit status.
        exit_code: i32,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// The underlying backend (gix) returned an unclassified error.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl From<crate::types::OidParseError> for GitError {
    fn from(e: crate::types::OidParseError) -> Self {
        Self::InvalidOid {
            value: e.value,
            reason: e.reason,
        }
    }
}
