//! Engine error type.
//!
//! [`EngineError`] follows the taxonomy callers are expected to react to:
//! absent things are not errors at all (queries return `Option` or an empty
//! `Vec`), incompatible repository state is [`EngineError::InvalidState`],
//! unexpected backend exits are [`EngineError::Backend`] with a classified
//! [`BackendErrorKind`], and anything that would discard user content is
//! [`EngineError::DataLossRisk`].

use loom_git::{CommandOutput, GitError};
use thiserror::Error;

use crate::classify::{self, BackendErrorKind};
use crate::config::ConfigError;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A named thing that had to exist does not.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up (`stash@{3}`, `branch 'topic'`).
        what: String,
    },

    /// The repository is in a state the operation cannot run in.
    #[error("{message}")]
    InvalidState {
        /// Description of the blocking state and how to clear it.
        message: String,
    },

    /// A backend command exited non-zero for a reason not handled inline.
    #[error("{kind}: `{command}`: {message}")]
    Backend {
        /// Classified cause.
        kind: BackendErrorKind,
        /// The command line that failed.
        command: String,
        /// First meaningful line of the backend's output.
        message: String,
    },

    /// Continuing would discard user content; nothing was changed.
    #[error("refusing to continue, user content would be lost: {message}")]
    DataLossRisk {
        /// What would have been lost.
        message: String,
    },

    /// The repository handle or executor failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Build a [`EngineError::Backend`] from a failed command's output.
    #[must_use]
    pub fn backend(argv: &[&str], output: &CommandOutput) -> Self {
        let combined = output.combined();
        Self::Backend {
            kind: classify::classify(&combined),
            command: argv.join(" "),
            message: classify::headline(if output.stderr.trim().is_empty() {
                &output.stdout
            } else {
                &output.stderr
            }),
        }
    }

    /// The classified kind for backend failures, `None` otherwise.
    #[must_use]
    pub const fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            Self::Backend { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Shorthand for `Result<T, EngineError>`.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
