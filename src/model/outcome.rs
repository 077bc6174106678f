//! The result shape shared by every merge-like operation.

use std::fmt;

use serde::Serialize;

/// Outcome of a branch merge, fast-forward, squash, rebase step, cherry-pick
/// or stash reapplication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// The operation completed.
    Success,
    /// The operation stopped with these paths unmerged.
    Conflicts(Vec<String>),
    /// The two sides share no history.
    UnrelatedHistories,
    /// The operation failed; the message is meant for the user.
    Failure(String),
}

impl MergeOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Conflicting paths, empty for every other outcome.
    #[must_use]
    pub fn conflicts(&self) -> &[String] {
        match self {
            Self::Conflicts(paths) => paths,
            _ => &[],
        }
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Conflicts(paths) => {
                write!(f, "{} conflicting file(s)", paths.len())?;
                for p in paths {
                    write!(f, "\n  {p}")?;
                }
                Ok(())
            }
            Self::UnrelatedHistories => write!(f, "refusing to merge unrelated histories"),
            Self::Failure(msg) => write!(f, "failed: {msg}"),
        }
    }
}
