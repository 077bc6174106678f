//! Conflict state and per-file conflict records.

use std::fmt;

use serde::Serialize;

/// What the repository is in the middle of.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepoState {
    /// Nothing in progress and no unmerged index entries.
    Clean,
    /// A merge stopped on conflicts; `incoming` names the merged branch.
    MergeInProgress {
        /// Branch (or commit) being merged in.
        incoming: String,
    },
    /// An interactive or am-style rebase is stopped.
    RebaseInProgress,
    /// A cherry-pick stopped on conflicts.
    CherryPickInProgress,
    /// Unmerged index entries exist but nothing is in progress, e.g. after a
    /// conflicting stash apply or a failed checkout.
    OrphanedConflict,
}

impl RepoState {
    /// `true` for every state other than [`RepoState::Clean`].
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self, Self::Clean)
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::MergeInProgress { incoming } => write!(f, "merging {incoming}"),
            Self::RebaseInProgress => write!(f, "rebase in progress"),
            Self::CherryPickInProgress => write!(f, "cherry-pick in progress"),
            Self::OrphanedConflict => write!(f, "unresolved conflicts"),
        }
    }
}

/// The three sides of one conflicting file.
///
/// Each side is independently optional: a file added on only one side has
/// no ancestor, a file deleted on one side has no content for that side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    /// Path relative to the repository root.
    pub path: String,
    pub ancestor: Option<String>,
    pub ours: Option<String>,
    pub theirs: Option<String>,
    /// `true` once the path no longer has unmerged index entries.
    pub resolved: bool,
    /// Working-tree content with conflict markers, filled in only when the
    /// index has no stage entries to read the sides from.
    pub merged: Option<String>,
}

impl ConflictRecord {
    /// `true` if at least one side could be read from the index.
    #[must_use]
    pub const fn has_stages(&self) -> bool {
        self.ancestor.is_some() || self.ours.is_some() || self.theirs.is_some()
    }
}
