//! Labeled commits as handed to graph consumers.

use std::fmt;

use loom_git::GitOid;
use serde::Serialize;

use super::{oid_hex, oid_hex_vec};

// ---------------------------------------------------------------------------
// RemoteKind
// ---------------------------------------------------------------------------

/// Hosting service a remote points at, classified from its URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteKind {
    /// github.com or a GitHub Enterprise host.
    GitHub,
    /// gitlab.com or a self-hosted GitLab.
    GitLab,
    /// bitbucket.org.
    Bitbucket,
    /// Azure DevOps / Visual Studio Team Services.
    AzureDevOps,
    /// Gitea or Forgejo (including codeberg.org).
    Gitea,
    /// A path or `file://` URL on the local machine.
    Local,
    /// Anything else, or no URL configured.
    #[default]
    Other,
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "github"),
            Self::GitLab => write!(f, "gitlab"),
            Self::Bitbucket => write!(f, "bitbucket"),
            Self::AzureDevOps => write!(f, "azure-devops"),
            Self::Gitea => write!(f, "gitea"),
            Self::Local => write!(f, "local"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteBranchRef
// ---------------------------------------------------------------------------

/// One remote's copy of a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemoteBranchRef {
    /// Remote name (`origin`).
    pub remote: String,
    /// Hosting service of that remote.
    pub kind: RemoteKind,
    /// Where that remote's copy of the branch points.
    #[serde(serialize_with = "oid_hex")]
    pub tip: GitOid,
}

// ---------------------------------------------------------------------------
// BranchLabel
// ---------------------------------------------------------------------------

/// A branch label attached to a commit.
///
/// One label per branch short name: a local branch and every remote copy of
/// the same short name share a single label, with one [`RemoteBranchRef`]
/// per remote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BranchLabel {
    /// Branch short name without any remote prefix.
    pub name: String,
    /// `true` if a local branch of this name exists.
    pub is_local: bool,
    /// `true` for the checked-out branch (or the synthetic detached `HEAD`).
    pub is_current: bool,
    /// Tip of the local branch, or of the first remote copy for remote-only
    /// labels.
    #[serde(serialize_with = "oid_hex")]
    pub tip: GitOid,
    /// Remote copies of this branch.
    pub remotes: Vec<RemoteBranchRef>,
}

impl BranchLabel {
    /// The synthetic label carried by a detached HEAD commit.
    #[must_use]
    pub fn detached_head(tip: GitOid) -> Self {
        Self {
            name: "HEAD".to_owned(),
            is_local: true,
            is_current: true,
            tip,
            remotes: Vec::new(),
        }
    }

    /// A label with no remote copies.
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.is_local && self.remotes.is_empty()
    }

    /// A label for a branch that only exists on remotes.
    #[must_use]
    pub const fn is_remote_only(&self) -> bool {
        !self.is_local
    }

    /// Fold `other` (same branch name) into `self`, keeping one entry per
    /// remote and never downgrading the local/current flags.
    pub fn absorb(&mut self, other: Self) {
        debug_assert_eq!(self.name, other.name);
        if other.is_local && !self.is_local {
            self.is_local = true;
            self.tip = other.tip;
        }
        self.is_current |= other.is_current;
        for remote in other.remotes {
            if !self.remotes.iter().any(|r| r.remote == remote.remote) {
                self.remotes.push(remote);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A commit in the display window, with every label attached to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Commit {
    #[serde(serialize_with = "oid_hex")]
    pub id: GitOid,
    /// First line of the message.
    pub summary: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
    #[serde(serialize_with = "oid_hex_vec")]
    pub parents: Vec<GitOid>,
    /// `true` if HEAD resolves to this commit.
    pub is_head: bool,
    /// Local branch names, then remote-qualified names (`origin/main`).
    pub branches: Vec<String>,
    pub labels: Vec<BranchLabel>,
    pub tags: Vec<String>,
}

impl Commit {
    /// `true` if some label on this commit marks the current position.
    #[must_use]
    pub fn has_current_label(&self) -> bool {
        self.labels.iter().any(|l| l.is_current)
    }

    /// Merge labels from elsewhere (back-filled tips) into this commit.
    ///
    /// Labels with a name already present are absorbed into the existing
    /// label; new ones are appended. The current label is kept first.
    pub fn merge_labels(&mut self, labels: Vec<BranchLabel>) {
        for label in labels {
            match self.labels.iter_mut().find(|l| l.name == label.name) {
                Some(existing) => existing.absorb(label),
                None => self.labels.push(label),
            }
        }
        // stable: only the current label moves
        self.labels.sort_by_key(|l| !l.is_current);
    }

    /// Append names not already present, preserving order.
    pub fn merge_names(target: &mut Vec<String>, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !target.contains(&name) {
                target.push(name);
            }
        }
    }
}
