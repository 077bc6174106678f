//! Classification of backend failure messages.
//!
//! The backend reports most failures only as English text on stderr. Every
//! substring rule lives in [`RULES`] so new wording can be added in one
//! place. Commands run through
//! [`ProcessExecutor`](loom_git::ProcessExecutor) under `LC_ALL=C`, so the
//! table only needs the C-locale phrasing.

use std::fmt;

use serde::Serialize;

/// What kind of failure a backend message describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    Authentication,
    NetworkUnreachable,
    PermissionDenied,
    DivergedBranches,
    DetachedHead,
    UnrelatedHistories,
    /// The operation stopped with merge conflicts.
    Conflict,
    /// Local changes would be overwritten by the operation.
    LocalChangesOverwritten,
    /// Another git process holds the index lock.
    IndexLocked,
    Unclassified,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authentication => "authentication failed",
            Self::NetworkUnreachable => "network unreachable",
            Self::PermissionDenied => "permission denied",
            Self::DivergedBranches => "branches have diverged",
            Self::DetachedHead => "HEAD is detached",
            Self::UnrelatedHistories => "unrelated histories",
            Self::Conflict => "merge conflict",
            Self::LocalChangesOverwritten => "local changes would be overwritten",
            Self::IndexLocked => "index is locked by another process",
            Self::Unclassified => "backend command failed",
        };
        f.write_str(s)
    }
}

/// Ordered substring rules; the first match wins. Needles are lowercase.
const RULES: &[(&str, BackendErrorKind)] = &[
    ("refusing to merge unrelated histories", BackendErrorKind::UnrelatedHistories),
    ("authentication failed", BackendErrorKind::Authentication),
    ("could not read username", BackendErrorKind::Authentication),
    ("invalid username or password", BackendErrorKind::Authentication),
    ("permission denied (publickey", BackendErrorKind::Authentication),
    ("host key verification failed", BackendErrorKind::Authentication),
    ("could not resolve host", BackendErrorKind::NetworkUnreachable),
    ("network is unreachable", BackendErrorKind::NetworkUnreachable),
    ("connection timed out", BackendErrorKind::NetworkUnreachable),
    ("connection refused", BackendErrorKind::NetworkUnreachable),
    ("failed to connect", BackendErrorKind::NetworkUnreachable),
    ("unable to access", BackendErrorKind::NetworkUnreachable),
    ("index.lock", BackendErrorKind::IndexLocked),
    ("permission denied", BackendErrorKind::PermissionDenied),
    ("operation not permitted", BackendErrorKind::PermissionDenied),
    ("read-only file system", BackendErrorKind::PermissionDenied),
    ("have diverged", BackendErrorKind::DivergedBranches),
    ("not possible to fast-forward", BackendErrorKind::DivergedBranches),
    ("non-fast-forward", BackendErrorKind::DivergedBranches),
    ("need to specify how to reconcile divergent branches", BackendErrorKind::DivergedBranches),
    ("you are not currently on a branch", BackendErrorKind::DetachedHead),
    ("head detached", BackendErrorKind::DetachedHead),
    ("detached head", BackendErrorKind::DetachedHead),
    ("would be overwritten by", BackendErrorKind::LocalChangesOverwritten),
    ("please commit your changes or stash them", BackendErrorKind::LocalChangesOverwritten),
    ("conflict (", BackendErrorKind::Conflict),
    ("automatic merge failed", BackendErrorKind::Conflict),
    ("merge conflict", BackendErrorKind::Conflict),
    ("could not apply", BackendErrorKind::Conflict),
    ("needs merge", BackendErrorKind::Conflict),
    ("you have unmerged paths", BackendErrorKind::Conflict),
];

/// Classify a backend message. Pure, total, case-insensitive.
#[must_use]
pub fn classify(message: &str) -> BackendErrorKind {
    let lower = message.to_lowercase();
    RULES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map_or(BackendErrorKind::Unclassified, |(_, kind)| *kind)
}

/// `true` if the output of a merge-like command reports conflicts.
#[must_use]
pub fn is_conflict(message: &str) -> bool {
    classify(message) == BackendErrorKind::Conflict
}

/// First non-empty line of a backend message, with `error:`/`fatal:`
/// prefixes stripped, for user-facing summaries.
#[must_use]
pub fn headline(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| {
            l.strip_prefix("fatal:")
                .or_else(|| l.strip_prefix("error:"))
                .unwrap_or(l)
                .trim()
                .to_owned()
        })
        .unwrap_or_default()
}
