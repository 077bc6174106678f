//! Stash list entries.

use loom_git::GitOid;
use serde::Serialize;

use super::oid_hex;

/// One entry of the stash list.
///
/// `index` is volatile: pushing a new stash shifts every entry down by one
/// and dropping an entry shifts the older ones up. Use `id` to find the same
/// entry again after the list changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StashEntry {
    /// Position in the stash list (`stash@{index}`).
    pub index: usize,
    /// Object id of the stash commit (the working-tree snapshot).
    #[serde(serialize_with = "oid_hex")]
    pub id: GitOid,
    /// Reflog subject, e.g. `WIP on main: 1a2b3c4 fix parser`.
    pub message: String,
    /// Branch the stash was taken on, parsed from the message.
    pub branch: Option<String>,
    pub author: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
}

impl StashEntry {
    /// The `stash@{n}` revision naming this entry right now.
    #[must_use]
    pub fn refname(&self) -> String {
        stash_ref(self.index)
    }
}

/// `stash@{n}`.
#[must_use]
pub fn stash_ref(index: usize) -> String {
    format!("stash@{{{index}}}")
}
