//! The [`GitRepo`] trait: the read view over one repository that the
//! gitloom engine builds graphs and conflict records from.
//!
//! The trait is object-safe so callers can hold `&dyn GitRepo`, and small
//! enough that tests can fake it with a few hash maps.
//!
//! | Group     | Methods                                                  |
//! |-----------|----------------------------------------------------------|
//! | Layout    | `workdir`, `git_dir`                                     |
//! | Refs      | `local_branches`, `remote_branches`, `remotes`, `tags`   |
//! | HEAD      | `head`                                                   |
//! | Objects   | `read_commit`, `read_blob`                               |
//! | Index     | `conflict_entries`                                       |

use std::path::Path;

use crate::error::GitError;
use crate::types::{BranchRef, CommitInfo, GitOid, HeadState, IndexConflictEntry, RemoteInfo, TagRef};

/// Read access to one repository's refs, objects and index.
///
/// Implementations may be backed by gix ([`GixRepo`](crate::GixRepo)) or an
/// in-memory test double. Mutation of the working tree, index and stash list
/// goes through the git CLI via [`CommandExecutor`](crate::CommandExecutor)
/// instead, so that the backend's own locking and merge machinery apply.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// The working tree root, `None` for bare repositories.
    fn workdir(&self) -> Option<&Path>;

    /// The private git directory holding `HEAD`, `MERGE_HEAD`, `rebase-*`.
    ///
    /// For linked worktrees this is the per-worktree directory.
    fn git_dir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Refs
    //
    // Replaces: git for-each-ref refs/heads refs/remotes refs/tags,
    //           git remote -v
    // -----------------------------------------------------------------------

    /// All local branches with their peeled tips, sorted by name.
    fn local_branches(&self) -> Result<Vec<BranchRef>, GitError>;

    /// All remote-tracking branches (`origin/main`), sorted by name.
    ///
    /// Symbolic `<remote>/HEAD` entries are included; filtering them is the
    /// caller's decision.
    fn remote_branches(&self) -> Result<Vec<BranchRef>, GitError>;

    /// All configured remotes with their fetch URLs.
    fn remotes(&self) -> Result<Vec<RemoteInfo>, GitError>;

    /// All tags, peeled to the commit they point at.
    fn tags(&self) -> Result<Vec<TagRef>, GitError>;

    // -----------------------------------------------------------------------
    // HEAD
    // -----------------------------------------------------------------------

    /// Read HEAD: its target, checked-out branch and detached flag.
    fn head(&self) -> Result<HeadState, GitError>;

    // -----------------------------------------------------------------------
    // Objects
    //
    // Replaces: git cat-file commit, git cat-file blob
    // -----------------------------------------------------------------------

    /// Read a commit's metadata.
    ///
    /// Returns [`GitError::NotFound`] if no such commit exists.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    /// Read the raw contents of a blob.
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError>;

    // -----------------------------------------------------------------------
    // Index
    //
    // Replaces: git ls-files --unmerged
    // -----------------------------------------------------------------------

    /// All conflict-stage (1–3) entries of the index, in index order.
    fn conflict_entries(&self) -> Result<Vec<IndexConflictEntry>, GitError>;
}
