//! The gix-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{BranchRef, CommitInfo, GitOid, HeadState, IndexConflictEntry, RemoteInfo, TagRef};

/// A [`GitRepo`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// Construct via [`GixRepo::open`].
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: Option<PathBuf>,
}

impl GixRepo {
    /// Open the git repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(path).map_err(|e| GitError::BackendError {
            message: format!("failed to open repository at {}: {e}", path.display()),
        })?;
        let workdir = repo.workdir().map(Path::to_path_buf);
        Ok(Self { repo, workdir })
    }
}

/// Convert a `GitOid` to a `gix::ObjectId`.
pub(crate) fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

/// Convert a `gix::oid` to our `GitOid`.
pub(crate) fn from_gix_oid(oid: &gix::oid) -> GitOid {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(oid.as_bytes());
    GitOid::from_bytes(bytes)
}

pub(crate) fn backend<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> GitError + '_ {
    move |e| GitError::BackendError {
        message: format!("{context}: {e}"),
    }
}

impl GitRepo for GixRepo {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn git_dir(&self) -> &Path {
        self.repo.git_dir()
    }

    // === Refs ===
    fn local_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        crate::refs_impl::branches_under(self, "refs/heads/")
    }

    fn remote_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        crate::refs_impl::branches_under(self, "refs/remotes/")
    }

    fn remotes(&self) -> Result<Vec<RemoteInfo>, GitError> {
        crate::refs_impl::remotes(self)
    }

    fn tags(&self) -> Result<Vec<TagRef>, GitError> {
        crate::refs_impl::tags(self)
    }

    // === HEAD ===
    fn head(&self) -> Result<HeadState, GitError> {
        crate::refs_impl::head(self)
    }

    // === Objects ===
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::objects_impl::read_commit(self, oid)
    }

    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
        crate::objects_impl::read_blob(self, oid)
    }

    // === Index ===
    fn conflict_entries(&self) -> Result<Vec<IndexConflictEntry>, GitError> {
        crate::index_impl::conflict_entries(self)
    }
}
