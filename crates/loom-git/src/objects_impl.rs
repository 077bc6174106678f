//! gix-backed object reads.

use gix::bstr::ByteSlice;

use crate::error::GitError;
use crate::gix_repo::{GixRepo, from_gix_oid, to_gix_oid};
use crate::types::{CommitInfo, GitOid};

pub fn read_commit(repo: &GixRepo, oid: GitOid) -> Result<CommitInfo, GitError> {
    let commit = repo
        .repo
        .find_commit(to_gix_oid(oid))
        .map_err(|e| GitError::NotFound {
            message: format!("commit {oid}: {e}"),
        })?;

    let decoded = commit.decode().map_err(|e| GitError::BackendError {
        message: format!("failed to decode commit {oid}: {e}"),
    })?;

    let parents = decoded.parents().map(|p| from_gix_oid(&p)).collect();
    let message = decoded.message.to_str_lossy().into_owned();
    let author = decoded.author();
    let author_name = author.name.to_str_lossy().into_owned();
    let author_email = author.email.to_str_lossy().into_owned();
    let time = commit.time().map(|t| t.seconds).unwrap_or(0);

    Ok(CommitInfo {
        id: oid,
        parents,
        message,
        author_name,
        author_email,
        time,
    })
}

pub fn read_blob(repo: &GixRepo, oid: GitOid) -> Result<Vec<u8>, GitError> {
    let mut blob = repo
        .repo
        .find_blob(to_gix_oid(oid))
        .map_err(|e| GitError::NotFound {
            message: format!("blob {oid}: {e}"),
        })?;
    Ok(blob.take_data())
}
