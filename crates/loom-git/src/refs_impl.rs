//! gix-backed ref enumeration and HEAD inspection.

use gix::bstr::ByteSlice;
use tracing::warn;

use crate::error::GitError;
use crate::gix_repo::{GixRepo, backend, from_gix_oid};
use crate::types::{BranchRef, HeadState, RemoteInfo, TagRef};

/// Peeled `(short_name, oid)` pairs for every ref under `prefix`.
///
/// Refs that fail to peel (dangling symbolic refs, missing objects) are
/// skipped with a warning rather than failing the whole listing.
fn peeled_refs(repo: &GixRepo, prefix: &str) -> Result<Vec<(String, crate::GitOid)>, GitError> {
    let platform = repo
        .repo
        .references()
        .map_err(backend("failed to open ref store"))?;
    let refs_iter = platform
        .prefixed(prefix)
        .map_err(backend("failed to iterate refs"))?;

    let mut result = Vec::new();
    for r in refs_iter {
        let mut r = r.map_err(backend("failed to read ref"))?;
        let full = r.name().as_bstr().to_str_lossy().into_owned();
        let Some(short) = full.strip_prefix(prefix).map(str::to_owned) else {
            continue;
        };
        match r.peel_to_id_in_place() {
            Ok(id) => result.push((short, from_gix_oid(&id.detach()))),
            Err(e) => warn!(reference = %full, error = %e, "skipping unpeelable ref"),
        }
    }
    result.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(result)
}

pub fn branches_under(repo: &GixRepo, prefix: &str) -> Result<Vec<BranchRef>, GitError> {
    Ok(peeled_refs(repo, prefix)?
        .into_iter()
        .map(|(name, target)| BranchRef { name, target })
        .collect())
}

pub fn tags(repo: &GixRepo) -> Result<Vec<TagRef>, GitError> {
    Ok(peeled_refs(repo, "refs/tags/")?
        .into_iter()
        .map(|(name, target)| TagRef { name, target })
        .collect())
}

pub fn remotes(repo: &GixRepo) -> Result<Vec<RemoteInfo>, GitError> {
    let mut remotes = Vec::new();
    for name in repo.repo.remote_names() {
        let remote = repo
            .repo
            .find_remote(name.as_ref())
            .map_err(backend("failed to read remote"))?;
        let url = remote
            .url(gix::remote::Direction::Fetch)
            .map(|u| u.to_bstring().to_str_lossy().into_owned());
        remotes.push(RemoteInfo {
            name: name.to_str_lossy().into_owned(),
            url,
        });
    }
    remotes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(remotes)
}

pub fn head(repo: &GixRepo) -> Result<HeadState, GitError> {
    let head = repo.repo.head().map_err(backend("failed to read HEAD"))?;
    let target = head.id().map(|id| from_gix_oid(&id.detach()));
    let detached = head.is_detached();
    let branch = if detached {
        None
    } else {
        head.referent_name()
            .map(|n| n.shorten().to_str_lossy().into_owned())
    };
    Ok(HeadState {
        target,
        branch,
        detached,
    })
}
