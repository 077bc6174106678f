//! Index conflict-stage reads for [`GixRepo`].

use gix::bstr::ByteSlice;

use crate::error::GitError;
use crate::gix_repo::{GixRepo, backend, from_gix_oid};
use crate::types::{ConflictStage, IndexConflictEntry};

/// Every stage 1–3 entry of the on-disk index.
///
/// A repository without an index file (fresh `git init`) has no conflicts.
pub fn conflict_entries(repo: &GixRepo) -> Result<Vec<IndexConflictEntry>, GitError> {
    if !repo.repo.index_path().exists() {
        return Ok(Vec::new());
    }
    let index = repo
        .repo
        .open_index()
        .map_err(backend("failed to open index"))?;

    let mut out = Vec::new();
    for entry in index.entries() {
        let Some(stage) = ConflictStage::from_raw(entry.stage_raw()) else {
            continue;
        };
        out.push(IndexConflictEntry {
            path: entry.path(&index).to_str_lossy().into_owned(),
            stage,
            oid: from_gix_oid(&entry.id),
        });
    }
    Ok(out)
}
