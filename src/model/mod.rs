//! Value objects produced by the engine.
//!
//! Everything here is built fresh per graph build or merge attempt and is
//! never cached. Object ids serialize as 40-character hex strings.

pub mod commit;
pub mod conflict;
pub mod outcome;
pub mod stash;

pub use commit::{BranchLabel, Commit, RemoteBranchRef, RemoteKind};
pub use conflict::{ConflictRecord, RepoState};
pub use outcome::MergeOutcome;
pub use stash::{StashEntry, stash_ref};

use loom_git::GitOid;
use serde::Serializer;

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn oid_hex<S: Serializer>(oid: &GitOid, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(oid)
}

pub(crate) fn oid_hex_vec<S: Serializer>(oids: &[GitOid], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(oids.iter().map(ToString::to_string))
}
