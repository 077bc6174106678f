//! Repository handle and command execution layer for gitloom.
//!
//! This crate defines the two collaborators the gitloom engine is built on:
//!
//! - [`GitRepo`]: a read view over one repository's refs, objects and index,
//!   implemented by [`GixRepo`] on top of gix.
//! - [`CommandExecutor`]: runs backend commands (and the external `patch`
//!   tool) with a stable locale, implemented by [`ProcessExecutor`].
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`exec`]: the [`CommandExecutor`] trait and [`ProcessExecutor`].
//! - [`types`]: value types used in trait signatures ([`GitOid`],
//!   [`CommitInfo`], [`BranchRef`], etc.).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.

pub mod error;
pub mod exec;
pub mod repo;
pub mod types;

// gix-backed implementation modules
mod gix_repo;
mod index_impl;
mod objects_impl;
mod refs_impl;

pub use gix_repo::GixRepo;

pub use error::GitError;
pub use exec::{CommandExecutor, ProcessExecutor};
pub use repo::GitRepo;
pub use types::{
    BranchRef, CommandOutput, CommitInfo, ConflictStage, GitOid, HeadState, IndexConflictEntry,
    OidParseError, RemoteInfo, TagRef,
};
