//! gitloom library crate.
//!
//! Reconstructs a labeled, paginated commit graph from raw repository
//! primitives and reapplies stash entries onto a dirty working tree without
//! ever losing either side. The `gitloom` binary is a thin CLI over
//! [`engine::Engine`].
//!
//! Reads go through [`loom_git::GitRepo`]; every mutation of the working
//! tree, index or stash list goes through a [`loom_git::CommandExecutor`].

pub mod classify;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod graph;
pub mod model;
pub mod ops;
pub mod runner;
pub mod stash;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use engine::Engine;
pub use error::{EngineError, Result};
