//! Engine facade: one repository, one executor, one configuration.
//!
//! [`Engine`] owns the collaborators and hands out short-lived views
//! ([`CommitGraphBuilder`], [`ConflictStateTracker`], [`StashMergeEngine`],
//! [`MergeOps`]) borrowing them. Operations on one engine must not run
//! concurrently; the working tree, index and stash list are shared.

use std::path::{Path, PathBuf};

use loom_git::{CommandExecutor, GitRepo, GixRepo, ProcessExecutor};

use crate::config::LoomConfig;
use crate::conflict::ConflictStateTracker;
use crate::error::{EngineError, Result};
use crate::graph::CommitGraphBuilder;
use crate::ops::MergeOps;
use crate::runner::GitRunner;
use crate::stash::StashMergeEngine;

pub struct Engine {
    repo: Box<dyn GitRepo>,
    exec: Box<dyn CommandExecutor>,
    workdir: PathBuf,
    config: LoomConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("workdir", &self.workdir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Open the repository at or above `path` with the gix handle and real
    /// processes.
    ///
    /// `config` overrides the file lookup; otherwise `gitloom.toml` in the
    /// git directory is read if present.
    ///
    /// # Errors
    /// Fails if no repository is found, the repository is bare, or the
    /// configuration file is invalid.
    pub fn open(path: &Path, config: Option<&Path>) -> Result<Self> {
        let repo = GixRepo::open(path)?;
        let config_path = config.map_or_else(
            || repo.git_dir().join(LoomConfig::FILE_NAME),
            Path::to_path_buf,
        );
        let config = LoomConfig::load(&config_path)?;
        tracing::debug!(config = %config_path.display(), "configuration loaded");
        Self::with_parts(Box::new(repo), Box::new(ProcessExecutor::new()), config)
    }

    /// Assemble an engine from explicit collaborators.
    ///
    /// # Errors
    /// [`EngineError::InvalidState`] for a repository without a working
    /// tree.
    pub fn with_parts(
        repo: Box<dyn GitRepo>,
        exec: Box<dyn CommandExecutor>,
        config: LoomConfig,
    ) -> Result<Self> {
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| EngineError::InvalidState {
                message: format!(
                    "repository at {} has no working tree",
                    repo.git_dir().display()
                ),
            })?;
        Ok(Self {
            repo,
            exec,
            workdir,
            config,
        })
    }

    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[must_use]
    pub const fn config(&self) -> &LoomConfig {
        &self.config
    }

    #[must_use]
    pub fn repo(&self) -> &dyn GitRepo {
        self.repo.as_ref()
    }

    #[must_use]
    pub fn graph(&self) -> CommitGraphBuilder<'_> {
        CommitGraphBuilder::new(self.repo.as_ref(), &self.config.graph)
    }

    #[must_use]
    pub fn tracker(&self) -> ConflictStateTracker<'_> {
        ConflictStateTracker::new(self.repo.as_ref(), self.runner())
    }

    #[must_use]
    pub fn stash(&self) -> StashMergeEngine<'_> {
        StashMergeEngine::new(
            self.repo.as_ref(),
            self.exec.as_ref(),
            &self.workdir,
            &self.config,
        )
    }

    #[must_use]
    pub fn ops(&self) -> MergeOps<'_> {
        MergeOps::new(
            self.repo.as_ref(),
            self.exec.as_ref(),
            &self.workdir,
            &self.config,
        )
    }

    fn runner(&self) -> GitRunner<'_> {
        GitRunner::new(self.exec.as_ref(), &self.workdir, &self.config.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRepo, Script};

    #[test]
    fn bare_repository_is_rejected() {
        let repo = FakeRepo::default();
        let err = Engine::with_parts(
            Box::new(repo),
            Box::new(Script::default()),
            LoomConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn views_share_the_workdir() {
        let repo = FakeRepo {
            git_dir: PathBuf::from("/work/repo/.git"),
            ..FakeRepo::default()
        };
        let engine = Engine::with_parts(
            Box::new(repo),
            Box::new(Script::default()),
            LoomConfig::default(),
        )
        .unwrap();
        assert_eq!(engine.workdir(), Path::new("/work/repo"));
        assert_eq!(engine.config().graph.page_size, 500);
    }
}
