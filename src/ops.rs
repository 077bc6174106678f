//! Merge-like operations: branch merge, cherry-pick, rebase and abort.
//!
//! Each runs one backend command and interprets its exit into a
//! [`MergeOutcome`]. None of them starts while the repository is stopped
//! in another operation.

use loom_git::{CommandExecutor, CommandOutput, GitRepo};
use tracing::instrument;

use crate::classify::{self, BackendErrorKind};
use crate::config::LoomConfig;
use crate::conflict::ConflictStateTracker;
use crate::error::{EngineError, Result};
use crate::model::{MergeOutcome, RepoState};
use crate::runner::GitRunner;

/// How [`MergeOps::merge_branch`] joins the histories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Fast-forward when possible, otherwise create a merge commit.
    #[default]
    Normal,
    /// Only fast-forward; fail if the branches have diverged.
    FastForwardOnly,
    /// Stage the combined changes without committing or recording a merge.
    Squash,
}

impl MergeMode {
    const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::FastForwardOnly => Some("--ff-only"),
            Self::Squash => Some("--squash"),
        }
    }
}

pub struct MergeOps<'a> {
    git: GitRunner<'a>,
    tracker: ConflictStateTracker<'a>,
}

impl<'a> MergeOps<'a> {
    pub fn new(
        repo: &'a dyn GitRepo,
        exec: &'a dyn CommandExecutor,
        workdir: &std::path::Path,
        config: &LoomConfig,
    ) -> Self {
        let git = GitRunner::new(exec, workdir, &config.backend);
        Self {
            tracker: ConflictStateTracker::new(repo, git.clone()),
            git,
        }
    }

    /// Merge `branch` into the current branch.
    ///
    /// # Errors
    /// [`EngineError::InvalidState`] if another operation is stopped.
    #[instrument(skip(self))]
    pub fn merge_branch(&self, branch: &str, mode: MergeMode) -> Result<MergeOutcome> {
        self.require_clean("merge")?;
        let mut args = vec!["merge", "--no-edit"];
        args.extend(mode.flag());
        args.push(branch);
        let out = self.git.run(&args)?;
        self.interpret(&out)
    }

    /// Apply the change introduced by `rev` on top of HEAD.
    ///
    /// # Errors
    /// [`EngineError::InvalidState`] if another operation is stopped.
    #[instrument(skip(self))]
    pub fn cherry_pick(&self, rev: &str) -> Result<MergeOutcome> {
        self.require_clean("cherry-pick")?;
        let out = self.git.run(&["cherry-pick", rev])?;
        self.interpret(&out)
    }

    /// Replay the current branch onto `upstream`.
    ///
    /// Stops at the first conflicting commit with
    /// [`MergeOutcome::Conflicts`]; the repository is then
    /// [`RepoState::RebaseInProgress`].
    ///
    /// # Errors
    /// [`EngineError::InvalidState`] if another operation is stopped.
    #[instrument(skip(self))]
    pub fn rebase_onto(&self, upstream: &str) -> Result<MergeOutcome> {
        self.require_clean("rebase")?;
        let out = self.git.run(&["rebase", upstream])?;
        self.interpret(&out)
    }

    /// Abandon whatever operation is stopped and return to its start.
    ///
    /// # Errors
    /// [`EngineError::InvalidState`] when nothing is in progress, or a
    /// backend error if the abort itself fails.
    #[instrument(skip(self))]
    pub fn abort(&self) -> Result<RepoState> {
        let state = self.tracker.state()?;
        let args: &[&str] = match &state {
            RepoState::Clean => {
                return Err(EngineError::InvalidState {
                    message: "nothing to abort".to_owned(),
                });
            }
            RepoState::MergeInProgress { .. } => &["merge", "--abort"],
            RepoState::RebaseInProgress => &["rebase", "--abort"],
            RepoState::CherryPickInProgress => &["cherry-pick", "--abort"],
            RepoState::OrphanedConflict => &["reset", "--merge"],
        };
        self.git.run_ok(args)?;
        tracing::info!(%state, "aborted");
        Ok(state)
    }

    fn require_clean(&self, what: &str) -> Result<()> {
        let state = self.tracker.state()?;
        if state.is_busy() {
            return Err(EngineError::InvalidState {
                message: format!("cannot {what} while {state}; finish or abort it first"),
            });
        }
        Ok(())
    }

    fn interpret(&self, out: &CommandOutput) -> Result<MergeOutcome> {
        if out.success() {
            return Ok(MergeOutcome::Success);
        }
        let combined = out.combined();
        let kind = classify::classify(&combined);
        if kind == BackendErrorKind::UnrelatedHistories {
            return Ok(MergeOutcome::UnrelatedHistories);
        }
        let paths = self.tracker.conflicted_paths()?;
        if !paths.is_empty() || kind == BackendErrorKind::Conflict {
            return Ok(MergeOutcome::Conflicts(paths));
        }
        tracing::debug!(%kind, "operation failed");
        Ok(MergeOutcome::Failure(classify::headline(&combined)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRepo, Script};

    fn repo(dir: &tempfile::TempDir) -> FakeRepo {
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(&git_dir).unwrap();
        FakeRepo {
            git_dir,
            ..FakeRepo::default()
        }
    }

    fn ops<'a>(repo: &'a FakeRepo, exec: &'a Script) -> MergeOps<'a> {
        MergeOps::new(repo, exec, repo.git_dir.parent().unwrap(), &LoomConfig::default())
    }

    #[test]
    fn merge_modes_pass_flags() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on("merge --no-edit topic", 0, "")
            .on("merge --no-edit --ff-only topic", 0, "")
            .on("merge --no-edit --squash topic", 0, "");
        let ops = ops(&repo, &exec);
        for mode in [MergeMode::Normal, MergeMode::FastForwardOnly, MergeMode::Squash] {
            assert_eq!(ops.merge_branch("topic", mode).unwrap(), MergeOutcome::Success);
        }
        assert!(exec.finished());
    }

    #[test]
    fn conflicting_merge_lists_paths() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on("merge --no-edit topic", 1, "CONFLICT (content): Merge conflict in a.txt\n")
            .on("diff --name-only --diff-filter=U", 0, "a.txt\0");
        let outcome = ops(&repo, &exec).merge_branch("topic", MergeMode::Normal).unwrap();
        assert_eq!(outcome, MergeOutcome::Conflicts(vec!["a.txt".to_owned()]));
    }

    #[test]
    fn unrelated_histories() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default().on_stderr(
            "merge",
            128,
            "fatal: refusing to merge unrelated histories\n",
        );
        let outcome = ops(&repo, &exec).merge_branch("other", MergeMode::Normal).unwrap();
        assert_eq!(outcome, MergeOutcome::UnrelatedHistories);
    }

    #[test]
    fn diverged_fast_forward_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on_stderr("merge --no-edit --ff-only", 128, "fatal: Not possible to fast-forward, aborting.\n")
            .on("diff", 0, "")
            .on("status", 0, "");
        let outcome = ops(&repo, &exec)
            .merge_branch("topic", MergeMode::FastForwardOnly)
            .unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Failure("Not possible to fast-forward, aborting.".to_owned())
        );
    }

    #[test]
    fn refuses_while_rebasing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        std::fs::create_dir(repo.git_dir.join("rebase-merge")).unwrap();
        let exec = Script::default();
        let err = ops(&repo, &exec).cherry_pick("abc123").unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { message } if message.contains("rebase")));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn abort_picks_command_from_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        std::fs::write(repo.git_dir.join("CHERRY_PICK_HEAD"), "x").unwrap();
        let exec = Script::default().on("cherry-pick --abort", 0, "");
        assert_eq!(ops(&repo, &exec).abort().unwrap(), RepoState::CherryPickInProgress);
        assert!(exec.finished());
    }

    #[test]
    fn abort_with_nothing_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default();
        assert!(matches!(
            ops(&repo, &exec).abort().unwrap_err(),
            EngineError::InvalidState { .. }
        ));
    }

    #[test]
    fn rebase_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on_stderr("rebase main", 1, "error: could not apply 1a2b3c4... change\n")
            .on("diff", 0, "src/x.rs\0");
        assert_eq!(
            ops(&repo, &exec).rebase_onto("main").unwrap(),
            MergeOutcome::Conflicts(vec!["src/x.rs".to_owned()])
        );
    }
}
