//! Conflict-safe stash reapplication.
//!
//! [`StashMergeEngine::pop`] drives the [`machine`] through up to three
//! tiers:
//!
//! 1. DIRECT: clean tree, `git stash pop`.
//! 2. PATCH: dirty tree, render the entry as a diff and apply it with a
//!    fuzzy patch tool (dry run first, then for real, then verified).
//! 3. RECONCILE: park the dirty tree in a temporary stash entry (built with
//!    `stash create` + `stash store`, so its id is known exactly), apply the
//!    entry onto the clean tree, stage it, then apply the temporary entry on
//!    top so the backend's own merge machinery produces conflict markers.
//!
//! If reconciliation fails without conflicts the tree is reset and the
//! temporary stash reapplied (RESTORE).
//!
//! Entries are tracked by object id, never by index or message: pushing
//! the temporary stash shifts every index, and a message is just text.
//! Before each phase the stash list is checked against what the phase
//! expects to exist; a missing target stops the run with
//! [`EngineError::DataLossRisk`] before anything else is touched.

pub mod list;
pub mod machine;
pub mod patch;

use std::collections::HashSet;

use loom_git::{CommandExecutor, GitOid, GitRepo};
use serde::Serialize;
use tracing::instrument;

use crate::classify;
use crate::config::LoomConfig;
use crate::conflict::ConflictStateTracker;
use crate::error::{EngineError, Result};
use crate::model::{MergeOutcome, StashEntry, oid_hex, stash_ref};
use crate::runner::GitRunner;

pub use list::list;
pub use machine::{Inventory, Phase, PhaseResult, Transition};
use patch::{ApplyResult, PatchMode, PatchTool, TouchedPath};

/// Handle to the temporary stash entry a reconcile left behind.
///
/// Identifies the entry by object id, so it stays valid while other
/// entries are pushed or dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TempStash {
    #[serde(serialize_with = "oid_hex")]
    id: GitOid,
}

impl TempStash {
    #[must_use]
    pub const fn from_id(id: GitOid) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(&self) -> GitOid {
        self.id
    }
}

/// Result of [`StashMergeEngine::pop`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StashPop {
    pub outcome: MergeOutcome,
    /// The phase that produced the outcome.
    pub phase: Phase,
    /// Present while the user's pre-pop changes are parked in a stash
    /// entry: after a conflicted reconcile, or when a restore failed.
    pub temp: Option<TempStash>,
}

/// Reapplies stash entries onto a possibly dirty working tree.
pub struct StashMergeEngine<'a> {
    git: GitRunner<'a>,
    tracker: ConflictStateTracker<'a>,
    patch: PatchTool,
    temp_message: String,
}

impl<'a> StashMergeEngine<'a> {
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
            patch: PatchTool::new(&config.backend),
            temp_message: config.stash.temp_message.clone(),
        }
    }

    /// Every stash entry, newest first.
    ///
    /// # Errors
    /// Fails when the stash list cannot be read.
    pub fn list(&self) -> Result<Vec<StashEntry>> {
        list(&self.git)
    }

    /// Reapply `stash@{index}` onto the current working tree.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if there is no such entry.
    /// - [`EngineError::InvalidState`] while a merge, rebase or cherry-pick
    ///   is stopped.
    /// - [`EngineError::DataLossRisk`] if the entry vanished from the stash
    ///   list mid-run; nothing further is attempted.
    ///
    /// Backend failures during the tiers are reported as
    /// [`MergeOutcome::Failure`], not as errors.
    #[instrument(skip(self), fields(workdir = %self.git.workdir().display()))]
    pub fn pop(&self, index: usize) -> Result<StashPop> {
        let state = self.tracker.state()?;
        if state.is_busy() {
            return Err(EngineError::InvalidState {
                message: format!("cannot reapply a stash while {state}"),
            });
        }
        let entries = self.list()?;
        let target = entries
            .iter()
            .find(|e| e.index == index)
            .map(|e| e.id)
            .ok_or_else(|| EngineError::NotFound {
                what: stash_ref(index),
            })?;

        let dirty = self.git.has_tracked_changes()?;
        let mut phase = machine::start(dirty);
        let mut temp: Option<GitOid> = None;
        tracing::info!(target = %target.short(), dirty, "reapplying stash");

        loop {
            if let Err(e) = self.check_inventory(&phase, target, temp) {
                if let Phase::Restored { reason } = &phase {
                    // nothing left to restore from; say so rather than erroring
                    return Ok(StashPop {
                        outcome: MergeOutcome::Failure(format!("{reason}; {e}")),
                        phase,
                        temp: temp.map(TempStash::from_id),
                    });
                }
                return Err(e);
            }

            let result = match &phase {
                Phase::Direct => self.direct(target)?,
                Phase::PatchAttempt => self.patch_attempt(target)?,
                Phase::CommitReconcile => self.reconcile(target, &mut temp),
                Phase::Restored { .. } => self.restore(&mut temp),
            };
            tracing::debug!(%phase, ?result, "phase finished");

            let finished = phase.clone();
            match phase.transition(result) {
                Transition::Next(next) => {
                    tracing::info!(from = %finished, to = %next, "escalating");
                    phase = next;
                }
                Transition::Done(outcome) => {
                    tracing::info!(phase = %finished, %outcome, "stash reapplication finished");
                    return Ok(StashPop {
                        outcome,
                        phase: finished,
                        temp: temp.map(TempStash::from_id),
                    });
                }
            }
        }
    }

    /// Drop the temporary entry once conflicts are resolved.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if the entry is no longer listed, or a
    /// backend error if the drop fails.
    #[instrument(skip_all, fields(temp = %temp.id.short()))]
    pub fn release_temp(&self, temp: &TempStash) -> Result<()> {
        let index = self.require(temp.id)?;
        let rev = stash_ref(index);
        self.git.run_ok(&["stash", "drop", "-q", &rev])?;
        tracing::info!("temporary stash released");
        Ok(())
    }

    /// Reapply the temporary entry onto a clean tree and drop it.
    ///
    /// For when conflict resolution was abandoned: the caller discards the
    /// conflicted tree first (so the choice to throw it away is theirs),
    /// then gets their pre-pop changes back.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if the entry is no longer listed.
    /// - [`EngineError::DataLossRisk`] if the tree still has changes or
    ///   unmerged paths.
    #[instrument(skip_all, fields(temp = %temp.id.short()))]
    pub fn restore_temp(&self, temp: &TempStash) -> Result<MergeOutcome> {
        let index = self.require(temp.id)?;
        if !self.tracker.conflicted_paths()?.is_empty() || self.git.has_tracked_changes()? {
            return Err(EngineError::DataLossRisk {
                message: "the working tree has changes; commit, stash or discard them \
                          before restoring the temporary stash"
                    .to_owned(),
            });
        }
        let rev = stash_ref(index);
        let out = self.git.run(&["stash", "apply", "-q", &rev])?;
        if !out.success() {
            return Ok(self.apply_failure(&out));
        }
        self.drop_by_id(temp.id);
        Ok(MergeOutcome::Success)
    }

    fn check_inventory(&self, phase: &Phase, target: GitOid, temp: Option<GitOid>) -> Result<()> {
        let expected = phase.entry_inventory();
        let entries = self.list()?;
        let observed = Inventory {
            target: list::position(&entries, target).is_some(),
            temp: temp.is_some_and(|t| list::position(&entries, t).is_some()),
        };
        if expected.target && !observed.target {
            return Err(EngineError::DataLossRisk {
                message: format!(
                    "stash entry {} is no longer in the stash list; stopping before {phase}",
                    target.short()
                ),
            });
        }
        if expected.temp && !observed.temp {
            return Err(EngineError::DataLossRisk {
                message: "the temporary stash holding your changes is no longer in the stash list"
                    .to_owned(),
            });
        }
        Ok(())
    }

    fn direct(&self, target: GitOid) -> Result<PhaseResult> {
        let rev = stash_ref(self.require(target)?);
        let out = self.git.run(&["stash", "pop", "-q", &rev])?;
        if out.success() {
            return Ok(PhaseResult::Applied);
        }
        let paths = self.tracker.conflicted_paths()?;
        if !paths.is_empty() {
            return Ok(PhaseResult::Conflicted(paths));
        }
        let combined = out.combined();
        if classify::is_conflict(&combined) {
            return Ok(PhaseResult::Conflicted(Vec::new()));
        }
        Ok(PhaseResult::Failed(classify::headline(&combined)))
    }

    fn patch_attempt(&self, target: GitOid) -> Result<PhaseResult> {
        let rev = stash_ref(self.require(target)?);

        if self.has_untracked_part(&rev)? {
            // a diff cannot carry the untracked tree
            tracing::debug!("stash has untracked files, skipping patch");
            return Ok(PhaseResult::Rejected);
        }
        let rendered = patch::render(&self.git, &rev)?;
        if rendered.is_empty() {
            return Ok(PhaseResult::Rejected);
        }
        let touched = rendered.touched();
        let workdir = self.git.workdir();

        match self.patch.apply(&self.git, &rendered, PatchMode::DryRun) {
            ApplyResult::Clean => {}
            ApplyResult::Rejected(detail) => {
                tracing::info!(detail = %classify::headline(&detail), "patch dry run rejected hunks");
                return Ok(PhaseResult::Rejected);
            }
            ApplyResult::Failed(msg) => {
                tracing::warn!(error = %msg, "patch tool failed");
                return Ok(PhaseResult::Failed(msg));
            }
        }

        let snapshot = self.snapshot()?;
        let existing: HashSet<&str> = touched
            .iter()
            .filter(|t| workdir.join(&t.path).exists())
            .map(|t| t.path.as_str())
            .collect();

        let applied = self.patch.apply(&self.git, &rendered, PatchMode::Apply) == ApplyResult::Clean
            && self.patch.apply(&self.git, &rendered, PatchMode::VerifyApplied)
                == ApplyResult::Clean;

        if applied {
            self.drop_by_id(target);
            return Ok(PhaseResult::Applied);
        }

        tracing::warn!("patch did not apply cleanly after a clean dry run, rolling back");
        match self.rollback(snapshot, touched, &existing) {
            Ok(()) => Ok(PhaseResult::Rejected),
            Err(msg) => Ok(PhaseResult::Stopped(msg)),
        }
    }

    /// Undo a partial patch: reset tracked files, delete files the patch
    /// created, and reapply the snapshot of the dirty tree.
    fn rollback(
        &self,
        snapshot: Option<GitOid>,
        touched: &[TouchedPath],
        existing: &HashSet<&str>,
    ) -> std::result::Result<(), String> {
        let out = self
            .git
            .run(&["reset", "--hard", "-q"])
            .map_err(|e| e.to_string())?;
        if !out.success() {
            return Err(format!("reset failed: {}", classify::headline(&out.combined())));
        }
        for t in touched.iter().filter(|t| t.created && !existing.contains(t.path.as_str())) {
            if let Err(e) = std::fs::remove_file(self.git.workdir().join(&t.path))
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %t.path, error = %e, "could not remove patched file");
            }
        }
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        let hex = snapshot.to_string();
        match self.git.run(&["stash", "apply", "-q", &hex]) {
            Ok(out) if out.success() => Ok(()),
            _ => {
                // keep the snapshot reachable from the stash list
                let stored = self
                    .git
                    .run(&["stash", "store", "-m", &self.temp_message, &hex])
                    .is_ok_and(|o| o.success());
                Err(if stored {
                    format!("could not restore the working tree; your changes are in stash@{{0}} ({})", snapshot.short())
                } else {
                    format!("could not restore the working tree; your changes are in commit {hex}")
                })
            }
        }
    }

    fn reconcile(&self, target: GitOid, temp: &mut Option<GitOid>) -> PhaseResult {
        let parked = match self.park() {
            Ok(parked) => parked,
            Err(e) => return PhaseResult::Stopped(format!("could not save the working tree: {e}")),
        };
        *temp = parked;
        if let Some(id) = parked {
            tracing::debug!(temp = %id.short(), "working tree parked");
            if let Err(e) = self.git.run_ok(&["reset", "--hard", "-q"]) {
                return PhaseResult::Failed(format!("could not clean the working tree: {e}"));
            }
        } else {
            tracing::debug!("nothing to park");
        }

        let result = match self.reconcile_steps(target, parked) {
            Ok(result) => result,
            Err(e) => PhaseResult::Failed(e.to_string()),
        };
        match result {
            PhaseResult::Applied => {
                self.drop_by_id(target);
                if let Some(id) = parked
                    && self.drop_by_id(id)
                {
                    *temp = None;
                }
                PhaseResult::Applied
            }
            PhaseResult::Conflicted(paths) => {
                // the entry's content is in the tree now; the temp stays
                // until the caller releases it
                self.drop_by_id(target);
                PhaseResult::Conflicted(paths)
            }
            // nothing was parked, so there is nothing to restore
            PhaseResult::Failed(msg) if parked.is_none() => PhaseResult::Stopped(msg),
            other => other,
        }
    }

    /// Save tracked changes as a new stash entry.
    ///
    /// Returns the new entry's id, or `None` when `git stash create` finds
    /// nothing to save. The id comes from `stash create` itself, so an
    /// older entry can never be mistaken for the new one.
    fn park(&self) -> Result<Option<GitOid>> {
        let Some(id) = self.snapshot()? else {
            return Ok(None);
        };
        let hex = id.to_string();
        self.git
            .run_ok(&["stash", "store", "-q", "-m", &self.temp_message, &hex])?;
        self.require(id)?;
        Ok(Some(id))
    }

    fn reconcile_steps(&self, target: GitOid, temp: Option<GitOid>) -> Result<PhaseResult> {
        let rev = stash_ref(self.require(target)?);
        let out = self.git.run(&["stash", "apply", "-q", &rev])?;
        if !out.success() {
            return Ok(PhaseResult::Failed(format!(
                "applying {rev} onto a clean tree failed: {}",
                classify::headline(&out.combined())
            )));
        }
        let Some(temp) = temp else {
            return Ok(PhaseResult::Applied);
        };
        let out = self.git.run(&["add", "-A"])?;
        if !out.success() {
            return Ok(PhaseResult::Failed(format!(
                "staging {rev} failed: {}",
                classify::headline(&out.combined())
            )));
        }

        let temp_rev = stash_ref(self.require(temp)?);
        let out = self.git.run(&["stash", "apply", "-q", &temp_rev])?;
        if out.success() {
            return Ok(PhaseResult::Applied);
        }
        let paths = self.tracker.conflicted_paths()?;
        if !paths.is_empty() {
            return Ok(PhaseResult::Conflicted(paths));
        }
        Ok(PhaseResult::Failed(format!(
            "reapplying your changes failed: {}",
            classify::headline(&out.combined())
        )))
    }

    fn restore(&self, temp: &mut Option<GitOid>) -> PhaseResult {
        let Some(temp_id) = *temp else {
            return PhaseResult::Stopped("no temporary stash to restore from".to_owned());
        };
        match self.restore_steps(temp_id) {
            Ok(()) => {
                if self.drop_by_id(temp_id) {
                    *temp = None;
                }
                PhaseResult::Applied
            }
            Err(e) => PhaseResult::Failed(e.to_string()),
        }
    }

    fn restore_steps(&self, temp: GitOid) -> Result<()> {
        self.git.run_ok(&["reset", "--hard", "-q"])?;
        let rev = stash_ref(self.require(temp)?);
        self.git.run_ok(&["stash", "apply", "-q", &rev])?;
        Ok(())
    }

    /// `git stash create`: snapshot tracked changes without touching the
    /// stash list. `None` when there is nothing to snapshot.
    fn snapshot(&self) -> Result<Option<GitOid>> {
        let out = self.git.run_ok(&["stash", "create"])?;
        let hex = out.trim();
        if hex.is_empty() {
            return Ok(None);
        }
        hex.parse()
            .map(Some)
            .map_err(|e: loom_git::OidParseError| EngineError::InvalidState {
                message: format!("unexpected `git stash create` output: {e}"),
            })
    }

    fn has_untracked_part(&self, rev: &str) -> Result<bool> {
        let third_parent = format!("{rev}^3");
        Ok(self
            .git
            .run(&["rev-parse", "-q", "--verify", &third_parent])?
            .success())
    }

    /// Current index of the entry with id `id`.
    fn require(&self, id: GitOid) -> Result<usize> {
        list::position(&self.list()?, id).ok_or_else(|| EngineError::NotFound {
            what: format!("stash entry {}", id.short()),
        })
    }

    /// Best-effort drop; `true` if the entry is gone afterwards.
    fn drop_by_id(&self, id: GitOid) -> bool {
        let index = match self.require(id) {
            Ok(index) => index,
            Err(EngineError::NotFound { .. }) => return true,
            Err(e) => {
                tracing::warn!(entry = %id.short(), error = %e, "could not locate stash entry to drop");
                return false;
            }
        };
        let rev = stash_ref(index);
        match self.git.run(&["stash", "drop", "-q", &rev]) {
            Ok(out) if out.success() => true,
            Ok(out) => {
                tracing::warn!(entry = %id.short(), error = %classify::headline(&out.combined()), "stash drop failed");
                false
            }
            Err(e) => {
                tracing::warn!(entry = %id.short(), error = %e, "stash drop failed");
                false
            }
        }
    }

    fn apply_failure(&self, out: &loom_git::CommandOutput) -> MergeOutcome {
        let combined = out.combined();
        if classify::is_conflict(&combined) {
            match self.tracker.conflicted_paths() {
                Ok(paths) => return MergeOutcome::Conflicts(paths),
                Err(e) => tracing::warn!(error = %e, "could not list conflicts"),
            }
        }
        MergeOutcome::Failure(classify::headline(&combined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRepo, Script};

    const TARGET: &str = "1111111111111111111111111111111111111111";
    const TEMP: &str = "2222222222222222222222222222222222222222";
    const OTHER: &str = "3333333333333333333333333333333333333333";

    fn entries(ids: &[&str]) -> String {
        ids.iter()
            .map(|id| format!("{id}\u{1f}On main: x\u{1f}T\u{1f}1\n"))
            .collect()
    }

    fn repo(dir: &tempfile::TempDir) -> FakeRepo {
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(&git_dir).unwrap();
        FakeRepo {
            git_dir,
            ..FakeRepo::default()
        }
    }

    #[test]
    fn missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default().on("stash list", 0, &entries(&[TARGET]));
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let err = engine.pop(3).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { what } if what == "stash@{3}"));
    }

    #[test]
    fn refuses_while_merge_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        std::fs::write(repo.git_dir.join("MERGE_HEAD"), format!("{TARGET}\n")).unwrap();
        let exec = Script::default();
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let err = engine.pop(0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn clean_tree_pops_directly() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on("stash list", 0, &entries(&[TARGET]))
            .on("status", 0, "")
            .on("stash list", 0, &entries(&[TARGET]))
            .on("stash list", 0, &entries(&[TARGET]))
            .on("stash pop -q stash@{0}", 0, "");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let pop = engine.pop(0).unwrap();
        assert_eq!(pop.outcome, MergeOutcome::Success);
        assert_eq!(pop.phase, Phase::Direct);
        assert_eq!(pop.temp, None);
    }

    #[test]
    fn vanished_target_is_data_loss_risk() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on("stash list", 0, &entries(&[TARGET]))
            .on("status", 0, "")
            // something else dropped it in between
            .on("stash list", 0, "");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let err = engine.pop(0).unwrap_err();
        assert!(matches!(err, EngineError::DataLossRisk { .. }), "{err}");
    }

    #[test]
    fn reconcile_conflict_keeps_temp_and_drops_target() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let both = entries(&[TEMP, TARGET]);
        let exec = Script::default()
            .on("stash list", 0, &entries(&[TARGET]))
            .on("status", 0, " M a.txt\n")
            // PatchAttempt: entry check, locate, untracked check, empty diff
            .on("stash list", 0, &entries(&[TARGET]))
            .on("stash list", 0, &entries(&[TARGET]))
            .on("rev-parse -q --verify stash@{0}^3", 1, "")
            .on("diff --no-color", 0, "")
            // CommitReconcile: park the tree under the id stash create gave
            .on("stash list", 0, &entries(&[TARGET]))
            .on("stash create", 0, &format!("{TEMP}\n"))
            .on(&format!("stash store -q -m gitloom: reconcile snapshot {TEMP}"), 0, "")
            .on("stash list", 0, &both)
            .on("reset --hard -q", 0, "")
            .on("stash list", 0, &both)
            .on("stash apply -q stash@{1}", 0, "")
            .on("add -A", 0, "")
            .on("stash list", 0, &both)
            .on("stash apply -q stash@{0}", 1, "")
            .on("diff --name-only --diff-filter=U -z", 0, "a.txt\0")
            // drop target by id
            .on("stash list", 0, &both)
            .on("stash drop -q stash@{1}", 0, "");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let pop = engine.pop(0).unwrap();
        assert_eq!(pop.outcome, MergeOutcome::Conflicts(vec!["a.txt".to_owned()]));
        assert_eq!(pop.phase, Phase::CommitReconcile);
        assert_eq!(pop.temp.map(|t| t.id().to_string()).as_deref(), Some(TEMP));
        assert!(exec.finished());
    }

    #[test]
    fn reconcile_failure_restores() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let both = entries(&[TEMP, TARGET]);
        let exec = Script::default()
            .on("stash list", 0, &entries(&[TARGET]))
            .on("status", 0, " M a.txt\n")
            .on("stash list", 0, &entries(&[TARGET]))
            .on("stash list", 0, &entries(&[TARGET]))
            .on("rev-parse -q --verify stash@{0}^3", 0, "")
            // CommitReconcile
            .on("stash list", 0, &entries(&[TARGET]))
            .on("stash create", 0, &format!("{TEMP}\n"))
            .on("stash store -q -m", 0, "")
            .on("stash list", 0, &both)
            .on("reset --hard -q", 0, "")
            .on("stash list", 0, &both)
            .on("stash apply -q stash@{1}", 1, "")
            // Restored
            .on("stash list", 0, &both)
            .on("reset --hard -q", 0, "")
            .on("stash list", 0, &both)
            .on("stash apply -q stash@{0}", 0, "")
            .on("stash list", 0, &both)
            .on("stash drop -q stash@{0}", 0, "");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let pop = engine.pop(0).unwrap();
        assert!(matches!(&pop.outcome, MergeOutcome::Failure(m) if m.contains("restored")), "{:?}", pop.outcome);
        assert!(matches!(pop.phase, Phase::Restored { .. }));
        assert_eq!(pop.temp, None);
        assert!(exec.finished());
    }

    #[test]
    fn nothing_to_park_leaves_other_entries_alone() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        // an unrelated entry sits on top; stash create saves nothing
        let both = entries(&[OTHER, TARGET]);
        let exec = Script::default()
            .on("stash list", 0, &both)
            .on("status", 0, " M a.txt\n")
            .on("stash list", 0, &both)
            .on("stash list", 0, &both)
            .on("rev-parse -q --verify stash@{1}^3", 0, "")
            // CommitReconcile
            .on("stash list", 0, &both)
            .on("stash create", 0, "")
            .on("stash list", 0, &both)
            .on("stash apply -q stash@{1}", 0, "")
            .on("stash list", 0, &both)
            .on("stash drop -q stash@{1}", 0, "");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let pop = engine.pop(1).unwrap();
        assert_eq!(pop.outcome, MergeOutcome::Success);
        assert_eq!(pop.phase, Phase::CommitReconcile);
        assert_eq!(pop.temp, None);
        assert!(exec.finished());
        let calls = exec.calls();
        assert!(!calls.iter().any(|c| c.starts_with("stash store")));
        assert!(!calls.iter().any(|c| c.contains("stash@{0}")), "{calls:?}");
    }

    #[test]
    fn release_temp_drops_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on("stash list", 0, &entries(&[TARGET, TEMP]))
            .on("stash drop -q stash@{1}", 0, "");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        engine
            .release_temp(&TempStash::from_id(TEMP.parse().unwrap()))
            .unwrap();
        assert_eq!(exec.calls().last().map(String::as_str), Some("stash drop -q stash@{1}"));
    }

    #[test]
    fn release_of_unknown_temp_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default().on("stash list", 0, &entries(&[TARGET]));
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let err = engine
            .release_temp(&TempStash::from_id(TEMP.parse().unwrap()))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn restore_temp_refuses_dirty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let exec = Script::default()
            .on("stash list", 0, &entries(&[TEMP]))
            .on("diff --name-only", 0, "")
            .on("status --porcelain=v1", 0, "")
            .on("status --porcelain --untracked-files=no", 0, " M a.txt\n");
        let engine = StashMergeEngine::new(&repo, &exec, dir.path(), &LoomConfig::default());
        let err = engine
            .restore_temp(&TempStash::from_id(TEMP.parse().unwrap()))
            .unwrap_err();
        assert!(matches!(err, EngineError::DataLossRisk { .. }));
    }
}
