//! Repository state and conflict inspection.
//!
//! Different stopped operations surface their conflicts through different
//! primitives, so [`ConflictStateTracker::conflicted_paths`] asks three
//! sources in turn: an unmerged-filtered diff, porcelain status, and the
//! index's own stage entries.

use std::collections::BTreeMap;
use std::path::Path;

use loom_git::{ConflictStage, GitOid, GitRepo};
use tracing::instrument;

use crate::error::{EngineError, Result};
use crate::model::{ConflictRecord, RepoState};
use crate::runner::{GitRunner, split_nul};

/// How to settle one conflicting path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Take the "ours" side (stage 2).
    Ours,
    /// Take the "theirs" side (stage 3).
    Theirs,
    /// Keep the working-tree file as edited by the user.
    MarkResolved,
}

/// Reads the repository's in-progress state and its conflicts.
pub struct ConflictStateTracker<'a> {
    repo: &'a dyn GitRepo,
    git: GitRunner<'a>,
}

impl<'a> ConflictStateTracker<'a> {
    pub const fn new(repo: &'a dyn GitRepo, git: GitRunner<'a>) -> Self {
        Self { repo, git }
    }

    /// Classify the repository.
    ///
    /// # Errors
    /// Fails only when the index cannot be read.
    pub fn state(&self) -> Result<RepoState> {
        let git_dir = self.repo.git_dir();
        if git_dir.join("MERGE_HEAD").is_file() {
            return Ok(RepoState::MergeInProgress {
                incoming: incoming_name(git_dir),
            });
        }
        if git_dir.join("rebase-merge").is_dir() || git_dir.join("rebase-apply").is_dir() {
            return Ok(RepoState::RebaseInProgress);
        }
        if git_dir.join("CHERRY_PICK_HEAD").is_file() {
            return Ok(RepoState::CherryPickInProgress);
        }
        if !self.repo.conflict_entries()?.is_empty() {
            return Ok(RepoState::OrphanedConflict);
        }
        Ok(RepoState::Clean)
    }

    /// Paths with unmerged entries, sorted and deduplicated.
    ///
    /// The first source that yields anything wins.
    ///
    /// # Errors
    /// Fails only when every source fails to run.
    #[instrument(skip(self))]
    pub fn conflicted_paths(&self) -> Result<Vec<String>> {
        match self.git.run(&["diff", "--name-only", "--diff-filter=U", "-z"]) {
            Ok(out) if out.success() => {
                let paths = sorted_unique(split_nul(&out.stdout));
                if !paths.is_empty() {
                    tracing::debug!(source = "diff", count = paths.len());
                    return Ok(paths);
                }
            }
            Ok(out) => tracing::debug!(stderr = %out.stderr.trim(), "unmerged diff failed"),
            Err(e) => tracing::debug!(error = %e, "unmerged diff failed"),
        }

        match self
            .git
            .run(&["status", "--porcelain=v1", "-z", "--untracked-files=no"])
        {
            Ok(out) if out.success() => {
                let paths = sorted_unique(unmerged_from_porcelain(&out.stdout));
                if !paths.is_empty() {
                    tracing::debug!(source = "status", count = paths.len());
                    return Ok(paths);
                }
            }
            Ok(out) => tracing::debug!(stderr = %out.stderr.trim(), "porcelain status failed"),
            Err(e) => tracing::debug!(error = %e, "porcelain status failed"),
        }

        let paths = sorted_unique(
            self.repo
                .conflict_entries()?
                .into_iter()
                .map(|e| e.path)
                .collect(),
        );
        tracing::debug!(source = "index", count = paths.len());
        Ok(paths)
    }

    /// One record per conflicting path with each side's content.
    ///
    /// Sides missing from the index stay `None`. When the index has no
    /// stage entries for a path at all, the working-tree file (with its
    /// conflict markers) is returned in `merged` instead.
    ///
    /// # Errors
    /// Propagates index and blob read failures.
    pub fn records(&self) -> Result<Vec<ConflictRecord>> {
        let paths = self.conflicted_paths()?;
        let mut stages: BTreeMap<String, [Option<GitOid>; 3]> = BTreeMap::new();
        for entry in self.repo.conflict_entries()? {
            let slot = match entry.stage {
                ConflictStage::Ancestor => 0,
                ConflictStage::Ours => 1,
                ConflictStage::Theirs => 2,
            };
            stages.entry(entry.path).or_default()[slot] = Some(entry.oid);
        }

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let mut record = ConflictRecord {
                path: path.clone(),
                ..ConflictRecord::default()
            };
            if let Some([ancestor, ours, theirs]) = stages.get(&path) {
                record.ancestor = self.read_side(*ancestor)?;
                record.ours = self.read_side(*ours)?;
                record.theirs = self.read_side(*theirs)?;
            }
            if !record.has_stages() {
                record.merged = std::fs::read(self.git.workdir().join(&path))
                    .ok()
                    .map(|b| String::from_utf8_lossy(&b).into_owned());
            }
            records.push(record);
        }
        Ok(records)
    }

    fn read_side(&self, oid: Option<GitOid>) -> Result<Option<String>> {
        oid.map(|oid| {
            self.repo
                .read_blob(oid)
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .map_err(EngineError::from)
        })
        .transpose()
    }

    /// Settle `path` and stage the result.
    ///
    /// Choosing a side that has no version of the file removes it.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `path` is not conflicted; backend
    /// failures otherwise.
    #[instrument(skip(self))]
    pub fn resolve(&self, path: &str, resolution: Resolution) -> Result<()> {
        if !self.conflicted_paths()?.iter().any(|p| p == path) {
            return Err(EngineError::NotFound {
                what: format!("conflict for '{path}'"),
            });
        }
        let side = match resolution {
            Resolution::Ours => Some((ConflictStage::Ours, "--ours")),
            Resolution::Theirs => Some((ConflictStage::Theirs, "--theirs")),
            Resolution::MarkResolved => None,
        };
        if let Some((stage, flag)) = side {
            let present = self
                .repo
                .conflict_entries()?
                .iter()
                .any(|e| e.path == path && e.stage == stage);
            if !present {
                self.git.run_ok(&["rm", "-q", "--", path])?;
                tracing::info!(path, ?resolution, "side has no file; removed");
                return Ok(());
            }
            self.git.run_ok(&["checkout", flag, "--", path])?;
        }
        if self.git.workdir().join(path).exists() {
            self.git.run_ok(&["add", "--", path])?;
        } else {
            self.git.run_ok(&["rm", "-q", "--cached", "--", path])?;
        }
        tracing::info!(path, ?resolution, "conflict resolved");
        Ok(())
    }
}

/// Name of the branch being merged, from `MERGE_MSG`
/// (`Merge branch 'x'`, `Merge remote-tracking branch 'origin/x'`), falling
/// back to the abbreviated `MERGE_HEAD`.
fn incoming_name(git_dir: &Path) -> String {
    if let Ok(msg) = std::fs::read_to_string(git_dir.join("MERGE_MSG"))
        && let Some(name) = parse_merge_msg(&msg)
    {
        return name;
    }
    std::fs::read_to_string(git_dir.join("MERGE_HEAD"))
        .ok()
        .and_then(|s| s.lines().next().map(str::trim).map(str::to_owned))
        .and_then(|s| s.parse::<GitOid>().ok())
        .map_or_else(|| "MERGE_HEAD".to_owned(), |oid| oid.short())
}

fn parse_merge_msg(msg: &str) -> Option<String> {
    let first = msg.lines().next()?;
    let rest = first
        .strip_prefix("Merge remote-tracking branch '")
        .or_else(|| first.strip_prefix("Merge branch '"))
        .or_else(|| first.strip_prefix("Merge tag '"))
        .or_else(|| first.strip_prefix("Merge commit '"))?;
    let (name, _) = rest.split_once('\'')?;
    Some(name.to_owned())
}

/// Unmerged paths from `git status --porcelain=v1 -z`.
///
/// A path is unmerged when either status column is `U`, or both are `A`
/// or both are `D`. Rename and copy entries carry the source path as an
/// extra NUL field, which is skipped.
fn unmerged_from_porcelain(output: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    while let Some(entry) = fields.next() {
        if entry.len() < 4 {
            continue;
        }
        let (xy, path) = entry.split_at(3);
        let mut cols = xy.chars();
        let x = cols.next().unwrap_or(' ');
        let y = cols.next().unwrap_or(' ');
        if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') {
            fields.next();
        }
        if x == 'U' || y == 'U' || (x, y) == ('A', 'A') || (x, y) == ('D', 'D') {
            paths.push(path.to_owned());
        }
    }
    paths
}

fn sorted_unique(mut paths: Vec<String>) -> Vec<String> {
    paths.sort();
    paths.dedup();
    paths
}
