//! Labeled commit graph construction.
//!
//! [`CommitGraphBuilder::build`] enumerates refs, walks the reachable
//! history, orders it children-first by date, cuts the requested window and
//! labels every commit in it. Tips that fall outside the window have their
//! labels back-filled onto the nearest visible ancestor.
//!
//! A visible commit may end up carrying labels of several unrelated
//! branches whose tips were paged out above it. That accumulation is kept
//! as is.

pub mod ancestor;
pub mod labels;
pub mod order;
pub mod remote_kind;

use std::collections::{HashMap, HashSet, VecDeque};

use loom_git::{BranchRef, CommitInfo, GitOid, GitRepo, HeadState};
use tracing::instrument;

use crate::config::GraphConfig;
use crate::error::Result;
use crate::model::{BranchLabel, Commit};

pub use ancestor::{AncestorResolver, ParentLookup, WalkedParents};
pub use labels::{LabelAssembler, RemoteTable, RemoteTip, TipMaps};
pub use order::{Node, date_order};
pub use remote_kind::classify_url;

/// Which slice of history to materialize.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphQuery {
    /// Commits to skip from the top of the ordered history.
    pub skip: usize,
    /// Commits to return; `None` uses the configured page size.
    pub count: Option<usize>,
    /// Restrict the walk to one branch (`main` or `origin/main`).
    pub branch: Option<String>,
}

impl GraphQuery {
    /// The first `count` commits.
    #[must_use]
    pub fn first(count: usize) -> Self {
        Self {
            count: Some(count),
            ..Self::default()
        }
    }

    /// Window starting `skip` commits down.
    #[must_use]
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Restrict to `branch`.
    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Builds the ordered, labeled commit window.
pub struct CommitGraphBuilder<'a> {
    repo: &'a dyn GitRepo,
    config: &'a GraphConfig,
}

impl<'a> CommitGraphBuilder<'a> {
    pub const fn new(repo: &'a dyn GitRepo, config: &'a GraphConfig) -> Self {
        Self { repo, config }
    }

    /// Materialize the window described by `query`.
    ///
    /// An unknown branch filter yields an empty window. Repository handle
    /// failures propagate.
    ///
    /// # Errors
    /// Returns [`EngineError::Git`](crate::error::EngineError::Git) when a ref
    /// or object cannot be read.
    #[instrument(skip_all, fields(skip = query.skip, count = ?query.count, branch = ?query.branch))]
    pub fn build(&self, query: &GraphQuery) -> Result<Vec<Commit>> {
        let local = self.repo.local_branches()?;
        let remote = self.repo.remote_branches()?;
        let remotes = RemoteTable::new(&self.repo.remotes()?);
        let tags: Vec<(String, GitOid)> = self
            .repo
            .tags()?
            .into_iter()
            .map(|t| (t.name, t.target))
            .collect();
        let maps = TipMaps::build(&local, &remote, &tags, &remotes);
        let head = self.repo.head()?;

        let starts = match &query.branch {
            Some(name) => match Self::resolve_filter(name, &maps) {
                Some(tip) => vec![tip],
                None => {
                    tracing::debug!(branch = %name, "branch filter matched nothing");
                    return Ok(Vec::new());
                }
            },
            None => Self::all_starts(&local, &remote, &head),
        };

        let walked = self.walk(&starts)?;
        let nodes: Vec<Node> = walked
            .iter()
            .map(|c| Node {
                id: c.id,
                parents: c.parents.clone(),
                time: c.time,
            })
            .collect();
        let ordered = date_order(&nodes);

        let count = query.count.unwrap_or(self.config.page_size);
        let by_id: HashMap<GitOid, &CommitInfo> = walked.iter().map(|c| (c.id, c)).collect();
        let current = if head.detached { None } else { head.branch.as_deref() };
        let assembler = LabelAssembler::new(&maps, current);

        let mut window: Vec<Commit> = ordered
            .iter()
            .skip(query.skip)
            .take(count)
            .filter_map(|id| by_id.get(id))
            .map(|info| Self::materialize(info, &maps, &assembler, &head))
            .collect();

        let parents: HashMap<GitOid, Vec<GitOid>> =
            walked.iter().map(|c| (c.id, c.parents.clone())).collect();
        self.backfill(&mut window, &maps, &assembler, &head, &parents)?;

        tracing::debug!(
            walked = walked.len(),
            returned = window.len(),
            "commit graph built"
        );
        Ok(window)
    }

    fn resolve_filter(name: &str, maps: &TipMaps) -> Option<GitOid> {
        let name = name.strip_prefix("refs/heads/").unwrap_or(name);
        let name = name.strip_prefix("refs/remotes/").unwrap_or(name);
        maps.tip_of.get(name).copied()
    }

    /// Walk roots: HEAD, then every local and remote branch tip.
    fn all_starts(
        local: &[BranchRef],
        remote: &[BranchRef],
        head: &HeadState,
    ) -> Vec<GitOid> {
        let mut starts = Vec::new();
        let mut push = |id: GitOid| {
            if !starts.contains(&id) {
                starts.push(id);
            }
        };
        if let Some(target) = head.target {
            push(target);
        }
        for b in local {
            push(b.target);
        }
        for b in remote.iter().filter(|b| !b.name.ends_with("/HEAD")) {
            push(b.target);
        }
        starts
    }

    /// Every commit reachable from `starts`, in breadth-first discovery
    /// order.
    fn walk(&self, starts: &[GitOid]) -> Result<Vec<CommitInfo>> {
        let mut seen: HashSet<GitOid> = starts.iter().copied().collect();
        let mut queue: VecDeque<GitOid> = starts.iter().copied().collect();
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            let info = self.repo.read_commit(id)?;
            for parent in &info.parents {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
            out.push(info);
        }
        Ok(out)
    }

    fn materialize(
        info: &CommitInfo,
        maps: &TipMaps,
        assembler: &LabelAssembler<'_>,
        head: &HeadState,
    ) -> Commit {
        let is_head = head.target == Some(info.id);
        let mut labels = assembler.labels_for(info.id);
        if is_head && head.detached && !labels.iter().any(|l| l.is_current) {
            labels.insert(0, BranchLabel::detached_head(info.id));
        }
        Commit {
            id: info.id,
            summary: info.summary().to_owned(),
            message: info.message.clone(),
            author_name: info.author_name.clone(),
            author_email: info.author_email.clone(),
            time: info.time,
            parents: info.parents.clone(),
            is_head,
            branches: maps.branch_names(info.id),
            labels,
            tags: maps.tag_names(info.id),
        }
    }

    /// Attach the labels of tips outside the window to their nearest
    /// visible ancestor.
    fn backfill(
        &self,
        window: &mut [Commit],
        maps: &TipMaps,
        assembler: &LabelAssembler<'_>,
        head: &HeadState,
        parents: &HashMap<GitOid, Vec<GitOid>>,
    ) -> Result<()> {
        if window.is_empty() {
            return Ok(());
        }
        let position: HashMap<GitOid, usize> =
            window.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        let visible: HashSet<GitOid> = position.keys().copied().collect();

        let mut orphans: Vec<GitOid> = maps
            .all_tips
            .iter()
            .copied()
            .filter(|t| !visible.contains(t))
            .collect();
        let detached_orphan = head
            .target
            .filter(|t| head.detached && !visible.contains(t));
        if let Some(t) = detached_orphan
            && !orphans.contains(&t)
        {
            orphans.push(t);
        }

        let limit = self.config.max_backfill_tips;
        if orphans.len() > limit {
            tracing::warn!(
                orphaned = orphans.len(),
                limit,
                "too many tips outside the window; skipping the rest"
            );
            orphans.truncate(limit);
        }

        let lookup = WalkedParents {
            known: parents,
            repo: self.repo,
        };
        let resolver = AncestorResolver::new(&lookup);
        for tip in orphans {
            let Some(anchor) = resolver.nearest(tip, &visible)? else {
                tracing::trace!(%tip, "no visible ancestor");
                continue;
            };
            let commit = &mut window[position[&anchor]];
            commit.merge_labels(assembler.labels_for(tip));
            Commit::merge_names(&mut commit.branches, maps.branch_names(tip));
            Commit::merge_names(&mut commit.tags, maps.tag_names(tip));
            if detached_orphan == Some(tip) && !commit.has_current_label() {
                commit.labels.insert(0, BranchLabel::detached_head(tip));
            }
        }
        Ok(())
    }
}
