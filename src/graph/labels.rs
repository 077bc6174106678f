//! Branch label assembly.
//!
//! Ref tips are grouped by the commit they point at; for each commit the
//! assembler turns the names found there into [`BranchLabel`]s, one per
//! branch short name.
//!
//! A local branch's label sits on the local tip and carries every remote
//! copy of the same short name, wherever those copies point. Remote refs
//! only get a label of their own when no local branch of that name exists.

use std::collections::{HashMap, HashSet};

use loom_git::{BranchRef, GitOid, RemoteInfo};

use crate::model::{BranchLabel, RemoteBranchRef, RemoteKind};

use super::remote_kind::classify_url;

/// A remote-tracking ref split into remote and branch short name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTip {
    pub remote: String,
    /// Branch name without the remote prefix (may contain slashes).
    pub short: String,
    pub kind: RemoteKind,
    pub tip: GitOid,
}

impl RemoteTip {
    /// `remote/short`.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}/{}", self.remote, self.short)
    }
}

/// Known remotes, longest name first, for prefix stripping.
#[derive(Clone, Debug, Default)]
pub struct RemoteTable {
    remotes: Vec<(String, RemoteKind)>,
}

impl RemoteTable {
    #[must_use]
    pub fn new(remotes: &[RemoteInfo]) -> Self {
        let mut remotes: Vec<(String, RemoteKind)> = remotes
            .iter()
            .map(|r| (r.name.clone(), classify_url(r.url.as_deref())))
            .collect();
        // "origin/x" must not be claimed by a remote named "origin" when a
        // remote "origin/x" also exists
        remotes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { remotes }
    }

    /// Split `origin/feature/x` into (`origin`, `feature/x`) by matching
    /// known remote names, not by the first slash.
    ///
    /// Refs of remotes no longer configured fall back to the first slash.
    #[must_use]
    pub fn split(&self, name: &str) -> Option<(String, String, RemoteKind)> {
        for (remote, kind) in &self.remotes {
            if let Some(short) = name
                .strip_prefix(remote.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|s| !s.is_empty())
            {
                return Some((remote.clone(), short.to_owned(), *kind));
            }
        }
        let (remote, short) = name.split_once('/')?;
        if short.is_empty() {
            return None;
        }
        tracing::debug!(reference = name, "remote ref from unknown remote");
        Some((remote.to_owned(), short.to_owned(), RemoteKind::Other))
    }
}

/// Tips grouped by target commit, plus the name-to-tip reverse index.
#[derive(Clone, Debug, Default)]
pub struct TipMaps {
    /// Local branch names per commit, in ref order.
    pub local: HashMap<GitOid, Vec<String>>,
    /// Remote-tracking tips per commit, in ref order, `HEAD` excluded.
    pub remote: HashMap<GitOid, Vec<RemoteTip>>,
    /// Tag names per commit.
    pub tags: HashMap<GitOid, Vec<String>>,
    /// Every local branch name.
    pub local_names: HashSet<String>,
    /// Remote copies per branch short name, in ref order, one per remote.
    pub by_short: HashMap<String, Vec<RemoteTip>>,
    /// `name` (local) or `remote/short` (remote) to tip.
    pub tip_of: HashMap<String, GitOid>,
    /// Every distinct tip in first-seen order: locals, remotes, then tags.
    pub all_tips: Vec<GitOid>,
}

impl TipMaps {
    /// Group the repository's refs.
    #[must_use]
    pub fn build(
        local: &[BranchRef],
        remote: &[BranchRef],
        tags: &[(String, GitOid)],
        remotes: &RemoteTable,
    ) -> Self {
        let mut maps = Self::default();
        for b in local {
            maps.local.entry(b.target).or_default().push(b.name.clone());
            maps.local_names.insert(b.name.clone());
            maps.tip_of.insert(b.name.clone(), b.target);
            maps.note_tip(b.target);
        }
        for b in remote {
            let Some((remote, short, kind)) = remotes.split(&b.name) else {
                continue;
            };
            if short == "HEAD" {
                continue;
            }
            let tip = RemoteTip {
                remote,
                short,
                kind,
                tip: b.target,
            };
            maps.tip_of.insert(tip.qualified(), b.target);
            let copies = maps.by_short.entry(tip.short.clone()).or_default();
            if !copies.iter().any(|c| c.remote == tip.remote) {
                copies.push(tip.clone());
            }
            maps.remote.entry(b.target).or_default().push(tip);
            maps.note_tip(b.target);
        }
        for (name, target) in tags {
            maps.tags.entry(*target).or_default().push(name.clone());
            maps.note_tip(*target);
        }
        maps
    }

    fn note_tip(&mut self, id: GitOid) {
        if !self.all_tips.contains(&id) {
            self.all_tips.push(id);
        }
    }

    /// Branch names at `id`: local names, then `remote/short` names.
    #[must_use]
    pub fn branch_names(&self, id: GitOid) -> Vec<String> {
        let mut names: Vec<String> = self.local.get(&id).cloned().unwrap_or_default();
        if let Some(remotes) = self.remote.get(&id) {
            names.extend(remotes.iter().map(RemoteTip::qualified));
        }
        names
    }

    #[must_use]
    pub fn tag_names(&self, id: GitOid) -> Vec<String> {
        self.tags.get(&id).cloned().unwrap_or_default()
    }
}

/// Builds the labels for one commit.
pub struct LabelAssembler<'a> {
    maps: &'a TipMaps,
    current_branch: Option<&'a str>,
}

impl<'a> LabelAssembler<'a> {
    #[must_use]
    pub const fn new(maps: &'a TipMaps, current_branch: Option<&'a str>) -> Self {
        Self {
            maps,
            current_branch,
        }
    }

    /// Labels for the refs pointing at `id`.
    ///
    /// One label per local branch at `id`, carrying all remote copies of
    /// its short name. An untracked remote branch is labeled once, at the
    /// tip of its first copy in ref order. The checked-out branch (matched
    /// case-insensitively, local labels only) sorts first.
    #[must_use]
    pub fn labels_for(&self, id: GitOid) -> Vec<BranchLabel> {
        let locals = self.maps.local.get(&id).map_or(&[][..], Vec::as_slice);
        let remotes = self.maps.remote.get(&id).map_or(&[][..], Vec::as_slice);

        let mut labels: Vec<BranchLabel> = locals
            .iter()
            .map(|name| BranchLabel {
                name: name.clone(),
                is_local: true,
                is_current: self.is_current(name),
                tip: id,
                remotes: self.copies_of(name),
            })
            .collect();

        for r in remotes {
            if self.maps.local_names.contains(&r.short)
                || labels.iter().any(|l| l.name == r.short)
            {
                continue;
            }
            let first_tip = self
                .maps
                .by_short
                .get(&r.short)
                .and_then(|copies| copies.first())
                .map(|c| c.tip);
            if first_tip != Some(id) {
                continue;
            }
            labels.push(BranchLabel {
                name: r.short.clone(),
                is_local: false,
                is_current: false,
                tip: id,
                remotes: self.copies_of(&r.short),
            });
        }

        // stable: only the current label moves
        labels.sort_by_key(|l| !l.is_current);
        labels
    }

    fn copies_of(&self, short: &str) -> Vec<RemoteBranchRef> {
        self.maps.by_short.get(short).map_or_else(Vec::new, |copies| {
            copies
                .iter()
                .map(|c| RemoteBranchRef {
                    remote: c.remote.clone(),
                    kind: c.kind,
                    tip: c.tip,
                })
                .collect()
        })
    }

    fn is_current(&self, name: &str) -> bool {
        self.current_branch
            .is_some_and(|current| current.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_bytes([n; 20])
    }

    fn branch(name: &str, target: GitOid) -> BranchRef {
        BranchRef {
            name: name.to_owned(),
            target,
        }
    }

    fn remote(name: &str, url: &str) -> RemoteInfo {
        RemoteInfo {
            name: name.to_owned(),
            url: Some(url.to_owned()),
        }
    }

    fn table() -> RemoteTable {
        RemoteTable::new(&[
            remote("origin", "https://github.com/a/b.git"),
            remote("upstream", "https://gitlab.com/a/b.git"),
        ])
    }

    #[test]
    fn split_uses_known_remote_names() {
        let t = RemoteTable::new(&[
            remote("origin", "https://github.com/a/b.git"),
            remote("team/fork", "/srv/fork.git"),
        ]);
        let (r, short, kind) = t.split("team/fork/feature/login").unwrap();
        assert_eq!((r.as_str(), short.as_str()), ("team/fork", "feature/login"));
        assert_eq!(kind, RemoteKind::Local);

        let (r, short, kind) = t.split("origin/feature/login").unwrap();
        assert_eq!((r.as_str(), short.as_str()), ("origin", "feature/login"));
        assert_eq!(kind, RemoteKind::GitHub);
    }

    #[test]
    fn split_unknown_remote_falls_back_to_first_slash() {
        let (r, short, kind) = table().split("gone/topic").unwrap();
        assert_eq!((r.as_str(), short.as_str()), ("gone", "topic"));
        assert_eq!(kind, RemoteKind::Other);
        assert!(table().split("noslash").is_none());
    }

    #[test]
    fn remote_head_is_excluded() {
        let maps = TipMaps::build(
            &[],
            &[branch("origin/HEAD", oid(1)), branch("origin/main", oid(1))],
            &[],
            &table(),
        );
        assert_eq!(maps.branch_names(oid(1)), ["origin/main"]);
        assert!(!maps.tip_of.contains_key("origin/HEAD"));
    }

    #[test]
    fn local_label_absorbs_all_remotes() {
        let maps = TipMaps::build(
            &[branch("main", oid(1))],
            &[branch("origin/main", oid(1)), branch("upstream/main", oid(1))],
            &[],
            &table(),
        );
        let labels = LabelAssembler::new(&maps, Some("main")).labels_for(oid(1));
        assert_eq!(labels.len(), 1);
        let main = &labels[0];
        assert!(main.is_local && main.is_current);
        let remotes: Vec<_> = main.remotes.iter().map(|r| r.remote.as_str()).collect();
        assert_eq!(remotes, ["origin", "upstream"]);
        assert_eq!(main.remotes[1].kind, RemoteKind::GitLab);
    }

    #[test]
    fn remote_only_names_are_consolidated() {
        let maps = TipMaps::build(
            &[branch("main", oid(1))],
            &[branch("origin/topic", oid(1)), branch("upstream/topic", oid(1))],
            &[],
            &table(),
        );
        let labels = LabelAssembler::new(&maps, None).labels_for(oid(1));
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["main", "topic"]);
        assert!(labels[0].is_local_only());
        assert!(labels[1].is_remote_only());
        assert_eq!(labels[1].remotes.len(), 2);
    }

    #[test]
    fn remote_copy_behind_local_stays_on_local_label() {
        let maps = TipMaps::build(
            &[branch("main", oid(5))],
            &[branch("origin/main", oid(4)), branch("upstream/main", oid(5))],
            &[],
            &table(),
        );
        let assembler = LabelAssembler::new(&maps, Some("main"));

        let labels = assembler.labels_for(oid(5));
        assert_eq!(labels.len(), 1);
        let main = &labels[0];
        assert!(main.is_local && !main.is_local_only());
        let copies: Vec<_> = main.remotes.iter().map(|r| (r.remote.as_str(), r.tip)).collect();
        assert_eq!(copies, [("origin", oid(4)), ("upstream", oid(5))]);

        assert!(assembler.labels_for(oid(4)).is_empty());
    }

    #[test]
    fn untracked_branch_is_labeled_once_at_first_copy() {
        let maps = TipMaps::build(
            &[],
            &[branch("origin/topic", oid(2)), branch("upstream/topic", oid(3))],
            &[],
            &table(),
        );
        let assembler = LabelAssembler::new(&maps, None);

        let labels = assembler.labels_for(oid(2));
        assert_eq!(labels.len(), 1);
        assert!(labels[0].is_remote_only());
        assert_eq!(labels[0].tip, oid(2));
        let tips: Vec<_> = labels[0].remotes.iter().map(|r| r.tip).collect();
        assert_eq!(tips, [oid(2), oid(3)]);

        assert!(assembler.labels_for(oid(3)).is_empty());
    }

    #[test]
    fn current_branch_sorts_first_case_insensitive() {
        let maps = TipMaps::build(
            &[branch("alpha", oid(1)), branch("Feature", oid(1)), branch("zeta", oid(1))],
            &[],
            &[],
            &table(),
        );
        let labels = LabelAssembler::new(&maps, Some("feature")).labels_for(oid(1));
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Feature", "alpha", "zeta"]);
        assert_eq!(labels.iter().filter(|l| l.is_current).count(), 1);
    }

    #[test]
    fn remote_only_label_is_never_current() {
        let maps = TipMaps::build(&[], &[branch("origin/main", oid(2))], &[], &table());
        let labels = LabelAssembler::new(&maps, Some("main")).labels_for(oid(2));
        assert!(!labels[0].is_current);
    }

    #[test]
    fn commit_without_refs_has_no_labels() {
        let maps = TipMaps::build(&[branch("main", oid(1))], &[], &[], &table());
        assert!(LabelAssembler::new(&maps, None).labels_for(oid(9)).is_empty());
    }

    proptest! {
        #[test]
        fn n_remotes_give_one_label_with_n_refs(
            n in 1usize..8,
            name in "[a-z]{1,6}(/[a-z]{1,6})?",
            with_local in any::<bool>(),
        ) {
            let remotes: Vec<RemoteInfo> = (0..n)
                .map(|i| remote(&format!("r{i}"), "https://github.com/x/y"))
                .collect();
            let table = RemoteTable::new(&remotes);
            let remote_refs: Vec<BranchRef> = (0..n)
                .map(|i| branch(&format!("r{i}/{name}"), oid(1)))
                .collect();
            let local = if with_local { vec![branch(&name, oid(1))] } else { vec![] };
            let maps = TipMaps::build(&local, &remote_refs, &[], &table);

            let labels = LabelAssembler::new(&maps, None).labels_for(oid(1));
            prop_assert_eq!(labels.len(), 1);
            prop_assert_eq!(&labels[0].name, &name);
            prop_assert_eq!(labels[0].is_local, with_local);
            prop_assert_eq!(labels[0].remotes.len(), n);
        }

        #[test]
        fn scattered_copies_still_give_one_label(
            tips in proptest::collection::vec(1u8..5, 1..6),
            local in proptest::option::of(1u8..5),
        ) {
            let remotes: Vec<RemoteInfo> = (0..tips.len())
                .map(|i| remote(&format!("r{i}"), "https://github.com/x/y"))
                .collect();
            let table = RemoteTable::new(&remotes);
            let remote_refs: Vec<BranchRef> = tips
                .iter()
                .enumerate()
                .map(|(i, t)| branch(&format!("r{i}/main"), oid(*t)))
                .collect();
            let locals: Vec<BranchRef> = local.iter().map(|t| branch("main", oid(*t))).collect();
            let maps = TipMaps::build(&locals, &remote_refs, &[], &table);
            let assembler = LabelAssembler::new(&maps, None);

            let labels: Vec<(GitOid, BranchLabel)> = (1u8..5)
                .flat_map(|n| assembler.labels_for(oid(n)).into_iter().map(move |l| (oid(n), l)))
                .collect();
            prop_assert_eq!(labels.len(), 1);
            let (at, label) = &labels[0];
            prop_assert_eq!(label.is_local, local.is_some());
            prop_assert_eq!(*at, oid(local.unwrap_or(tips[0])));
            prop_assert_eq!(label.remotes.len(), tips.len());
        }
    }
}
