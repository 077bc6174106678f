//! Nearest visible ancestor search.
//!
//! Used by the back-fill pass: a ref tip that fell outside the display
//! window has its labels moved to the closest ancestor that is inside it.

use std::collections::{HashMap, HashSet, VecDeque};

use loom_git::{GitError, GitOid, GitRepo};

/// Source of parent edges.
pub trait ParentLookup {
    /// Parents of `id`, first parent first.
    fn parents(&self, id: GitOid) -> Result<Vec<GitOid>, GitError>;
}

impl ParentLookup for HashMap<GitOid, Vec<GitOid>> {
    fn parents(&self, id: GitOid) -> Result<Vec<GitOid>, GitError> {
        Ok(self.get(&id).cloned().unwrap_or_default())
    }
}

/// Parent edges from an already-walked commit set, falling back to the
/// repository for commits outside it.
pub struct WalkedParents<'a> {
    pub known: &'a HashMap<GitOid, Vec<GitOid>>,
    pub repo: &'a dyn GitRepo,
}

impl ParentLookup for WalkedParents<'_> {
    fn parents(&self, id: GitOid) -> Result<Vec<GitOid>, GitError> {
        match self.known.get(&id) {
            Some(parents) => Ok(parents.clone()),
            None => Ok(self.repo.read_commit(id)?.parents),
        }
    }
}

/// Breadth-first search for the nearest ancestor in a visible set.
pub struct AncestorResolver<'a, P: ParentLookup + ?Sized> {
    parents: &'a P,
}

impl<'a, P: ParentLookup + ?Sized> AncestorResolver<'a, P> {
    pub const fn new(parents: &'a P) -> Self {
        Self { parents }
    }

    /// The ancestor of `start` (or `start` itself) with the fewest parent
    /// edges between them that is in `visible`.
    ///
    /// Parents are enqueued in order, so among equally near candidates the
    /// one reached through the earlier parent wins. Each commit is expanded
    /// at most once.
    ///
    /// # Errors
    /// Propagates parent lookup failures.
    pub fn nearest(
        &self,
        start: GitOid,
        visible: &HashSet<GitOid>,
    ) -> Result<Option<GitOid>, GitError> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            if visible.contains(&id) {
                return Ok(Some(id));
            }
            for parent in self.parents.parents(id)? {
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(None)
    }
}
