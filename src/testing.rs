//! In-memory repository double for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use loom_git::{
    BranchRef, CommandExecutor, CommandOutput, CommitInfo, GitError, GitOid, GitRepo, HeadState,
    IndexConflictEntry, RemoteInfo, TagRef,
};

pub fn oid(n: u8) -> GitOid {
    GitOid::from_bytes([n; 20])
}

#[derive(Default)]
pub struct FakeRepo {
    pub git_dir: PathBuf,
    pub commits: HashMap<GitOid, CommitInfo>,
    pub local: Vec<BranchRef>,
    pub remote: Vec<BranchRef>,
    pub remotes: Vec<RemoteInfo>,
    pub tags: Vec<TagRef>,
    pub head: HeadState,
    pub blobs: HashMap<GitOid, Vec<u8>>,
    pub conflicts: Vec<IndexConflictEntry>,
}

impl FakeRepo {
    /// Add commit `n` with the given parents; its time is `n`.
    pub fn commit(&mut self, n: u8, parents: &[u8]) -> &mut Self {
        self.commit_at(n, parents, i64::from(n))
    }

    pub fn commit_at(&mut self, n: u8, parents: &[u8], time: i64) -> &mut Self {
        self.commits.insert(
            oid(n),
            CommitInfo {
                id: oid(n),
                parents: parents.iter().map(|p| oid(*p)).collect(),
                message: format!("commit {n}\n"),
                author_name: "Test".to_owned(),
                author_email: "test@example.com".to_owned(),
                time,
            },
        );
        self
    }

    pub fn branch(&mut self, name: &str, n: u8) -> &mut Self {
        self.local.push(BranchRef {
            name: name.to_owned(),
            target: oid(n),
        });
        self
    }

    pub fn remote_branch(&mut self, name: &str, n: u8) -> &mut Self {
        self.remote.push(BranchRef {
            name: name.to_owned(),
            target: oid(n),
        });
        self
    }

    pub fn remote(&mut self, name: &str, url: &str) -> &mut Self {
        self.remotes.push(RemoteInfo {
            name: name.to_owned(),
            url: Some(url.to_owned()),
        });
        self
    }

    pub fn tag(&mut self, name: &str, n: u8) -> &mut Self {
        self.tags.push(TagRef {
            name: name.to_owned(),
            target: oid(n),
        });
        self
    }

    pub fn checkout(&mut self, branch: &str, n: u8) -> &mut Self {
        self.head = HeadState {
            target: Some(oid(n)),
            branch: Some(branch.to_owned()),
            detached: false,
        };
        self
    }

    pub fn detach(&mut self, n: u8) -> &mut Self {
        self.head = HeadState {
            target: Some(oid(n)),
            branch: None,
            detached: true,
        };
        self
    }
}

impl GitRepo for FakeRepo {
    fn workdir(&self) -> Option<&Path> {
        self.git_dir.parent()
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn local_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        let mut v = self.local.clone();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    fn remote_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        let mut v = self.remote.clone();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    fn remotes(&self) -> Result<Vec<RemoteInfo>, GitError> {
        Ok(self.remotes.clone())
    }

    fn tags(&self) -> Result<Vec<TagRef>, GitError> {
        Ok(self.tags.clone())
    }

    fn head(&self) -> Result<HeadState, GitError> {
        Ok(self.head.clone())
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        self.commits.get(&oid).cloned().ok_or_else(|| GitError::NotFound {
            message: format!("commit {oid}"),
        })
    }

    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
        self.blobs.get(&oid).cloned().ok_or_else(|| GitError::NotFound {
            message: format!("blob {oid}"),
        })
    }

    fn conflict_entries(&self) -> Result<Vec<IndexConflictEntry>, GitError> {
        Ok(self.conflicts.clone())
    }
}

/// Executor that expects commands in a fixed order.
///
/// Each reply is registered with the prefix the command line (without the
/// program name) must start with; an unexpected command panics.
#[derive(Default)]
pub struct Script {
    replies: RefCell<VecDeque<(String, CommandOutput)>>,
    calls: RefCell<Vec<String>>,
}

impl Script {
    pub fn on(self, prefix: &str, exit_code: i32, stdout: &str) -> Self {
        self.push(prefix, exit_code, stdout, "")
    }

    pub fn on_stderr(self, prefix: &str, exit_code: i32, stderr: &str) -> Self {
        self.push(prefix, exit_code, "", stderr)
    }

    fn push(self, prefix: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.replies.borrow_mut().push_back((
            prefix.to_owned(),
            CommandOutput {
                exit_code,
                stdout: stdout.to_owned(),
                stderr: stderr.to_owned(),
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// `true` once every scripted reply was consumed.
    pub fn finished(&self) -> bool {
        self.replies.borrow().is_empty()
    }
}

impl CommandExecutor for Script {
    fn execute(
        &self,
        _workdir: &Path,
        argv: &[&str],
        _stdin: Option<&str>,
    ) -> Result<CommandOutput, GitError> {
        let line = argv[1..].join(" ");
        self.calls.borrow_mut().push(line.clone());
        let (prefix, output) = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command: {line}"));
        assert!(line.starts_with(&prefix), "expected `{prefix}`, got `{line}`");
        Ok(output)
    }
}
