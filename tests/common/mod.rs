//! Shared helpers for gitloom integration tests.
//!
//! Every test gets its own throwaway repository in a temp directory, built
//! with the real git CLI.

#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use gitloom::Engine;
use gitloom::config::LoomConfig;
use loom_git::{CommandExecutor, GitOid, GixRepo};

pub struct TestRepo {
    dir: TempDir,
    clock: Cell<i64>,
}

impl TestRepo {
    /// `git init -b main` with a test identity.
    pub fn new() -> Self {
        let repo = Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            clock: Cell::new(1_700_000_000),
        };
        repo.git(&["init", "-q", "-b", "main"]);
        repo.git(&["config", "user.email", "test@test.com"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run git, assert success, return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let out = self.git_raw(args);
        assert!(
            out.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).trim().to_owned()
    }

    /// Run git without checking the exit status.
    pub fn git_raw(&self, args: &[&str]) -> std::process::Output {
        // commits get strictly increasing timestamps so date order is stable
        let now = self.clock.get();
        self.clock.set(now + 60);
        let date = format!("@{now} +0000");
        Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("LC_ALL", "C")
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .output()
            .expect("failed to run git")
    }

    pub fn write(&self, name: &str, content: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn write_bytes(&self, name: &str, content: &[u8]) {
        std::fs::write(self.path().join(name), content).unwrap();
    }

    pub fn read_bytes(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path().join(name)).unwrap()
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path().join(name)).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }

    /// Write, stage and commit one file; returns the new HEAD.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> GitOid {
        self.write(name, content);
        self.git(&["add", name]);
        self.git(&["commit", "-q", "-m", message]);
        self.head()
    }

    pub fn head(&self) -> GitOid {
        self.rev("HEAD")
    }

    pub fn rev(&self, rev: &str) -> GitOid {
        self.git(&["rev-parse", rev]).parse().unwrap()
    }

    /// Object ids of the stash list, newest first.
    pub fn stash_ids(&self) -> Vec<GitOid> {
        self.git(&["stash", "list", "--format=%H"])
            .lines()
            .map(|l| l.parse().unwrap())
            .collect()
    }

    /// Files under the working tree whose name ends in `suffix`.
    pub fn files_ending_with(&self, suffix: &str) -> Vec<String> {
        fn visit(dir: &Path, root: &Path, suffix: &str, out: &mut Vec<String>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.file_name().is_some_and(|n| n == ".git") {
                    continue;
                }
                if path.is_dir() {
                    visit(&path, root, suffix, out);
                } else if path.to_string_lossy().ends_with(suffix) {
                    out.push(path.strip_prefix(root).unwrap().display().to_string());
                }
            }
        }
        let mut out = Vec::new();
        visit(self.path(), self.path(), suffix, &mut out);
        out
    }

    /// Engine over this repository with real processes.
    pub fn engine(&self) -> Engine {
        Engine::open(self.path(), None).unwrap()
    }

    /// Engine over this repository with a custom executor.
    pub fn engine_with(&self, exec: impl CommandExecutor + 'static) -> Engine {
        Engine::with_parts(
            Box::new(GixRepo::open(self.path()).unwrap()),
            Box::new(exec),
            LoomConfig::default(),
        )
        .unwrap()
    }
}

/// `true` if an external `patch` tool is on `PATH`.
pub fn patch_available() -> bool {
    Command::new("patch")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}
