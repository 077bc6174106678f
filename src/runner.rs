//! Backend command runner.
//!
//! Thin wrapper over a [`CommandExecutor`] bound to one working directory
//! and the configured program names. Every mutation of the working tree,
//! index or stash list goes through here.

use std::path::{Path, PathBuf};

use loom_git::{CommandExecutor, CommandOutput};

use crate::config::BackendConfig;
use crate::error::{EngineError, Result};

/// Runs `git` (and the patch tool) in one working directory.
#[derive(Clone)]
pub struct GitRunner<'a> {
    exec: &'a dyn CommandExecutor,
    workdir: PathBuf,
    git_program: String,
}

impl std::fmt::Debug for GitRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRunner")
            .field("workdir", &self.workdir)
            .field("git_program", &self.git_program)
            .finish_non_exhaustive()
    }
}

impl<'a> GitRunner<'a> {
    /// Bind `exec` to `workdir`, invoking git as configured.
    pub fn new(exec: &'a dyn CommandExecutor, workdir: &Path, config: &BackendConfig) -> Self {
        Self {
            exec,
            workdir: workdir.to_owned(),
            git_program: config.git_program.clone(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git <args>`; a non-zero exit is returned, not raised.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.run_program(&self.git_program, args, None)
    }

    /// Run `git <args>` and return stdout, raising a classified
    /// [`EngineError::Backend`] on a non-zero exit.
    pub fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(self.failure(args, &output))
        }
    }

    /// Run an arbitrary program in the working directory.
    pub fn run_program(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program);
        argv.extend_from_slice(args);
        Ok(self.exec.execute(&self.workdir, &argv, stdin)?)
    }

    /// Build the classified error for a failed `git <args>`.
    pub fn failure(&self, args: &[&str], output: &CommandOutput) -> EngineError {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.git_program.as_str());
        argv.extend_from_slice(args);
        EngineError::backend(&argv, output)
    }

    /// `true` if tracked files differ from HEAD (staged or not).
    ///
    /// Untracked files do not count.
    pub fn has_tracked_changes(&self) -> Result<bool> {
        let out = self.run_ok(&[
            "status",
            "--porcelain",
            "--untracked-files=no",
            "--ignore-submodules",
        ])?;
        Ok(!out.trim().is_empty())
    }
}

/// Split NUL-terminated output (`-z`) into its non-empty fields.
pub fn split_nul(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
