//! The [`CommandExecutor`] trait and its process-spawning implementation.
//!
//! Everything that mutates a working tree, index or stash list is done by
//! shelling out to the backend CLI (and the external `patch` tool) through
//! this trait, so the engine can be driven by a scripted executor in tests.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use crate::error::GitError;
use crate::types::CommandOutput;

/// Run a program in a working directory and capture its output.
pub trait CommandExecutor {
    /// Execute `argv[0]` with `argv[1..]` in `workdir`, optionally piping
    /// `stdin` to it.
    ///
    /// A non-zero exit status is *not* an error: it is reported through
    /// [`CommandOutput::exit_code`] so callers can classify it. Errors are
    /// reserved for failing to run the program at all.
    fn execute(
        &self,
        workdir: &Path,
        argv: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, GitError>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(
        &self,
        workdir: &Path,
        argv: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, GitError> {
        (**self).execute(workdir, argv, stdin)
    }
}

/// Environment forced onto every spawned process.
///
/// A fixed `C` locale keeps backend messages in English so substring
/// classification of stderr is deterministic. Prompts are disabled because
/// nothing is attached to the child's terminal.
const STABLE_ENV: &[(&str, &str)] = &[
    ("LC_ALL", "C"),
    ("LANG", "C"),
    ("LANGUAGE", "C"),
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GIT_EDITOR", "true"),
    ("GIT_MERGE_AUTOEDIT", "no"),
];

/// [`CommandExecutor`] that spawns real processes.
#[derive(Clone, Debug, Default)]
pub struct ProcessExecutor {
    extra_env: Vec<(String, String)>,
}

impl ProcessExecutor {
    /// An executor with only the stable-locale environment applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable to every spawned process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute(
        &self,
        workdir: &Path,
        argv: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, GitError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            GitError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty argv",
            ))
        })?;

        debug!(program, ?args, workdir = %workdir.display(), "exec");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workdir)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in STABLE_ENV {
            cmd.env(k, v);
        }
        for (k, v) in &self.extra_env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn()?;

        // Feed stdin from a separate thread so a child that fills its stdout
        // pipe before draining stdin cannot deadlock us.
        let writer = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.to_owned();
                Some(std::thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child.wait_with_output()?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // The child may legitimately exit without reading all input.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(GitError::Io(e)),
                Err(_) => {
                    return Err(GitError::Io(std::io::Error::other(
                        "stdin writer thread panicked",
                    )));
                }
            }
        }

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(program, exit_code = result.exit_code, "exec done");
        Ok(result)
    }
}
