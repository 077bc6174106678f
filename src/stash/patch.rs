//! Fuzzy patch application of a stash entry onto a dirty tree.
//!
//! The stash is rendered by git straight into a scratch file and fed to an
//! external `patch` tool, which tolerates context drift that `git stash
//! apply` refuses. Content never passes through a `String`, so bytes that
//! are not UTF-8 survive. Rejected hunks go to a scratch reject file and
//! backups are disabled, so nothing is written next to the user's files
//! besides the patched files themselves.

use std::path::PathBuf;

use loom_git::GitError;
use tempfile::TempDir;

use crate::config::BackendConfig;
use crate::error::Result;
use crate::runner::GitRunner;

const PATCH_FILE: &str = "entry.patch";
const REJECT_FILE: &str = "entry.rej";

/// A file named by a patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TouchedPath {
    pub path: String,
    /// The patch creates the file.
    pub created: bool,
}

/// How to invoke the patch tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchMode {
    /// Check that every hunk would apply, changing nothing.
    DryRun,
    /// Apply for real.
    Apply,
    /// Check that the patch is fully present by reverse-applying it dry.
    VerifyApplied,
}

/// Result of one patch tool run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyResult {
    Clean,
    /// Some hunks did not apply.
    Rejected(String),
    /// The tool could not run or hit a hard error.
    Failed(String),
}

/// The configured patch tool.
#[derive(Clone, Debug)]
pub struct PatchTool {
    program: String,
    fuzz: u32,
}

impl PatchTool {
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            program: config.patch_program.clone(),
            fuzz: config.patch_fuzz,
        }
    }

    /// Run the tool over `patch` in `git`'s working directory.
    ///
    /// Never errors: a tool that cannot be spawned is [`ApplyResult::Failed`]
    /// so the caller can escalate.
    pub fn apply(&self, git: &GitRunner<'_>, patch: &RenderedPatch, mode: PatchMode) -> ApplyResult {
        let fuzz = format!("--fuzz={}", self.fuzz);
        let input = format!("--input={}", patch.patch_file().display());
        let rejects = format!("--reject-file={}", patch.reject_file().display());
        let mut args = vec![
            "-p1",
            "--batch",
            fuzz.as_str(),
            "--no-backup-if-mismatch",
            input.as_str(),
            rejects.as_str(),
        ];
        match mode {
            PatchMode::DryRun => args.extend(["--forward", "--dry-run"]),
            PatchMode::Apply => args.push("--forward"),
            PatchMode::VerifyApplied => args.extend(["--reverse", "--dry-run"]),
        }
        match git.run_program(&self.program, &args, None) {
            Ok(out) => match out.exit_code {
                0 => ApplyResult::Clean,
                1 => ApplyResult::Rejected(out.combined()),
                code => ApplyResult::Failed(format!(
                    "{} exited with {code}: {}",
                    self.program,
                    crate::classify::headline(&out.combined())
                )),
            },
            Err(e) => ApplyResult::Failed(format!("{}: {e}", self.program)),
        }
    }
}

/// A stash entry rendered as a unified diff in a scratch directory.
///
/// The directory (and any rejects written into it) is removed on drop.
#[derive(Debug)]
pub struct RenderedPatch {
    scratch: TempDir,
    touched: Vec<TouchedPath>,
}

impl RenderedPatch {
    fn scratch() -> Result<TempDir> {
        Ok(tempfile::Builder::new()
            .prefix("gitloom-patch-")
            .tempdir()
            .map_err(GitError::from)?)
    }

    #[must_use]
    pub fn patch_file(&self) -> PathBuf {
        self.scratch.path().join(PATCH_FILE)
    }

    #[must_use]
    pub fn reject_file(&self) -> PathBuf {
        self.scratch.path().join(REJECT_FILE)
    }

    /// Files the diff names.
    #[must_use]
    pub fn touched(&self) -> &[TouchedPath] {
        &self.touched
    }

    /// `true` if the diff changes no tracked file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }
}

/// Render `rev` as a binary-safe unified diff against its base, tracked
/// files only.
///
/// # Errors
/// Fails when the scratch directory cannot be created, when `git diff`
/// exits non-zero, or when its output cannot be read back.
pub fn render(git: &GitRunner<'_>, rev: &str) -> Result<RenderedPatch> {
    let scratch = RenderedPatch::scratch()?;
    let file = scratch.path().join(PATCH_FILE);
    let output = format!("--output={}", file.display());
    let base = format!("{rev}^1");
    git.run_ok(&[
        "diff",
        "--no-color",
        "--no-ext-diff",
        "--no-renames",
        "--binary",
        &output,
        &base,
        rev,
    ])?;
    let bytes = match std::fs::read(&file) {
        Ok(bytes) => bytes,
        // nothing written: nothing to apply
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(GitError::from(e).into()),
    };
    let touched = touched_paths(&String::from_utf8_lossy(&bytes));
    Ok(RenderedPatch { scratch, touched })
}

/// Files named by a unified diff, in order of appearance.
#[must_use]
pub fn touched_paths(patch: &str) -> Vec<TouchedPath> {
    let mut out: Vec<TouchedPath> = Vec::new();
    let mut from_dev_null = false;
    let mut old_path: Option<&str> = None;

    for line in patch.lines() {
        if let Some(old) = line.strip_prefix("--- ") {
            let old = clean_path(old);
            from_dev_null = old == "/dev/null";
            old_path = old.strip_prefix("a/");
        } else if let Some(new) = line.strip_prefix("+++ ") {
            let new = clean_path(new);
            let path = match new.strip_prefix("b/") {
                Some(p) => p,
                // deletion: the new side is /dev/null
                None => match old_path {
                    Some(p) => p,
                    None => continue,
                },
            };
            if !out.iter().any(|t| t.path == path) {
                out.push(TouchedPath {
                    path: path.to_owned(),
                    created: from_dev_null,
                });
            }
            from_dev_null = false;
            old_path = None;
        }
    }
    out
}

fn clean_path(raw: &str) -> &str {
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}
