//! Value types shared between the [`GitRepo`](crate::GitRepo) trait, the
//! [`CommandExecutor`](crate::CommandExecutor) trait and the gitloom engine.
//!
//! None of these carry gix types; the backend is an implementation detail.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A git object identifier (SHA-1, 20 bytes).
///
/// Stored as raw bytes so it is `Copy` and cheap to hash. Displays as 40
/// lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitOid([u8; 20]);

impl GitOid {
    /// The zero OID (`0000...0000`).
    pub const ZERO: Self = Self([0; 20]);

    /// Create a `GitOid` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Return `true` if this is the zero OID.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The abbreviated 7-character form used in log output.
    #[must_use]
    pub fn short(&self) -> String {
        let mut full = self.to_string();
        full.truncate(7);
        full
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({})", self.short())
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 40 {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let digit = |b: u8| {
                hex_digit(b).ok_or_else(|| OidParseError {
                    value: s.to_owned(),
                    reason: format!("invalid hex digit '{}'", b as char),
                })
            };
            bytes[i] = (digit(chunk[0])? << 4) | digit(chunk[1])?;
        }
        Ok(Self(bytes))
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

const fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Refs
// ---------------------------------------------------------------------------

/// A branch reference and the commit its tip resolves to.
///
/// For local branches `name` is the short name (`feature/login`); for
/// remote-tracking branches it is the remote-qualified short name
/// (`origin/feature/login`). Splitting the remote off is the caller's job
/// because remote names may themselves contain slashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchRef {
    /// Short name, see above.
    pub name: String,
    /// Peeled tip commit.
    pub target: GitOid,
}

/// A configured remote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Remote name (`origin`, `upstream`, `team/mirror`).
    pub name: String,
    /// Fetch URL, if one is configured.
    pub url: Option<String>,
}

/// A tag and the commit it peels to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRef {
    /// Short tag name (`v1.2.0`).
    pub name: String,
    /// The commit the tag ultimately points at (annotated tags are peeled).
    pub target: GitOid,
}

/// Where HEAD currently points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadState {
    /// The commit HEAD resolves to, `None` on an unborn branch.
    pub target: Option<GitOid>,
    /// Short name of the checked-out branch, `None` when detached.
    pub branch: Option<String>,
    /// `true` when HEAD points directly at a commit.
    pub detached: bool,
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

/// Metadata of a single commit object.
///
/// Returned by [`GitRepo::read_commit`](crate::GitRepo::read_commit).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit's own id.
    pub id: GitOid,
    /// OIDs of parent commits (empty for root commits).
    pub parents: Vec<GitOid>,
    /// Full commit message.
    pub message: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Commit time in seconds since the Unix epoch.
    pub time: i64,
}

impl CommitInfo {
    /// The first line of the message.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim_end()
    }
}

// ---------------------------------------------------------------------------
// Index conflicts
// ---------------------------------------------------------------------------

/// One of the three index slots holding a side of a conflicting path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictStage {
    /// Stage 1: the common ancestor.
    Ancestor,
    /// Stage 2: the current branch ("ours").
    Ours,
    /// Stage 3: the incoming side ("theirs").
    Theirs,
}

impl ConflictStage {
    /// Map a raw index stage number (1–3) to a [`ConflictStage`].
    ///
    /// Stage 0 (unconflicted) and anything out of range map to `None`.
    #[must_use]
    pub const fn from_raw(stage: u32) -> Option<Self> {
        match stage {
            1 => Some(Self::Ancestor),
            2 => Some(Self::Ours),
            3 => Some(Self::Theirs),
            _ => None,
        }
    }
}

/// A single conflict-stage entry of the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexConflictEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// Which side this entry holds.
    pub stage: ConflictStage,
    /// Blob holding that side's content.
    pub oid: GitOid,
}

// ---------------------------------------------------------------------------
// Command output
// ---------------------------------------------------------------------------

/// Captured result of a [`CommandExecutor`](crate::CommandExecutor) run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl CommandOutput {
    /// `true` if the process exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr joined, for substring checks that must look at both.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut s = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        s.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stderr.is_empty() {
            s.push('\n');
        }
        s.push_str(&self.stderr);
        s
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
