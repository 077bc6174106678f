//! Engine configuration (`gitloom.toml`).
//!
//! Every field has a default; a missing file yields all defaults. Unknown
//! keys are rejected so typos surface instead of being silently ignored.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoomConfig {
    /// External programs.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Commit graph settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Stash reapplication settings.
    #[serde(default)]
    pub stash: StashConfig,
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Programs the engine shells out to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// The git CLI (default: `"git"` from `PATH`).
    #[serde(default = "default_git_program")]
    pub git_program: String,

    /// The fuzzy patch tool used to reapply stashes onto a dirty tree
    /// (default: `"patch"`).
    #[serde(default = "default_patch_program")]
    pub patch_program: String,

    /// Context lines the patch tool may ignore when matching hunks
    /// (default: 2).
    #[serde(default = "default_patch_fuzz")]
    pub patch_fuzz: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            git_program: default_git_program(),
            patch_program: default_patch_program(),
            patch_fuzz: default_patch_fuzz(),
        }
    }
}

fn default_git_program() -> String {
    "git".to_owned()
}

fn default_patch_program() -> String {
    "patch".to_owned()
}

const fn default_patch_fuzz() -> u32 {
    2
}

// ---------------------------------------------------------------------------
// GraphConfig
// ---------------------------------------------------------------------------

/// Commit graph settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Commits per window when the caller does not give a count
    /// (default: 500).
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Orphaned tips resolved per build; the rest are skipped with a warning
    /// (default: 512).
    #[serde(default = "default_max_backfill_tips")]
    pub max_backfill_tips: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_backfill_tips: default_max_backfill_tips(),
        }
    }
}

const fn default_page_size() -> usize {
    500
}

const fn default_max_backfill_tips() -> usize {
    512
}

// ---------------------------------------------------------------------------
// StashConfig
// ---------------------------------------------------------------------------

/// Stash reapplication settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StashConfig {
    /// Message given to the temporary stash pushed during reconciliation.
    ///
    /// Purely informational; the entry is tracked by object id.
    #[serde(default = "default_temp_message")]
    pub temp_message: String,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            temp_message: default_temp_message(),
        }
    }
}

fn default_temp_message() -> String {
    "gitloom: reconcile snapshot".to_owned()
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error loading or parsing the configuration file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    /// Path to the file, when one was read.
    pub path: Option<PathBuf>,
    /// Description of the problem (with a line number for parse errors).
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "config error in {}: {}", p.display(), self.message),
            None => write!(f, "config error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl LoomConfig {
    /// File name looked up inside the repository's git directory.
    pub const FILE_NAME: &'static str = "gitloom.toml";

    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = LoomConfig::default();
        assert_eq!(cfg.backend.git_program, "git");
        assert_eq!(cfg.backend.patch_program, "patch");
        assert_eq!(cfg.backend.patch_fuzz, 2);
        assert_eq!(cfg.graph.page_size, 500);
        assert_eq!(cfg.graph.max_backfill_tips, 512);
        assert_eq!(cfg.stash.temp_message, "gitloom: reconcile snapshot");
    }

    #[test]
    fn parse_empty_string() {
        let cfg = LoomConfig::parse("").unwrap();
        assert_eq!(cfg, LoomConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[backend]
git_program = "/usr/local/bin/git"
patch_program = "gpatch"
patch_fuzz = 3

[graph]
page_size = 100
max_backfill_tips = 16

[stash]
temp_message = "snapshot"
"#;
        let cfg = LoomConfig::parse(toml).unwrap();
        assert_eq!(cfg.backend.git_program, "/usr/local/bin/git");
        assert_eq!(cfg.backend.patch_program, "gpatch");
        assert_eq!(cfg.backend.patch_fuzz, 3);
        assert_eq!(cfg.graph.page_size, 100);
        assert_eq!(cfg.graph.max_backfill_tips, 16);
        assert_eq!(cfg.stash.temp_message, "snapshot");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = LoomConfig::parse("[graph]\npage_size = 50\n").unwrap();
        assert_eq!(cfg.graph.page_size, 50);
        assert_eq!(cfg.graph.max_backfill_tips, 512);
        assert_eq!(cfg.backend, BackendConfig::default());
    }

    #[test]
    fn unknown_field_reports_line() {
        let err = LoomConfig::parse("[graph]\npage_size = 1\nbogus = true\n").unwrap_err();
        assert!(err.message.contains("line 3"), "{}", err.message);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoomConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, LoomConfig::default());
    }

    #[test]
    fn load_sets_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LoomConfig::FILE_NAME);
        std::fs::write(&path, "[stash\n").unwrap();
        let err = LoomConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().contains("gitloom.toml"));
    }
}
