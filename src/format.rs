//! Output rendering for the `gitloom` binary.

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

use gitloom::model::{BranchLabel, Commit, ConflictRecord, MergeOutcome, RepoState, StashEntry};
use gitloom::stash::StashPop;

/// Output format for structured data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text for terminals.
    #[default]
    Text,
    /// JSON, machine-parseable.
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => bail!("Invalid format '{s}'. Use: text or json"),
        }
    }
}

impl OutputFormat {
    /// Serialize data as pretty JSON.
    pub fn json<T: Serialize>(data: &T) -> Result<String> {
        serde_json::to_string_pretty(data)
            .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}"))
    }

    /// Render `data` as JSON, or with `text` otherwise.
    pub fn render<T: Serialize>(self, data: &T, text: impl FnOnce(&T) -> String) -> Result<String> {
        match self {
            Self::Json => Self::json(data),
            Self::Text => Ok(text(data)),
        }
    }
}

/// One line per commit: short id, decorations, summary.
pub fn commits_text(commits: &[Commit]) -> String {
    let mut out = String::new();
    for c in commits {
        let marker = if c.is_head { '@' } else { '*' };
        let _ = write!(out, "{marker} {}", c.id.short());
        let decorations = decorations(c);
        if !decorations.is_empty() {
            let _ = write!(out, " ({})", decorations.join(", "));
        }
        let _ = writeln!(out, " {}", c.summary);
    }
    out
}

fn decorations(c: &Commit) -> Vec<String> {
    let mut out: Vec<String> = c.labels.iter().map(label_text).collect();
    out.extend(c.tags.iter().map(|t| format!("tag: {t}")));
    out
}

fn label_text(label: &BranchLabel) -> String {
    let remotes: Vec<&str> = label.remotes.iter().map(|r| r.remote.as_str()).collect();
    if label.name == "HEAD" {
        return "HEAD".to_owned();
    }
    let name = if label.is_current {
        format!("HEAD -> {}", label.name)
    } else {
        label.name.clone()
    };
    match remotes.as_slice() {
        [] => name,
        [only] if !label.is_local => format!("{only}/{name}"),
        _ => format!("{name} [{}]", remotes.join(", ")),
    }
}

pub fn state_text(state: &RepoState) -> String {
    format!("{state}\n")
}

/// One line per path; the flags show which sides (base, ours, theirs)
/// the index holds.
pub fn conflicts_text(records: &[ConflictRecord]) -> String {
    if records.is_empty() {
        return "no conflicts\n".to_owned();
    }
    let mut out = String::new();
    for r in records {
        let sides: String = [(&r.ancestor, 'B'), (&r.ours, 'O'), (&r.theirs, 'T')]
            .iter()
            .map(|(side, c)| if side.is_some() { *c } else { '-' })
            .collect();
        let _ = writeln!(out, "{sides} {}", r.path);
    }
    out
}

pub fn stash_list_text(entries: &[StashEntry]) -> String {
    if entries.is_empty() {
        return "no stash entries\n".to_owned();
    }
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(out, "{} {} {}", e.refname(), e.id.short(), e.message);
    }
    out
}

pub fn outcome_text(outcome: &MergeOutcome) -> String {
    format!("{outcome}\n")
}

pub fn stash_pop_text(pop: &StashPop) -> String {
    let mut out = format!("{} ({})\n", pop.outcome, pop.phase);
    if let Some(temp) = &pop.temp {
        let _ = writeln!(
            out,
            "your previous changes are kept in stash entry {}; \
             run `gitloom stash release {}` once resolved",
            temp.id().short(),
            temp.id()
        );
    }
    out
}
