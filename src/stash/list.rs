//! Reading the stash list.

use loom_git::GitOid;

use crate::error::Result;
use crate::model::StashEntry;
use crate::runner::GitRunner;

const FIELD_SEP: char = '\u{1f}';

/// Stash commit id, reflog subject, author name, author time.
const LIST_FORMAT: &str = "--format=%H%x1f%gs%x1f%an%x1f%at";

/// List every stash entry, newest first.
///
/// # Errors
/// Fails when `git stash list` cannot run or exits non-zero.
pub fn list(git: &GitRunner<'_>) -> Result<Vec<StashEntry>> {
    let out = git.run_ok(&["stash", "list", LIST_FORMAT])?;
    Ok(parse(&out))
}

/// Position of the entry with object id `id`, if it is still listed.
#[must_use]
pub fn position(entries: &[StashEntry], id: GitOid) -> Option<usize> {
    entries.iter().find(|e| e.id == id).map(|e| e.index)
}

fn parse(output: &str) -> Vec<StashEntry> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .filter_map(|(index, line)| {
            let mut fields = line.split(FIELD_SEP);
            let id = fields.next()?.trim().parse().ok()?;
            let message = fields.next().unwrap_or_default().to_owned();
            let author = fields.next().unwrap_or_default().to_owned();
            let time = fields
                .next()
                .and_then(|t| t.trim().parse().ok())
                .unwrap_or(0);
            Some(StashEntry {
                index,
                id,
                branch: origin_branch(&message),
                message,
                author,
                time,
            })
        })
        .collect()
}

/// Branch a stash was taken on: `WIP on <branch>: ...` or `On <branch>: ...`.
fn origin_branch(message: &str) -> Option<String> {
    let rest = message
        .strip_prefix("WIP on ")
        .or_else(|| message.strip_prefix("On "))?;
    let (branch, _) = rest.split_once(':')?;
    let branch = branch.trim();
    if branch.is_empty() || branch == "(no branch)" {
        None
    } else {
        Some(branch.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn parses_fields_and_assigns_indices() {
        let out = format!(
            "{A}\u{1f}WIP on main: 1a2b3c4 fix parser\u{1f}Ann\u{1f}1700000000\n\
             {B}\u{1f}On feature/x: halfway\u{1f}Bob\u{1f}1690000000\n"
        );
        let entries = parse(&out);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].id.to_string(), A);
        assert_eq!(entries[0].branch.as_deref(), Some("main"));
        assert_eq!(entries[0].author, "Ann");
        assert_eq!(entries[0].time, 1_700_000_000);
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].branch.as_deref(), Some("feature/x"));
        assert_eq!(entries[1].message, "On feature/x: halfway");
    }

    #[test]
    fn origin_branch_shapes() {
        assert_eq!(origin_branch("WIP on main: abc msg").as_deref(), Some("main"));
        assert_eq!(origin_branch("On dev: custom: with colon").as_deref(), Some("dev"));
        assert_eq!(origin_branch("WIP on (no branch): abc msg"), None);
        assert_eq!(origin_branch("autostash"), None);
    }

    #[test]
    fn skips_malformed_lines() {
        let out = format!("not-an-oid\u{1f}x\u{1f}y\u{1f}1\n{B}\u{1f}On main: m\u{1f}C\u{1f}bad\n");
        let entries = parse(&out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].time, 0);
    }

    #[test]
    fn position_by_id() {
        let out = format!("{A}\u{1f}On a: x\u{1f}A\u{1f}1\n{B}\u{1f}On b: y\u{1f}B\u{1f}2\n");
        let entries = parse(&out);
        let b: GitOid = B.parse().unwrap();
        assert_eq!(position(&entries, b), Some(1));
        assert_eq!(position(&entries, GitOid::from_bytes([9; 20])), None);
    }
}
