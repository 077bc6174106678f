//! The stash reapplication state machine.
//!
//! Pure: phases, the results a phase can report, and the transition table.
//! Each phase also declares which stash entries must exist when it starts
//! and after it reports a result, so the no-loss ordering can be checked
//! without touching a repository.

use std::fmt;

use serde::Serialize;

use crate::model::MergeOutcome;

/// Where the engine is in the escalation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Clean tree: pop the entry directly.
    Direct,
    /// Dirty tree: apply the entry as a fuzzy patch.
    PatchAttempt,
    /// Patch rejected: park the dirty tree in a temporary stash, apply the
    /// entry, then merge the temporary stash back on top.
    CommitReconcile,
    /// Reconciliation failed: reset and reapply the temporary stash.
    Restored {
        /// Why reconciliation was abandoned.
        reason: String,
    },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::PatchAttempt => write!(f, "patch"),
            Self::CommitReconcile => write!(f, "reconcile"),
            Self::Restored { .. } => write!(f, "restore"),
        }
    }
}

/// What a phase reports back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseResult {
    /// The content landed without conflicts.
    Applied,
    /// The content landed with these paths unmerged.
    Conflicted(Vec<String>),
    /// The patch tool could not place every hunk.
    Rejected,
    /// The phase failed in a way a later phase may still handle.
    Failed(String),
    /// The phase failed and nothing further may be attempted.
    Stopped(String),
}

/// Next step after a phase reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Next(Phase),
    Done(MergeOutcome),
}

/// Which stash entries exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inventory {
    /// The entry being reapplied.
    pub target: bool,
    /// The temporary entry holding the user's dirty tree.
    pub temp: bool,
}

impl Inventory {
    const fn new(target: bool, temp: bool) -> Self {
        Self { target, temp }
    }
}

/// Entry phase for a tree with (`dirty`) or without tracked changes.
#[must_use]
pub const fn start(dirty: bool) -> Phase {
    if dirty { Phase::PatchAttempt } else { Phase::Direct }
}

impl Phase {
    /// Stash entries that must exist when this phase starts.
    #[must_use]
    pub const fn entry_inventory(&self) -> Inventory {
        match self {
            Self::Direct | Self::PatchAttempt | Self::CommitReconcile => Inventory::new(true, false),
            Self::Restored { .. } => Inventory::new(true, true),
        }
    }

    /// Stash entries that exist once this phase reported `result`.
    ///
    /// The target is gone only when its content is in the working tree.
    #[must_use]
    pub const fn exit_inventory(&self, result: &PhaseResult) -> Inventory {
        match (self, result) {
            (Self::Direct | Self::PatchAttempt, PhaseResult::Applied) => Inventory::new(false, false),
            // a conflicting pop keeps the entry
            (Self::Direct | Self::PatchAttempt, _) => Inventory::new(true, false),
            (Self::CommitReconcile, PhaseResult::Applied) => Inventory::new(false, false),
            (Self::CommitReconcile, PhaseResult::Conflicted(_)) => Inventory::new(false, true),
            (Self::CommitReconcile, PhaseResult::Stopped(_)) => Inventory::new(true, false),
            (Self::CommitReconcile, _) => Inventory::new(true, true),
            (Self::Restored { .. }, PhaseResult::Applied) => Inventory::new(true, false),
            (Self::Restored { .. }, _) => Inventory::new(true, true),
        }
    }

    /// Apply the transition table.
    #[must_use]
    pub fn transition(self, result: PhaseResult) -> Transition {
        use PhaseResult as R;

        match (self, result) {
            (Self::Direct, R::Applied) => Transition::Done(MergeOutcome::Success),
            (Self::Direct, R::Conflicted(paths)) => Transition::Done(MergeOutcome::Conflicts(paths)),
            (Self::Direct, R::Failed(msg) | R::Stopped(msg)) => {
                Transition::Done(MergeOutcome::Failure(msg))
            }
            (Self::Direct, R::Rejected) => {
                Transition::Done(MergeOutcome::Failure("stash could not be applied".to_owned()))
            }

            (Self::PatchAttempt, R::Applied) => Transition::Done(MergeOutcome::Success),
            (Self::PatchAttempt, R::Rejected | R::Failed(_) | R::Conflicted(_)) => {
                Transition::Next(Self::CommitReconcile)
            }
            (Self::PatchAttempt, R::Stopped(msg)) => Transition::Done(MergeOutcome::Failure(msg)),

            (Self::CommitReconcile, R::Applied) => Transition::Done(MergeOutcome::Success),
            (Self::CommitReconcile, R::Conflicted(paths)) => {
                Transition::Done(MergeOutcome::Conflicts(paths))
            }
            (Self::CommitReconcile, R::Failed(reason)) => {
                Transition::Next(Self::Restored { reason })
            }
            (Self::CommitReconcile, R::Rejected) => Transition::Next(Self::Restored {
                reason: "reconciliation rejected".to_owned(),
            }),
            (Self::CommitReconcile, R::Stopped(msg)) => {
                Transition::Done(MergeOutcome::Failure(msg))
            }

            (Self::Restored { reason }, R::Applied) => {
                Transition::Done(MergeOutcome::Failure(format!(
                    "{reason}; working tree restored to its previous state"
                )))
            }
            (Self::Restored { reason }, R::Failed(msg) | R::Stopped(msg)) => {
                Transition::Done(MergeOutcome::Failure(format!(
                    "{reason}; restoring the working tree failed ({msg}); \
                     your changes are kept in the temporary stash"
                )))
            }
            (Self::Restored { reason }, R::Rejected | R::Conflicted(_)) => {
                Transition::Done(MergeOutcome::Failure(format!(
                    "{reason}; working tree only partly restored; \
                     your changes are kept in the temporary stash"
                )))
            }
        }
    }
}
