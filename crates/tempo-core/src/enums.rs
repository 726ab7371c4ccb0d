//! Status and operation enums for Tempo.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `StoryStatus` provides `allowed_next_states()` describing the shape of the
//! state machine; the operation-level rules live in [`crate::workflow`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StoryStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a user story.
///
/// ```text
/// created → in_progress → finished
/// created | in_progress → suspended → created | in_progress (resumed)
/// created | in_progress | suspended → canceled | finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Created,
    InProgress,
    Suspended,
    Canceled,
    Finished,
}

impl StoryStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::InProgress,
        Self::Suspended,
        Self::Canceled,
        Self::Finished,
    ];

    /// Valid next states from the current state.
    ///
    /// `in_progress → in_progress` is a transfer to another assignee.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Created => &[
                Self::InProgress,
                Self::Suspended,
                Self::Canceled,
                Self::Finished,
            ],
            Self::InProgress => &[
                Self::InProgress,
                Self::Suspended,
                Self::Canceled,
                Self::Finished,
            ],
            Self::Suspended => &[
                Self::Created,
                Self::InProgress,
                Self::Canceled,
                Self::Finished,
            ],
            Self::Canceled | Self::Finished => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// `finished` and `canceled` never transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Finished)
    }

    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Suspended => "suspended",
            Self::Canceled => "canceled",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkflowOp
// ---------------------------------------------------------------------------

/// A workflow operation a contributor can perform on an existing story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOp {
    Take,
    Suspend,
    Resume,
    Cancel,
    Validate,
}

impl WorkflowOp {
    pub const ALL: [Self; 5] = [
        Self::Take,
        Self::Suspend,
        Self::Resume,
        Self::Cancel,
        Self::Validate,
    ];

    /// Whether only the owner of the story's epic may perform this operation.
    #[must_use]
    pub const fn requires_ownership(self) -> bool {
        !matches!(self, Self::Take)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Take => "take",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for WorkflowOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_serde_roundtrip {
        ($name:ident, $ty:ty, $variant:expr, $expected_str:expr) => {
            #[test]
            fn $name() {
                let val = $variant;
                let json = serde_json::to_string(&val).unwrap();
                assert_eq!(json, format!("\"{}\"", $expected_str));
                let recovered: $ty = serde_json::from_str(&json).unwrap();
                assert_eq!(recovered, val);
            }
        };
    }

    test_serde_roundtrip!(
        status_in_progress,
        StoryStatus,
        StoryStatus::InProgress,
        "in_progress"
    );
    test_serde_roundtrip!(status_canceled, StoryStatus, StoryStatus::Canceled, "canceled");
    test_serde_roundtrip!(op_validate, WorkflowOp, WorkflowOp::Validate, "validate");

    #[test]
    fn terminal_states_have_no_successors() {
        for status in StoryStatus::ALL {
            assert_eq!(
                status.is_terminal(),
                status.allowed_next_states().is_empty(),
                "{status}"
            );
        }
    }

    #[test]
    fn nominal_path_is_allowed() {
        assert!(StoryStatus::Created.can_transition_to(StoryStatus::InProgress));
        assert!(StoryStatus::InProgress.can_transition_to(StoryStatus::Finished));
    }

    #[test]
    fn suspended_is_a_reversible_detour() {
        assert!(StoryStatus::Created.can_transition_to(StoryStatus::Suspended));
        assert!(StoryStatus::InProgress.can_transition_to(StoryStatus::Suspended));
        assert!(StoryStatus::Suspended.can_transition_to(StoryStatus::Created));
        assert!(StoryStatus::Suspended.can_transition_to(StoryStatus::InProgress));
        assert!(!StoryStatus::Suspended.can_transition_to(StoryStatus::Suspended));
    }

    #[test]
    fn nothing_leaves_a_terminal_state() {
        for next in StoryStatus::ALL {
            assert!(!StoryStatus::Finished.can_transition_to(next));
            assert!(!StoryStatus::Canceled.can_transition_to(next));
        }
    }

    #[test]
    fn only_take_is_open_to_everyone() {
        for op in WorkflowOp::ALL {
            assert_eq!(op.requires_ownership(), op != WorkflowOp::Take, "{op}");
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", StoryStatus::InProgress), "in_progress");
        assert_eq!(format!("{}", StoryStatus::Suspended), "suspended");
        assert_eq!(format!("{}", WorkflowOp::Resume), "resume");
    }
}
