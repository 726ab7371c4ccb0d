//! Story workflow rules.
//!
//! Pure functions deciding whether a contributor may apply a [`WorkflowOp`] to
//! a story and what the story's state becomes. Authorization and state validity
//! are separate functions so each can be checked on its own; [`transition`]
//! composes them. Nothing here touches storage: `tempo-db` applies the result
//! inside a transaction and records the ledger event.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Epic, UserStory};
use crate::enums::{StoryStatus, WorkflowOp};
use crate::errors::WorkflowError;

/// The workflow-relevant state of a story: its status and its assignee.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StoryState {
    pub status: StoryStatus,
    pub assigned_to: Option<String>,
}

impl StoryState {
    /// State of a freshly created story.
    #[must_use]
    pub const fn created() -> Self {
        Self {
            status: StoryStatus::Created,
            assigned_to: None,
        }
    }
}

/// Check that `actor` may create stories in `epic`. Only the owner may.
///
/// # Errors
///
/// Returns `WorkflowError::NotOwner` if `actor` does not own `epic`.
pub fn authorize_new_story(actor: &str, epic: &Epic) -> Result<(), WorkflowError> {
    if epic.is_owned_by(actor) {
        Ok(())
    } else {
        Err(not_owner(actor, epic))
    }
}

/// Check that `actor` may perform `op` on a story of `epic`.
///
/// Anyone may take a story; every other operation is reserved to the epic owner.
///
/// # Errors
///
/// Returns `WorkflowError::NotOwner` for an owner-only operation by someone else.
pub fn authorize(op: WorkflowOp, actor: &str, epic: &Epic) -> Result<(), WorkflowError> {
    if op.requires_ownership() && !epic.is_owned_by(actor) {
        return Err(not_owner(actor, epic));
    }
    Ok(())
}

/// Compute the state reached by applying `op` to `current`.
///
/// # Errors
///
/// Returns `WorkflowError::InvalidTransition` if `op` is not legal from
/// `current.status`.
pub fn next_state(
    op: WorkflowOp,
    actor: &str,
    story_id: &str,
    current: &StoryState,
) -> Result<StoryState, WorkflowError> {
    use StoryStatus::{Canceled, Created, Finished, InProgress, Suspended};

    let next = match (op, current.status) {
        (WorkflowOp::Take, Created | InProgress) => StoryState {
            status: InProgress,
            assigned_to: Some(actor.to_string()),
        },
        (WorkflowOp::Suspend, Created | InProgress) => StoryState {
            status: Suspended,
            assigned_to: current.assigned_to.clone(),
        },
        (WorkflowOp::Resume, Suspended) => StoryState {
            status: if current.assigned_to.is_some() {
                InProgress
            } else {
                Created
            },
            assigned_to: current.assigned_to.clone(),
        },
        (WorkflowOp::Cancel, Created | InProgress | Suspended) => StoryState {
            status: Canceled,
            assigned_to: None,
        },
        (WorkflowOp::Validate, Created | InProgress | Suspended) => StoryState {
            status: Finished,
            assigned_to: None,
        },
        (_, from) => {
            return Err(WorkflowError::InvalidTransition {
                story: story_id.to_string(),
                op,
                from,
            });
        }
    };
    Ok(next)
}

/// Authorize and apply `op` to `story` on behalf of `actor`.
///
/// Ownership is checked first: a non-owner attempting an owner-only operation
/// gets `NotOwner` whatever the story's status.
///
/// # Errors
///
/// Returns `WorkflowError::NotOwner` or `WorkflowError::InvalidTransition`.
pub fn transition(
    op: WorkflowOp,
    actor: &str,
    epic: &Epic,
    story: &UserStory,
) -> Result<StoryState, WorkflowError> {
    authorize(op, actor, epic)?;
    next_state(op, actor, &story.id, &story.state())
}

fn not_owner(actor: &str, epic: &Epic) -> WorkflowError {
    WorkflowError::NotOwner {
        actor: actor.to_string(),
        epic: epic.id.clone(),
    }
}
