//! Cross-cutting error types for Tempo.
//!
//! `WorkflowError` is the rejection taxonomy of the workflow engine. Both kinds
//! are raised before anything is written, so a rejected operation never leaves
//! a partial mutation behind. Storage errors (`DatabaseError`) are defined in
//! `tempo-db` and wrap `CoreError`.

use thiserror::Error;

use crate::enums::{StoryStatus, WorkflowOp};

/// A workflow operation that was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The actor is not the owner of the epic and the operation is owner-only.
    #[error("Operation not allowed: {actor} is not the owner of epic {epic}")]
    NotOwner { actor: String, epic: String },

    /// The operation is not legal from the story's current status.
    #[error("Operation not allowed: cannot {op} story {story} while it is {from}")]
    InvalidTransition {
        story: String,
        op: WorkflowOp,
        from: StoryStatus,
    },
}

/// Errors that can be raised by any Tempo crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation (empty title, over-long field, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A workflow rule rejected the operation.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_parties() {
        let err = WorkflowError::NotOwner {
            actor: "ctb-00000002".into(),
            epic: "epc-00000001".into(),
        };
        assert_eq!(
            err.to_string(),
            "Operation not allowed: ctb-00000002 is not the owner of epic epc-00000001"
        );

        let err = WorkflowError::InvalidTransition {
            story: "sty-00000001".into(),
            op: WorkflowOp::Take,
            from: StoryStatus::Finished,
        };
        assert_eq!(
            err.to_string(),
            "Operation not allowed: cannot take story sty-00000001 while it is finished"
        );
    }

    #[test]
    fn workflow_error_converts_into_core_error() {
        let core: CoreError = WorkflowError::NotOwner {
            actor: "a".into(),
            epic: "e".into(),
        }
        .into();
        assert!(matches!(core, CoreError::Workflow(WorkflowError::NotOwner { .. })));
    }
}
