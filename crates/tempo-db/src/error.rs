//! Database error types for tempo-db.

use chrono::{DateTime, Utc};
use tempo_core::errors::{CoreError, WorkflowError};
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A ledger append is earlier than the story's latest event.
    #[error("Status change for story {story} at {attempted} is earlier than its latest event at {latest}")]
    OutOfOrder {
        story: String,
        latest: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    /// The row changed between read and write inside a unit of work.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The row is still referenced and cannot be deleted.
    #[error("Protected: {0}")]
    Protected(String),

    /// Validation or workflow rejection from tempo-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<WorkflowError> for DatabaseError {
    fn from(err: WorkflowError) -> Self {
        Self::Core(CoreError::Workflow(err))
    }
}

impl DatabaseError {
    /// The workflow rejection carried by this error, if any.
    #[must_use]
    pub const fn workflow(&self) -> Option<&WorkflowError> {
        match self {
            Self::Core(CoreError::Workflow(err)) => Some(err),
            _ => None,
        }
    }

    /// Whether the operation was refused (validation, authorization, state,
    /// ordering, contention or a protected reference) rather than failing in
    /// the store itself.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Core(CoreError::Validation(_) | CoreError::Workflow(_))
                | Self::OutOfOrder { .. }
                | Self::Conflict(_)
                | Self::Protected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_core::enums::{StoryStatus, WorkflowOp};

    #[test]
    fn workflow_errors_are_reachable() {
        let err: DatabaseError = WorkflowError::InvalidTransition {
            story: "sty-00000001".into(),
            op: WorkflowOp::Resume,
            from: StoryStatus::Created,
        }
        .into();
        assert!(err.is_rejection());
        assert!(matches!(
            err.workflow(),
            Some(WorkflowError::InvalidTransition { op: WorkflowOp::Resume, .. })
        ));
        assert_eq!(
            err.to_string(),
            "Operation not allowed: cannot resume story sty-00000001 while it is created"
        );
    }

    #[test]
    fn store_failures_are_not_rejections() {
        assert!(!DatabaseError::NoResult.is_rejection());
        assert!(!DatabaseError::Query("boom".into()).is_rejection());
        assert!(DatabaseError::Conflict("story moved".into()).is_rejection());
        assert!(DatabaseError::NoResult.workflow().is_none());
    }
}
