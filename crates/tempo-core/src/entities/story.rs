use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::StoryStatus;
use crate::workflow::StoryState;

/// A unit of work inside an epic, with a lifecycle status and an optional
/// assignee.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UserStory {
    pub id: String,
    pub epic_id: String,
    pub title: String,
    pub description: String,
    pub status: StoryStatus,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStory {
    /// The workflow-relevant part of the story.
    #[must_use]
    pub fn state(&self) -> StoryState {
        StoryState {
            status: self.status,
            assigned_to: self.assigned_to.clone(),
        }
    }

    /// Replace the workflow state, stamping `updated_at`.
    #[must_use]
    pub fn with_state(self, state: StoryState, at: DateTime<Utc>) -> Self {
        Self {
            status: state.status,
            assigned_to: state.assigned_to,
            updated_at: at,
            ..self
        }
    }

    #[must_use]
    pub fn is_assigned_to(&self, contributor_id: &str) -> bool {
        self.assigned_to.as_deref() == Some(contributor_id)
    }
}
