use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A coarse unit of work owned by one contributor. The owner never changes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Epic {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Epic {
    #[must_use]
    pub fn is_owned_by(&self, contributor_id: &str) -> bool {
        self.owner_id == contributor_id
    }
}
