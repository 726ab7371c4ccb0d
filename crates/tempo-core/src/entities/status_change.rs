use chrono::{DateTime, TimeDelta, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::duration_serde;
use crate::enums::StoryStatus;

/// An append-only ledger entry recording that a story reached `new_status`.
///
/// `duration` is the length of the interval this event opened. It stays `None`
/// while the event is the story's most recent one and is filled exactly once,
/// when the next event for the same story is appended.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusChange {
    pub id: String,
    pub story_id: String,
    /// 1-based position of the event in the story's timeline.
    pub seq: u32,
    pub time: DateTime<Utc>,
    pub new_status: StoryStatus,
    /// Acting contributor. `None` for system-initiated changes.
    pub contributor_id: Option<String>,
    #[serde(with = "duration_serde::millis_option")]
    #[schemars(with = "Option<i64>")]
    pub duration: Option<TimeDelta>,
}

impl StatusChange {
    /// Whether a later event has closed this event's interval.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.duration.is_some()
    }

    /// End of the interval this event opened, if closed.
    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.duration.map(|d| self.time + d)
    }
}
