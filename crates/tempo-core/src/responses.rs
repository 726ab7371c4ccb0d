//! Read models returned to callers rendering epics and stories.
//!
//! These structs bundle an entity with the related data a page or API response
//! needs (owner names, story lists, counts) so callers make one call per view.

use chrono::TimeDelta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::duration_serde;
use crate::durations::StatusCounts;
use crate::entities::{Contributor, Epic, UserStory};

/// A story with its epic summary and assignee.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StoryDetail {
    pub story: UserStory,
    pub epic_title: String,
    pub epic_owner: Contributor,
    pub assignee: Option<Contributor>,
}

impl StoryDetail {
    #[must_use]
    pub fn assignee_name(&self) -> Option<String> {
        self.assignee.as_ref().map(Contributor::display_name)
    }
}

/// An epic with its owner, its stories (newest first) and per-status counts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EpicDetail {
    pub epic: Epic,
    pub owner: Contributor,
    pub stories: Vec<UserStory>,
    pub stats: StatusCounts,
}

/// Closed `in_progress` time a contributor spent on one story.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StoryWorkTime {
    pub story_id: String,
    pub story_title: String,
    pub epic_id: String,
    #[serde(with = "duration_serde::millis")]
    #[schemars(with = "i64")]
    pub work_time: TimeDelta,
}
