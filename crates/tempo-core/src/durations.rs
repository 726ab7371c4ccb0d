//! Duration math over status-change timelines.
//!
//! A story's ledger is a sequence of events; each event opens a *status
//! interval* that the next event closes. The last interval stays open and keeps
//! accruing time until `as_of`, except on terminal stories where nothing accrues.
//! All sums start from zero so empty inputs yield `TimeDelta::zero()`.

use chrono::{DateTime, TimeDelta, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::duration_serde;
use crate::entities::StatusChange;
use crate::enums::StoryStatus;

/// Elapsed-time totals for a story or an epic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TimeStats {
    /// Every status interval, including accruing open intervals.
    #[serde(with = "duration_serde::millis")]
    #[schemars(with = "i64")]
    pub total_time: TimeDelta,
    /// Closed `in_progress` intervals only.
    #[serde(with = "duration_serde::millis")]
    #[schemars(with = "i64")]
    pub total_work_time: TimeDelta,
}

impl Default for TimeStats {
    fn default() -> Self {
        Self {
            total_time: TimeDelta::zero(),
            total_work_time: TimeDelta::zero(),
        }
    }
}

/// Count of stories per current status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusCounts {
    pub created: u32,
    pub in_progress: u32,
    pub suspended: u32,
    pub canceled: u32,
    pub finished: u32,
}

impl StatusCounts {
    #[must_use]
    pub const fn get(&self, status: StoryStatus) -> u32 {
        match status {
            StoryStatus::Created => self.created,
            StoryStatus::InProgress => self.in_progress,
            StoryStatus::Suspended => self.suspended,
            StoryStatus::Canceled => self.canceled,
            StoryStatus::Finished => self.finished,
        }
    }

    pub fn add(&mut self, status: StoryStatus, count: u32) {
        match status {
            StoryStatus::Created => self.created += count,
            StoryStatus::InProgress => self.in_progress += count,
            StoryStatus::Suspended => self.suspended += count,
            StoryStatus::Canceled => self.canceled += count,
            StoryStatus::Finished => self.finished += count,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.created + self.in_progress + self.suspended + self.canceled + self.finished
    }
}

/// One span of a story's timeline during which it held a single status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusInterval {
    pub status: StoryStatus,
    /// Actor of the event that opened the interval.
    pub contributor_id: Option<String>,
    pub start: DateTime<Utc>,
    /// `None` while the interval is still accruing.
    pub end: Option<DateTime<Utc>>,
    #[serde(with = "duration_serde::millis")]
    #[schemars(with = "i64")]
    pub duration: TimeDelta,
}

impl StatusInterval {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Length of the interval from `start` to `end`, or `None` if `end` is earlier.
#[must_use]
pub fn interval_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<TimeDelta> {
    let d = end - start;
    (d >= TimeDelta::zero()).then_some(d)
}

/// Time accrued by a story's open interval at `as_of`.
///
/// Terminal stories accrue nothing; an `as_of` before the last event counts as
/// zero rather than a negative span.
#[must_use]
pub fn open_interval(
    current_status: StoryStatus,
    last_event_time: DateTime<Utc>,
    as_of: DateTime<Utc>,
) -> TimeDelta {
    if current_status.is_terminal() {
        return TimeDelta::zero();
    }
    interval_between(last_event_time, as_of).unwrap_or_else(TimeDelta::zero)
}

/// Sum durations, yielding zero for an empty input.
pub fn sum_durations<I>(durations: I) -> TimeDelta
where
    I: IntoIterator<Item = TimeDelta>,
{
    durations
        .into_iter()
        .fold(TimeDelta::zero(), |acc, d| acc + d)
}

/// Fold an ordered timeline into status intervals.
///
/// Closed intervals use the stored duration; the last interval is open unless
/// its status is terminal, in which case it is a zero-length closed interval.
#[must_use]
pub fn intervals(timeline: &[StatusChange], as_of: DateTime<Utc>) -> Vec<StatusInterval> {
    let last_idx = timeline.len().saturating_sub(1);
    timeline
        .iter()
        .enumerate()
        .map(|(idx, event)| {
            let (end, duration) = match event.duration {
                Some(d) => (Some(event.time + d), d),
                None if idx < last_idx => {
                    let next = timeline[idx + 1].time;
                    (Some(next), interval_between(event.time, next).unwrap_or_else(TimeDelta::zero))
                }
                None if event.new_status.is_terminal() => (Some(event.time), TimeDelta::zero()),
                None => (None, open_interval(event.new_status, event.time, as_of)),
            };
            StatusInterval {
                status: event.new_status,
                contributor_id: event.contributor_id.clone(),
                start: event.time,
                end,
                duration,
            }
        })
        .collect()
}

/// Time statistics of a single story's timeline at `as_of`.
#[must_use]
pub fn story_time_stats(timeline: &[StatusChange], as_of: DateTime<Utc>) -> TimeStats {
    let intervals = intervals(timeline, as_of);
    TimeStats {
        total_time: sum_durations(intervals.iter().map(|i| i.duration)),
        total_work_time: sum_durations(
            intervals
                .iter()
                .filter(|i| i.status == StoryStatus::InProgress && !i.is_open())
                .map(|i| i.duration),
        ),
    }
}

/// Closed `in_progress` time attributed to `contributor_id` in a timeline.
#[must_use]
pub fn contributor_work_time(timeline: &[StatusChange], contributor_id: &str) -> TimeDelta {
    sum_durations(
        timeline
            .iter()
            .filter(|e| {
                e.new_status == StoryStatus::InProgress
                    && e.contributor_id.as_deref() == Some(contributor_id)
            })
            .filter_map(|e| e.duration),
    )
}
