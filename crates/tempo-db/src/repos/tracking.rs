//! Duration queries over the status-change ledger.
//!
//! Closed intervals come straight from the stored `duration_ms` column and are
//! summed in SQL. The open interval of a non-terminal story is the time from
//! its latest event to the caller's `as_of` and is added in Rust. Every
//! query answers zero for an empty set.

use chrono::{DateTime, TimeDelta, Utc};
use tempo_core::durations::{
    StatusCounts, StatusInterval, TimeStats, intervals, open_interval, story_time_stats,
    sum_durations,
};
use tempo_core::entities::StatusChange;
use tempo_core::enums::StoryStatus;
use tempo_core::responses::StoryWorkTime;

use crate::error::DatabaseError;
use crate::helpers::{
    ceil_millis, format_timestamp, get_u32, millis_to_duration, normalize, parse_datetime,
    parse_enum,
};
use crate::ledger::{self, EventSink};
use crate::repos::epic::fetch_epic;
use crate::repos::story::fetch_story;
use crate::service::TempoService;

/// Stored-text bounds of the inclusive period `[start, end]`, or `None` when
/// no stored timestamp can fall inside it. Stored times have millisecond
/// precision, so `start` rounds up and `end` rounds down.
fn period_bounds(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<(String, String)> {
    let start = ceil_millis(start);
    let end = normalize(end);
    (start <= end).then(|| (format_timestamp(start), format_timestamp(end)))
}

/// Run a `SELECT COALESCE(SUM(duration_ms), 0) ...` query and read it as a duration.
async fn sum_millis(
    conn: &libsql::Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
) -> Result<TimeDelta, DatabaseError> {
    let mut rows = conn.query(sql, params).await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    millis_to_duration(row.get::<i64>(0)?)
}

impl<S: EventSink> TempoService<S> {
    // -----------------------------------------------------------------------
    // Timeline reads
    // -----------------------------------------------------------------------

    /// A story's events in `(time, seq)` order.
    pub async fn story_timeline(&self, story_id: &str) -> Result<Vec<StatusChange>, DatabaseError> {
        fetch_story(&*self.db().conn().await, story_id).await?;
        ledger::story_timeline(&*self.db().conn().await, story_id).await
    }

    /// A story's latest event. `None` only for stories created outside the
    /// workflow engine.
    pub async fn last_status_change(
        &self,
        story_id: &str,
    ) -> Result<Option<StatusChange>, DatabaseError> {
        fetch_story(&*self.db().conn().await, story_id).await?;
        ledger::last_status_change(&*self.db().conn().await, story_id).await
    }

    /// The story's timeline folded into status intervals at `as_of`.
    pub async fn story_intervals(
        &self,
        story_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<StatusInterval>, DatabaseError> {
        let timeline = self.story_timeline(story_id).await?;
        Ok(intervals(&timeline, as_of))
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Total and work time of one story at `as_of`.
    pub async fn story_time_stats(
        &self,
        story_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<TimeStats, DatabaseError> {
        let timeline = self.story_timeline(story_id).await?;
        Ok(story_time_stats(&timeline, as_of))
    }

    /// Total and work time across every story of an epic at `as_of`.
    ///
    /// `total_time` counts every closed interval plus the open interval of each
    /// story that is neither finished nor canceled. `total_work_time` counts
    /// closed `in_progress` intervals only.
    pub async fn epic_time_stats(
        &self,
        epic_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<TimeStats, DatabaseError> {
        let conn = self.db().conn().await;
        fetch_epic(&conn, epic_id).await?;

        let closed = sum_millis(
            &conn,
            "SELECT COALESCE(SUM(sc.duration_ms), 0) FROM status_changes sc \
             JOIN user_stories s ON s.id = sc.story_id WHERE s.epic_id = ?1",
            [epic_id],
        )
        .await?;
        let work = sum_millis(
            &conn,
            "SELECT COALESCE(SUM(sc.duration_ms), 0) FROM status_changes sc \
             JOIN user_stories s ON s.id = sc.story_id \
             WHERE s.epic_id = ?1 AND sc.new_status = 'in_progress'",
            [epic_id],
        )
        .await?;

        let mut rows = conn
            .query(
                "SELECT s.status, MAX(sc.time) FROM user_stories s \
                 JOIN status_changes sc ON sc.story_id = s.id \
                 WHERE s.epic_id = ?1 AND s.status NOT IN ('canceled', 'finished') \
                 GROUP BY s.id, s.status",
                [epic_id],
            )
            .await?;
        let mut open = Vec::new();
        while let Some(row) = rows.next().await? {
            let status: StoryStatus = parse_enum(&row.get::<String>(0)?)?;
            let last = parse_datetime(&row.get::<String>(1)?)?;
            open.push(open_interval(status, last, as_of));
        }

        Ok(TimeStats {
            total_time: closed + sum_durations(open),
            total_work_time: work,
        })
    }

    /// Closed `in_progress` time attributed to `contributor_id` in an epic.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the epic does not exist.
    pub async fn epic_contributor_time(
        &self,
        epic_id: &str,
        contributor_id: &str,
    ) -> Result<TimeDelta, DatabaseError> {
        let conn = self.db().conn().await;
        fetch_epic(&conn, epic_id).await?;
        sum_millis(
            &conn,
            "SELECT COALESCE(SUM(sc.duration_ms), 0) FROM status_changes sc \
             JOIN user_stories s ON s.id = sc.story_id \
             WHERE s.epic_id = ?1 AND sc.contributor_id = ?2 AND sc.new_status = 'in_progress'",
            [epic_id, contributor_id],
        )
        .await
    }

    /// Closed `in_progress` time attributed to `contributor_id` on one story.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the story does not exist.
    pub async fn story_contributor_time(
        &self,
        story_id: &str,
        contributor_id: &str,
    ) -> Result<TimeDelta, DatabaseError> {
        let conn = self.db().conn().await;
        fetch_story(&conn, story_id).await?;
        sum_millis(
            &conn,
            "SELECT COALESCE(SUM(duration_ms), 0) FROM status_changes \
             WHERE story_id = ?1 AND contributor_id = ?2 AND new_status = 'in_progress'",
            [story_id, contributor_id],
        )
        .await
    }

    /// Closed `in_progress` time of `contributor_id` across all stories, for
    /// intervals that started within `[start, end]`. Zero when `start > end`.
    pub async fn period_contributor_time(
        &self,
        contributor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeDelta, DatabaseError> {
        let Some((start, end)) = period_bounds(start, end) else {
            return Ok(TimeDelta::zero());
        };
        sum_millis(
            &*self.db().conn().await,
            "SELECT COALESCE(SUM(duration_ms), 0) FROM status_changes \
             WHERE contributor_id = ?1 AND new_status = 'in_progress' \
             AND time >= ?2 AND time <= ?3",
            [contributor_id.to_string(), start, end],
        )
        .await
    }

    /// Per-story breakdown of [`Self::period_contributor_time`], ordered by
    /// story id. Stories without closed work in the period are omitted.
    pub async fn contributor_time_by_story(
        &self,
        contributor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoryWorkTime>, DatabaseError> {
        let Some((start, end)) = period_bounds(start, end) else {
            return Ok(Vec::new());
        };
        let mut rows = self
            .db()
            .conn()
            .await
            .query(
                "SELECT s.id, s.title, s.epic_id, SUM(sc.duration_ms) AS work \
                 FROM status_changes sc JOIN user_stories s ON s.id = sc.story_id \
                 WHERE sc.contributor_id = ?1 AND sc.new_status = 'in_progress' \
                 AND sc.duration_ms IS NOT NULL AND sc.time >= ?2 AND sc.time <= ?3 \
                 GROUP BY s.id, s.title, s.epic_id ORDER BY s.id",
                [contributor_id.to_string(), start, end],
            )
            .await?;

        let mut breakdown = Vec::new();
        while let Some(row) = rows.next().await? {
            breakdown.push(StoryWorkTime {
                story_id: row.get(0)?,
                story_title: row.get(1)?,
                epic_id: row.get(2)?,
                work_time: millis_to_duration(row.get::<i64>(3)?)?,
            });
        }
        Ok(breakdown)
    }

    /// Number of stories of an epic per current status.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the epic does not exist.
    pub async fn epic_stats(&self, epic_id: &str) -> Result<StatusCounts, DatabaseError> {
        let conn = self.db().conn().await;
        fetch_epic(&conn, epic_id).await?;
        let mut rows = conn
            .query(
                "SELECT status, COUNT(*) FROM user_stories WHERE epic_id = ?1 GROUP BY status",
                [epic_id],
            )
            .await?;

        let mut counts = StatusCounts::default();
        while let Some(row) = rows.next().await? {
            let status: StoryStatus = parse_enum(&row.get::<String>(0)?)?;
            counts.add(status, get_u32(&row, 1)?);
        }
        Ok(counts)
    }
}
