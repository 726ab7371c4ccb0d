//! Append-only status-change ledger.
//!
//! Every workflow transition emits exactly one [`StatusChange`] through an
//! [`EventSink`]. Appending an event closes the interval opened by the story's
//! previous event: its `duration` is set to the time elapsed between the two.
//! Nothing else about a ledger row ever changes (a trigger in the schema
//! enforces it); rows disappear only with their story.
//!
//! The sink is handed the connection of the unit of work that performs the
//! transition, so the append commits or rolls back together with the story
//! update.

use std::future::Future;

use chrono::{DateTime, Utc};
use tempo_core::durations::interval_between;
use tempo_core::entities::StatusChange;
use tempo_core::enums::StoryStatus;
use tempo_core::ids::PREFIX_STATUS_CHANGE;

use crate::error::DatabaseError;
use crate::generate_id_on;
use crate::helpers::{
    format_timestamp, get_opt_duration, get_opt_string, get_u32, normalize, parse_datetime,
    parse_enum,
};

const SELECT_COLS: &str = "id, story_id, seq, time, new_status, contributor_id, duration_ms";

/// A status change to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusChange {
    pub story_id: String,
    pub new_status: StoryStatus,
    /// `None` for system-initiated changes.
    pub contributor_id: Option<String>,
    pub time: DateTime<Utc>,
}

impl NewStatusChange {
    #[must_use]
    pub fn new(
        story_id: impl Into<String>,
        new_status: StoryStatus,
        contributor_id: Option<&str>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            story_id: story_id.into(),
            new_status,
            contributor_id: contributor_id.map(String::from),
            time,
        }
    }
}

/// Destination of status-change events.
///
/// `record` runs inside the caller's transaction. An error aborts the whole
/// unit of work, so implementations must not swallow failures.
pub trait EventSink: Send + Sync {
    /// Append `change` to the story's timeline and close the previous interval.
    fn record(
        &self,
        conn: &libsql::Connection,
        change: NewStatusChange,
    ) -> impl Future<Output = Result<StatusChange, DatabaseError>> + Send;
}

/// The libSQL-backed ledger stored in the `status_changes` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger;

impl EventSink for Ledger {
    async fn record(
        &self,
        conn: &libsql::Connection,
        change: NewStatusChange,
    ) -> Result<StatusChange, DatabaseError> {
        let time = normalize(change.time);
        let previous = last_status_change(conn, &change.story_id).await?;

        let seq = match previous {
            Some(prev) => {
                let duration =
                    interval_between(prev.time, time).ok_or_else(|| DatabaseError::OutOfOrder {
                        story: change.story_id.clone(),
                        latest: prev.time,
                        attempted: time,
                    })?;
                let closed = conn
                    .execute(
                        "UPDATE status_changes SET duration_ms = ?1 \
                         WHERE id = ?2 AND duration_ms IS NULL",
                        libsql::params![duration.num_milliseconds(), prev.id.as_str()],
                    )
                    .await?;
                if closed != 1 {
                    return Err(DatabaseError::Conflict(format!(
                        "status change {} of story {} was already closed",
                        prev.id, change.story_id
                    )));
                }
                prev.seq + 1
            }
            None => 1,
        };

        let id = generate_id_on(conn, PREFIX_STATUS_CHANGE).await?;
        conn.execute(
            &format!("INSERT INTO status_changes ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)"),
            libsql::params![
                id.as_str(),
                change.story_id.as_str(),
                i64::from(seq),
                format_timestamp(time),
                change.new_status.as_str(),
                change.contributor_id.as_deref()
            ],
        )
        .await?;

        tracing::debug!(
            story = %change.story_id,
            seq,
            status = %change.new_status,
            contributor = ?change.contributor_id,
            "appended status change"
        );

        Ok(StatusChange {
            id,
            story_id: change.story_id,
            seq,
            time,
            new_status: change.new_status,
            contributor_id: change.contributor_id,
            duration: None,
        })
    }
}

pub(crate) fn row_to_status_change(row: &libsql::Row) -> Result<StatusChange, DatabaseError> {
    Ok(StatusChange {
        id: row.get(0)?,
        story_id: row.get(1)?,
        seq: get_u32(row, 2)?,
        time: parse_datetime(&row.get::<String>(3)?)?,
        new_status: parse_enum(&row.get::<String>(4)?)?,
        contributor_id: get_opt_string(row, 5)?,
        duration: get_opt_duration(row, 6)?,
    })
}

/// A story's events ordered by `(time, seq)`.
pub(crate) async fn story_timeline(
    conn: &libsql::Connection,
    story_id: &str,
) -> Result<Vec<StatusChange>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM status_changes WHERE story_id = ?1 ORDER BY time, seq"
            ),
            [story_id],
        )
        .await?;

    let mut events = Vec::new();
    while let Some(row) = rows.next().await? {
        events.push(row_to_status_change(&row)?);
    }
    Ok(events)
}

/// The story's most recent event, if it has any.
pub(crate) async fn last_status_change(
    conn: &libsql::Connection,
    story_id: &str,
) -> Result<Option<StatusChange>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM status_changes WHERE story_id = ?1 \
                 ORDER BY time DESC, seq DESC LIMIT 1"
            ),
            [story_id],
        )
        .await?;
    rows.next()
        .await?
        .map(|row| row_to_status_change(&row))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TempoDb;
    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 3, 3, 14, 0, 0).unwrap()
    }

    async fn db_with_story() -> TempoDb {
        let db = TempoDb::open_local(":memory:").await.unwrap();
        db.conn()
            .await
            .execute_batch(
                "INSERT INTO contributors (id, username, created_at) VALUES
                     ('ctb-po', 'po', '2012-03-03T14:00:00.000Z'),
                     ('ctb-dev', 'dev', '2012-03-03T14:00:00.000Z');
                 INSERT INTO epics (id, owner_id, title, created_at, updated_at) VALUES
                     ('epc-1', 'ctb-po', 'Epic', '2012-03-03T14:00:00.000Z', '2012-03-03T14:00:00.000Z');
                 INSERT INTO user_stories (id, epic_id, title, created_at, updated_at) VALUES
                     ('sty-1', 'epc-1', 'Story', '2012-03-03T14:00:00.000Z', '2012-03-03T14:00:00.000Z');",
            )
            .await
            .unwrap();
        db
    }

    async fn append(
        db: &TempoDb,
        status: StoryStatus,
        who: Option<&str>,
        time: DateTime<Utc>,
    ) -> Result<StatusChange, DatabaseError> {
        Ledger
            .record(&*db.conn().await, NewStatusChange::new("sty-1", status, who, time))
            .await
    }

    #[tokio::test]
    async fn first_event_has_seq_one_and_no_duration() {
        let db = db_with_story().await;
        let event = append(&db, StoryStatus::Created, Some("ctb-po"), t0())
            .await
            .unwrap();
        assert!(event.id.starts_with("chg-"));
        assert_eq!(event.seq, 1);
        assert_eq!(event.duration, None);
    }

    #[tokio::test]
    async fn append_closes_the_previous_interval() {
        let db = db_with_story().await;
        append(&db, StoryStatus::Created, Some("ctb-po"), t0()).await.unwrap();
        append(&db, StoryStatus::InProgress, Some("ctb-dev"), t0() + TimeDelta::days(1))
            .await
            .unwrap();
        append(&db, StoryStatus::Finished, Some("ctb-po"), t0() + TimeDelta::days(2))
            .await
            .unwrap();

        let timeline = story_timeline(&*db.conn().await, "sty-1").await.unwrap();
        let seqs: Vec<u32> = timeline.iter().map(|e| e.seq).collect();
        let durations: Vec<Option<TimeDelta>> = timeline.iter().map(|e| e.duration).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(
            durations,
            vec![Some(TimeDelta::days(1)), Some(TimeDelta::days(1)), None]
        );
    }

    #[tokio::test]
    async fn equal_timestamps_give_a_zero_interval() {
        let db = db_with_story().await;
        append(&db, StoryStatus::Created, Some("ctb-po"), t0()).await.unwrap();
        append(&db, StoryStatus::InProgress, Some("ctb-dev"), t0()).await.unwrap();

        let timeline = story_timeline(&*db.conn().await, "sty-1").await.unwrap();
        assert_eq!(timeline[0].duration, Some(TimeDelta::zero()));
        assert_eq!(timeline[1].new_status, StoryStatus::InProgress);
    }

    #[tokio::test]
    async fn earlier_append_is_rejected() {
        let db = db_with_story().await;
        append(&db, StoryStatus::Created, Some("ctb-po"), t0()).await.unwrap();
        let err = append(&db, StoryStatus::InProgress, Some("ctb-dev"), t0() - TimeDelta::seconds(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::OutOfOrder { .. }));
        assert_eq!(story_timeline(&*db.conn().await, "sty-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn system_events_have_no_actor() {
        let db = db_with_story().await;
        let event = append(&db, StoryStatus::Created, None, t0()).await.unwrap();
        assert_eq!(event.contributor_id, None);
        let last = last_status_change(&*db.conn().await, "sty-1").await.unwrap().unwrap();
        assert_eq!(last, event);
    }

    #[tokio::test]
    async fn sub_millisecond_precision_is_dropped() {
        let db = db_with_story().await;
        let event = append(
            &db,
            StoryStatus::Created,
            Some("ctb-po"),
            t0() + TimeDelta::microseconds(1_500),
        )
        .await
        .unwrap();
        assert_eq!(event.time, t0() + TimeDelta::milliseconds(1));
        let stored = last_status_change(&*db.conn().await, "sty-1").await.unwrap().unwrap();
        assert_eq!(stored.time, event.time);
    }

    #[tokio::test]
    async fn story_without_events_has_empty_timeline() {
        let db = db_with_story().await;
        assert!(story_timeline(&*db.conn().await, "sty-1").await.unwrap().is_empty());
        assert!(last_status_change(&*db.conn().await, "sty-1").await.unwrap().is_none());
    }
}
