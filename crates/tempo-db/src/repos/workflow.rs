//! Workflow engine: applies story transitions as atomic units of work.
//!
//! Each operation opens an `IMMEDIATE` transaction, loads the story and its
//! epic, asks [`tempo_core::workflow::transition`] for the next state, writes
//! it with a compare-and-swap on the previous state and records the status
//! change through the service's [`EventSink`]. Any error rolls the whole unit
//! back, so a rejected or failed operation leaves neither a story change nor a
//! ledger entry behind.

use chrono::{DateTime, Utc};
use tempo_core::entities::UserStory;
use tempo_core::enums::WorkflowOp;
use tempo_core::workflow::{StoryState, transition};

use crate::error::DatabaseError;
use crate::finish;
use crate::helpers::{format_timestamp, normalize};
use crate::ledger::{EventSink, NewStatusChange};
use crate::repos::contributor::fetch_contributor;
use crate::repos::epic::fetch_epic;
use crate::repos::story::fetch_story;
use crate::service::TempoService;

impl<S: EventSink> TempoService<S> {
    /// Assign the story to `actor` and mark it `in_progress`. Open to every
    /// contributor, including a transfer away from the current assignee.
    pub async fn take(
        &self,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        self.apply(WorkflowOp::Take, actor, story_id, now).await
    }

    /// Put the story on hold, keeping its assignee. Owner only.
    pub async fn suspend(
        &self,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        self.apply(WorkflowOp::Suspend, actor, story_id, now).await
    }

    /// Leave `suspended`: back to `in_progress` when assigned, else `created`.
    /// Owner only.
    pub async fn resume(
        &self,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        self.apply(WorkflowOp::Resume, actor, story_id, now).await
    }

    /// Abandon the story and clear its assignee. Owner only.
    pub async fn cancel(
        &self,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        self.apply(WorkflowOp::Cancel, actor, story_id, now).await
    }

    /// Accept the story as finished and clear its assignee. Owner only.
    pub async fn validate(
        &self,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        self.apply(WorkflowOp::Validate, actor, story_id, now).await
    }

    /// Run `op` as one unit of work.
    ///
    /// # Errors
    ///
    /// * `NoResult` if the story or the actor does not exist
    /// * `NotOwner` / `InvalidTransition` when the workflow refuses `op`
    /// * `Conflict` if the story changed concurrently
    /// * `OutOfOrder` if `now` precedes the story's latest event
    pub async fn apply(
        &self,
        op: WorkflowOp,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        let tx = self.db().begin_immediate().await?;
        let result = self.apply_on(&tx, op, actor, story_id, normalize(now)).await;
        finish(tx, result, op.as_str()).await
    }

    async fn apply_on(
        &self,
        conn: &libsql::Connection,
        op: WorkflowOp,
        actor: &str,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        let story = fetch_story(conn, story_id).await?;
        let epic = fetch_epic(conn, &story.epic_id).await?;
        fetch_contributor(conn, actor).await?;

        let next = transition(op, actor, &epic, &story)?;
        swap_state(conn, &story, &next, now).await?;

        let event = self
            .sink()
            .record(
                conn,
                NewStatusChange::new(story_id, next.status, Some(actor), now),
            )
            .await?;

        tracing::debug!(
            story = story_id,
            %op,
            from = %story.status,
            to = %next.status,
            seq = event.seq,
            "applied transition"
        );

        Ok(story.with_state(next, now))
    }
}

/// Write `next` over `story`'s row, provided the row still holds the state
/// `story` was read with.
async fn swap_state(
    conn: &libsql::Connection,
    story: &UserStory,
    next: &StoryState,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let swapped = conn
        .execute(
            "UPDATE user_stories SET status = ?1, assigned_to = ?2, updated_at = ?3 \
             WHERE id = ?4 AND status = ?5 AND assigned_to IS ?6",
            libsql::params![
                next.status.as_str(),
                next.assigned_to.as_deref(),
                format_timestamp(now),
                story.id.as_str(),
                story.status.as_str(),
                story.assigned_to.as_deref()
            ],
        )
        .await?;
    if swapped != 1 {
        return Err(DatabaseError::Conflict(format!(
            "story {} left {} before it could become {}",
            story.id, story.status, next.status
        )));
    }
    Ok(())
}
