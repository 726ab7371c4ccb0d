//! User story repository: creation (with its first ledger event), lookup,
//! listing, content updates and the story detail read model.

use chrono::{DateTime, Utc};
use tempo_core::entities::UserStory;
use tempo_core::enums::StoryStatus;
use tempo_core::ids::PREFIX_STORY;
use tempo_core::responses::StoryDetail;
use tempo_core::validation::validate_title;
use tempo_core::workflow::authorize_new_story;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_opt_string, normalize, parse_datetime, parse_enum};
use crate::ledger::{EventSink, NewStatusChange};
use crate::repos::contributor::{fetch_contributor, fetch_optional_contributor};
use crate::repos::epic::fetch_epic;
use crate::service::TempoService;
use crate::updates::SetClause;
use crate::updates::story::StoryUpdate;
use crate::{finish, generate_id_on};

const SELECT_COLS: &str =
    "id, epic_id, title, description, status, assigned_to, created_at, updated_at";

fn row_to_story(row: &libsql::Row) -> Result<UserStory, DatabaseError> {
    Ok(UserStory {
        id: row.get(0)?,
        epic_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        assigned_to: get_opt_string(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

pub(crate) async fn fetch_story(
    conn: &libsql::Connection,
    id: &str,
) -> Result<UserStory, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM user_stories WHERE id = ?1"),
            [id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    row_to_story(&row)
}

impl<S: EventSink> TempoService<S> {
    /// Create a story in `epic_id` on behalf of `actor` and record its
    /// `created` event, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotOwner` if `actor` does not own the epic,
    /// `DatabaseError::Core(Validation)` for an invalid title and
    /// `DatabaseError::NoResult` if the epic does not exist.
    pub async fn new_story(
        &self,
        actor: &str,
        epic_id: &str,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        let tx = self.db().begin_immediate().await?;
        let result = self
            .insert_story(&tx, actor, epic_id, title, description, normalize(now))
            .await;
        finish(tx, result, "new_story").await
    }

    async fn insert_story(
        &self,
        conn: &libsql::Connection,
        actor: &str,
        epic_id: &str,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        let epic = fetch_epic(conn, epic_id).await?;
        authorize_new_story(actor, &epic)?;
        validate_title("story", title)?;

        let id = generate_id_on(conn, PREFIX_STORY).await?;
        conn.execute(
            &format!(
                "INSERT INTO user_stories ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)"
            ),
            libsql::params![
                id.as_str(),
                epic_id,
                title,
                description,
                StoryStatus::Created.as_str(),
                format_timestamp(now),
                format_timestamp(now)
            ],
        )
        .await?;

        self.sink()
            .record(
                conn,
                NewStatusChange::new(id.as_str(), StoryStatus::Created, Some(actor), now),
            )
            .await?;

        tracing::debug!(story = %id, epic = epic_id, actor, "created story");

        Ok(UserStory {
            id,
            epic_id: epic_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            status: StoryStatus::Created,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_story(&self, id: &str) -> Result<UserStory, DatabaseError> {
        fetch_story(&*self.db().conn().await, id).await
    }

    /// Stories of an epic, newest first.
    pub async fn list_stories(&self, epic_id: &str) -> Result<Vec<UserStory>, DatabaseError> {
        self.query_stories(
            &format!(
                "SELECT {SELECT_COLS} FROM user_stories WHERE epic_id = ?1 \
                 ORDER BY created_at DESC, id DESC"
            ),
            epic_id,
        )
        .await
    }

    /// Stories currently assigned to `contributor_id`, newest first.
    pub async fn list_assigned_stories(
        &self,
        contributor_id: &str,
    ) -> Result<Vec<UserStory>, DatabaseError> {
        self.query_stories(
            &format!(
                "SELECT {SELECT_COLS} FROM user_stories WHERE assigned_to = ?1 \
                 ORDER BY created_at DESC, id DESC"
            ),
            contributor_id,
        )
        .await
    }

    async fn query_stories(&self, sql: &str, key: &str) -> Result<Vec<UserStory>, DatabaseError> {
        let mut rows = self.db().conn().await.query(sql, [key]).await?;
        let mut stories = Vec::new();
        while let Some(row) = rows.next().await? {
            stories.push(row_to_story(&row)?);
        }
        Ok(stories)
    }

    /// Update the title and/or description.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` for an unknown story and
    /// `DatabaseError::Core(Validation)` for an invalid title.
    pub async fn update_story(
        &self,
        id: &str,
        update: StoryUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserStory, DatabaseError> {
        let mut set = SetClause::default();
        if let Some(ref title) = update.title {
            validate_title("story", title)?;
            set.push("title", title.as_str());
        }
        if let Some(ref description) = update.description {
            set.push("description", description.as_str());
        }

        if set.is_empty() {
            return self.get_story(id).await;
        }
        set.push("updated_at", format_timestamp(normalize(now)));

        let (sql, params) = set.into_update("user_stories", id);
        let updated = self
            .db()
            .conn()
            .await
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if updated == 0 {
            return Err(DatabaseError::NoResult);
        }
        self.get_story(id).await
    }

    /// The story with its epic title, epic owner and assignee.
    pub async fn story_detail(&self, id: &str) -> Result<StoryDetail, DatabaseError> {
        let conn = self.db().conn().await;
        let story = fetch_story(&conn, id).await?;
        let epic = fetch_epic(&conn, &story.epic_id).await?;
        let epic_owner = fetch_contributor(&conn, &epic.owner_id).await?;
        let assignee = fetch_optional_contributor(&conn, story.assigned_to.as_deref()).await?;
        Ok(StoryDetail {
            story,
            epic_title: epic.title,
            epic_owner,
            assignee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{story, t0, team, test_service};
    use crate::updates::story::StoryUpdateBuilder;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use tempo_core::errors::WorkflowError;

    #[tokio::test]
    async fn new_story_starts_created_with_one_event() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let s = story(&svc, &team, "Build the model").await;

        assert!(s.id.starts_with("sty-"));
        assert_eq!(s.status, StoryStatus::Created);
        assert_eq!(s.assigned_to, None);
        assert_eq!(svc.get_story(&s.id).await.unwrap(), s);

        let timeline = svc.story_timeline(&s.id).await.unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].new_status, StoryStatus::Created);
        assert_eq!(timeline[0].contributor_id.as_deref(), Some(team.po.id.as_str()));
        assert_eq!(timeline[0].time, t0());
    }

    #[tokio::test]
    async fn only_the_owner_creates_stories() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let err = svc
            .new_story(&team.dev1.id, &team.epic.id, "Sneaky", "", t0())
            .await
            .unwrap_err();
        assert!(matches!(err.workflow(), Some(WorkflowError::NotOwner { .. })));
        assert!(svc.list_stories(&team.epic.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_title_leaves_nothing_behind() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let err = svc
            .new_story(&team.po.id, &team.epic.id, "", "", t0())
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert!(svc.list_stories(&team.epic.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_epic_is_no_result() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let result = svc
            .new_story(&team.po.id, "epc-missing", "Orphan", "", t0())
            .await;
        assert!(matches!(result, Err(DatabaseError::NoResult)));
    }

    #[tokio::test]
    async fn stories_are_listed_newest_first() {
        let svc = test_service().await;
        let team = team(&svc).await;
        for (i, title) in ["old", "mid", "new"].into_iter().enumerate() {
            svc.new_story(
                &team.po.id,
                &team.epic.id,
                title,
                "",
                t0() + TimeDelta::minutes(i64::try_from(i).unwrap()),
            )
            .await
            .unwrap();
        }
        let titles: Vec<String> = svc
            .list_stories(&team.epic.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn assigned_stories_follow_take() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let a = story(&svc, &team, "a").await;
        story(&svc, &team, "b").await;

        assert!(svc.list_assigned_stories(&team.dev1.id).await.unwrap().is_empty());
        svc.take(&team.dev1.id, &a.id, t0() + TimeDelta::hours(1))
            .await
            .unwrap();
        let assigned = svc.list_assigned_stories(&team.dev1.id).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, a.id);
    }

    #[tokio::test]
    async fn update_story_keeps_workflow_state() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let s = story(&svc, &team, "Draft").await;
        svc.take(&team.dev1.id, &s.id, t0() + TimeDelta::hours(1))
            .await
            .unwrap();

        let update = StoryUpdateBuilder::new()
            .title("Final")
            .description("Clarified")
            .build();
        let updated = svc
            .update_story(&s.id, update, t0() + TimeDelta::hours(2))
            .await
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description, "Clarified");
        assert_eq!(updated.status, StoryStatus::InProgress);
        assert_eq!(updated.assigned_to.as_deref(), Some(team.dev1.id.as_str()));
        assert_eq!(svc.story_timeline(&s.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn story_detail_names_the_assignee() {
        let svc = test_service().await;
        let team = team(&svc).await;
        let s = story(&svc, &team, "Build the model").await;

        let detail = svc.story_detail(&s.id).await.unwrap();
        assert_eq!(detail.epic_title, "A new epic");
        assert_eq!(detail.epic_owner, team.po);
        assert_eq!(detail.assignee_name(), None);

        svc.take(&team.dev2.id, &s.id, t0() + TimeDelta::hours(1))
            .await
            .unwrap();
        let detail = svc.story_detail(&s.id).await.unwrap();
        assert_eq!(detail.assignee_name().as_deref(), Some("dev2_test"));
    }
}
