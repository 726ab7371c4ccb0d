//! Epic repository: creation, listing, content updates, cascading delete and
//! the epic detail read model.

use chrono::{DateTime, Utc};
use tempo_core::entities::Epic;
use tempo_core::ids::PREFIX_EPIC;
use tempo_core::responses::EpicDetail;
use tempo_core::validation::validate_title;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, normalize, parse_datetime};
use crate::ledger::EventSink;
use crate::repos::contributor::fetch_contributor;
use crate::service::TempoService;
use crate::updates::SetClause;
use crate::updates::epic::EpicUpdate;

const SELECT_COLS: &str = "id, owner_id, title, description, created_at, updated_at";

fn row_to_epic(row: &libsql::Row) -> Result<Epic, DatabaseError> {
    Ok(Epic {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

pub(crate) async fn fetch_epic(conn: &libsql::Connection, id: &str) -> Result<Epic, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM epics WHERE id = ?1"), [id])
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    row_to_epic(&row)
}

impl<S: EventSink> TempoService<S> {
    /// Create an epic owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the owner does not exist and
    /// `DatabaseError::Core(Validation)` for an invalid title.
    pub async fn new_epic(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Epic, DatabaseError> {
        validate_title("epic", title)?;
        fetch_contributor(&*self.db().conn().await, owner_id).await?;

        let now = normalize(now);
        let id = self.db().generate_id(PREFIX_EPIC).await?;
        self.db()
            .conn()
            .await
            .execute(
                &format!("INSERT INTO epics ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                libsql::params![
                    id.as_str(),
                    owner_id,
                    title,
                    description,
                    format_timestamp(now),
                    format_timestamp(now)
                ],
            )
            .await?;

        tracing::debug!(epic = %id, owner = owner_id, "created epic");

        Ok(Epic {
            id,
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_epic(&self, id: &str) -> Result<Epic, DatabaseError> {
        fetch_epic(&*self.db().conn().await, id).await
    }

    /// Epics newest first, at most `limit` (default from configuration).
    pub async fn list_epics(&self, limit: Option<u32>) -> Result<Vec<Epic>, DatabaseError> {
        let limit = self.limit_or_default(limit);
        self.query_epics(
            &format!(
                "SELECT {SELECT_COLS} FROM epics ORDER BY created_at DESC, id DESC LIMIT {limit}"
            ),
            (),
        )
        .await
    }

    /// Epics owned by `owner_id`, newest first.
    pub async fn list_epics_for_owner(&self, owner_id: &str) -> Result<Vec<Epic>, DatabaseError> {
        self.query_epics(
            &format!(
                "SELECT {SELECT_COLS} FROM epics WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
            ),
            [owner_id],
        )
        .await
    }

    async fn query_epics(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Epic>, DatabaseError> {
        let mut rows = self.db().conn().await.query(sql, params).await?;
        let mut epics = Vec::new();
        while let Some(row) = rows.next().await? {
            epics.push(row_to_epic(&row)?);
        }
        Ok(epics)
    }

    /// Update the title and/or description.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` for an unknown epic and
    /// `DatabaseError::Core(Validation)` for an invalid title.
    pub async fn update_epic(
        &self,
        id: &str,
        update: EpicUpdate,
        now: DateTime<Utc>,
    ) -> Result<Epic, DatabaseError> {
        let mut set = SetClause::default();
        if let Some(ref title) = update.title {
            validate_title("epic", title)?;
            set.push("title", title.as_str());
        }
        if let Some(ref description) = update.description {
            set.push("description", description.as_str());
        }

        if set.is_empty() {
            return self.get_epic(id).await;
        }
        set.push("updated_at", format_timestamp(normalize(now)));

        let (sql, params) = set.into_update("epics", id);
        let updated = self
            .db()
            .conn()
            .await
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if updated == 0 {
            return Err(DatabaseError::NoResult);
        }
        self.get_epic(id).await
    }

    /// Delete an epic together with its stories and their ledger entries.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no such epic exists.
    pub async fn delete_epic(&self, id: &str) -> Result<(), DatabaseError> {
        let deleted = self
            .db()
            .conn()
            .await
            .execute("DELETE FROM epics WHERE id = ?1", [id])
            .await?;
        if deleted == 0 {
            return Err(DatabaseError::NoResult);
        }
        tracing::debug!(epic = id, "deleted epic");
        Ok(())
    }

    /// The epic with its owner, its stories newest first and status counts.
    pub async fn epic_detail(&self, id: &str) -> Result<EpicDetail, DatabaseError> {
        let epic = self.get_epic(id).await?;
        let owner = self.get_contributor(&epic.owner_id).await?;
        let stories = self.list_stories(id).await?;
        let stats = self.epic_stats(id).await?;
        Ok(EpicDetail {
            epic,
            owner,
            stories,
            stats,
        })
    }
}
