//! Contributor repository: registration, lookup, update and protected delete.

use chrono::{DateTime, Utc};
use tempo_core::entities::{Contributor, NewContributor};
use tempo_core::ids::PREFIX_CONTRIBUTOR;
use tempo_core::validation::validate_username;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_opt_string, normalize, parse_datetime};
use crate::ledger::EventSink;
use crate::service::TempoService;
use crate::updates::SetClause;
use crate::updates::contributor::ContributorUpdate;

const SELECT_COLS: &str = "id, username, first_name, last_name, email, created_at";

fn row_to_contributor(row: &libsql::Row) -> Result<Contributor, DatabaseError> {
    Ok(Contributor {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: get_opt_string(row, 2)?,
        last_name: get_opt_string(row, 3)?,
        email: get_opt_string(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

pub(crate) async fn fetch_contributor(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Contributor, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM contributors WHERE id = ?1"),
            [id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    row_to_contributor(&row)
}

pub(crate) async fn fetch_optional_contributor(
    conn: &libsql::Connection,
    id: Option<&str>,
) -> Result<Option<Contributor>, DatabaseError> {
    match id {
        Some(id) => Ok(Some(fetch_contributor(conn, id).await?)),
        None => Ok(None),
    }
}

async fn count(conn: &libsql::Connection, sql: &str, id: &str) -> Result<i64, DatabaseError> {
    let mut rows = conn.query(sql, [id]).await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<i64>(0)?)
}

impl<S: EventSink> TempoService<S> {
    /// Register a contributor with a unique username.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Core(Validation)` for an invalid or taken username.
    pub async fn register_contributor(
        &self,
        new: NewContributor,
        now: DateTime<Utc>,
    ) -> Result<Contributor, DatabaseError> {
        validate_username(&new.username)?;
        if self.get_contributor_by_username(&new.username).await?.is_some() {
            return Err(tempo_core::errors::CoreError::Validation(format!(
                "username '{}' is already taken",
                new.username
            ))
            .into());
        }

        let now = normalize(now);
        let id = self.db().generate_id(PREFIX_CONTRIBUTOR).await?;
        self.db()
            .conn()
            .await
            .execute(
                &format!("INSERT INTO contributors ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                libsql::params![
                    id.as_str(),
                    new.username.as_str(),
                    new.first_name.as_deref(),
                    new.last_name.as_deref(),
                    new.email.as_deref(),
                    format_timestamp(now)
                ],
            )
            .await?;

        tracing::debug!(contributor = %id, username = %new.username, "registered contributor");

        Ok(Contributor {
            id,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            created_at: now,
        })
    }

    pub async fn get_contributor(&self, id: &str) -> Result<Contributor, DatabaseError> {
        fetch_contributor(&*self.db().conn().await, id).await
    }

    pub async fn get_contributor_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Contributor>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .await
            .query(
                &format!("SELECT {SELECT_COLS} FROM contributors WHERE username = ?1"),
                [username],
            )
            .await?;
        rows.next()
            .await?
            .map(|row| row_to_contributor(&row))
            .transpose()
    }

    /// All contributors ordered by username.
    pub async fn list_contributors(&self) -> Result<Vec<Contributor>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .await
            .query(
                &format!("SELECT {SELECT_COLS} FROM contributors ORDER BY username"),
                (),
            )
            .await?;

        let mut contributors = Vec::new();
        while let Some(row) = rows.next().await? {
            contributors.push(row_to_contributor(&row)?);
        }
        Ok(contributors)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` for an unknown contributor and
    /// `DatabaseError::Core(Validation)` for an invalid or taken username.
    pub async fn update_contributor(
        &self,
        id: &str,
        update: ContributorUpdate,
    ) -> Result<Contributor, DatabaseError> {
        let current = self.get_contributor(id).await?;

        let mut set = SetClause::default();
        if let Some(ref username) = update.username {
            validate_username(username)?;
            if username != &current.username
                && self.get_contributor_by_username(username).await?.is_some()
            {
                return Err(tempo_core::errors::CoreError::Validation(format!(
                    "username '{username}' is already taken"
                ))
                .into());
            }
            set.push("username", username.as_str());
        }
        if let Some(ref first_name) = update.first_name {
            set.push_opt("first_name", first_name.as_deref());
        }
        if let Some(ref last_name) = update.last_name {
            set.push_opt("last_name", last_name.as_deref());
        }
        if let Some(ref email) = update.email {
            set.push_opt("email", email.as_deref());
        }

        if set.is_empty() {
            return Ok(current);
        }

        let (sql, params) = set.into_update("contributors", id);
        self.db()
            .conn()
            .await
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        self.get_contributor(id).await
    }

    /// Delete a contributor that nothing references.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Protected` while the contributor owns an epic,
    /// is assigned to a story or acted in a ledger event, and
    /// `DatabaseError::NoResult` if no such contributor exists.
    pub async fn delete_contributor(&self, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().begin_immediate().await?;
        let result = delete_unreferenced(&tx, id).await;
        crate::finish(tx, result, "delete_contributor").await
    }
}

async fn delete_unreferenced(conn: &libsql::Connection, id: &str) -> Result<(), DatabaseError> {
    let references = [
        ("epics", "SELECT COUNT(*) FROM epics WHERE owner_id = ?1"),
        ("stories", "SELECT COUNT(*) FROM user_stories WHERE assigned_to = ?1"),
        ("status changes", "SELECT COUNT(*) FROM status_changes WHERE contributor_id = ?1"),
    ];
    for (what, sql) in references {
        let n = count(conn, sql, id).await?;
        if n > 0 {
            return Err(DatabaseError::Protected(format!(
                "contributor {id} is referenced by {n} {what}"
            )));
        }
    }

    let deleted = conn
        .execute("DELETE FROM contributors WHERE id = ?1", [id])
        .await?;
    if deleted == 0 {
        return Err(DatabaseError::NoResult);
    }
    Ok(())
}
