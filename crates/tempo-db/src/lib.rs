//! # tempo-db
//!
//! libSQL storage for Tempo: contributors, epics, user stories, the
//! append-only status-change ledger, the transactional workflow engine and the
//! duration queries built on the ledger.
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) in local mode. Each
//! workflow operation runs as one `BEGIN IMMEDIATE` unit of work.

pub mod error;
pub mod helpers;
pub mod ledger;
mod migrations;
pub mod repos;
pub mod service;
pub mod updates;

mod test_support;

use std::ops::Deref;

use error::DatabaseError;
use libsql::{Builder, TransactionBehavior};
use tempo_config::DatabaseConfig;
use tokio::sync::{Mutex, MutexGuard};

pub use ledger::{EventSink, Ledger, NewStatusChange};
pub use service::TempoService;

/// Central database handle for Tempo state.
///
/// Wraps a libSQL database and a single connection. Every statement and every
/// unit of work takes the connection's lock first: a transaction on a shared
/// connection would otherwise absorb the writes of concurrent callers and roll
/// them back with its own.
pub struct TempoDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: Mutex<libsql::Connection>,
}

/// An `IMMEDIATE` transaction holding the connection lock until it is
/// committed or rolled back through [`finish`].
pub struct UnitOfWork<'a> {
    tx: libsql::Transaction,
    _conn: MutexGuard<'a, libsql::Connection>,
}

impl Deref for UnitOfWork<'_> {
    type Target = libsql::Connection;

    fn deref(&self) -> &libsql::Connection {
        &self.tx
    }
}

impl TempoDb {
    /// Open a local database at the given path with foreign keys enforced.
    ///
    /// Runs migrations automatically on first open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Self::open(path, true).await
    }

    /// Open the database described by `config`, creating its parent directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the database
    /// cannot be opened or migrations fail.
    pub async fn open_from_config(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if let Some(dir) = config.parent_dir() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                DatabaseError::Other(
                    anyhow::Error::new(e).context(format!("creating {}", dir.display())),
                )
            })?;
        }
        Self::open(&config.path, config.foreign_keys).await
    }

    async fn open(path: &str, foreign_keys: bool) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Must be set per connection in SQLite.
        let pragma = if foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        conn.execute(pragma, ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let tempo_db = Self {
            db,
            conn: Mutex::new(conn),
        };
        tempo_db.run_migrations().await?;
        tracing::info!(path, foreign_keys, "opened tempo database");
        Ok(tempo_db)
    }

    /// Lock the underlying libSQL connection for direct queries.
    ///
    /// The guard must be dropped before calling back into the service.
    pub async fn conn(&self) -> MutexGuard<'_, libsql::Connection> {
        self.conn.lock().await
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"sty-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        generate_id_on(&*self.conn().await, prefix).await
    }

    /// Begin a transaction that takes the write lock up front.
    ///
    /// Waits for any other unit of work on this handle to finish first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if the database lock cannot be acquired.
    pub async fn begin_immediate(&self) -> Result<UnitOfWork<'_>, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        Ok(UnitOfWork { tx, _conn: conn })
    }
}

/// Generate a prefixed ID on an arbitrary connection or transaction.
///
/// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the prefix.
pub(crate) async fn generate_id_on(
    conn: &libsql::Connection,
    prefix: &str,
) -> Result<String, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
            (),
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<String>(0)?)
}

/// Commit `work` if `result` is `Ok`, roll it back otherwise. The connection
/// lock is released only afterwards.
pub(crate) async fn finish<T>(
    work: UnitOfWork<'_>,
    result: Result<T, DatabaseError>,
    unit: &str,
) -> Result<T, DatabaseError> {
    let UnitOfWork { tx, _conn } = work;
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(%rollback_error, unit, "rollback failed");
            }
            tracing::warn!(%error, unit, "rolled back");
            Err(error)
        }
    }
}
