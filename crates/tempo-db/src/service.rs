//! Service layer hosting every Tempo operation.
//!
//! `TempoService` wraps `TempoDb` (raw database access) and an [`EventSink`]
//! that receives one status-change event per workflow transition. All repo
//! methods are implemented as `impl TempoService` blocks under `repos/`.

use tempo_config::TempoConfig;

use crate::TempoDb;
use crate::error::DatabaseError;
use crate::ledger::{EventSink, Ledger};

/// Default page size when the service is built without a config.
const DEFAULT_LIMIT: u32 = 50;

/// Entity store, workflow engine and duration queries over one database.
///
/// Every workflow mutation follows this protocol:
/// 1. Begin an `IMMEDIATE` transaction
/// 2. Load the story and its epic, apply the pure transition rules
/// 3. Compare-and-swap the story row on its previous status
/// 4. Record the status change through the sink (closes the previous interval)
/// 5. Commit, or roll back everything on any error
pub struct TempoService<S = Ledger> {
    db: TempoDb,
    sink: S,
    default_limit: u32,
}

impl TempoService<Ledger> {
    /// Create a service over a local database with the libSQL ledger.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = TempoDb::open_local(db_path).await?;
        Ok(Self::from_db(db, Ledger))
    }

    /// Create a service from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn from_config(config: &TempoConfig) -> Result<Self, DatabaseError> {
        let db = TempoDb::open_from_config(&config.database).await?;
        Ok(Self::from_db(db, Ledger).with_default_limit(config.general.default_limit))
    }
}

impl<S: EventSink> TempoService<S> {
    /// Create from an existing `TempoDb` and sink.
    #[must_use]
    pub const fn from_db(db: TempoDb, sink: S) -> Self {
        Self {
            db,
            sink,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Override the page size used by list queries without an explicit limit.
    #[must_use]
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &TempoDb {
        &self.db
    }

    /// Access the event sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub const fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub(crate) fn limit_or_default(&self, limit: Option<u32>) -> u32 {
        limit.unwrap_or(self.default_limit)
    }
}
