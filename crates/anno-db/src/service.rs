//! Service layer tying the database to the in-memory graph engines.
//!
//! `CorpusService` wraps `AnnoDb` (raw database access) and the loaded
//! `AnnoConfig`. All repo methods are implemented as `impl CorpusService`.

use anno_config::AnnoConfig;

use crate::AnnoDb;
use crate::error::DatabaseError;

/// Corpus-level operations over one database connection.
///
/// Every mutation runs inside a single libSQL transaction that is committed
/// on success and rolled back on every error path.
pub struct CorpusService {
    db: AnnoDb,
    config: AnnoConfig,
}

impl CorpusService {
    #[must_use]
    pub const fn new(db: AnnoDb, config: AnnoConfig) -> Self {
        Self { db, config }
    }

    /// Open the database named by `config.database` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the configuration is invalid or the
    /// database cannot be opened.
    pub async fn open(config: AnnoConfig) -> Result<Self, DatabaseError> {
        config.validate()?;
        let db = AnnoDb::open(&config.database).await?;
        Ok(Self { db, config })
    }

    /// A service over an in-memory database with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let db = AnnoDb::open_local(":memory:").await?;
        Ok(Self::new(db, AnnoConfig::default()))
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &AnnoDb {
        &self.db
    }

    #[must_use]
    pub const fn config(&self) -> &AnnoConfig {
        &self.config
    }
}
