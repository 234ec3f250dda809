//! # anno-db
//!
//! libSQL persistence for annotation graphs.
//!
//! Stores tiers, interned annotations, discourses, timeline nodes and tier
//! edges, plus the two derived tables: closure facts (`annotation_subarcs`)
//! and per-tier label counts (`annotation_frequencies`). Graph construction
//! and closure computation run in memory through `anno-graph`; this crate
//! only moves their results in and out of the database, one transaction per
//! mutation.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;

use anno_config::DatabaseConfig;
use error::DatabaseError;
use libsql::Builder;
use tracing::debug;

/// Database handle for one corpus.
pub struct AnnoDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl AnnoDb {
    /// Open a local database at the given path with foreign keys enabled.
    ///
    /// Runs migrations automatically on first open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Self::open_with(path, true).await
    }

    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// As [`Self::open_local`].
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Self::open_with(&config.path, config.foreign_keys).await
    }

    async fn open_with(path: &str, foreign_keys: bool) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Must be set per connection in SQLite.
        if foreign_keys {
            conn.execute("PRAGMA foreign_keys = ON", ())
                .await
                .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;
        }

        let anno_db = Self { db, conn };
        anno_db.run_migrations().await?;
        debug!(path, foreign_keys, "database opened");
        Ok(anno_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
