//! Repository modules implementing corpus operations.
//!
//! Each module adds methods to `CorpusService` via `impl CorpusService` blocks.

pub mod closure;
pub mod discourse;
pub mod frequency;
pub mod graph;
pub mod lookup;

use tracing::warn;

use crate::error::DatabaseError;

/// Commit `tx` if `result` is `Ok`, roll it back otherwise.
pub(crate) async fn finish<T>(
    tx: libsql::Transaction,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, cause = %err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
