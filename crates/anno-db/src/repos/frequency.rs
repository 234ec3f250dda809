//! Frequency table: edge counts per (annotation, tier).

use tracing::info;

use crate::error::DatabaseError;
use crate::helpers::from_sql_int;
use crate::repos::finish;
use crate::service::CorpusService;

/// Replace the whole frequency table with fresh counts from `edges`.
pub(crate) async fn refresh(conn: &libsql::Connection) -> Result<u64, DatabaseError> {
    conn.execute("DELETE FROM annotation_frequencies", ()).await?;
    let inserted = conn
        .execute(
            "INSERT INTO annotation_frequencies (annotation_id, tier_id, frequency)
             SELECT annotation_id, tier_id, COUNT(*) FROM edges
             GROUP BY annotation_id, tier_id",
            (),
        )
        .await?;
    Ok(inserted)
}

impl CorpusService {
    /// Recount every (annotation, tier) pair. Returns the number of pairs.
    pub async fn regenerate_frequencies(&self) -> Result<u64, DatabaseError> {
        let tx = self.db().conn().transaction().await?;
        let result = refresh(&tx).await;
        let pairs = finish(tx, result).await?;
        info!(pairs, "frequencies regenerated");
        Ok(pairs)
    }

    /// Stored count of `label` on `tier`, if any.
    pub async fn frequency(&self, label: &str, tier: &str) -> Result<Option<usize>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT f.frequency FROM annotation_frequencies f
                 JOIN annotations a ON a.id = f.annotation_id
                 JOIN annotation_types t ON t.id = f.tier_id
                 WHERE a.label = ?1 AND t.label = ?2",
                [label, tier],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(from_sql_int(row.get::<i64>(0)?)?)),
            None => Ok(None),
        }
    }
}
