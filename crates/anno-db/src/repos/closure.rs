//! Closure facts: computed in memory, stored per tier pair.

use anno_graph::ClosureEngine;
use serde::Serialize;
use tracing::info;

use crate::error::DatabaseError;
use crate::repos::finish;
use crate::service::CorpusService;

/// What one closure run stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClosureSummary {
    pub higher: String,
    pub lower: String,
    pub records: usize,
    /// Higher-tier edges spanned by more than one lower-tier chain.
    pub ambiguous: usize,
}

/// One stored subarc with its annotation label.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubarcRow {
    pub annotation: String,
    pub subarc: String,
}

async fn replace_subarcs(
    conn: &libsql::Connection,
    higher: i64,
    lower: i64,
    records: &[(i64, &str)],
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM annotation_subarcs WHERE higher_tier_id = ?1 AND lower_tier_id = ?2",
        libsql::params![higher, lower],
    )
    .await?;
    for (annotation, subarc) in records {
        conn.execute(
            "INSERT INTO annotation_subarcs (annotation_id, higher_tier_id, lower_tier_id, subarc)
             VALUES (?1, ?2, ?3, ?4)",
            libsql::params![*annotation, higher, lower, *subarc],
        )
        .await?;
    }
    Ok(())
}

impl CorpusService {
    /// Compute the closure of `higher` over `lower` and replace the stored
    /// records for that pair.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Graph` for unknown tiers and
    /// `DatabaseError::LibSql` if the replacement fails, in which case the
    /// previous records are kept.
    pub async fn compute_closure(
        &self,
        higher: &str,
        lower: &str,
    ) -> Result<ClosureSummary, DatabaseError> {
        let stored = self.load_graph().await?;
        let higher_tier = stored.tier(higher)?;
        let lower_tier = stored.tier(lower)?;
        let closure = ClosureEngine::new(&stored.graph)
            .with_separator(self.config().closure.separator.as_str())
            .compute_closure(higher_tier, lower_tier)?;

        let missing = |what: &str| DatabaseError::InvalidState(format!("{what} has no stored row"));
        let higher_row = stored.tier_row(higher_tier).ok_or_else(|| missing(higher))?;
        let lower_row = stored.tier_row(lower_tier).ok_or_else(|| missing(lower))?;
        let records = closure
            .records
            .iter()
            .map(|r| {
                stored
                    .annotation_row(r.annotation_id)
                    .map(|row| (row, r.subarc.as_str()))
                    .ok_or_else(|| missing(&r.annotation_id.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tx = self.db().conn().transaction().await?;
        let result = replace_subarcs(&tx, higher_row, lower_row, &records).await;
        finish(tx, result).await?;

        let summary = ClosureSummary {
            higher: higher.into(),
            lower: lower.into(),
            records: records.len(),
            ambiguous: closure.ambiguities.len(),
        };
        info!(
            higher = %summary.higher,
            lower = %summary.lower,
            records = summary.records,
            ambiguous = summary.ambiguous,
            "closure stored"
        );
        Ok(summary)
    }

    /// Stored subarcs of `higher` over `lower`, ordered by label then subarc.
    pub async fn subarcs(&self, higher: &str, lower: &str) -> Result<Vec<SubarcRow>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT a.label, s.subarc FROM annotation_subarcs s
                 JOIN annotations a ON a.id = s.annotation_id
                 JOIN annotation_types h ON h.id = s.higher_tier_id
                 JOIN annotation_types l ON l.id = s.lower_tier_id
                 WHERE h.label = ?1 AND l.label = ?2
                 ORDER BY a.label, s.subarc",
                [higher, lower],
            )
            .await?;
        let mut subarcs = Vec::new();
        while let Some(row) = rows.next().await? {
            subarcs.push(SubarcRow {
                annotation: row.get::<String>(0)?,
                subarc: row.get::<String>(1)?,
            });
        }
        Ok(subarcs)
    }
}
