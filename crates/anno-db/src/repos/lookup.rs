//! Read-only lookups for reporting: label search and word lists.

use serde::Serialize;

use crate::error::DatabaseError;
use crate::helpers::{from_sql_int, get_opt_string};
use crate::service::CorpusService;

/// One stored edge matched by label.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoundEdge {
    pub id: i64,
    pub discourse: String,
    pub label: String,
    pub begin: Option<f64>,
    pub end: Option<f64>,
}

/// A word-list line: a label, how often it occurs, and one of its subarcs.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WordlistEntry {
    pub label: String,
    pub frequency: usize,
    pub subarc: Option<String>,
}

fn row_to_found(row: &libsql::Row) -> Result<FoundEdge, DatabaseError> {
    Ok(FoundEdge {
        id: row.get::<i64>(0)?,
        discourse: row.get::<String>(1)?,
        label: row.get::<String>(2)?,
        begin: row.get::<Option<f64>>(3)?,
        end: row.get::<Option<f64>>(4)?,
    })
}

impl CorpusService {
    /// Edges of `tier` labelled `label`, ignoring ASCII case.
    pub async fn find(&self, label: &str, tier: &str) -> Result<Vec<FoundEdge>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT e.id, d.name, a.label, s.time, t.time FROM edges e
                 JOIN annotations a ON a.id = e.annotation_id
                 JOIN annotation_types ty ON ty.id = e.tier_id
                 JOIN discourses d ON d.id = e.discourse_id
                 JOIN nodes s ON s.id = e.source_id
                 JOIN nodes t ON t.id = e.target_id
                 WHERE lower(a.label) = lower(?1) AND ty.label = ?2
                 ORDER BY e.id",
                [label, tier],
            )
            .await?;
        let mut found = Vec::new();
        while let Some(row) = rows.next().await? {
            found.push(row_to_found(&row)?);
        }
        Ok(found)
    }

    /// Labels of `word_tier` by descending frequency, each with its subarcs
    /// over `lower_tier` (one entry per subarc, `None` if never closed).
    ///
    /// Reads the frequency table; call [`Self::regenerate_frequencies`] first.
    pub async fn wordlist(
        &self,
        word_tier: &str,
        lower_tier: &str,
    ) -> Result<Vec<WordlistEntry>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT a.label, f.frequency, s.subarc FROM annotation_frequencies f
                 JOIN annotations a ON a.id = f.annotation_id
                 JOIN annotation_types w ON w.id = f.tier_id
                 LEFT JOIN annotation_subarcs s
                   ON s.annotation_id = f.annotation_id
                  AND s.higher_tier_id = f.tier_id
                  AND s.lower_tier_id = (SELECT id FROM annotation_types WHERE label = ?2)
                 WHERE w.label = ?1
                 ORDER BY f.frequency DESC, a.label, s.subarc",
                [word_tier, lower_tier],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(WordlistEntry {
                label: row.get::<String>(0)?,
                frequency: from_sql_int(row.get::<i64>(1)?)?,
                subarc: get_opt_string(&row, 2)?,
            });
        }
        Ok(entries)
    }
}
