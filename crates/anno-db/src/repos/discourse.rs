//! Discourse repository: import through the graph builder, listing, deletion.

use std::collections::HashMap;
use std::hash::Hash;

use anno_core::entities::{AnnotationType, TierFlags};
use anno_core::{DiscourseData, DiscourseId, StructuralError};
use anno_graph::{AnnotationGraph, Control, GraphBuilder, GraphError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::helpers::{get_flag, get_opt_string, parse_datetime, to_sql_int};
use crate::repos::{finish, frequency};
use crate::service::CorpusService;

/// Outcome of storing one discourse.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredDiscourse {
    pub id: i64,
    pub name: String,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscourseRecord {
    pub id: i64,
    pub name: String,
    pub anchor_tier: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn row_to_discourse(row: &libsql::Row) -> Result<DiscourseRecord, DatabaseError> {
    Ok(DiscourseRecord {
        id: row.get::<i64>(0)?,
        name: row.get::<String>(1)?,
        anchor_tier: get_opt_string(row, 2)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

fn mapped<K: Eq + Hash + std::fmt::Display>(
    rows: &HashMap<K, i64>,
    key: K,
) -> Result<i64, DatabaseError> {
    rows.get(&key)
        .copied()
        .ok_or_else(|| DatabaseError::InvalidState(format!("{key} has no stored row")))
}

/// Find or insert a tier row; a stored tier with other flags is a redefinition.
async fn upsert_tier(
    conn: &libsql::Connection,
    tier: &AnnotationType,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id, anchor, base, token, delimiter FROM annotation_types WHERE label = ?1",
            [tier.label.as_str()],
        )
        .await?;
    if let Some(row) = rows.next().await? {
        let flags = TierFlags {
            anchor: get_flag(&row, 1)?,
            base: get_flag(&row, 2)?,
            token: get_flag(&row, 3)?,
        };
        let delimiter = get_opt_string(&row, 4)?;
        if flags != tier.flags || delimiter != tier.delimiter {
            return Err(GraphError::from(StructuralError::TierRedefined {
                tier: tier.label.clone(),
            })
            .into());
        }
        return Ok(row.get::<i64>(0)?);
    }
    drop(rows);

    conn.execute(
        "INSERT INTO annotation_types (label, anchor, base, token, delimiter)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        libsql::params![
            tier.label.as_str(),
            i64::from(tier.flags.anchor),
            i64::from(tier.flags.base),
            i64::from(tier.flags.token),
            tier.delimiter.as_deref()
        ],
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

async fn upsert_annotation(conn: &libsql::Connection, label: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO annotations (label) VALUES (?1) ON CONFLICT (label) DO NOTHING",
        [label],
    )
    .await?;
    let mut rows = conn
        .query("SELECT id FROM annotations WHERE label = ?1", [label])
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<i64>(0)?)
}

/// Write one discourse of `graph` and everything it references.
async fn persist_discourse(
    conn: &libsql::Connection,
    graph: &AnnotationGraph,
    discourse: DiscourseId,
) -> Result<StoredDiscourse, DatabaseError> {
    let mut tiers = HashMap::new();
    for tier in graph.tiers() {
        tiers.insert(tier.id, upsert_tier(conn, tier).await?);
    }
    let mut annotations = HashMap::new();
    for annotation in graph.annotations() {
        annotations.insert(annotation.id, upsert_annotation(conn, &annotation.label).await?);
    }

    let record = graph.discourse(discourse)?;
    let anchor = record.anchor.map(|t| mapped(&tiers, t)).transpose()?;
    conn.execute(
        "INSERT INTO discourses (name, anchor_tier_id, created_at) VALUES (?1, ?2, ?3)",
        libsql::params![record.name.as_str(), anchor, Utc::now().to_rfc3339()],
    )
    .await?;
    let discourse_row = conn.last_insert_rowid();

    let mut nodes = HashMap::new();
    for node in graph.nodes().filter(|n| n.discourse == discourse) {
        conn.execute(
            "INSERT INTO nodes (discourse_id, time, ordinal) VALUES (?1, ?2, ?3)",
            libsql::params![discourse_row, node.time, to_sql_int(node.ordinal)?],
        )
        .await?;
        nodes.insert(node.id, conn.last_insert_rowid());
    }

    let mut edges = 0;
    for edge in graph.edges().filter(|e| e.discourse == discourse) {
        conn.execute(
            "INSERT INTO edges (discourse_id, source_id, target_id, tier_id, annotation_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            libsql::params![
                discourse_row,
                mapped(&nodes, edge.source)?,
                mapped(&nodes, edge.target)?,
                mapped(&tiers, edge.tier)?,
                mapped(&annotations, edge.annotation)?
            ],
        )
        .await?;
        edges += 1;
    }

    Ok(StoredDiscourse {
        id: discourse_row,
        name: record.name.clone(),
        nodes: nodes.len(),
        edges,
    })
}

async fn delete_rows(conn: &libsql::Connection, discourse: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM edges WHERE discourse_id = ?1",
        libsql::params![discourse],
    )
    .await?;
    conn.execute(
        "DELETE FROM nodes WHERE discourse_id = ?1",
        libsql::params![discourse],
    )
    .await?;
    conn.execute(
        "DELETE FROM discourses WHERE id = ?1",
        libsql::params![discourse],
    )
    .await?;
    frequency::refresh(conn).await?;
    Ok(())
}

impl CorpusService {
    /// Build `data` in memory, then store it in one transaction.
    ///
    /// Tiers and annotations are shared across discourses by label.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::Graph` if the discourse name is taken, the data is
    ///   structurally invalid, or a tier is stored with different flags.
    /// - `DatabaseError::LibSql` if a write fails.
    ///
    /// Nothing is stored when an error is returned.
    pub async fn add_discourse(&self, data: &DiscourseData) -> Result<StoredDiscourse, DatabaseError> {
        if self.discourse_row(&data.name).await?.is_some() {
            return Err(GraphError::from(StructuralError::DuplicateDiscourse {
                name: data.name.clone(),
            })
            .into());
        }

        let mut graph = AnnotationGraph::new();
        let discourse = GraphBuilder::new(&mut graph)
            .with_lookahead(self.config().alignment.window())
            .build(data)?;

        let tx = self.db().conn().transaction().await?;
        let result = persist_discourse(&tx, &graph, discourse).await;
        let stored = finish(tx, result).await?;
        info!(
            discourse = %stored.name,
            nodes = stored.nodes,
            edges = stored.edges,
            "discourse stored"
        );
        Ok(stored)
    }

    /// Store several discourses in order, one transaction each.
    ///
    /// `control` is polled before each discourse. Progress is reported every
    /// `import.progress_every` discourses and after the last one.
    ///
    /// # Errors
    ///
    /// Returns the first error; discourses stored before it stay stored.
    /// Cancellation surfaces as `GraphError::Cancelled`.
    pub async fn add_discourses(
        &self,
        items: &[DiscourseData],
        control: Control<'_>,
    ) -> Result<Vec<StoredDiscourse>, DatabaseError> {
        let control = control.every(self.config().import.progress_every);
        let mut stored = Vec::with_capacity(items.len());
        for (done, data) in items.iter().enumerate() {
            control.check()?;
            stored.push(self.add_discourse(data).await?);
            control.report(done + 1, items.len());
        }
        Ok(stored)
    }

    /// Row id of the named discourse.
    pub async fn discourse_row(&self, name: &str) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT id FROM discourses WHERE name = ?1", [name])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<i64>(0)?)),
            None => Ok(None),
        }
    }

    /// Names of all stored discourses in insertion order.
    pub async fn discourse_names(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT name FROM discourses ORDER BY id", ())
            .await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            names.push(row.get::<String>(0)?);
        }
        Ok(names)
    }

    pub async fn list_discourses(&self) -> Result<Vec<DiscourseRecord>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT d.id, d.name, t.label, d.created_at
                 FROM discourses d LEFT JOIN annotation_types t ON t.id = d.anchor_tier_id
                 ORDER BY d.id",
                (),
            )
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_discourse(&row)?);
        }
        Ok(records)
    }

    /// Remove a discourse with its nodes and edges, then refresh frequencies.
    /// Returns `false` if no discourse has that name.
    ///
    /// Closure rows are kept: they describe annotation types, which other
    /// discourses may still use.
    pub async fn delete_discourse(&self, name: &str) -> Result<bool, DatabaseError> {
        let Some(row) = self.discourse_row(name).await? else {
            debug!(discourse = %name, "no discourse to delete");
            return Ok(false);
        };
        let tx = self.db().conn().transaction().await?;
        let result = delete_rows(&tx, row).await;
        finish(tx, result).await?;
        info!(discourse = %name, "discourse deleted");
        Ok(true)
    }
}
