//! Rebuilding the in-memory graph from stored rows.

use std::collections::{BTreeMap, HashMap};

use anno_core::entities::TierFlags;
use anno_core::{AnnotationId, DiscourseId, NodeId, ReferentialError, TierDefinition, TierId};
use anno_graph::{AnnotationGraph, GraphError};
use anno_query::Hierarchy;
use tracing::debug;

use crate::error::DatabaseError;
use crate::helpers::{get_flag, get_opt_string};
use crate::service::CorpusService;

/// A graph loaded from the database, with the row id behind each entity.
#[derive(Debug, Default)]
pub struct StoredGraph {
    pub graph: AnnotationGraph,
    tiers: BTreeMap<TierId, i64>,
    annotations: BTreeMap<AnnotationId, i64>,
    discourses: BTreeMap<DiscourseId, i64>,
}

impl StoredGraph {
    /// Tier looked up by label.
    ///
    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownTierLabel` if no such tier is stored.
    pub fn tier(&self, label: &str) -> Result<TierId, DatabaseError> {
        self.graph
            .tier_by_label(label)
            .ok_or_else(|| GraphError::from(ReferentialError::UnknownTierLabel(label.into())).into())
    }

    #[must_use]
    pub fn tier_row(&self, tier: TierId) -> Option<i64> {
        self.tiers.get(&tier).copied()
    }

    #[must_use]
    pub fn annotation_row(&self, annotation: AnnotationId) -> Option<i64> {
        self.annotations.get(&annotation).copied()
    }

    #[must_use]
    pub fn discourse_row(&self, discourse: DiscourseId) -> Option<i64> {
        self.discourses.get(&discourse).copied()
    }
}

fn lookup<V: Copy>(rows: &HashMap<i64, V>, row: i64, table: &str) -> Result<V, DatabaseError> {
    rows.get(&row)
        .copied()
        .ok_or_else(|| DatabaseError::InvalidState(format!("{table} row {row} is missing")))
}

impl CorpusService {
    /// Load every stored discourse into one [`AnnotationGraph`].
    ///
    /// Rows are replayed in insertion order, so every structural check runs
    /// again on the way in.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Graph` if stored rows no longer form a valid
    /// graph and `DatabaseError::InvalidState` for dangling references.
    pub async fn load_graph(&self) -> Result<StoredGraph, DatabaseError> {
        let conn = self.db().conn();
        let mut stored = StoredGraph::default();

        let mut tiers = HashMap::new();
        let mut rows = conn
            .query(
                "SELECT id, label, anchor, base, token, delimiter FROM annotation_types ORDER BY id",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let definition = TierDefinition {
                name: row.get::<String>(1)?,
                flags: TierFlags {
                    anchor: get_flag(&row, 2)?,
                    base: get_flag(&row, 3)?,
                    token: get_flag(&row, 4)?,
                },
                delimiter: get_opt_string(&row, 5)?,
            };
            let id = stored.graph.register_tier(&definition)?;
            let row_id = row.get::<i64>(0)?;
            tiers.insert(row_id, id);
            stored.tiers.insert(id, row_id);
        }

        let mut annotations = HashMap::new();
        let mut rows = conn
            .query("SELECT id, label FROM annotations ORDER BY id", ())
            .await?;
        while let Some(row) = rows.next().await? {
            let id = stored.graph.intern(&row.get::<String>(1)?);
            let row_id = row.get::<i64>(0)?;
            annotations.insert(row_id, id);
            stored.annotations.insert(id, row_id);
        }

        let mut discourses = HashMap::new();
        let mut rows = conn
            .query(
                "SELECT id, name, anchor_tier_id FROM discourses ORDER BY id",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let id = stored.graph.add_discourse(&row.get::<String>(1)?)?;
            if let Some(anchor) = row.get::<Option<i64>>(2)? {
                stored
                    .graph
                    .set_anchor(id, lookup(&tiers, anchor, "annotation_types")?)?;
            }
            let row_id = row.get::<i64>(0)?;
            discourses.insert(row_id, id);
            stored.discourses.insert(id, row_id);
        }

        let mut nodes: HashMap<i64, NodeId> = HashMap::new();
        let mut rows = conn
            .query(
                "SELECT id, discourse_id, time, ordinal FROM nodes ORDER BY discourse_id, ordinal",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let discourse = lookup(&discourses, row.get::<i64>(1)?, "discourses")?;
            let id = if row.get::<i64>(3)? == 0 {
                stored.graph.discourse(discourse)?.begin
            } else {
                stored.graph.add_node(discourse, row.get::<Option<f64>>(2)?)?
            };
            nodes.insert(row.get::<i64>(0)?, id);
        }

        let mut rows = conn
            .query(
                "SELECT source_id, target_id, tier_id, annotation_id FROM edges ORDER BY id",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            stored.graph.add_edge(
                lookup(&nodes, row.get::<i64>(0)?, "nodes")?,
                lookup(&nodes, row.get::<i64>(1)?, "nodes")?,
                lookup(&tiers, row.get::<i64>(2)?, "annotation_types")?,
                lookup(&annotations, row.get::<i64>(3)?, "annotations")?,
            )?;
        }

        debug!(
            discourses = stored.discourses.len(),
            nodes = stored.graph.node_count(),
            edges = stored.graph.edge_count(),
            "graph loaded"
        );
        Ok(stored)
    }

    /// Query hierarchy over the stored tiers, named `query.corpus`.
    ///
    /// # Errors
    ///
    /// As [`Self::load_graph`].
    pub async fn hierarchy(&self) -> Result<Hierarchy, DatabaseError> {
        let stored = self.load_graph().await?;
        Ok(Hierarchy::from_graph(
            self.config().query.corpus.as_str(),
            &stored.graph,
        ))
    }
}
