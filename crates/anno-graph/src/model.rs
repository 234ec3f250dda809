//! In-memory annotation graph.
//!
//! Nodes and edges live in a petgraph [`DiGraph`]; a [`NodeId`] or [`EdgeId`]
//! is the petgraph index of the entity it names. Indices stay stable because
//! entities are only ever removed from the end (see [`AnnotationGraph::rollback_to`]).

use std::collections::{BTreeMap, HashMap, HashSet};

use anno_core::entities::{Annotation, AnnotationType, Discourse, Edge, Node};
use anno_core::{
    AnnotationId, DiscourseId, EdgeId, NodeId, ReferentialError, StructuralError, TierDefinition,
    TierId,
};
use rustworkx_core::petgraph::Direction;
use rustworkx_core::petgraph::algo::has_path_connecting;
use rustworkx_core::petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rustworkx_core::petgraph::visit::{EdgeFiltered, EdgeRef};

use crate::error::GraphError;

/// Sizes of every store at one point in time.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    nodes: usize,
    edges: usize,
    annotations: usize,
    tiers: usize,
    discourses: usize,
    back_edge_tiers: HashSet<TierId>,
}

/// Nodes, edges, interned labels, tiers and discourses of a corpus.
#[derive(Debug, Default)]
pub struct AnnotationGraph {
    graph: DiGraph<Node, Edge>,
    annotations: Vec<Annotation>,
    annotation_index: HashMap<String, AnnotationId>,
    tiers: Vec<AnnotationType>,
    tier_index: HashMap<String, TierId>,
    discourses: Vec<Discourse>,
    discourse_index: HashMap<String, DiscourseId>,
    next_ordinal: Vec<usize>,
    back_edge_tiers: HashSet<TierId>,
}

impl AnnotationGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Discourses ──────────────────────────────────────────────────────

    /// Create a discourse and its begin node (time 0, ordinal 0).
    ///
    /// # Errors
    ///
    /// Returns `StructuralError::DuplicateDiscourse` if the name is taken.
    pub fn add_discourse(&mut self, name: &str) -> Result<DiscourseId, GraphError> {
        if self.discourse_index.contains_key(name) {
            return Err(StructuralError::DuplicateDiscourse { name: name.into() }.into());
        }
        let id = DiscourseId::new(self.discourses.len());
        let begin = NodeId::new(self.graph.node_count());
        self.graph.add_node(Node {
            id: begin,
            discourse: id,
            time: Some(0.0),
            ordinal: 0,
        });
        self.discourses.push(Discourse {
            id,
            name: name.into(),
            begin,
            anchor: None,
        });
        self.next_ordinal.push(1);
        self.discourse_index.insert(name.into(), id);
        Ok(id)
    }

    /// Designate the tier whose edges form the discourse's master timeline.
    ///
    /// # Errors
    ///
    /// Fails if the tier is not a base tier or the discourse already has a
    /// different anchor.
    pub fn set_anchor(&mut self, discourse: DiscourseId, tier: TierId) -> Result<(), GraphError> {
        let tier_type = self.tier(tier)?;
        if !tier_type.flags.base {
            return Err(StructuralError::AnchorNotBase {
                tier: tier_type.label.clone(),
            }
            .into());
        }
        let tier_label = tier_type.label.clone();
        let existing = self.discourse(discourse)?.anchor;
        match existing {
            Some(current) if current != tier => Err(StructuralError::MultipleAnchors {
                discourse: self.discourse(discourse)?.name.clone(),
                tiers: vec![self.tier(current)?.label.clone(), tier_label],
            }
            .into()),
            _ => {
                self.discourses[discourse.index()].anchor = Some(tier);
                Ok(())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownDiscourse` for an id this graph did not issue.
    pub fn discourse(&self, id: DiscourseId) -> Result<&Discourse, GraphError> {
        self.discourses
            .get(id.index())
            .ok_or_else(|| ReferentialError::UnknownDiscourse(id).into())
    }

    #[must_use]
    pub fn discourse_by_name(&self, name: &str) -> Option<&Discourse> {
        self.discourse_index
            .get(name)
            .map(|id| &self.discourses[id.index()])
    }

    pub fn discourses(&self) -> impl Iterator<Item = &Discourse> {
        self.discourses.iter()
    }

    // ── Tiers and annotations ───────────────────────────────────────────

    /// Get-or-create a tier by label.
    ///
    /// # Errors
    ///
    /// Returns `StructuralError::TierRedefined` if the label is registered
    /// with different flags or delimiter.
    pub fn register_tier(&mut self, definition: &TierDefinition) -> Result<TierId, GraphError> {
        if let Some(&id) = self.tier_index.get(&definition.name) {
            let existing = &self.tiers[id.index()];
            if existing.flags != definition.flags || existing.delimiter != definition.delimiter {
                return Err(StructuralError::TierRedefined {
                    tier: definition.name.clone(),
                }
                .into());
            }
            return Ok(id);
        }
        let id = TierId::new(self.tiers.len());
        self.tiers.push(AnnotationType {
            id,
            label: definition.name.clone(),
            flags: definition.flags,
            delimiter: definition.delimiter.clone(),
        });
        self.tier_index.insert(definition.name.clone(), id);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownTier` for an id this graph did not issue.
    pub fn tier(&self, id: TierId) -> Result<&AnnotationType, GraphError> {
        self.tiers
            .get(id.index())
            .ok_or_else(|| ReferentialError::UnknownTier(id).into())
    }

    /// Exact label match first, then ASCII case-insensitive.
    #[must_use]
    pub fn tier_by_label(&self, label: &str) -> Option<TierId> {
        self.tier_index.get(label).copied().or_else(|| {
            self.tiers
                .iter()
                .find(|t| t.label.eq_ignore_ascii_case(label))
                .map(|t| t.id)
        })
    }

    pub fn tiers(&self) -> impl Iterator<Item = &AnnotationType> {
        self.tiers.iter()
    }

    /// Lookup-or-create the interned annotation for `label`.
    pub fn intern(&mut self, label: &str) -> AnnotationId {
        if let Some(&id) = self.annotation_index.get(label) {
            return id;
        }
        let id = AnnotationId::new(self.annotations.len());
        self.annotations.push(Annotation {
            id,
            label: label.into(),
        });
        self.annotation_index.insert(label.into(), id);
        id
    }

    #[must_use]
    pub fn annotation_id(&self, label: &str) -> Option<AnnotationId> {
        self.annotation_index.get(label).copied()
    }

    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownAnnotation` for an id this graph did not issue.
    pub fn annotation(&self, id: AnnotationId) -> Result<&Annotation, GraphError> {
        self.annotations
            .get(id.index())
            .ok_or_else(|| ReferentialError::UnknownAnnotation(id).into())
    }

    /// Label text of an edge's annotation.
    #[must_use]
    pub fn label(&self, edge: &Edge) -> &str {
        self.annotations
            .get(edge.annotation.index())
            .map_or("", |a| a.label.as_str())
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    // ── Nodes and edges ─────────────────────────────────────────────────

    /// Append a timeline point to a discourse.
    ///
    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownDiscourse` for an unknown discourse.
    pub fn add_node(
        &mut self,
        discourse: DiscourseId,
        time: Option<f64>,
    ) -> Result<NodeId, GraphError> {
        let ordinal = *self
            .next_ordinal
            .get(discourse.index())
            .ok_or(ReferentialError::UnknownDiscourse(discourse))?;
        let id = NodeId::new(self.graph.node_count());
        self.graph.add_node(Node {
            id,
            discourse,
            time,
            ordinal,
        });
        self.next_ordinal[discourse.index()] = ordinal + 1;
        Ok(id)
    }

    /// Add an edge of `tier` labeled `annotation` from `source` to `target`.
    ///
    /// # Errors
    ///
    /// - `ReferentialError` for unknown ids or endpoints in different discourses.
    /// - `StructuralError::AnchorBranch`, `NonMonotonicTime` or
    ///   `NonMonotonicOrdinal` if an anchor edge would break the timeline chain.
    /// - `StructuralError::TierCycle` if the tier's edges would no longer form a DAG.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        tier: TierId,
        annotation: AnnotationId,
    ) -> Result<EdgeId, GraphError> {
        let src = *self.node(source)?;
        let dst = *self.node(target)?;
        self.tier(tier)?;
        self.annotation(annotation)?;

        if src.discourse != dst.discourse {
            return Err(ReferentialError::CrossDiscourse {
                source_node: source,
                source_discourse: src.discourse,
                target,
                target_discourse: dst.discourse,
            }
            .into());
        }
        if source == target {
            return Err(StructuralError::TierCycle {
                source_node: source,
                target,
                tier,
            }
            .into());
        }

        if self.discourses[src.discourse.index()].anchor == Some(tier) {
            self.check_anchor_edge(&src, &dst, tier)?;
        }

        let backward = dst.ordinal < src.ordinal;
        if (backward || self.back_edge_tiers.contains(&tier)) && self.tier_path(target, source, tier)
        {
            return Err(StructuralError::TierCycle {
                source_node: source,
                target,
                tier,
            }
            .into());
        }
        if backward {
            self.back_edge_tiers.insert(tier);
        }

        let id = EdgeId::new(self.graph.edge_count());
        self.graph.add_edge(
            NodeIndex::new(source.index()),
            NodeIndex::new(target.index()),
            Edge {
                id,
                discourse: src.discourse,
                source,
                target,
                tier,
                annotation,
            },
        );
        Ok(id)
    }

    fn check_anchor_edge(&self, src: &Node, dst: &Node, tier: TierId) -> Result<(), GraphError> {
        let branch = self.out_edges(src.id, Some(tier)).next().is_some()
            || self.in_edges(dst.id, Some(tier)).next().is_some();
        if branch {
            return Err(StructuralError::AnchorBranch {
                source_node: src.id,
                target: dst.id,
            }
            .into());
        }
        match (src.time, dst.time) {
            (Some(source_time), Some(target_time)) if target_time <= source_time => {
                Err(StructuralError::NonMonotonicTime {
                    source_node: src.id,
                    source_time,
                    target: dst.id,
                    target_time,
                }
                .into())
            }
            _ if dst.ordinal <= src.ordinal => Err(StructuralError::NonMonotonicOrdinal {
                source_node: src.id,
                target: dst.id,
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Whether `to` is reachable from `from` through edges of `tier` alone.
    fn tier_path(&self, from: NodeId, to: NodeId, tier: TierId) -> bool {
        let view = EdgeFiltered::from_fn(&self.graph, |e| e.weight().tier == tier);
        has_path_connecting(
            &view,
            NodeIndex::new(from.index()),
            NodeIndex::new(to.index()),
            None,
        )
    }

    /// Whether any edge of `tier` runs against node creation order.
    #[must_use]
    pub fn has_back_edges(&self, tier: TierId) -> bool {
        self.back_edge_tiers.contains(&tier)
    }

    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownNode` for an id this graph did not issue.
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.graph
            .node_weight(NodeIndex::new(id.index()))
            .ok_or_else(|| ReferentialError::UnknownNode(id).into())
    }

    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownEdge` for an id this graph did not issue.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GraphError> {
        self.graph
            .edge_weight(EdgeIndex::new(id.index()))
            .ok_or_else(|| ReferentialError::UnknownEdge(id).into())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing edges of `node`, optionally restricted to one tier.
    pub fn out_edges(&self, node: NodeId, tier: Option<TierId>) -> impl Iterator<Item = &Edge> {
        self.adjacent(node, tier, Direction::Outgoing)
    }

    /// Incoming edges of `node`, optionally restricted to one tier.
    pub fn in_edges(&self, node: NodeId, tier: Option<TierId>) -> impl Iterator<Item = &Edge> {
        self.adjacent(node, tier, Direction::Incoming)
    }

    fn adjacent(
        &self,
        node: NodeId,
        tier: Option<TierId>,
        direction: Direction,
    ) -> impl Iterator<Item = &Edge> {
        let index = NodeIndex::new(node.index());
        let edges = (index.index() < self.graph.node_count())
            .then(|| self.graph.edges_directed(index, direction))
            .into_iter()
            .flatten();
        edges
            .map(|e| e.weight())
            .filter(move |e| tier.is_none_or(|t| e.tier == t))
    }

    /// All edges of one tier, in creation order.
    pub fn edges_of_tier(&self, tier: TierId) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights().filter(move |e| e.tier == tier)
    }

    /// Anchor-tier edges from the discourse's begin node, in timeline order.
    /// Empty when no anchor is designated.
    ///
    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownDiscourse` for an unknown discourse.
    pub fn anchor_chain(&self, discourse: DiscourseId) -> Result<Vec<EdgeId>, GraphError> {
        let record = self.discourse(discourse)?;
        let Some(anchor) = record.anchor else {
            return Ok(Vec::new());
        };
        let mut chain = Vec::new();
        let mut at = record.begin;
        while let Some(edge) = self.out_edges(at, Some(anchor)).next() {
            chain.push(edge.id);
            at = edge.target;
        }
        Ok(chain)
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Edges of `tier` whose label equals `label`, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, label: &str, tier: TierId) -> Vec<&Edge> {
        self.edges_of_tier(tier)
            .filter(|e| self.label(e).eq_ignore_ascii_case(label))
            .collect()
    }

    /// Number of edges per (annotation, tier).
    #[must_use]
    pub fn annotation_frequencies(&self) -> BTreeMap<(AnnotationId, TierId), usize> {
        let mut counts = BTreeMap::new();
        for edge in self.graph.edge_weights() {
            *counts.entry((edge.annotation, edge.tier)).or_insert(0) += 1;
        }
        counts
    }

    /// `"tier/label"` strings for every (source, target) pair, in edge order.
    #[must_use]
    pub fn edge_labels(&self) -> BTreeMap<(NodeId, NodeId), Vec<String>> {
        let mut labels: BTreeMap<(NodeId, NodeId), Vec<String>> = BTreeMap::new();
        for edge in self.graph.edge_weights() {
            let tier = self.tiers.get(edge.tier.index()).map_or("", |t| t.label.as_str());
            labels
                .entry((edge.source, edge.target))
                .or_default()
                .push(format!("{tier}/{}", self.label(edge)));
        }
        labels
    }

    // ── Scoped edits ────────────────────────────────────────────────────

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            annotations: self.annotations.len(),
            tiers: self.tiers.len(),
            discourses: self.discourses.len(),
            back_edge_tiers: self.back_edge_tiers.clone(),
        }
    }

    /// Discard everything created after `checkpoint`.
    pub fn rollback_to(&mut self, checkpoint: Checkpoint) {
        while self.graph.edge_count() > checkpoint.edges {
            let last = EdgeIndex::new(self.graph.edge_count() - 1);
            self.graph.remove_edge(last);
        }
        while self.graph.node_count() > checkpoint.nodes {
            let last = NodeIndex::new(self.graph.node_count() - 1);
            if let Some(node) = self.graph.remove_node(last) {
                if let Some(next) = self.next_ordinal.get_mut(node.discourse.index()) {
                    *next = node.ordinal;
                }
            }
        }
        for annotation in self.annotations.drain(checkpoint.annotations..) {
            self.annotation_index.remove(&annotation.label);
        }
        for tier in self.tiers.drain(checkpoint.tiers..) {
            self.tier_index.remove(&tier.label);
        }
        for discourse in self.discourses.drain(checkpoint.discourses..) {
            self.discourse_index.remove(&discourse.name);
        }
        self.next_ordinal.truncate(checkpoint.discourses);
        self.back_edge_tiers = checkpoint.back_edge_tiers;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn anchored(graph: &mut AnnotationGraph, name: &str) -> (DiscourseId, TierId) {
        let discourse = graph.add_discourse(name).unwrap();
        let phone = graph.register_tier(&TierDefinition::anchor("phone")).unwrap();
        graph.set_anchor(discourse, phone).unwrap();
        (discourse, phone)
    }

    #[test]
    fn interning_shares_one_annotation() {
        let mut graph = AnnotationGraph::new();
        let a = graph.intern("cat");
        let b = graph.intern("cat");
        let c = graph.intern("Cat");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(graph.annotations().count(), 2);
    }

    #[test]
    fn begin_node_has_time_zero() {
        let mut graph = AnnotationGraph::new();
        let d = graph.add_discourse("d1").unwrap();
        let begin = graph.discourse(d).unwrap().begin;
        let node = graph.node(begin).unwrap();
        assert_eq!(node.time, Some(0.0));
        assert_eq!(node.ordinal, 0);
    }

    #[test]
    fn duplicate_discourse_is_rejected() {
        let mut graph = AnnotationGraph::new();
        graph.add_discourse("d1").unwrap();
        let err = graph.add_discourse("d1").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::DuplicateDiscourse { .. })
        ));
    }

    #[test]
    fn tier_redefinition_is_rejected() {
        let mut graph = AnnotationGraph::new();
        graph.register_tier(&TierDefinition::anchor("phone")).unwrap();
        let again = graph.register_tier(&TierDefinition::anchor("phone")).unwrap();
        assert_eq!(again, TierId::new(0));
        let err = graph
            .register_tier(&TierDefinition::dependent("phone"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::TierRedefined { .. })
        ));
    }

    #[test]
    fn cross_discourse_edge_is_referential_error() {
        let mut graph = AnnotationGraph::new();
        let (d1, phone) = anchored(&mut graph, "d1");
        let d2 = graph.add_discourse("d2").unwrap();
        let a = graph.discourse(d1).unwrap().begin;
        let b = graph.add_node(d2, Some(1.0)).unwrap();
        let label = graph.intern("k");
        let err = graph.add_edge(a, b, phone, label).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Referential(ReferentialError::CrossDiscourse { .. })
        ));
    }

    #[test]
    fn anchor_chain_cannot_branch() {
        let mut graph = AnnotationGraph::new();
        let (d, phone) = anchored(&mut graph, "d1");
        let begin = graph.discourse(d).unwrap().begin;
        let n1 = graph.add_node(d, Some(0.5)).unwrap();
        let n2 = graph.add_node(d, Some(0.8)).unwrap();
        let k = graph.intern("k");
        graph.add_edge(begin, n1, phone, k).unwrap();
        let err = graph.add_edge(begin, n2, phone, k).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::AnchorBranch { .. })
        ));
    }

    #[test]
    fn anchor_time_must_increase() {
        let mut graph = AnnotationGraph::new();
        let (d, phone) = anchored(&mut graph, "d1");
        let begin = graph.discourse(d).unwrap().begin;
        let n1 = graph.add_node(d, Some(0.0)).unwrap();
        let k = graph.intern("k");
        let err = graph.add_edge(begin, n1, phone, k).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::NonMonotonicTime { .. })
        ));
    }

    #[test]
    fn per_tier_cycle_is_rejected() {
        let mut graph = AnnotationGraph::new();
        let d = graph.add_discourse("d1").unwrap();
        let word = graph.register_tier(&TierDefinition::dependent("word")).unwrap();
        let begin = graph.discourse(d).unwrap().begin;
        let n1 = graph.add_node(d, None).unwrap();
        let n2 = graph.add_node(d, None).unwrap();
        let w = graph.intern("w");
        graph.add_edge(begin, n1, word, w).unwrap();
        graph.add_edge(n1, n2, word, w).unwrap();
        let err = graph.add_edge(n2, begin, word, w).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::TierCycle { .. })
        ));
        assert!(!graph.has_back_edges(word));

        // A backward edge that closes no cycle is allowed and marks the tier.
        let n3 = graph.add_node(d, None).unwrap();
        graph.add_edge(n3, n1, word, w).unwrap();
        assert!(graph.has_back_edges(word));
        let err = graph.add_edge(n2, n3, word, w).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::TierCycle { .. })
        ));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = AnnotationGraph::new();
        let d = graph.add_discourse("d1").unwrap();
        let word = graph.register_tier(&TierDefinition::dependent("word")).unwrap();
        let begin = graph.discourse(d).unwrap().begin;
        let w = graph.intern("w");
        assert!(graph.add_edge(begin, begin, word, w).is_err());
    }

    #[test]
    fn rollback_discards_later_entities() {
        let mut graph = AnnotationGraph::new();
        let (d, phone) = anchored(&mut graph, "d1");
        let begin = graph.discourse(d).unwrap().begin;
        let checkpoint = graph.checkpoint();

        let n1 = graph.add_node(d, Some(0.2)).unwrap();
        let label = graph.intern("k");
        graph.add_edge(begin, n1, phone, label).unwrap();
        graph.add_discourse("d2").unwrap();
        graph
            .register_tier(&TierDefinition::dependent("word"))
            .unwrap();

        graph.rollback_to(checkpoint);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.annotation_id("k").is_none());
        assert!(graph.discourse_by_name("d2").is_none());
        assert!(graph.tier_by_label("word").is_none());

        let again = graph.add_node(d, None).unwrap();
        assert_eq!(graph.node(again).unwrap().ordinal, 1);
    }

    #[test]
    fn lookups_ignore_case() {
        let mut graph = AnnotationGraph::new();
        let (d, phone) = anchored(&mut graph, "d1");
        let begin = graph.discourse(d).unwrap().begin;
        let n1 = graph.add_node(d, Some(0.1)).unwrap();
        let n2 = graph.add_node(d, Some(0.2)).unwrap();
        let upper = graph.intern("AA");
        let lower = graph.intern("aa");
        graph.add_edge(begin, n1, phone, upper).unwrap();
        graph.add_edge(n1, n2, phone, lower).unwrap();

        assert_eq!(graph.tier_by_label("PHONE"), Some(phone));
        assert_eq!(graph.find("aA", phone).len(), 2);
        assert_eq!(graph.annotation_frequencies()[&(lower, phone)], 1);
        assert_eq!(graph.edge_labels()[&(begin, n1)], vec!["phone/AA".to_string()]);
        assert_eq!(graph.anchor_chain(d).unwrap().len(), 2);
    }
}
