//! Construction of a discourse graph from its normalized representation.
//!
//! Base tiers are built first and produce the node timeline (merged through
//! the alignment engine when two base tiers are present). Dependent tiers are
//! then laid over it, each span's base indices resolved to nodes through an
//! [`IndexResolver`]. A failed build is rolled back to the checkpoint taken
//! at the start, so the graph never holds a partially built discourse.

use std::collections::{HashMap, HashSet};

use anno_core::{DiscourseData, DiscourseId, NodeId, Span, StructuralError, TierData, TierId};
use tracing::{debug, info, warn};

use crate::align::{Aligned, align_within, label_compatible};
use crate::control::Control;
use crate::error::GraphError;
use crate::model::AnnotationGraph;

/// Resolves base-tier positions to nodes by walking that tier's chain.
///
/// Position 0 is the discourse's begin node. A miss walks forward from the
/// furthest cached position, caching every node it passes.
#[derive(Debug)]
pub struct IndexResolver {
    tier: TierId,
    nodes: Vec<NodeId>,
}

impl IndexResolver {
    #[must_use]
    pub fn new(tier: TierId, begin: NodeId) -> Self {
        Self {
            tier,
            nodes: vec![begin],
        }
    }

    /// The node at base position `index`, if the chain reaches it.
    pub fn resolve(&mut self, graph: &AnnotationGraph, index: usize) -> Option<NodeId> {
        while self.nodes.len() <= index {
            let &last = self.nodes.last()?;
            let next = graph.out_edges(last, Some(self.tier)).next()?.target;
            self.nodes.push(next);
        }
        self.nodes.get(index).copied()
    }

    /// Number of units in the chain.
    pub fn chain_len(&mut self, graph: &AnnotationGraph) -> usize {
        while self.resolve(graph, self.nodes.len()).is_some() {}
        self.nodes.len() - 1
    }
}

/// Builds discourses into an [`AnnotationGraph`].
#[derive(Debug)]
pub struct GraphBuilder<'g> {
    graph: &'g mut AnnotationGraph,
    lookahead: Option<usize>,
}

/// Tier layout of one discourse after validation.
struct Plan<'d> {
    anchor: &'d TierData,
    secondary: Option<&'d TierData>,
    dependents: Vec<&'d TierData>,
    anchor_fallback: bool,
}

impl<'g> GraphBuilder<'g> {
    #[must_use]
    pub const fn new(graph: &'g mut AnnotationGraph) -> Self {
        Self {
            graph,
            lookahead: None,
        }
    }

    /// Bound the alignment engine's forward search (`None` = unbounded).
    #[must_use]
    pub const fn with_lookahead(mut self, lookahead: Option<usize>) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Build one discourse.
    ///
    /// # Errors
    ///
    /// Returns a `GraphError` if the data violates a structural invariant;
    /// the graph is left as it was before the call.
    pub fn build(&mut self, data: &DiscourseData) -> Result<DiscourseId, GraphError> {
        self.build_with(data, &Control::none())
    }

    /// Build one discourse, polling `control` between tiers.
    ///
    /// # Errors
    ///
    /// As [`Self::build`], plus `GraphError::Cancelled` if the stop check fires.
    pub fn build_with(
        &mut self,
        data: &DiscourseData,
        control: &Control<'_>,
    ) -> Result<DiscourseId, GraphError> {
        let checkpoint = self.graph.checkpoint();
        let nodes_before = self.graph.node_count();
        match self.build_inner(data, control) {
            Ok(id) => {
                info!(
                    discourse = %data.name,
                    nodes = self.graph.node_count() - nodes_before,
                    "discourse built"
                );
                Ok(id)
            }
            Err(err) => {
                warn!(discourse = %data.name, error = %err, "discourse build failed, rolling back");
                self.graph.rollback_to(checkpoint);
                Err(err)
            }
        }
    }

    fn build_inner(
        &mut self,
        data: &DiscourseData,
        control: &Control<'_>,
    ) -> Result<DiscourseId, GraphError> {
        let plan = plan(data)?;

        let mut anchor_def = plan.anchor.definition.clone();
        if plan.anchor_fallback {
            anchor_def.flags.anchor = true;
        }
        let anchor_tier = self.graph.register_tier(&anchor_def)?;
        let secondary_tier = plan
            .secondary
            .map(|t| self.graph.register_tier(&t.definition))
            .transpose()?;
        let dependent_tiers = plan
            .dependents
            .iter()
            .map(|t| self.graph.register_tier(&t.definition))
            .collect::<Result<Vec<_>, _>>()?;

        let discourse = self.graph.add_discourse(&data.name)?;
        self.graph.set_anchor(discourse, anchor_tier)?;
        let begin = self.graph.discourse(discourse)?.begin;

        let total = 1 + plan.dependents.len();
        control.check()?;
        match (plan.secondary, secondary_tier) {
            (Some(secondary), Some(tier)) => {
                self.build_aligned(discourse, begin, (plan.anchor, anchor_tier), (secondary, tier))?;
            }
            _ => self.build_single(discourse, begin, plan.anchor, anchor_tier)?,
        }
        control.report(1, total);

        let mut resolvers: HashMap<String, IndexResolver> = HashMap::new();
        resolvers.insert(
            plan.anchor.definition.name.clone(),
            IndexResolver::new(anchor_tier, begin),
        );
        if let (Some(secondary), Some(tier)) = (plan.secondary, secondary_tier) {
            resolvers.insert(
                secondary.definition.name.clone(),
                IndexResolver::new(tier, begin),
            );
        }

        for (done, (tier_data, &tier)) in plan.dependents.iter().zip(&dependent_tiers).enumerate() {
            control.check()?;
            self.build_dependent(tier_data, tier, &plan.anchor.definition.name, &mut resolvers)?;
            control.report(done + 2, total);
        }

        Ok(discourse)
    }

    fn build_single(
        &mut self,
        discourse: DiscourseId,
        begin: NodeId,
        tier_data: &TierData,
        tier: TierId,
    ) -> Result<(), GraphError> {
        let mut at = begin;
        for span in &tier_data.spans {
            let node = self.graph.add_node(discourse, span.end_time)?;
            let label = self.graph.intern(&span.label);
            self.graph.add_edge(at, node, tier, label)?;
            at = node;
        }
        debug!(tier = %tier_data.definition.name, units = tier_data.spans.len(), "base tier built");
        Ok(())
    }

    fn build_aligned(
        &mut self,
        discourse: DiscourseId,
        begin: NodeId,
        (anchor, anchor_tier): (&TierData, TierId),
        (secondary, secondary_tier): (&TierData, TierId),
    ) -> Result<(), GraphError> {
        let a: Vec<&Span> = anchor.spans.iter().collect();
        let b: Vec<&Span> = secondary.spans.iter().collect();
        let alignment = align_within(
            &a,
            &b,
            |x, y| label_compatible(&x.label, &y.label),
            self.lookahead,
        );
        if a.len() != b.len() && alignment.paired() == 0 {
            return Err(StructuralError::Unalignable {
                first: anchor.definition.name.clone(),
                first_len: a.len(),
                second: secondary.definition.name.clone(),
                second_len: b.len(),
            }
            .into());
        }

        let (mut last_a, mut last_b) = (begin, begin);
        for (col_a, col_b) in alignment.columns() {
            let time = col_a
                .element()
                .and_then(|s| s.end_time)
                .or_else(|| col_b.element().and_then(|s| s.end_time));
            let node = self.graph.add_node(discourse, time)?;
            if let Aligned::Element(span) = col_a {
                let label = self.graph.intern(&span.label);
                self.graph.add_edge(last_a, node, anchor_tier, label)?;
                last_a = node;
            }
            if let Aligned::Element(span) = col_b {
                let label = self.graph.intern(&span.label);
                self.graph.add_edge(last_b, node, secondary_tier, label)?;
                last_b = node;
            }
        }
        debug!(
            anchor = %anchor.definition.name,
            secondary = %secondary.definition.name,
            columns = alignment.len(),
            paired = alignment.paired(),
            "base tiers aligned"
        );
        Ok(())
    }

    fn build_dependent(
        &mut self,
        tier_data: &TierData,
        tier: TierId,
        anchor_name: &str,
        resolvers: &mut HashMap<String, IndexResolver>,
    ) -> Result<(), GraphError> {
        let name = &tier_data.definition.name;
        for span in &tier_data.spans {
            let primary = if span.refs.contains_key(anchor_name) {
                anchor_name
            } else {
                span.refs
                    .keys()
                    .next()
                    .map(String::as_str)
                    .ok_or_else(|| StructuralError::UnanchoredSpan {
                        tier: name.clone(),
                        label: span.label.clone(),
                    })?
            };

            let &(begin, end) = span.refs.get(primary).ok_or_else(|| {
                StructuralError::UnanchoredSpan {
                    tier: name.clone(),
                    label: span.label.clone(),
                }
            })?;
            let (source, target) = self.resolve_span(resolvers, name, primary, begin, end)?;
            for (base, &(b, e)) in span.refs.iter().filter(|(k, _)| k.as_str() != primary) {
                if self.resolve_span(resolvers, name, base, b, e)? != (source, target) {
                    warn!(
                        tier = %name,
                        label = %span.label,
                        base = %base,
                        using = %primary,
                        "base tier references resolve to different nodes"
                    );
                }
            }

            let label = self.graph.intern(&span.label);
            self.graph.add_edge(source, target, tier, label)?;
        }
        debug!(tier = %name, units = tier_data.spans.len(), "dependent tier built");
        Ok(())
    }

    fn resolve_span(
        &self,
        resolvers: &mut HashMap<String, IndexResolver>,
        tier: &str,
        base: &str,
        begin: usize,
        end: usize,
    ) -> Result<(NodeId, NodeId), GraphError> {
        if begin >= end {
            return Err(StructuralError::EmptySpan {
                tier: tier.into(),
                begin,
                end,
            }
            .into());
        }
        let resolver = resolvers
            .get_mut(base)
            .ok_or_else(|| StructuralError::UnknownBaseTier {
                tier: tier.into(),
                base: base.into(),
            })?;
        let graph: &AnnotationGraph = &*self.graph;
        match (resolver.resolve(graph, begin), resolver.resolve(graph, end)) {
            (Some(source), Some(target)) => Ok((source, target)),
            _ => Err(StructuralError::SpanOutOfBounds {
                tier: tier.into(),
                base: base.into(),
                begin,
                end,
                len: resolver.chain_len(graph),
            }
            .into()),
        }
    }
}

/// Validate the tier layout and pick the anchor.
fn plan(data: &DiscourseData) -> Result<Plan<'_>, GraphError> {
    let mut seen = HashSet::new();
    for tier in &data.tiers {
        if !seen.insert(tier.definition.name.as_str()) {
            return Err(StructuralError::DuplicateTier {
                tier: tier.definition.name.clone(),
            }
            .into());
        }
    }

    let flagged: Vec<&TierData> = data.tiers.iter().filter(|t| t.definition.flags.anchor).collect();
    if flagged.len() > 1 {
        return Err(StructuralError::MultipleAnchors {
            discourse: data.name.clone(),
            tiers: flagged.iter().map(|t| t.definition.name.clone()).collect(),
        }
        .into());
    }
    if let Some(anchor) = flagged.first() {
        if !anchor.definition.flags.base {
            return Err(StructuralError::AnchorNotBase {
                tier: anchor.definition.name.clone(),
            }
            .into());
        }
    }

    let bases: Vec<&TierData> = data.base_tiers().collect();
    let anchor = match (flagged.first(), bases.first()) {
        (_, None) => {
            return Err(StructuralError::NoBaseTier {
                discourse: data.name.clone(),
            }
            .into());
        }
        (Some(&anchor), Some(_)) => anchor,
        (None, Some(&first)) => first,
    };
    if bases.len() > 2 {
        return Err(StructuralError::TooManyBaseTiers {
            discourse: data.name.clone(),
            count: bases.len(),
        }
        .into());
    }

    let secondary = bases
        .iter()
        .copied()
        .find(|t| t.definition.name != anchor.definition.name);
    let dependents = data
        .tiers
        .iter()
        .filter(|t| !t.definition.flags.base)
        .collect();

    Ok(Plan {
        anchor,
        secondary,
        dependents,
        anchor_fallback: flagged.is_empty(),
    })
}
