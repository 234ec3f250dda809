//! Direct evaluation of query specifications against an in-memory graph.
//!
//! Covers the subset of specifications that need nothing beyond the graph
//! itself: labels and times of the matched tier at any offset, enclosing
//! and contained annotations of other tiers, and alignment. Projection
//! clauses are not evaluated; the result is the set of matched edges.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use anno_core::entities::Edge;
use anno_core::{EdgeId, NodeId, TierId};
use anno_graph::AnnotationGraph;
use tracing::debug;

use crate::attribute::{
    AnnotationRef, AttributeKind, Filter, Literal, Operator, Position, TierProperty, Value,
};
use crate::compile::plan;
use crate::error::{EvalError, SpecificationError};
use crate::spec::QuerySpecification;

/// Edges of the queried tier that satisfy every filter of `spec`, in
/// creation order.
///
/// # Errors
///
/// Returns the same `SpecificationError`s as [`crate::compile`], plus
/// `SpecificationError::UnknownTier` for tiers absent from `graph`, and
/// `EvalError::NotEvaluable` for filters on subarcs, named
/// properties or speaker and discourse metadata.
pub fn evaluate(
    graph: &AnnotationGraph,
    spec: &QuerySpecification,
) -> Result<Vec<EdgeId>, EvalError> {
    plan(spec)?;
    let evaluator = Evaluator::new(graph, spec)?;
    let mut matches = Vec::new();
    for edge in graph.edges_of_tier(evaluator.tier) {
        if evaluator.matches(edge)? {
            matches.push(edge.id);
        }
    }
    debug!(tier = %spec.tier, matches = matches.len(), "query evaluated");
    Ok(matches)
}

/// Number of edges [`evaluate`] would return.
///
/// # Errors
///
/// As [`evaluate`].
pub fn count(graph: &AnnotationGraph, spec: &QuerySpecification) -> Result<usize, EvalError> {
    evaluate(graph, spec).map(|m| m.len())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'g> {
    Text(&'g str),
    Number(f64),
}

impl<'g> From<&'g Literal> for Scalar<'g> {
    fn from(literal: &'g Literal) -> Self {
        match literal {
            Literal::Text(text) => Self::Text(text),
            Literal::Number(n) => Self::Number(*n),
        }
    }
}

fn compare(lhs: Scalar<'_>, op: Operator, rhs: Scalar<'_>) -> bool {
    let ordering = match (lhs, rhs) {
        (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
        (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(&b),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        Operator::Eq | Operator::In => ordering.is_eq(),
        Operator::NotEq => ordering.is_ne(),
        Operator::Lt => ordering.is_lt(),
        Operator::Le => ordering.is_le(),
        Operator::Gt => ordering.is_gt(),
        Operator::Ge => ordering.is_ge(),
    }
}

type Binding<'g> = BTreeMap<AnnotationRef, &'g Edge>;

struct Evaluator<'g, 's> {
    graph: &'g AnnotationGraph,
    spec: &'s QuerySpecification,
    tier: TierId,
    offsets: BTreeSet<i32>,
    /// Enclosing tiers and the annotation each binds.
    outer: Vec<(TierId, AnnotationRef)>,
    /// Contained tiers and the filters their path must satisfy.
    inner: Vec<(TierId, Vec<&'s Filter>)>,
    left: Vec<TierId>,
    right: Vec<TierId>,
}

impl<'g, 's> Evaluator<'g, 's> {
    fn new(
        graph: &'g AnnotationGraph,
        spec: &'s QuerySpecification,
    ) -> Result<Self, EvalError> {
        let resolve = |label: &str| {
            graph
                .tier_by_label(label)
                .ok_or_else(|| SpecificationError::UnknownTier {
                    tier: label.into(),
                    available: graph.tiers().map(|t| t.label.clone()).collect(),
                })
        };

        let tier = resolve(&spec.tier)?;
        for filter in spec.filters.iter().chain(&spec.contained_by) {
            supported(&filter.attribute)?;
            if let Value::Attribute(other) = &filter.value {
                supported(other)?;
            }
        }

        let mut offsets = BTreeSet::new();
        let mut outer = BTreeSet::new();
        let annotations = spec
            .filters
            .iter()
            .chain(&spec.contained_by)
            .flat_map(Filter::annotations);
        for annotation in annotations {
            if annotation.tier == spec.tier {
                if let Position::Relative(offset) = annotation.position {
                    offsets.insert(offset);
                }
            } else {
                outer.insert(annotation.clone());
            }
        }
        let outer = outer
            .into_iter()
            .map(|a| Ok((resolve(&a.tier)?, a)))
            .collect::<Result<_, SpecificationError>>()?;

        let mut grouped: BTreeMap<&str, Vec<&Filter>> = BTreeMap::new();
        for filter in &spec.contains {
            if let Some(annotation) = filter.attribute.annotation() {
                if let Value::Attribute(other) = &filter.value {
                    return Err(EvalError::NotEvaluable {
                        what: format!("contains filter against {}", other.output_alias()),
                    });
                }
                if !matches!(
                    filter.attribute,
                    AttributeKind::Tier {
                        property: TierProperty::Label,
                        ..
                    }
                ) {
                    return Err(EvalError::NotEvaluable {
                        what: filter.attribute.output_alias(),
                    });
                }
                grouped.entry(annotation.tier.as_str()).or_default().push(filter);
            }
        }
        let inner = grouped
            .into_iter()
            .map(|(label, filters)| Ok((resolve(label)?, filters)))
            .collect::<Result<_, SpecificationError>>()?;

        let left = spec
            .left_aligned
            .iter()
            .map(|t| resolve(t))
            .collect::<Result<_, _>>()?;
        let right = spec
            .right_aligned
            .iter()
            .map(|t| resolve(t))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            graph,
            spec,
            tier,
            offsets,
            outer,
            inner,
            left,
            right,
        })
    }

    fn matches(&self, edge: &'g Edge) -> Result<bool, EvalError> {
        let Some(mut binding) = self.bind_offsets(edge) else {
            return Ok(false);
        };
        if !self.aligned(edge) {
            return Ok(false);
        }
        for (tier, filters) in &self.inner {
            if !self.contains(edge, *tier, filters)? {
                return Ok(false);
            }
        }
        self.bind_outer(edge, 0, &mut binding)
    }

    /// Walk the queried tier to every referenced offset.
    fn bind_offsets(&self, edge: &'g Edge) -> Option<Binding<'g>> {
        let mut binding = Binding::new();
        binding.insert(self.spec.matched(), edge);
        for &offset in &self.offsets {
            let mut at = edge;
            for _ in 0..offset.unsigned_abs() {
                at = if offset < 0 {
                    self.graph.in_edges(at.source, Some(self.tier)).next()?
                } else {
                    self.graph.out_edges(at.target, Some(self.tier)).next()?
                };
            }
            binding.insert(
                AnnotationRef {
                    tier: self.spec.tier.clone(),
                    position: Position::Relative(offset),
                },
                at,
            );
        }
        Some(binding)
    }

    fn aligned(&self, edge: &Edge) -> bool {
        self.left
            .iter()
            .all(|&t| self.graph.out_edges(edge.source, Some(t)).next().is_some())
            && self
                .right
                .iter()
                .all(|&t| self.graph.in_edges(edge.target, Some(t)).next().is_some())
    }

    /// Try each enclosing annotation of the next outer tier in turn.
    fn bind_outer(
        &self,
        edge: &'g Edge,
        index: usize,
        binding: &mut Binding<'g>,
    ) -> Result<bool, EvalError> {
        let Some((tier, annotation)) = self.outer.get(index) else {
            return self.filters_hold(binding);
        };
        for candidate in self.graph.edges_of_tier(*tier) {
            if candidate.discourse != edge.discourse
                || !self.reachable(candidate.source, edge.source)
                || !self.reachable(edge.target, candidate.target)
            {
                continue;
            }
            binding.insert(annotation.clone(), candidate);
            if self.bind_outer(edge, index + 1, binding)? {
                return Ok(true);
            }
        }
        binding.remove(annotation);
        Ok(false)
    }

    /// Whether `to` is reachable from `from` over zero or more queried-tier edges.
    fn reachable(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(at) = stack.pop() {
            if at == to {
                return true;
            }
            if seen.insert(at) {
                stack.extend(self.graph.out_edges(at, Some(self.tier)).map(|e| e.target));
            }
        }
        false
    }

    /// Whether some path of `tier` edges spans `edge` with each filter
    /// satisfied by at least one edge on it.
    fn contains(&self, edge: &Edge, tier: TierId, filters: &[&Filter]) -> Result<bool, EvalError> {
        let mut stack: Vec<(NodeId, Vec<&Edge>)> = vec![(edge.source, Vec::new())];
        while let Some((at, path)) = stack.pop() {
            if at == edge.target {
                let mut all = true;
                for filter in filters {
                    let mut any = false;
                    for step in &path {
                        if self.holds_on(filter, step)? {
                            any = true;
                            break;
                        }
                    }
                    all &= any;
                }
                if all {
                    return Ok(true);
                }
                continue;
            }
            for next in self.graph.out_edges(at, Some(tier)) {
                let mut extended = path.clone();
                extended.push(next);
                stack.push((next.target, extended));
            }
        }
        Ok(false)
    }

    /// Contained filters only read labels.
    fn holds_on(&self, filter: &Filter, edge: &Edge) -> Result<bool, EvalError> {
        let label = Scalar::Text(self.graph.label(edge));
        self.compare_value(label, filter, &Binding::new())
    }

    fn filters_hold(&self, binding: &Binding<'g>) -> Result<bool, EvalError> {
        for filter in self.spec.filters.iter().chain(&self.spec.contained_by) {
            let Some(lhs) = self.scalar(&filter.attribute, binding)? else {
                return Ok(false);
            };
            if !self.compare_value(lhs, filter, binding)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn compare_value(
        &self,
        lhs: Scalar<'_>,
        filter: &Filter,
        binding: &Binding<'g>,
    ) -> Result<bool, EvalError> {
        Ok(match &filter.value {
            Value::Literal(literal) => compare(lhs, filter.operator, literal.into()),
            Value::List(values) => values
                .iter()
                .any(|v| compare(lhs, Operator::Eq, v.into())),
            Value::Attribute(other) => self
                .scalar(other, binding)?
                .is_some_and(|rhs| compare(lhs, filter.operator, rhs)),
        })
    }

    fn scalar(
        &self,
        attribute: &AttributeKind,
        binding: &Binding<'g>,
    ) -> Result<Option<Scalar<'g>>, EvalError> {
        let AttributeKind::Tier {
            annotation,
            property,
        } = attribute
        else {
            return Ok(None);
        };
        let Some(edge) = binding.get(annotation) else {
            return Ok(None);
        };
        let time = |node: NodeId| self.graph.node(node).map(|n| n.time);
        Ok(match property {
            TierProperty::Label => Some(Scalar::Text(self.graph.label(edge))),
            TierProperty::Begin => time(edge.source)?.map(Scalar::Number),
            TierProperty::End => time(edge.target)?.map(Scalar::Number),
            TierProperty::Duration => match (time(edge.source)?, time(edge.target)?) {
                (Some(begin), Some(end)) => Some(Scalar::Number(end - begin)),
                _ => None,
            },
            TierProperty::Subarc(_) | TierProperty::Named(_) => None,
        })
    }
}

fn supported(attribute: &AttributeKind) -> Result<(), EvalError> {
    let evaluable = matches!(
        attribute,
        AttributeKind::Tier {
            property: TierProperty::Label
                | TierProperty::Begin
                | TierProperty::End
                | TierProperty::Duration,
            ..
        }
    );
    if evaluable {
        Ok(())
    } else {
        Err(EvalError::NotEvaluable {
            what: attribute.output_alias(),
        })
    }
}
