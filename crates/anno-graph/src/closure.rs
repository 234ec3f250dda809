//! Hierarchical decomposition of higher-tier annotations into lower-tier chains.
//!
//! For each discourse, candidate paths over the lower tier are grown by a
//! worklist fixpoint: every lower edge seeds a one-edge path, and each path is
//! extended by every lower edge leaving its target. Paths are then joined to
//! higher-tier edges with the same (source, target) pair.
//!
//! Only paths that can still end at a higher-tier target are kept: a path must
//! start where some higher edge starts, and while the lower tier runs strictly
//! forward in node order its end may not pass the furthest higher edge that
//! starts at the same node.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use anno_core::entities::{AmbiguityReport, AnnotationSubarc, Edge};
use anno_core::{AnnotationId, DiscourseId, NodeId, TierId};
use tracing::{debug, info, warn};

use crate::control::Control;
use crate::error::GraphError;
use crate::model::AnnotationGraph;

pub const DEFAULT_SEPARATOR: &str = ".";

/// The full set of subarc records for one tier pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    pub higher_tier: TierId,
    pub lower_tier: TierId,
    pub records: BTreeSet<AnnotationSubarc>,
    /// Higher-tier edges spanned by more than one distinct lower chain.
    pub ambiguities: Vec<AmbiguityReport>,
}

impl Closure {
    /// Subarcs recorded for one higher-tier annotation.
    pub fn subarcs_of(
        &self,
        annotation: AnnotationId,
    ) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter(move |r| r.annotation_id == annotation)
            .map(|r| r.subarc.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Candidate {
    source: NodeId,
    target: NodeId,
    path: String,
}

/// Computes closures over a borrowed graph.
#[derive(Debug)]
pub struct ClosureEngine<'g> {
    graph: &'g AnnotationGraph,
    separator: String,
}

impl<'g> ClosureEngine<'g> {
    #[must_use]
    pub fn new(graph: &'g AnnotationGraph) -> Self {
        Self {
            graph,
            separator: DEFAULT_SEPARATOR.into(),
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// # Errors
    ///
    /// Returns `ReferentialError::UnknownTier` if either tier is unknown.
    pub fn compute_closure(&self, higher: TierId, lower: TierId) -> Result<Closure, GraphError> {
        self.compute_closure_with(higher, lower, &Control::none())
    }

    /// As [`Self::compute_closure`], polling `control` between discourses.
    ///
    /// # Errors
    ///
    /// Also returns `GraphError::Cancelled` if the stop check fires.
    pub fn compute_closure_with(
        &self,
        higher: TierId,
        lower: TierId,
        control: &Control<'_>,
    ) -> Result<Closure, GraphError> {
        let higher_label = self.graph.tier(higher)?.label.clone();
        let lower_label = self.graph.tier(lower)?.label.clone();

        let mut higher_by_discourse: BTreeMap<DiscourseId, Vec<&Edge>> = BTreeMap::new();
        for edge in self.graph.edges_of_tier(higher) {
            higher_by_discourse.entry(edge.discourse).or_default().push(edge);
        }
        let mut lower_by_source: HashMap<NodeId, Vec<&Edge>> = HashMap::new();
        for edge in self.graph.edges_of_tier(lower) {
            lower_by_source.entry(edge.source).or_default().push(edge);
        }
        let forward_only = !self.graph.has_back_edges(lower);

        let mut closure = Closure {
            higher_tier: higher,
            lower_tier: lower,
            records: BTreeSet::new(),
            ambiguities: Vec::new(),
        };
        let total = higher_by_discourse.len();
        for (done, (discourse, higher_edges)) in higher_by_discourse.iter().enumerate() {
            control.check()?;
            let paths = self.paths_for(higher_edges, &lower_by_source, forward_only)?;
            join(higher_edges, &paths, &mut closure);
            debug!(discourse = %discourse, spans = paths.len(), "discourse closure computed");
            control.report(done + 1, total);
        }

        for report in &closure.ambiguities {
            warn!(
                higher = %higher_label,
                lower = %lower_label,
                edge = %report.edge,
                chains = report.subarcs.len(),
                "annotation spanned by more than one lower-tier chain"
            );
        }
        info!(
            higher = %higher_label,
            lower = %lower_label,
            records = closure.records.len(),
            ambiguities = closure.ambiguities.len(),
            "closure computed"
        );
        Ok(closure)
    }

    /// Every distinct lower-tier label path per (source, target), restricted
    /// to paths that can join one of `higher_edges`.
    fn paths_for(
        &self,
        higher_edges: &[&Edge],
        lower_by_source: &HashMap<NodeId, Vec<&Edge>>,
        forward_only: bool,
    ) -> Result<HashMap<(NodeId, NodeId), BTreeSet<String>>, GraphError> {
        let mut furthest: HashMap<NodeId, usize> = HashMap::new();
        for edge in higher_edges {
            let ordinal = self.graph.node(edge.target)?.ordinal;
            let entry = furthest.entry(edge.source).or_insert(ordinal);
            *entry = (*entry).max(ordinal);
        }

        let reachable = |source: NodeId, target: NodeId| -> Result<bool, GraphError> {
            if !forward_only {
                return Ok(true);
            }
            let limit = furthest.get(&source).copied().unwrap_or(0);
            Ok(self.graph.node(target)?.ordinal <= limit)
        };

        let mut worklist = VecDeque::new();
        let mut seen = HashSet::new();
        for &source in furthest.keys() {
            for edge in lower_by_source.get(&source).into_iter().flatten() {
                if reachable(source, edge.target)? {
                    let seed = Candidate {
                        source,
                        target: edge.target,
                        path: format!("{}{}", self.graph.label(edge), self.separator),
                    };
                    if seen.insert(seed.clone()) {
                        worklist.push_back(seed);
                    }
                }
            }
        }

        let mut paths: HashMap<(NodeId, NodeId), BTreeSet<String>> = HashMap::new();
        while let Some(candidate) = worklist.pop_front() {
            for edge in lower_by_source.get(&candidate.target).into_iter().flatten() {
                if !reachable(candidate.source, edge.target)? {
                    continue;
                }
                let extended = Candidate {
                    source: candidate.source,
                    target: edge.target,
                    path: format!("{}{}{}", candidate.path, self.graph.label(edge), self.separator),
                };
                if seen.insert(extended.clone()) {
                    worklist.push_back(extended);
                }
            }
            paths
                .entry((candidate.source, candidate.target))
                .or_default()
                .insert(candidate.path);
        }
        Ok(paths)
    }
}

fn join(
    higher_edges: &[&Edge],
    paths: &HashMap<(NodeId, NodeId), BTreeSet<String>>,
    closure: &mut Closure,
) {
    for edge in higher_edges {
        let Some(chains) = paths.get(&(edge.source, edge.target)) else {
            continue;
        };
        for chain in chains {
            closure.records.insert(AnnotationSubarc {
                annotation_id: edge.annotation,
                higher_tier: closure.higher_tier,
                lower_tier: closure.lower_tier,
                subarc: chain.clone(),
            });
        }
        if chains.len() > 1 {
            closure.ambiguities.push(AmbiguityReport {
                edge: edge.id,
                annotation_id: edge.annotation,
                higher_tier: closure.higher_tier,
                lower_tier: closure.lower_tier,
                subarcs: chains.iter().cloned().collect(),
            });
        }
    }
}

/// Latest closure per (higher, lower) tier pair.
#[derive(Debug, Default)]
pub struct ClosureCache {
    closures: HashMap<(TierId, TierId), Closure>,
}

impl ClosureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `closure`, discarding any earlier records for its tier pair.
    pub fn replace(&mut self, closure: Closure) -> Option<Closure> {
        self.closures
            .insert((closure.higher_tier, closure.lower_tier), closure)
    }

    #[must_use]
    pub fn get(&self, higher: TierId, lower: TierId) -> Option<&Closure> {
        self.closures.get(&(higher, lower))
    }

    /// Drop every closure; call after any structural edit.
    pub fn invalidate(&mut self) {
        self.closures.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.closures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closures.is_empty()
    }
}
