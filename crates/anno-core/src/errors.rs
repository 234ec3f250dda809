//! Cross-cutting error types for annograph.
//!
//! `StructuralError` and `ReferentialError` can originate from graph
//! construction, direct model edits, or closure computation. Crate-specific
//! errors (`GraphError`, `SpecificationError`, `DatabaseError`) wrap these.

use thiserror::Error;

use crate::ids::{AnnotationId, DiscourseId, EdgeId, NodeId, TierId};

/// Graph construction or editing violated a structural invariant.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StructuralError {
    /// A dependent span references base positions outside the constructed chain.
    #[error("span {begin}..{end} of tier '{tier}' is outside base tier '{base}' (length {len})")]
    SpanOutOfBounds {
        tier: String,
        base: String,
        begin: usize,
        end: usize,
        len: usize,
    },

    /// A dependent span is empty or inverted.
    #[error("span {begin}..{end} of tier '{tier}' must cover at least one base unit")]
    EmptySpan {
        tier: String,
        begin: usize,
        end: usize,
    },

    /// A dependent span references no base tier at all.
    #[error("span '{label}' of tier '{tier}' references no base tier")]
    UnanchoredSpan { tier: String, label: String },

    /// A span references a tier that is not a base tier of the discourse.
    #[error("tier '{tier}' references unknown base tier '{base}'")]
    UnknownBaseTier { tier: String, base: String },

    /// Two base tiers of differing length share no compatible element.
    #[error(
        "base tiers '{first}' ({first_len} units) and '{second}' ({second_len} units) cannot be aligned"
    )]
    Unalignable {
        first: String,
        first_len: usize,
        second: String,
        second_len: usize,
    },

    /// A discourse declares no base tier.
    #[error("discourse '{discourse}' has no base tier")]
    NoBaseTier { discourse: String },

    /// A discourse declares more than two base tiers.
    #[error("discourse '{discourse}' has {count} base tiers (at most 2 are supported)")]
    TooManyBaseTiers { discourse: String, count: usize },

    /// More than one tier is flagged as anchor.
    #[error("discourse '{discourse}' flags more than one anchor tier: {tiers:?}")]
    MultipleAnchors {
        discourse: String,
        tiers: Vec<String>,
    },

    /// The anchor tier is not a base tier.
    #[error("anchor tier '{tier}' must be a base tier")]
    AnchorNotBase { tier: String },

    /// A tier name appears twice in one discourse.
    #[error("tier '{tier}' is declared twice")]
    DuplicateTier { tier: String },

    /// A discourse with this name already exists.
    #[error("discourse '{name}' already exists")]
    DuplicateDiscourse { name: String },

    /// A tier was registered again with different flags or delimiter.
    #[error("tier '{tier}' is already registered with different flags")]
    TierRedefined { tier: String },

    /// An anchor-tier edge would make the anchor chain branch or merge.
    #[error("anchor tier edge {source_node} -> {target} would branch the anchor chain")]
    AnchorBranch { source_node: NodeId, target: NodeId },

    /// Anchor timestamps must strictly increase along the chain.
    #[error("anchor edge {source_node} ({source_time}) -> {target} ({target_time}) goes back in time")]
    NonMonotonicTime {
        source_node: NodeId,
        source_time: f64,
        target: NodeId,
        target_time: f64,
    },

    /// Untimed anchor edges must follow node creation order.
    #[error("anchor edge {source_node} -> {target} runs against the timeline order")]
    NonMonotonicOrdinal { source_node: NodeId, target: NodeId },

    /// An edge would close a cycle among edges of one tier.
    #[error("edge {source_node} -> {target} closes a cycle in tier {tier}")]
    TierCycle {
        source_node: NodeId,
        target: NodeId,
        tier: TierId,
    },
}

/// An edge or record references entities outside the expected scope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferentialError {
    /// Edge endpoints belong to different discourses.
    #[error("edge {source_node} ({source_discourse}) -> {target} ({target_discourse}) crosses discourses")]
    CrossDiscourse {
        source_node: NodeId,
        source_discourse: DiscourseId,
        target: NodeId,
        target_discourse: DiscourseId,
    },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("unknown tier {0}")]
    UnknownTier(TierId),

    #[error("unknown tier '{0}'")]
    UnknownTierLabel(String),

    #[error("unknown annotation {0}")]
    UnknownAnnotation(AnnotationId),

    #[error("unknown discourse {0}")]
    UnknownDiscourse(DiscourseId),
}

/// Errors that can be raised by any annograph crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Referential(#[from] ReferentialError),

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
