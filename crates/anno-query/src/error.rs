use anno_graph::GraphError;

/// A query specification is self-contradictory or refers to things that do not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecificationError {
    /// Offset 0 is the matched annotation itself and must not be spelled out.
    #[error("offset 0 of tier '{tier}' is the matched annotation; use the tier directly")]
    RedundantZeroOffset { tier: String },

    /// Containment was requested against the queried tier.
    #[error("tier '{tier}' cannot contain or be contained by itself")]
    SelfContainment { tier: String },

    /// An extra column is neither aggregated nor grouped.
    #[error("column '{column}' must appear in group_by when aggregates are requested")]
    UngroupedColumn { column: String },

    /// A property name was not found in the hierarchy.
    #[error("{kind} do not have a '{key}' property (available: {})", .available.join(", "))]
    UnknownProperty {
        kind: String,
        key: String,
        available: Vec<String>,
    },

    #[error("unknown tier '{tier}' (available: {})", .available.join(", "))]
    UnknownTier { tier: String, available: Vec<String> },

    /// Relative positions are only supported on the queried tier.
    #[error("offset {offset} on tier '{tier}' is not supported; only the queried tier takes offsets")]
    UnsupportedOffset { tier: String, offset: i32 },

    /// A containment filter used a property that has no per-edge value.
    #[error("property '{property}' cannot be used in a contains filter")]
    UnsupportedInContains { property: String },

    #[error("filter on '{column}' compares against an empty list")]
    EmptyInList { column: String },
}

/// Errors raised by [`crate::evaluate`].
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The in-memory evaluator does not cover this construct.
    #[error("cannot evaluate {what} without a query backend")]
    NotEvaluable { what: String },
}
