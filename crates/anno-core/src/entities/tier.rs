use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::TierId;

/// Flags describing how a tier participates in the graph.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct TierFlags {
    /// Edges of this tier define the master timeline of a discourse.
    #[serde(default)]
    pub anchor: bool,
    /// Leaf tier with no further decomposition. At most two per discourse.
    #[serde(default)]
    pub base: bool,
    /// Values are per-occurrence (token) rather than per-type.
    #[serde(default)]
    pub token: bool,
}

impl TierFlags {
    /// Flags for a base tier that also anchors the timeline.
    #[must_use]
    pub const fn anchor_base() -> Self {
        Self {
            anchor: true,
            base: true,
            token: true,
        }
    }

    /// Flags for a secondary base tier aligned against the anchor.
    #[must_use]
    pub const fn base() -> Self {
        Self {
            anchor: false,
            base: true,
            token: true,
        }
    }

    /// Flags for a dependent tier spanning base-tier units.
    #[must_use]
    pub const fn dependent() -> Self {
        Self {
            anchor: false,
            base: false,
            token: false,
        }
    }
}

/// A named category of edges (a tier).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationType {
    pub id: TierId,
    pub label: String,
    pub flags: TierFlags,
    /// Delimiter for composite labels (e.g. `"."` in `"k.a.t"`).
    pub delimiter: Option<String>,
}
