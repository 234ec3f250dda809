use serde::{Deserialize, Serialize};

use crate::ids::{AnnotationId, EdgeId, TierId};

/// Derived closure record: the ordered lower-tier labels composing one
/// higher-tier annotation, each followed by the separator (e.g. `"k.a.t."`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationSubarc {
    pub annotation_id: AnnotationId,
    pub higher_tier: TierId,
    pub lower_tier: TierId,
    pub subarc: String,
}

/// A higher-tier edge spanned by more than one distinct lower-tier chain.
///
/// Not an error: every chain is still emitted as a subarc record. The report
/// lets callers tell homophonous realizations from construction defects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AmbiguityReport {
    pub edge: EdgeId,
    pub annotation_id: AnnotationId,
    pub higher_tier: TierId,
    pub lower_tier: TierId,
    pub subarcs: Vec<String>,
}
