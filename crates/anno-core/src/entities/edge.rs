use serde::{Deserialize, Serialize};

use crate::ids::{AnnotationId, DiscourseId, EdgeId, NodeId, TierId};

/// One unit of a tier spanning two timeline points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub discourse: DiscourseId,
    pub source: NodeId,
    pub target: NodeId,
    pub tier: TierId,
    pub annotation: AnnotationId,
}
