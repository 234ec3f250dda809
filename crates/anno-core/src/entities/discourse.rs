use serde::{Deserialize, Serialize};

use crate::ids::{DiscourseId, NodeId, TierId};

/// A named recording or document owning its own node and edge set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discourse {
    pub id: DiscourseId,
    pub name: String,
    /// The single begin node (time 0, ordinal 0).
    pub begin: NodeId,
    /// Tier whose edges form the master timeline. Set once the base chain is built.
    pub anchor: Option<TierId>,
}
