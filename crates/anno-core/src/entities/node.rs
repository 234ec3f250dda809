use serde::{Deserialize, Serialize};

use crate::ids::{DiscourseId, NodeId};

/// A point on a discourse timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub discourse: DiscourseId,
    /// Absolute timestamp in seconds. `None` for untimed corpora.
    pub time: Option<f64>,
    /// Creation order within the discourse. The begin node is ordinal 0.
    pub ordinal: usize,
}
