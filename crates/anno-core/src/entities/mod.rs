//! Entity structs for the annotation graph.
//!
//! Each entity maps to a table in the libSQL database (see `anno-db` migrations).
//! All structs derive `Serialize` and `Deserialize` for JSON roundtrip.

mod annotation;
mod discourse;
mod edge;
mod node;
mod subarc;
mod tier;

pub use annotation::Annotation;
pub use discourse::Discourse;
pub use edge::Edge;
pub use node::Node;
pub use subarc::{AmbiguityReport, AnnotationSubarc};
pub use tier::{AnnotationType, TierFlags};
