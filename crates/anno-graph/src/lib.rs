//! # anno-graph
//!
//! The annotation graph of a spoken-language corpus and the algorithms that
//! run over it:
//!
//! - [`model`]: nodes, tier edges and interned labels with referential and
//!   structural checks on every edit.
//! - [`align`]: greedy alignment of two parallel base tiers.
//! - [`builder`]: construction of one discourse from [`anno_core::DiscourseData`].
//! - [`closure`]: decomposition of higher-tier annotations into lower-tier label chains.
//! - [`control`]: cooperative cancellation and progress callbacks.
//!
//! Every operation here is synchronous and holds no state beyond the graph
//! it is handed.

pub mod align;
pub mod builder;
pub mod closure;
pub mod control;
pub mod error;
pub mod model;

pub use align::{Aligned, Alignment, align, align_within, label_compatible};
pub use builder::{GraphBuilder, IndexResolver};
pub use closure::{Closure, ClosureCache, ClosureEngine};
pub use control::{Control, Progress};
pub use error::GraphError;
pub use model::{AnnotationGraph, Checkpoint};
