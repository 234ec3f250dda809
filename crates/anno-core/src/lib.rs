//! # anno-core
//!
//! Core types shared across all annograph crates:
//! - Dense id newtypes for nodes, edges, tiers, annotations, and discourses
//! - Entity structs for the annotation graph (nodes, edges, tiers, interned annotations,
//!   closure records, discourses)
//! - The normalized discourse representation produced by file-ingestion collaborators
//! - Cross-cutting error types (`StructuralError`, `ReferentialError`)

pub mod discourse_data;
pub mod entities;
pub mod errors;
pub mod ids;

pub use discourse_data::{DiscourseData, Span, TierData, TierDefinition, parse_transcription};
pub use errors::{CoreError, ReferentialError, StructuralError};
pub use ids::{AnnotationId, DiscourseId, EdgeId, NodeId, TierId};
