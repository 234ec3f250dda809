//! # anno-query
//!
//! Attribute-based queries over annotation graphs.
//!
//! A [`Hierarchy`] names the tiers and metadata a corpus declares and hands
//! out typed [`AttributeKind`]s. Those are combined into [`Filter`]s and a
//! [`QuerySpecification`], which is then either compiled into graph-pattern
//! query text with [`compile`] or, for the label and time subset, run
//! directly against an [`anno_graph::AnnotationGraph`] with [`evaluate`].
//!
//! ```
//! use anno_query::{Hierarchy, compile};
//!
//! let h = Hierarchy::new("buckeye").with_tier("phone", []);
//! let phone = h.tier("phone").unwrap();
//! let spec = h.find("phone").unwrap().filter(phone.label().equals("aa"));
//! let compiled = compile(&spec).unwrap();
//! assert!(compiled.text.contains("r_phone.label = 'aa'"));
//! ```

pub mod ast;
pub mod attribute;
pub mod compile;
pub mod error;
pub mod eval;
pub mod hierarchy;
pub mod render;
pub mod spec;

pub use attribute::{
    AnnotationRef, AttributeKind, Filter, Literal, Operator, Position, TierProperty, Value,
};
pub use compile::{CompiledQuery, compile, plan};
pub use error::{EvalError, SpecificationError};
pub use eval::{count, evaluate};
pub use hierarchy::{Hierarchy, TierRef};
pub use render::render;
pub use spec::{Aggregate, QuerySpecification};
