//! Dense id newtypes for graph entities.
//!
//! Ids are indices into the storage of the `AnnotationGraph` that issued them
//! and are meaningless outside it. The persistence layer maps them to database
//! row ids on write and back on load.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wrap a storage index.
            #[must_use]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// The storage index this id refers to.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

dense_id!(
    /// A point on a discourse timeline.
    NodeId,
    "nod"
);
dense_id!(
    /// One unit of a tier spanning two timeline points.
    EdgeId,
    "edg"
);
dense_id!(
    /// An annotation type (tier).
    TierId,
    "tir"
);
dense_id!(
    /// An interned annotation label.
    AnnotationId,
    "ann"
);
dense_id!(
    /// A named recording or document.
    DiscourseId,
    "dis"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        assert_eq!(NodeId::new(3).to_string(), "nod-3");
        assert_eq!(TierId::new(0).to_string(), "tir-0");
    }

    #[test]
    fn index_roundtrips() {
        assert_eq!(AnnotationId::new(42).index(), 42);
    }
}
