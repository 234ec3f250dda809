use serde::{Deserialize, Serialize};

use crate::ids::AnnotationId;

/// An interned label value. Equal label text always maps to the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub label: String,
}
