use anno_core::{CoreError, ReferentialError, StructuralError};

/// Errors raised while editing, building, or deriving facts from an annotation graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Referential(#[from] ReferentialError),

    /// The caller's stop check asked the operation to end early.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<GraphError> for CoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Structural(e) => Self::Structural(e),
            GraphError::Referential(e) => Self::Referential(e),
            GraphError::Cancelled => Self::Validation("operation cancelled".into()),
        }
    }
}
