//! Error types for mesh simplification.

use thiserror::Error;

/// Errors that can occur during simplification.
///
/// These are the fatal tier: construction failures abort before any collapse
/// and leave the input untouched; cancellation aborts the collapse loop but
/// still writes back the valid, partially simplified mesh.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyError {
    /// An undirected edge is shared by more than two faces.
    #[error("Mesh is non-manifold: an edge is shared by more than two faces")]
    NonManifoldEdge,

    /// A face has collinear (or coincident) corners.
    #[error("Mesh has a degenerate face with zero area")]
    DegenerateFace,

    /// The cancellation token was triggered between collapse steps.
    #[error("Simplification was cancelled")]
    Cancelled,
}

/// Result type for simplification operations.
pub type SimplifyResult<T> = std::result::Result<T, SimplifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SimplifyError::NonManifoldEdge;
        assert!(format!("{err}").contains("non-manifold"));

        let err = SimplifyError::DegenerateFace;
        assert!(format!("{err}").contains("degenerate"));
    }
}
