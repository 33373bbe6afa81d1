//! Error types for the shapeup solver.
//!
//! All crates return `ShapeResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for the shapeup solver.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Caller buffer does not match the configured point count.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Unknown constraint or force id.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// `init` called with no registered constraints.
    #[error("Cannot initialize: no constraints registered")]
    EmptyConstraintSet,

    /// The system matrix could not be factorized (under-constrained geometry).
    #[error("Singular system: {0}")]
    SingularSystem(String),

    /// A constraint or force references points it cannot use
    /// (out of range, repeated, or wrong count).
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A numeric parameter is out of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The edit does not apply to this constraint kind.
    #[error("Constraint {id} of kind {kind} does not accept edit {edit}")]
    UnsupportedEdit {
        id: u32,
        kind: String,
        edit: String,
    },

    /// `solve` called before `init` / `init_dynamic`.
    #[error("Solver not initialized. Call init() or init_dynamic() first.")]
    NotInitialized,

    /// Constraints were added after the last initialization.
    #[error("System is stale: constraints changed since the last init")]
    StaleSystem,

    /// The iteration produced non-finite positions.
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, ShapeError>`.
pub type ShapeResult<T> = Result<T, ShapeError>;
