//! Solver event types.
//!
//! Structured events emitted by the solver at lifecycle points.
//! Events are lightweight value types that carry just enough data to be
//! useful for monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A solver event, tagged with the solve call it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverEvent {
    /// Number of `solve` calls completed before this event (0-indexed).
    pub step: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// The linear system was assembled and factorized.
    Initialized {
        /// `"static"` or `"dynamic"`.
        mode: String,
        /// Number of points.
        points: usize,
        /// Number of registered constraints.
        constraints: usize,
    },

    /// A solve call started.
    SolveBegin {
        /// Requested iteration (or time step) count.
        iterations: u32,
    },

    /// One local/global iteration (or dynamic time step) completed.
    Iteration {
        /// Iteration number within the solve call.
        iteration: u32,
        /// Relative position change of this iteration.
        residual: f64,
    },

    /// A solve call completed and its result was committed.
    SolveEnd {
        /// Iterations performed.
        iterations: u32,
        /// Residual of the last iteration.
        final_residual: f64,
        /// Wall-clock time of the call (seconds).
        wall_time: f64,
    },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SolverEvent {
    /// Creates a new event for the given step.
    pub fn new(step: u32, kind: EventKind) -> Self {
        Self { step, kind }
    }
}
