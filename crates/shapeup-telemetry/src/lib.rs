//! # shapeup-telemetry
//!
//! Event bus for solver telemetry. The solver publishes structured events
//! (initialization, per-iteration residuals, solve summaries) through an
//! [`EventEmitter`]; the owning [`EventBus`] dispatches them to pluggable
//! sinks (in-memory capture, `tracing` logs).

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::{EventBus, EventEmitter};
pub use events::{EventKind, SolverEvent};
pub use sinks::{EventSink, TracingSink, VecSink};
