//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them
//! (collect in memory, forward to `tracing`, ...).

use std::sync::{Arc, Mutex};

use crate::events::{EventKind, SolverEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SolverEvent);

    /// Called when the run ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Shared handle to the events captured by a [`VecSink`].
pub type SharedEvents = Arc<Mutex<Vec<SolverEvent>>>;

/// A sink that collects events in memory for testing and inspection.
///
/// The storage is shared, so the events stay readable after the sink has
/// been boxed into a bus.
#[derive(Default)]
pub struct VecSink {
    events: SharedEvents,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the collected events.
    pub fn events(&self) -> SharedEvents {
        Arc::clone(&self.events)
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SolverEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events using the `tracing` crate.
pub struct TracingSink {
    /// Level used for per-iteration events; lifecycle events log at INFO.
    iteration_level: tracing::Level,
}

impl TracingSink {
    /// Creates a new tracing sink logging iterations at the given level.
    pub fn new(iteration_level: tracing::Level) -> Self {
        Self { iteration_level }
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SolverEvent) {
        match &event.kind {
            EventKind::Iteration {
                iteration,
                residual,
            } => {
                if self.iteration_level == tracing::Level::TRACE {
                    tracing::trace!(step = event.step, iteration, residual, "solver_iteration");
                } else {
                    tracing::debug!(step = event.step, iteration, residual, "solver_iteration");
                }
            }
            kind => {
                tracing::info!(step = event.step, event = ?kind, "solver_event");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
