//! Event bus — channel-based event dispatch with pluggable sinks.
//!
//! The bus uses `std::sync::mpsc`: any number of [`EventEmitter`]s (cheap
//! sender clones) can be handed to solvers, while the bus keeps the
//! receiver and forwards pending events to its sinks on [`EventBus::flush`].

use std::sync::mpsc;

use crate::events::SolverEvent;
use crate::sinks::EventSink;

/// Broadcast event bus for solver telemetry.
pub struct EventBus {
    /// Channel sender, cloned into every emitter.
    sender: mpsc::Sender<SolverEvent>,
    /// Channel receiver, owned by the bus for dispatching to sinks.
    receiver: mpsc::Receiver<SolverEvent>,
    /// Registered sinks.
    sinks: Vec<Box<dyn EventSink>>,
    /// Whether the bus is active. Disabled bus is a no-op.
    enabled: bool,
}

/// Producer handle for an [`EventBus`].
///
/// Emitting never blocks; events sit in the channel until the bus flushes.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: mpsc::Sender<SolverEvent>,
}

impl EventEmitter {
    /// Emit an event. Silently dropped if the bus no longer exists.
    pub fn emit(&self, event: SolverEvent) {
        let _ = self.sender.send(event);
    }
}

impl EventBus {
    /// Creates a new event bus with no sinks.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Returns a producer handle feeding this bus.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            sender: self.sender.clone(),
        }
    }

    /// Enables or disables the bus. A disabled bus discards events on flush.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if the bus is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event directly from the bus owner.
    pub fn emit(&self, event: SolverEvent) {
        if !self.enabled {
            return;
        }
        let _ = self.sender.send(event);
    }

    /// Flush all pending events to registered sinks.
    ///
    /// Returns the number of events dispatched.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            if !self.enabled {
                continue;
            }
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
            count += 1;
        }
        count
    }

    /// Flushes pending events, then finalizes every sink.
    pub fn finish(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
