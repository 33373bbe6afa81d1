//! Numeric thresholds and solver defaults.

/// Default iteration count for a static solve (matches the scene runner default).
pub const DEFAULT_STATIC_ITERATIONS: u32 = 50;

/// Default number of time steps per `solve` call in the scene runner's dynamic mode.
pub const DEFAULT_DYNAMIC_ITERATIONS: u32 = 5;

/// Default point mass for dynamic mode.
pub const DEFAULT_MASS: f64 = 1.0;

/// Default velocity retention factor (1.0 keeps the full velocity).
pub const DEFAULT_DAMPING: f64 = 1.0;

/// Default dynamic timestep (seconds).
pub const DEFAULT_TIMESTEP: f64 = 0.1;

/// Threshold below which lengths, areas and volumes count as degenerate.
pub const DEGENERATE_THRESHOLD: f64 = 1.0e-10;
