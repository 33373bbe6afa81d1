//! Solver configuration.
//!
//! Parameters that control how the solver runs: parallelism of the local
//! step, inner iterations per dynamic time step, and the defaults used when
//! dynamic mode is initialized without explicit values.

use serde::{Deserialize, Serialize};
use shapeup_types::constants::{DEFAULT_DAMPING, DEFAULT_MASS, DEFAULT_TIMESTEP};

/// Configuration for the constraint solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Whether to run the local step and per-point updates on the rayon pool.
    pub parallel: bool,

    /// Minimum number of items (constraints or points) before work is
    /// split across threads.
    pub parallel_threshold: usize,

    /// Local/global passes per dynamic time step.
    pub dynamic_inner_iterations: u32,

    /// Run the structural anchor check before a static factorization.
    ///
    /// Without it an under-anchored system is only caught if the numeric
    /// factorization happens to fail.
    pub check_anchors: bool,

    /// Per-point mass used by [`Solver::init_dynamic_default`](crate::Solver::init_dynamic_default).
    pub default_mass: f64,

    /// Velocity retention factor used by `init_dynamic_default` (1 = undamped).
    pub default_damping: f64,

    /// Timestep used by `init_dynamic_default` (seconds).
    pub default_timestep: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 64,
            dynamic_inner_iterations: 1,
            check_anchors: true,
            default_mass: DEFAULT_MASS,
            default_damping: DEFAULT_DAMPING,
            default_timestep: DEFAULT_TIMESTEP,
        }
    }
}

impl SolverConfig {
    /// Creates a config for debugging (single-threaded, deterministic order).
    pub fn debug() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more inner passes per time step).
    pub fn high_quality() -> Self {
        Self {
            dynamic_inner_iterations: 10,
            parallel_threshold: 16,
            ..Default::default()
        }
    }

    /// Returns true if `items` units of work should run in parallel.
    #[inline]
    pub fn use_parallel(&self, items: usize) -> bool {
        self.parallel && items >= self.parallel_threshold
    }
}
