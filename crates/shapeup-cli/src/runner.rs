//! Runs a scene end to end and collects the results.

use serde::{Deserialize, Serialize};
use shapeup_telemetry::{EventBus, EventKind, VecSink};
use shapeup_types::ShapeResult;

use crate::scene::{Scene, SceneMode};

/// Result of running a scene, written as JSON by `shapeup solve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneReport {
    pub mode: SceneMode,
    /// Iterations (static) or time steps (dynamic) performed.
    pub iterations: u32,
    pub final_residual: f64,
    pub wall_time: f64,
    /// Per-iteration residuals, in order.
    pub residuals: Vec<f64>,
    /// Total weighted energy after solving.
    pub energy: f64,
    /// Final positions.
    pub points: Vec<[f64; 3]>,
    /// Error of every constraint (anchors included), indexed by id.
    pub errors: Vec<f64>,
}

impl SceneReport {
    /// Largest constraint error.
    pub fn max_error(&self) -> f64 {
        self.errors.iter().copied().fold(0.0, f64::max)
    }
}

/// Builds, initializes and solves `scene`. `iterations` overrides the
/// scene's iteration (static) or step (dynamic) count.
pub fn run(scene: &Scene, iterations: Option<u32>) -> ShapeResult<SceneReport> {
    let mut built = scene.build()?;

    let mut bus = EventBus::new();
    let sink = VecSink::new();
    let events = sink.events();
    bus.add_sink(Box::new(sink));
    built.solver.attach_emitter(bus.emitter());

    scene.init(&mut built.solver)?;
    let count = iterations.unwrap_or_else(|| scene.settings.solve_count());
    let report = built.solver.solve(count)?;
    bus.finish();

    let residuals = events
        .lock()
        .map(|events| {
            events
                .iter()
                .filter_map(|e| match e.kind {
                    EventKind::Iteration { residual, .. } => Some(residual),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SceneReport {
        mode: scene.settings.mode,
        iterations: report.iterations,
        final_residual: report.final_residual,
        wall_time: report.wall_time,
        residuals,
        energy: built.solver.total_energy(),
        points: built.solver.points().iter().map(|p| p.to_array()).collect(),
        errors: built.solver.constraint_errors(),
    })
}
