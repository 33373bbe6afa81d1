//! The local/global constraint solver.
//!
//! Implements the alternating optimization loop:
//! 1. **Local step** — project every constraint onto its feasible set,
//!    all from one snapshot of the positions (parallel across constraints)
//! 2. **Global step** — solve the prefactored SPD system `A x = rhs`
//! 3. **Repeat** for the requested number of iterations
//!
//! In dynamic mode each iteration is one time step of projective dynamics:
//! velocities are updated from external forces, positions are predicted,
//! the local/global passes run against the inertial target, and velocities
//! are recomputed from the position change.

use std::time::Instant;

use rayon::prelude::*;
use shapeup_math::DVec3;
use shapeup_telemetry::{EventEmitter, EventKind, SolverEvent};
use shapeup_types::{ConstraintId, ForceId, ShapeError, ShapeResult};
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::constraint::{
    self, AngleConstraint, AreaConstraint, BendingConstraint, ClosenessConstraint, Constraint,
    ConstraintEdit, ConstraintKind, EdgeStrainConstraint, EditError, FitShape, FittingConstraint,
    ShapeConstraint, TetStrainConstraint, TriangleStrainConstraint, UniformLaplacianConstraint,
    VolumeConstraint,
};
use crate::field::VectorField;
use crate::force::{Force, GravityForce, VertexForce};
use crate::system::LinearSystem;

/// Lifecycle state of a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMode {
    /// No factorization yet.
    Uninitialized,
    /// Constraint-only relaxation.
    Static,
    /// Projective-dynamics time stepping.
    Dynamic,
}

/// Per-point masses for dynamic mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Masses {
    /// The same mass for every point.
    Uniform(f64),
    /// One mass per point.
    PerPoint(Vec<f64>),
}

/// Result of a `solve` call.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Iterations (static) or time steps (dynamic) performed.
    pub iterations: u32,
    /// Relative position change of the last iteration.
    pub final_residual: f64,
    /// Wall-clock time for the call (seconds).
    pub wall_time: f64,
}

/// Dynamic-mode state captured at `init_dynamic`.
#[derive(Debug, Clone)]
struct DynamicState {
    masses: Vec<f64>,
    velocities: Vec<DVec3>,
}

/// Constraint-based geometry solver.
///
/// Owns the points, the constraint and force registries and the factorized
/// linear system. Ids are dense indices into the registries, assigned in
/// registration order and never reused.
pub struct Solver {
    config: SolverConfig,
    points: VectorField,
    /// Set by the first `set_points`; fixes the point count.
    points_fixed: bool,
    constraints: Vec<Box<dyn Constraint>>,
    forces: Vec<Box<dyn Force>>,
    system: Option<LinearSystem>,
    mode: SolverMode,
    dynamics: Option<DynamicState>,
    damping: f64,
    timestep: f64,
    /// Constraints were added since the last init.
    topology_dirty: bool,
    /// Weights were changed since the last init.
    weights_dirty: bool,
    emitter: Option<EventEmitter>,
    /// Number of committed solve calls.
    solve_count: u32,
}

impl Solver {
    /// Creates an empty solver with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Creates an empty solver with the given configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            damping: config.default_damping,
            timestep: config.default_timestep,
            config,
            points: VectorField::default(),
            points_fixed: false,
            constraints: Vec::new(),
            forces: Vec::new(),
            system: None,
            mode: SolverMode::Uninitialized,
            dynamics: None,
            topology_dirty: false,
            weights_dirty: false,
            emitter: None,
            solve_count: 0,
        }
    }

    /// Publishes solver events through `emitter` from now on.
    pub fn attach_emitter(&mut self, emitter: EventEmitter) {
        self.emitter = Some(emitter);
    }

    fn emit(&self, kind: EventKind) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(SolverEvent::new(self.solve_count, kind));
        }
    }

    // ─── Points ──────────────────────────────────────────────

    /// Replaces all coordinates from an interleaved `[x0, y0, z0, ...]`
    /// buffer. The first call fixes the point count.
    pub fn set_points(&mut self, coords: &[f64], count: usize) -> ShapeResult<()> {
        if coords.len() != count * 3 {
            return Err(ShapeError::Dimension {
                expected: count * 3,
                actual: coords.len(),
            });
        }
        if self.points_fixed && count != self.points.len() {
            return Err(ShapeError::Dimension {
                expected: self.points.len(),
                actual: count,
            });
        }
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(ShapeError::InvalidParameter(
                "point coordinates must be finite".into(),
            ));
        }
        self.points = VectorField::from_flat(coords)?;
        self.points_fixed = true;
        Ok(())
    }

    /// Copies the coordinates into an interleaved buffer of `3 * count` values.
    pub fn get_points(&self, out: &mut [f64], count: usize) -> ShapeResult<()> {
        if count != self.points.len() {
            return Err(ShapeError::Dimension {
                expected: self.points.len(),
                actual: count,
            });
        }
        self.points.write_flat(out)
    }

    /// Copy of the current positions.
    pub fn points(&self) -> Vec<DVec3> {
        self.points.to_points()
    }

    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    // ─── Registration ────────────────────────────────────────

    fn check_indices(&self, kind: ConstraintKind, ids: &[usize]) -> ShapeResult<()> {
        let arity = kind.arity();
        if !arity.accepts(ids.len()) {
            return Err(ShapeError::InvalidTopology(format!(
                "{kind} constraint needs {arity} points, got {}",
                ids.len()
            )));
        }
        let n = self.points.len();
        if let Some(&bad) = ids.iter().find(|&&i| i >= n) {
            return Err(ShapeError::InvalidTopology(format!(
                "point index {bad} out of range (point count: {n})"
            )));
        }
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(ShapeError::InvalidTopology(format!(
                "point index {} repeated in {kind} constraint",
                w[0]
            )));
        }
        Ok(())
    }

    fn register<C, F>(
        &mut self,
        kind: ConstraintKind,
        ids: &[usize],
        weight: f64,
        build: F,
    ) -> ShapeResult<ConstraintId>
    where
        C: Constraint + 'static,
        F: FnOnce(&VectorField) -> C,
    {
        self.check_indices(kind, ids)?;
        check_weight(weight)?;

        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Box::new(build(&self.points)));
        if self.system.is_some() {
            self.topology_dirty = true;
        }
        Ok(id)
    }

    /// Keeps the distance between two points at its current length.
    pub fn add_edge_strain_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::EdgeStrain, ids, weight, |p| {
            EdgeStrainConstraint::new([ids[0], ids[1]], weight, p)
        })
    }

    /// Keeps the principal stretches of a triangle at their current values.
    pub fn add_triangle_strain_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::TriangleStrain, ids, weight, |p| {
            TriangleStrainConstraint::new([ids[0], ids[1], ids[2]], weight, p)
        })
    }

    /// Keeps the principal stretches of a tetrahedron at their current values.
    pub fn add_tetrahedron_strain_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::TetrahedronStrain, ids, weight, |p| {
            TetStrainConstraint::new([ids[0], ids[1], ids[2], ids[3]], weight, p)
        })
    }

    /// Keeps the area of a triangle at its current value.
    pub fn add_area_constraint(&mut self, ids: &[usize], weight: f64) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::Area, ids, weight, |p| {
            AreaConstraint::new([ids[0], ids[1], ids[2]], weight, p)
        })
    }

    /// Keeps the volume of a tetrahedron at its current value.
    pub fn add_volume_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::Volume, ids, weight, |p| {
            VolumeConstraint::new([ids[0], ids[1], ids[2], ids[3]], weight, p)
        })
    }

    /// Keeps the discrete curvature at its current magnitude.
    ///
    /// Exactly 4 indices always form an edge stencil (edge `ids[0]`,
    /// `ids[1]`, wings `ids[2]`, `ids[3]`) with cotangent weights, so a
    /// valence-3 one-ring is read as a stencil too. Any other count is a
    /// vertex one-ring (center first) with uniform weights.
    pub fn add_bending_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::Bending, ids, weight, |p| {
            BendingConstraint::new(ids.to_vec(), weight, p)
        })
    }

    /// Pulls a point toward its current position.
    pub fn add_closeness_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::Closeness, ids, weight, |p| {
            ClosenessConstraint::new(ids[0], weight, p)
        })
    }

    /// Pulls the points onto their best-fit line.
    pub fn add_line_constraint(&mut self, ids: &[usize], weight: f64) -> ShapeResult<ConstraintId> {
        self.add_fitting(FitShape::Line, ConstraintKind::Line, ids, weight)
    }

    /// Pulls the points onto their best-fit plane.
    pub fn add_plane_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.add_fitting(FitShape::Plane, ConstraintKind::Plane, ids, weight)
    }

    /// Pulls the points onto their best-fit circle.
    pub fn add_circle_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.add_fitting(FitShape::Circle, ConstraintKind::Circle, ids, weight)
    }

    /// Pulls the points onto their best-fit sphere.
    pub fn add_sphere_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.add_fitting(FitShape::Sphere, ConstraintKind::Sphere, ids, weight)
    }

    fn add_fitting(
        &mut self,
        shape: FitShape,
        kind: ConstraintKind,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(kind, ids, weight, |_| {
            FittingConstraint::new(shape, ids.to_vec(), weight)
        })
    }

    /// Pulls a vertex (first index) toward the mean of its ring. With
    /// `displacement`, the current offset from the mean is kept instead.
    pub fn add_uniform_laplacian_constraint(
        &mut self,
        ids: &[usize],
        displacement: bool,
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::UniformLaplacian, ids, weight, |p| {
            UniformLaplacianConstraint::new(ids.to_vec(), displacement, weight, p)
        })
    }

    /// Keeps the angle at `ids[1]` between `min_angle` and `max_angle` radians.
    pub fn add_angle_constraint(
        &mut self,
        ids: &[usize],
        min_angle: f64,
        max_angle: f64,
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        AngleConstraint::check_angles(min_angle, max_angle).map_err(invalid_parameter)?;
        self.register(ConstraintKind::Angle, ids, weight, |_| {
            AngleConstraint::new([ids[0], ids[1], ids[2]], min_angle, max_angle, weight)
        })
    }

    /// Keeps the points a rotated copy of their current configuration.
    pub fn add_rigid_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::Rigid, ids, weight, |p| {
            ShapeConstraint::rigid(ids.to_vec(), weight, p)
        })
    }

    /// Keeps the points a rotated, uniformly scaled copy of their current
    /// configuration.
    pub fn add_similarity_constraint(
        &mut self,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        self.register(ConstraintKind::Similarity, ids, weight, |p| {
            ShapeConstraint::similarity(ids.to_vec(), weight, p)
        })
    }

    /// Registers a constraint of any kind with its default parameters
    /// (angle range `[0, π]`, smoothing Laplacian).
    pub fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        ids: &[usize],
        weight: f64,
    ) -> ShapeResult<ConstraintId> {
        match kind {
            ConstraintKind::EdgeStrain => self.add_edge_strain_constraint(ids, weight),
            ConstraintKind::TriangleStrain => self.add_triangle_strain_constraint(ids, weight),
            ConstraintKind::TetrahedronStrain => {
                self.add_tetrahedron_strain_constraint(ids, weight)
            }
            ConstraintKind::Area => self.add_area_constraint(ids, weight),
            ConstraintKind::Volume => self.add_volume_constraint(ids, weight),
            ConstraintKind::Bending => self.add_bending_constraint(ids, weight),
            ConstraintKind::Closeness => self.add_closeness_constraint(ids, weight),
            ConstraintKind::Line => self.add_line_constraint(ids, weight),
            ConstraintKind::Plane => self.add_plane_constraint(ids, weight),
            ConstraintKind::Circle => self.add_circle_constraint(ids, weight),
            ConstraintKind::Sphere => self.add_sphere_constraint(ids, weight),
            ConstraintKind::UniformLaplacian => {
                self.add_uniform_laplacian_constraint(ids, false, weight)
            }
            ConstraintKind::Angle => {
                self.add_angle_constraint(ids, 0.0, std::f64::consts::PI, weight)
            }
            ConstraintKind::Rigid => self.add_rigid_constraint(ids, weight),
            ConstraintKind::Similarity => self.add_similarity_constraint(ids, weight),
        }
    }

    /// Adds a force acting equally on every point.
    pub fn add_gravity_force(&mut self, force: DVec3) -> ShapeResult<ForceId> {
        check_force(force)?;
        self.push_force(Box::new(GravityForce::new(force)))
    }

    /// Adds a force acting on one point.
    pub fn add_vertex_force(&mut self, force: DVec3, point: usize) -> ShapeResult<ForceId> {
        check_force(force)?;
        self.check_point(point)?;
        self.push_force(Box::new(VertexForce::new(force, point)))
    }

    fn push_force(&mut self, force: Box<dyn Force>) -> ShapeResult<ForceId> {
        let id = ForceId(self.forces.len() as u32);
        self.forces.push(force);
        Ok(id)
    }

    fn check_point(&self, point: usize) -> ShapeResult<()> {
        if point >= self.points.len() {
            return Err(ShapeError::InvalidTopology(format!(
                "point index {point} out of range (point count: {})",
                self.points.len()
            )));
        }
        Ok(())
    }

    // ─── Edits ───────────────────────────────────────────────

    fn constraint_index(&self, id: ConstraintId) -> ShapeResult<usize> {
        let idx = id.index();
        if idx >= self.constraints.len() {
            return Err(ShapeError::InvalidId(format!(
                "{id} (constraint count: {})",
                self.constraints.len()
            )));
        }
        Ok(idx)
    }

    fn force_index(&self, id: ForceId) -> ShapeResult<usize> {
        let idx = id.index();
        if idx >= self.forces.len() {
            return Err(ShapeError::InvalidId(format!(
                "{id} (force count: {})",
                self.forces.len()
            )));
        }
        Ok(idx)
    }

    /// Applies a parameter edit. Takes effect at the next solve, without
    /// re-initialization.
    pub fn edit_constraint(&mut self, id: ConstraintId, edit: ConstraintEdit) -> ShapeResult<()> {
        let idx = self.constraint_index(id)?;
        let constraint = &mut self.constraints[idx];
        constraint.edit(&edit).map_err(|e| match e {
            EditError::Unsupported => ShapeError::UnsupportedEdit {
                id: id.0,
                kind: constraint.kind().to_string(),
                edit: edit.name().to_string(),
            },
            EditError::Invalid(msg) => ShapeError::InvalidParameter(msg),
        })
    }

    /// Sets the rest length of an edge strain constraint.
    pub fn edit_edge_strain_constraint(
        &mut self,
        id: ConstraintId,
        length: f64,
    ) -> ShapeResult<()> {
        self.edit_constraint(id, ConstraintEdit::RestLength(length))
    }

    /// Sets the target position of a closeness constraint.
    pub fn edit_closeness_constraint(&mut self, id: ConstraintId, point: DVec3) -> ShapeResult<()> {
        self.edit_constraint(id, ConstraintEdit::Target(point))
    }

    /// Changes a constraint's weight. The factorized system keeps the
    /// weights captured at init until the next `init`/`init_dynamic`.
    pub fn set_constraint_weight(&mut self, id: ConstraintId, weight: f64) -> ShapeResult<()> {
        let idx = self.constraint_index(id)?;
        check_weight(weight)?;
        self.constraints[idx].set_weight(weight);
        if self.system.is_some() {
            self.weights_dirty = true;
        }
        Ok(())
    }

    /// Moves a vertex force and replaces its vector.
    pub fn edit_vertex_force(
        &mut self,
        id: ForceId,
        force: DVec3,
        point: usize,
    ) -> ShapeResult<()> {
        let idx = self.force_index(id)?;
        check_force(force)?;
        self.check_point(point)?;
        if !self.forces[idx].edit(force, Some(point)) {
            return Err(ShapeError::InvalidId(format!(
                "{id} is a {} force, not a vertex force",
                self.forces[idx].kind()
            )));
        }
        Ok(())
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Assembles and factorizes the static system `Sᵀ W S`.
    pub fn init(&mut self) -> ShapeResult<()> {
        let system = LinearSystem::assemble(
            self.points.len(),
            &self.constraints,
            None,
            self.config.check_anchors,
        )?;

        info!(
            points = self.points.len(),
            constraints = self.constraints.len(),
            rows = system.row_count(),
            "Static solver initialized"
        );

        self.system = Some(system);
        self.mode = SolverMode::Static;
        self.dynamics = None;
        self.topology_dirty = false;
        self.weights_dirty = false;
        self.emit(EventKind::Initialized {
            mode: "static".into(),
            points: self.points.len(),
            constraints: self.constraints.len(),
        });
        Ok(())
    }

    /// Assembles and factorizes the dynamic system `Sᵀ W S + M/h²` and
    /// resets velocities to zero.
    ///
    /// `damping` is the fraction of velocity kept per step (1 = undamped).
    pub fn init_dynamic(&mut self, masses: Masses, damping: f64, timestep: f64) -> ShapeResult<()> {
        let n = self.points.len();
        let masses = match masses {
            Masses::Uniform(m) => vec![m; n],
            Masses::PerPoint(m) => {
                if m.len() != n {
                    return Err(ShapeError::Dimension {
                        expected: n,
                        actual: m.len(),
                    });
                }
                m
            }
        };
        if let Some(bad) = masses.iter().find(|m| !m.is_finite() || **m <= 0.0) {
            return Err(ShapeError::InvalidParameter(format!(
                "mass {bad} must be positive and finite"
            )));
        }
        check_damping(damping)?;
        check_timestep(timestep)?;

        let system = LinearSystem::assemble(
            n,
            &self.constraints,
            Some((&masses, timestep)),
            self.config.check_anchors,
        )?;

        info!(
            points = n,
            constraints = self.constraints.len(),
            forces = self.forces.len(),
            damping,
            timestep,
            "Dynamic solver initialized"
        );

        self.system = Some(system);
        self.mode = SolverMode::Dynamic;
        self.dynamics = Some(DynamicState {
            masses,
            velocities: vec![DVec3::ZERO; n],
        });
        self.damping = damping;
        self.timestep = timestep;
        self.topology_dirty = false;
        self.weights_dirty = false;
        self.emit(EventKind::Initialized {
            mode: "dynamic".into(),
            points: n,
            constraints: self.constraints.len(),
        });
        Ok(())
    }

    /// `init_dynamic` with the mass, damping and timestep defaults of the
    /// solver's configuration.
    pub fn init_dynamic_default(&mut self) -> ShapeResult<()> {
        self.init_dynamic(
            Masses::Uniform(self.config.default_mass),
            self.config.default_damping,
            self.config.default_timestep,
        )
    }

    /// Sets the timestep. In dynamic mode the system is refactorized
    /// immediately; on failure the previous timestep stays in effect.
    pub fn set_time_step(&mut self, timestep: f64) -> ShapeResult<()> {
        check_timestep(timestep)?;
        if let (Some(system), Some(dynamics)) = (self.system.as_mut(), self.dynamics.as_ref()) {
            system.refactor_inertia(&dynamics.masses, timestep)?;
            debug!(timestep, "Dynamic system refactorized for new timestep");
        }
        self.timestep = timestep;
        Ok(())
    }

    /// Sets the fraction of velocity kept per time step. Takes effect at
    /// the next solve.
    pub fn set_damping(&mut self, damping: f64) -> ShapeResult<()> {
        check_damping(damping)?;
        self.damping = damping;
        Ok(())
    }

    // ─── Solve ───────────────────────────────────────────────

    /// Runs `iterations` local/global iterations (static) or time steps
    /// (dynamic). Positions and velocities are only committed if every
    /// iteration succeeds.
    pub fn solve(&mut self, iterations: u32) -> ShapeResult<SolveReport> {
        let system = self.system.as_ref().ok_or(ShapeError::NotInitialized)?;
        if self.topology_dirty {
            return Err(ShapeError::StaleSystem);
        }
        if self.weights_dirty {
            warn!("Constraint weights changed since init; using the weights captured at init");
        }
        if iterations == 0 {
            return Ok(SolveReport {
                iterations: 0,
                final_residual: 0.0,
                wall_time: 0.0,
            });
        }

        let start = Instant::now();
        self.emit(EventKind::SolveBegin { iterations });

        let (points, velocities, final_residual) = match (self.mode, self.dynamics.as_ref()) {
            (SolverMode::Dynamic, Some(dynamics)) => {
                let (points, velocities, residual) =
                    self.run_dynamic(system, dynamics, iterations)?;
                (points, Some(velocities), residual)
            }
            _ => {
                let (points, residual) = self.run_static(system, iterations)?;
                (points, None, residual)
            }
        };

        self.points = points;
        if let (Some(dynamics), Some(velocities)) = (self.dynamics.as_mut(), velocities) {
            dynamics.velocities = velocities;
        }

        let wall_time = start.elapsed().as_secs_f64();
        self.emit(EventKind::SolveEnd {
            iterations,
            final_residual,
            wall_time,
        });
        self.solve_count += 1;

        debug!(
            mode = ?self.mode,
            iterations,
            final_residual,
            wall_time,
            "Solve completed"
        );

        Ok(SolveReport {
            iterations,
            final_residual,
            wall_time,
        })
    }

    fn run_static(
        &self,
        system: &LinearSystem,
        iterations: u32,
    ) -> ShapeResult<(VectorField, f64)> {
        let n = self.points.len();
        let mut x = self.points.clone();
        let mut next = VectorField::zeros(n);
        let mut projections = vec![DVec3::ZERO; system.row_count()];
        let mut residual = 0.0;

        for iter in 0..iterations {
            // === LOCAL STEP ===
            self.project_all(&x, &mut projections);

            // === GLOBAL STEP ===
            system.solve(&projections, None, &mut next)?;
            check_finite(&next, iter)?;

            residual = next.relative_change(&x);
            std::mem::swap(&mut x, &mut next);
            self.emit(EventKind::Iteration {
                iteration: iter,
                residual,
            });
        }

        Ok((x, residual))
    }

    fn run_dynamic(
        &self,
        system: &LinearSystem,
        dynamics: &DynamicState,
        iterations: u32,
    ) -> ShapeResult<(VectorField, Vec<DVec3>, f64)> {
        let n = self.points.len();
        let h = self.timestep;
        let damping = self.damping;
        let masses = &dynamics.masses;
        let parallel = self.config.use_parallel(n);
        let inner = self.config.dynamic_inner_iterations.max(1);

        let mut external = vec![DVec3::ZERO; n];
        for force in &self.forces {
            force.accumulate(&mut external);
        }

        let mut x = self.points.clone();
        let mut velocities = dynamics.velocities.clone();
        let mut next = VectorField::zeros(n);
        let mut projections = vec![DVec3::ZERO; system.row_count()];
        let mut residual = 0.0;

        for step in 0..iterations {
            let x_old = x.clone();

            // 1. v ← damping·v + h·F/m
            let integrate = |(i, v): (usize, &mut DVec3)| {
                *v = *v * damping + external[i] * (h / masses[i]);
            };
            if parallel {
                velocities.par_iter_mut().enumerate().for_each(integrate);
            } else {
                velocities.iter_mut().enumerate().for_each(integrate);
            }

            // 2. x̃ ← x + h·v, used as both the inertial target and the initial guess
            let predict = |i: usize| x_old.get(i) + velocities[i] * h;
            let predicted_points: Vec<DVec3> = if parallel {
                (0..n).into_par_iter().map(predict).collect()
            } else {
                (0..n).map(predict).collect()
            };
            let predicted = VectorField::from_points(&predicted_points);
            x.clone_from(&predicted);

            // 3. Local/global passes against the inertial target
            for _ in 0..inner {
                self.project_all(&x, &mut projections);
                system.solve(&projections, Some(&predicted), &mut next)?;
                check_finite(&next, step)?;
                std::mem::swap(&mut x, &mut next);
            }

            // 4. v ← (x − x_old) / h
            let recover = |(i, v): (usize, &mut DVec3)| {
                *v = (x.get(i) - x_old.get(i)) / h;
            };
            if parallel {
                velocities.par_iter_mut().enumerate().for_each(recover);
            } else {
                velocities.iter_mut().enumerate().for_each(recover);
            }

            residual = x.relative_change(&x_old);
            self.emit(EventKind::Iteration {
                iteration: step,
                residual,
            });
        }

        Ok((x, velocities, residual))
    }

    /// Local step: every constraint projects from the same snapshot into
    /// its own slice of `out`.
    fn project_all(&self, points: &VectorField, out: &mut [DVec3]) {
        let mut chunks: Vec<&mut [DVec3]> = Vec::with_capacity(self.constraints.len());
        let mut rest = out;
        for c in &self.constraints {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(c.rows());
            chunks.push(head);
            rest = tail;
        }

        if self.config.use_parallel(self.constraints.len()) {
            self.constraints
                .par_iter()
                .zip(chunks.into_par_iter())
                .for_each(|(c, chunk)| c.project(points, chunk));
        } else {
            for (c, chunk) in self.constraints.iter().zip(chunks) {
                c.project(points, chunk);
            }
        }
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Violation of one constraint on the current positions.
    pub fn constraint_error(&self, id: ConstraintId) -> ShapeResult<f64> {
        let idx = self.constraint_index(id)?;
        Ok(self.constraints[idx].error(&self.points))
    }

    /// Violations of all constraints, indexed by id.
    pub fn constraint_errors(&self) -> Vec<f64> {
        self.constraints
            .iter()
            .map(|c| c.error(&self.points))
            .collect()
    }

    /// Registered constraint by id.
    pub fn constraint(&self, id: ConstraintId) -> ShapeResult<&dyn Constraint> {
        let idx = self.constraint_index(id)?;
        Ok(self.constraints[idx].as_ref())
    }

    /// Total weighted energy `Σ w ‖S x − P(x)‖²` with the current weights.
    pub fn total_energy(&self) -> f64 {
        self.constraints
            .iter()
            .map(|c| constraint::energy(c.as_ref(), &self.points))
            .sum()
    }

    pub fn mode(&self) -> SolverMode {
        self.mode
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    /// Per-point velocities (empty unless in dynamic mode).
    pub fn velocities(&self) -> &[DVec3] {
        match &self.dynamics {
            Some(d) => d.velocities.as_slice(),
            None => &[],
        }
    }

    /// Returns true if constraints or weights changed since the last init.
    pub fn is_stale(&self) -> bool {
        self.topology_dirty || self.weights_dirty
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_parameter(e: EditError) -> ShapeError {
    match e {
        EditError::Invalid(msg) => ShapeError::InvalidParameter(msg),
        EditError::Unsupported => ShapeError::InvalidParameter("unsupported parameter".into()),
    }
}

fn check_weight(weight: f64) -> ShapeResult<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ShapeError::InvalidParameter(format!(
            "weight {weight} must be finite and non-negative"
        )));
    }
    Ok(())
}

fn check_force(force: DVec3) -> ShapeResult<()> {
    if !force.is_finite() {
        return Err(ShapeError::InvalidParameter(format!(
            "force {force} must be finite"
        )));
    }
    Ok(())
}

fn check_damping(damping: f64) -> ShapeResult<()> {
    if !damping.is_finite() || !(0.0..=1.0).contains(&damping) {
        return Err(ShapeError::InvalidParameter(format!(
            "damping {damping} must lie in [0, 1]"
        )));
    }
    Ok(())
}

fn check_timestep(timestep: f64) -> ShapeResult<()> {
    if !timestep.is_finite() || timestep <= 0.0 {
        return Err(ShapeError::InvalidParameter(format!(
            "timestep {timestep} must be positive and finite"
        )));
    }
    Ok(())
}

fn check_finite(points: &VectorField, iteration: u32) -> ShapeResult<()> {
    if !points.is_finite() {
        return Err(ShapeError::NumericalFailure(format!(
            "non-finite positions after iteration {iteration}"
        )));
    }
    Ok(())
}
