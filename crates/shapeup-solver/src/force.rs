//! The force family.
//!
//! Forces only act in dynamic mode, where they enter the velocity update
//! `v ← damping·v + h·F/m`. They are stateless apart from their parameters.

use std::fmt;

use shapeup_math::DVec3;

/// The closed set of force kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceKind {
    Gravity,
    Vertex,
}

impl fmt::Display for ForceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForceKind::Gravity => f.write_str("gravity"),
            ForceKind::Vertex => f.write_str("vertex"),
        }
    }
}

/// Common interface of all force kinds.
pub trait Force: Send + Sync + fmt::Debug {
    fn kind(&self) -> ForceKind;

    /// Force acting on `point`.
    fn force_at(&self, point: usize) -> DVec3;

    /// Adds this force into a per-point accumulator.
    fn accumulate(&self, out: &mut [DVec3]) {
        for (i, f) in out.iter_mut().enumerate() {
            *f += self.force_at(i);
        }
    }

    /// Replaces the force vector and, for per-point forces, the target
    /// point. Returns false if the kind has no target point to move.
    fn edit(&mut self, force: DVec3, point: Option<usize>) -> bool;
}

/// The same force on every point.
#[derive(Debug, Clone)]
pub struct GravityForce {
    force: DVec3,
}

impl GravityForce {
    pub fn new(force: DVec3) -> Self {
        Self { force }
    }
}

impl Force for GravityForce {
    fn kind(&self) -> ForceKind {
        ForceKind::Gravity
    }

    fn force_at(&self, _point: usize) -> DVec3 {
        self.force
    }

    fn edit(&mut self, force: DVec3, point: Option<usize>) -> bool {
        if point.is_some() {
            return false;
        }
        self.force = force;
        true
    }
}

/// A force on a single point.
#[derive(Debug, Clone)]
pub struct VertexForce {
    force: DVec3,
    point: usize,
}

impl VertexForce {
    pub fn new(force: DVec3, point: usize) -> Self {
        Self { force, point }
    }

    pub fn point(&self) -> usize {
        self.point
    }
}

impl Force for VertexForce {
    fn kind(&self) -> ForceKind {
        ForceKind::Vertex
    }

    fn force_at(&self, point: usize) -> DVec3 {
        if point == self.point {
            self.force
        } else {
            DVec3::ZERO
        }
    }

    fn accumulate(&self, out: &mut [DVec3]) {
        if let Some(f) = out.get_mut(self.point) {
            *f += self.force;
        }
    }

    fn edit(&mut self, force: DVec3, point: Option<usize>) -> bool {
        self.force = force;
        if let Some(point) = point {
            self.point = point;
        }
        true
    }
}
