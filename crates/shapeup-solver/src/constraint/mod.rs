//! The constraint family.
//!
//! Every constraint owns an ordered list of point indices and a weight, and
//! contributes `rows()` rows to the stacked selection operator `S`. The
//! local step asks each constraint to [`project`](Constraint::project) the
//! current geometry onto its feasible set, writing one 3D target per row;
//! the global step then minimizes `Σ w ‖S x − p‖²`.
//!
//! Apart from Closeness, every row's coefficients sum to zero, so the rows
//! are blind to rigid translation and only anchors pin the system down.

mod angle;
mod bending;
mod closeness;
mod edge;
mod fitting;
mod shape;
mod strain;

use std::fmt;

use serde::{Deserialize, Serialize};
use shapeup_math::DVec3;

use crate::field::VectorField;

pub use angle::AngleConstraint;
pub use bending::{BendingConstraint, UniformLaplacianConstraint};
pub use closeness::ClosenessConstraint;
pub use edge::EdgeStrainConstraint;
pub use fitting::{FitShape, FittingConstraint};
pub use shape::ShapeConstraint;
pub use strain::{AreaConstraint, TetStrainConstraint, TriangleStrainConstraint, VolumeConstraint};

/// The closed set of constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    EdgeStrain,
    TriangleStrain,
    TetrahedronStrain,
    Area,
    Volume,
    Bending,
    Closeness,
    Line,
    Plane,
    Circle,
    Sphere,
    UniformLaplacian,
    Angle,
    Rigid,
    Similarity,
}

/// Number of points a constraint kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    /// Returns true if `n` points are acceptable.
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "exactly {k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

impl ConstraintKind {
    /// Point count accepted at registration.
    pub fn arity(self) -> Arity {
        match self {
            ConstraintKind::EdgeStrain => Arity::Exactly(2),
            ConstraintKind::TriangleStrain | ConstraintKind::Area => Arity::Exactly(3),
            ConstraintKind::TetrahedronStrain | ConstraintKind::Volume => Arity::Exactly(4),
            ConstraintKind::Bending => Arity::AtLeast(3),
            ConstraintKind::Closeness => Arity::Exactly(1),
            ConstraintKind::Line => Arity::AtLeast(2),
            ConstraintKind::Plane | ConstraintKind::Circle => Arity::AtLeast(3),
            ConstraintKind::Sphere => Arity::AtLeast(4),
            ConstraintKind::UniformLaplacian => Arity::AtLeast(2),
            ConstraintKind::Angle => Arity::Exactly(3),
            ConstraintKind::Rigid | ConstraintKind::Similarity => Arity::AtLeast(2),
        }
    }

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            ConstraintKind::EdgeStrain => "edge_strain",
            ConstraintKind::TriangleStrain => "triangle_strain",
            ConstraintKind::TetrahedronStrain => "tetrahedron_strain",
            ConstraintKind::Area => "area",
            ConstraintKind::Volume => "volume",
            ConstraintKind::Bending => "bending",
            ConstraintKind::Closeness => "closeness",
            ConstraintKind::Line => "line",
            ConstraintKind::Plane => "plane",
            ConstraintKind::Circle => "circle",
            ConstraintKind::Sphere => "sphere",
            ConstraintKind::UniformLaplacian => "uniform_laplacian",
            ConstraintKind::Angle => "angle",
            ConstraintKind::Rigid => "rigid",
            ConstraintKind::Similarity => "similarity",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter edit applied to a registered constraint.
///
/// Edits change projection targets only; they never touch the matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintEdit {
    /// New rest length (edge strain).
    RestLength(f64),
    /// New target position (closeness).
    Target(DVec3),
    /// New admissible range (strain, area, volume, bending, angle).
    Range { min: f64, max: f64 },
    /// Candidate shapes to align to (rigid, similarity).
    Shapes(Vec<Vec<DVec3>>),
}

impl ConstraintEdit {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintEdit::RestLength(_) => "rest_length",
            ConstraintEdit::Target(_) => "target",
            ConstraintEdit::Range { .. } => "range",
            ConstraintEdit::Shapes(_) => "shapes",
        }
    }
}

/// Why a constraint refused an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// The constraint kind has no such parameter.
    Unsupported,
    /// The value is out of the parameter's domain.
    Invalid(String),
}

/// Common interface of all constraint kinds.
pub trait Constraint: Send + Sync + fmt::Debug {
    /// The constraint's kind.
    fn kind(&self) -> ConstraintKind;

    /// Point indices, in registration order.
    fn indices(&self) -> &[usize];

    /// Current weight.
    fn weight(&self) -> f64;

    /// Replaces the weight. Takes effect at the next assembly.
    fn set_weight(&mut self, weight: f64);

    /// Number of rows contributed to `S`.
    fn rows(&self) -> usize;

    /// Appends this constraint's `(row, point, coefficient)` entries,
    /// with rows numbered from `row_offset`.
    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize);

    /// Writes one target per row into `out` (length `rows()`).
    fn project(&self, points: &VectorField, out: &mut [DVec3]);

    /// Current violation, in the kind's own measure.
    fn error(&self, points: &VectorField) -> f64;

    /// Applies a parameter edit.
    fn edit(&mut self, edit: &ConstraintEdit) -> Result<(), EditError> {
        let _ = edit;
        Err(EditError::Unsupported)
    }
}

/// Evaluates `S_c x` for one constraint, one 3D value per row.
pub fn apply_rows(constraint: &dyn Constraint, points: &VectorField) -> Vec<DVec3> {
    let mut triplets = Vec::new();
    constraint.add_to_system(&mut triplets, 0);
    let mut rows = vec![DVec3::ZERO; constraint.rows()];
    for (r, c, v) in triplets {
        rows[r] += points.get(c) * v;
    }
    rows
}

/// Weighted energy `w ‖S_c x − P_c(x)‖²` of one constraint.
pub fn energy(constraint: &dyn Constraint, points: &VectorField) -> f64 {
    let applied = apply_rows(constraint, points);
    let mut projected = vec![DVec3::ZERO; constraint.rows()];
    constraint.project(points, &mut projected);
    let sum: f64 = applied
        .iter()
        .zip(&projected)
        .map(|(a, p)| (*a - *p).length_squared())
        .sum();
    constraint.weight() * sum
}

/// Validates a `[min, max]` range: finite, non-negative, ordered.
pub(crate) fn check_range(min: f64, max: f64) -> Result<(), EditError> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
        return Err(EditError::Invalid(format!(
            "range [{min}, {max}] must be finite with 0 <= min <= max"
        )));
    }
    Ok(())
}

/// Entries of one mean-centered row block: row `r` selects
/// `x_r − mean(x)` over `indices`.
pub(crate) fn mean_centered_rows(
    indices: &[usize],
    triplets: &mut Vec<(usize, usize, f64)>,
    row_offset: usize,
) {
    let n = indices.len();
    let inv_n = 1.0 / n as f64;
    for r in 0..n {
        for (j, &col) in indices.iter().enumerate() {
            let delta = if r == j { 1.0 } else { 0.0 };
            triplets.push((row_offset + r, col, delta - inv_n));
        }
    }
}

/// Points of `indices`, centered on their centroid.
pub(crate) fn centered(points: &VectorField, indices: &[usize]) -> Vec<DVec3> {
    let gathered = points.gather(indices);
    let c = shapeup_math::fitting::centroid(&gathered);
    gathered.into_iter().map(|p| p - c).collect()
}

/// Root-mean-square distance between two equally long point lists.
pub(crate) fn rms_distance(a: &[DVec3], b: &[DVec3]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a.iter().zip(b).map(|(p, q)| p.distance_squared(*q)).sum();
    (sum / a.len() as f64).sqrt()
}
