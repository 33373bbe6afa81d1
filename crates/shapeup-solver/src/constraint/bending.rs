//! Curvature constraints: discrete bending and uniform Laplacian smoothing.
//!
//! Both evaluate a single Laplacian-style row `L x = Σ wᵢ xᵢ` with weights
//! summing to zero. Bending keeps the magnitude of that vector (a discrete
//! mean curvature) near its rest value; the uniform Laplacian pulls the
//! vector itself to zero or back to its rest value.

use shapeup_math::DVec3;
use shapeup_types::constants::DEGENERATE_THRESHOLD;

use super::{check_range, Constraint, ConstraintEdit, ConstraintKind, EditError};
use crate::field::VectorField;

fn cotangent(a: DVec3, b: DVec3) -> Option<f64> {
    let sin = a.cross(b).length();
    (sin > DEGENERATE_THRESHOLD).then(|| a.dot(b) / sin)
}

/// Cotangent weights of the edge stencil `(p0, p1 | p2, p3)`, scaled by
/// the area of the two adjacent triangles.
fn edge_stencil(points: &[DVec3]) -> Option<Vec<f64>> {
    let [p0, p1, p2, p3] = [points[0], points[1], points[2], points[3]];
    let e0 = p1 - p0;
    let e1 = p2 - p0;
    let e2 = p3 - p0;
    let e3 = p2 - p1;
    let e4 = p3 - p1;

    let c01 = cotangent(e0, e1)?;
    let c02 = cotangent(e0, e2)?;
    let c03 = cotangent(-e0, e3)?;
    let c04 = cotangent(-e0, e4)?;

    let area = 0.5 * (e0.cross(e1).length() + e0.cross(e2).length());
    if area < DEGENERATE_THRESHOLD {
        return None;
    }
    let coef = -3.0 / (2.0 * area);

    Some(vec![
        coef * (c03 + c04),
        coef * (c01 + c02),
        coef * (-c01 - c03),
        coef * (-c02 - c04),
    ])
}

/// `[1, −1/k, …, −1/k]` for a center followed by its `k` ring vertices.
fn uniform_weights(count: usize) -> Vec<f64> {
    let ring = (count - 1) as f64;
    std::iter::once(1.0)
        .chain(std::iter::repeat(-1.0 / ring).take(count - 1))
        .collect()
}

fn laplacian(indices: &[usize], weights: &[f64], points: &VectorField) -> DVec3 {
    indices
        .iter()
        .zip(weights)
        .map(|(&i, &w)| points.get(i) * w)
        .sum()
}

fn push_row(
    indices: &[usize],
    weights: &[f64],
    triplets: &mut Vec<(usize, usize, f64)>,
    row: usize,
) {
    for (&i, &w) in indices.iter().zip(weights) {
        if w != 0.0 {
            triplets.push((row, i, w));
        }
    }
}

// ─── Bending ─────────────────────────────────────────────────

/// Keeps the discrete mean curvature magnitude within `[min, max]` times
/// its rest value.
///
/// Four points are read as an edge `(p0, p1)` with wings `(p2, p3)` and use
/// the cotangent stencil; any other count is a center vertex followed by
/// its ring and uses uniform weights.
#[derive(Debug, Clone)]
pub struct BendingConstraint {
    indices: Vec<usize>,
    weight: f64,
    /// Empty when the rest stencil is degenerate.
    weights: Vec<f64>,
    rest_norm: f64,
    range_min: f64,
    range_max: f64,
}

impl BendingConstraint {
    pub fn new(indices: Vec<usize>, weight: f64, points: &VectorField) -> Self {
        let rest = points.gather(&indices);
        let weights = if indices.len() == 4 {
            edge_stencil(&rest).unwrap_or_default()
        } else {
            uniform_weights(indices.len())
        };
        let rest_norm = if weights.is_empty() {
            0.0
        } else {
            laplacian(&indices, &weights, points).length()
        };
        Self {
            indices,
            weight,
            weights,
            rest_norm,
            range_min: 1.0,
            range_max: 1.0,
        }
    }

    /// Magnitude of the rest curvature vector.
    pub fn rest_norm(&self) -> f64 {
        self.rest_norm
    }
}

impl Constraint for BendingConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Bending
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn rows(&self) -> usize {
        1
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        push_row(&self.indices, &self.weights, triplets, row_offset);
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        if self.weights.is_empty() {
            out[0] = DVec3::ZERO;
            return;
        }
        let e = laplacian(&self.indices, &self.weights, points);
        let n = e.length();
        out[0] = if n > DEGENERATE_THRESHOLD {
            let target = n.clamp(
                self.range_min * self.rest_norm,
                self.range_max * self.rest_norm,
            );
            e * (target / n)
        } else {
            e
        };
    }

    fn error(&self, points: &VectorField) -> f64 {
        if self.weights.is_empty() {
            return 0.0;
        }
        (laplacian(&self.indices, &self.weights, points).length() - self.rest_norm).abs()
    }

    fn edit(&mut self, edit: &ConstraintEdit) -> Result<(), EditError> {
        match *edit {
            ConstraintEdit::Range { min, max } => {
                check_range(min, max)?;
                self.range_min = min;
                self.range_max = max;
                Ok(())
            }
            _ => Err(EditError::Unsupported),
        }
    }
}

// ─── Uniform Laplacian ───────────────────────────────────────

/// Pulls a vertex toward the mean of its ring.
///
/// With `displacement` set, the target is the rest Laplacian vector, so
/// the local shape detail is preserved instead of smoothed away.
#[derive(Debug, Clone)]
pub struct UniformLaplacianConstraint {
    indices: Vec<usize>,
    weight: f64,
    weights: Vec<f64>,
    target: DVec3,
    displacement: bool,
}

impl UniformLaplacianConstraint {
    pub fn new(indices: Vec<usize>, displacement: bool, weight: f64, points: &VectorField) -> Self {
        let weights = uniform_weights(indices.len());
        let target = if displacement {
            laplacian(&indices, &weights, points)
        } else {
            DVec3::ZERO
        };
        Self {
            indices,
            weight,
            weights,
            target,
            displacement,
        }
    }

    pub fn is_displacement(&self) -> bool {
        self.displacement
    }
}

impl Constraint for UniformLaplacianConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::UniformLaplacian
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn rows(&self) -> usize {
        1
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        push_row(&self.indices, &self.weights, triplets, row_offset);
    }

    fn project(&self, _points: &VectorField, out: &mut [DVec3]) {
        out[0] = self.target;
    }

    fn error(&self, points: &VectorField) -> f64 {
        (laplacian(&self.indices, &self.weights, points) - self.target).length()
    }
}
