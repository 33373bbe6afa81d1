//! Deformation-gradient constraints on triangles and tetrahedra.
//!
//! Each element stores the inverse of its rest edge matrix `Dm`, so the
//! rows of `S` evaluate the columns of `F = Ds · Dm⁻¹` directly. The
//! strain kinds clamp the singular values of `F`; the area and volume kinds
//! rescale `F` uniformly so that `det F` lands in range.

use shapeup_math::decomposition::{
    deformation_gradient, polar_decomposition_3x2, rest_frame_inverse, svd3,
};
use shapeup_math::mat3x2::Mat3x2;
use shapeup_math::{DMat3, DVec3};
use shapeup_types::constants::DEGENERATE_THRESHOLD;

use super::{check_range, Constraint, ConstraintEdit, ConstraintKind, EditError};
use crate::field::VectorField;

// ─── Shared element data ─────────────────────────────────────

/// Rest data of a triangle: `Dm⁻¹` in the triangle's own 2D frame.
#[derive(Debug, Clone)]
struct TriangleElement {
    indices: [usize; 3],
    /// Column-major `[a, b, c, d]`; `None` for a degenerate rest triangle.
    dm_inv: Option<[f64; 4]>,
}

impl TriangleElement {
    fn new(indices: [usize; 3], points: &VectorField) -> Self {
        let [p0, p1, p2] = indices.map(|i| points.get(i));
        Self {
            indices,
            dm_inv: rest_frame_inverse(p1 - p0, p2 - p0),
        }
    }

    /// Rows `F·e₀` and `F·e₁` as coefficients on `(x0, x1, x2)`.
    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        let Some([a, b, c, d]) = self.dm_inv else {
            return;
        };
        let [i0, i1, i2] = self.indices;
        // F col0 = a(x1 − x0) + b(x2 − x0); F col1 = c(x1 − x0) + d(x2 − x0)
        for (r, (g1, g2)) in [(a, b), (c, d)].into_iter().enumerate() {
            triplets.push((row_offset + r, i0, -(g1 + g2)));
            triplets.push((row_offset + r, i1, g1));
            triplets.push((row_offset + r, i2, g2));
        }
    }

    fn gradient(&self, points: &VectorField) -> Option<Mat3x2> {
        let dm_inv = self.dm_inv?;
        let [p0, p1, p2] = self.indices.map(|i| points.get(i));
        Some(deformation_gradient(p0, p1, p2, dm_inv))
    }
}

/// Rest data of a tetrahedron: `Dm⁻¹` of its three rest edges from `x0`.
#[derive(Debug, Clone)]
struct TetElement {
    indices: [usize; 4],
    /// `None` for a flat rest tetrahedron.
    dm_inv: Option<DMat3>,
}

impl TetElement {
    fn new(indices: [usize; 4], points: &VectorField) -> Self {
        let [p0, p1, p2, p3] = indices.map(|i| points.get(i));
        let dm = DMat3::from_cols(p1 - p0, p2 - p0, p3 - p0);
        let dm_inv = (dm.determinant().abs() > DEGENERATE_THRESHOLD).then(|| dm.inverse());
        Self { indices, dm_inv }
    }

    /// Rows `F·eₖ`: coefficient of `x_{j+1}` is `Dm⁻¹[j][k]`, `x0` balances.
    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        let Some(dm_inv) = self.dm_inv else {
            return;
        };
        for k in 0..3 {
            let col = dm_inv.col(k);
            let row = row_offset + k;
            triplets.push((row, self.indices[0], -(col.x + col.y + col.z)));
            triplets.push((row, self.indices[1], col.x));
            triplets.push((row, self.indices[2], col.y));
            triplets.push((row, self.indices[3], col.z));
        }
    }

    fn gradient(&self, points: &VectorField) -> Option<DMat3> {
        let dm_inv = self.dm_inv?;
        let [p0, p1, p2, p3] = self.indices.map(|i| points.get(i));
        Some(DMat3::from_cols(p1 - p0, p2 - p0, p3 - p0) * dm_inv)
    }
}

fn write_cols2(f: Mat3x2, out: &mut [DVec3]) {
    out[0] = f.col0;
    out[1] = f.col1;
}

fn write_cols3(f: DMat3, out: &mut [DVec3]) {
    out[0] = f.x_axis;
    out[1] = f.y_axis;
    out[2] = f.z_axis;
}

/// Shared weight/range bookkeeping for the four element kinds.
macro_rules! element_common {
    () => {
        fn indices(&self) -> &[usize] {
            &self.element.indices
        }

        fn weight(&self) -> f64 {
            self.weight
        }

        fn set_weight(&mut self, weight: f64) {
            self.weight = weight;
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
    };
}

// ─── Triangle strain ─────────────────────────────────────────

/// Limits the principal stretches of a triangle to `[min, max]`.
#[derive(Debug, Clone)]
pub struct TriangleStrainConstraint {
    element: TriangleElement,
    weight: f64,
    range_min: f64,
    range_max: f64,
}

impl TriangleStrainConstraint {
    pub fn new(indices: [usize; 3], weight: f64, points: &VectorField) -> Self {
        Self {
            element: TriangleElement::new(indices, points),
            weight,
            range_min: 1.0,
            range_max: 1.0,
        }
    }
}

impl Constraint for TriangleStrainConstraint {
    element_common!();

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::TriangleStrain
    }

    fn rows(&self) -> usize {
        2
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        self.element.add_to_system(triplets, row_offset);
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let target = match self.element.gradient(points) {
            Some(f) => polar_decomposition_3x2(&f).clamped(self.range_min, self.range_max),
            None => Mat3x2::ZERO,
        };
        write_cols2(target, out);
    }

    fn error(&self, points: &VectorField) -> f64 {
        self.element
            .gradient(points)
            .map_or(0.0, |f| polar_decomposition_3x2(&f).stretch_deviation())
    }
}

// ─── Area ────────────────────────────────────────────────────

/// Keeps a triangle's area ratio `A / A₀ = det F` within `[min, max]`.
#[derive(Debug, Clone)]
pub struct AreaConstraint {
    element: TriangleElement,
    weight: f64,
    range_min: f64,
    range_max: f64,
}

impl AreaConstraint {
    pub fn new(indices: [usize; 3], weight: f64, points: &VectorField) -> Self {
        Self {
            element: TriangleElement::new(indices, points),
            weight,
            range_min: 1.0,
            range_max: 1.0,
        }
    }
}

impl Constraint for AreaConstraint {
    element_common!();

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Area
    }

    fn rows(&self) -> usize {
        2
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        self.element.add_to_system(triplets, row_offset);
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let Some(f) = self.element.gradient(points) else {
            write_cols2(Mat3x2::ZERO, out);
            return;
        };
        let polar = polar_decomposition_3x2(&f);
        let [s0, s1] = polar.singular_values;
        let ratio = s0 * s1;
        let target_ratio = ratio.clamp(self.range_min, self.range_max);

        let target = if ratio > DEGENERATE_THRESHOLD {
            f * (target_ratio / ratio).sqrt()
        } else {
            polar.rotation * target_ratio.sqrt()
        };
        write_cols2(target, out);
    }

    fn error(&self, points: &VectorField) -> f64 {
        self.element.gradient(points).map_or(0.0, |f| {
            let [s0, s1] = polar_decomposition_3x2(&f).singular_values;
            (s0 * s1 - 1.0).abs()
        })
    }
}

// ─── Tetrahedron strain ──────────────────────────────────────

/// Limits the principal stretches of a tetrahedron to `[min, max]`.
///
/// Inverted elements carry a negative smallest singular value, which the
/// clamp pushes back to `min`.
#[derive(Debug, Clone)]
pub struct TetStrainConstraint {
    element: TetElement,
    weight: f64,
    range_min: f64,
    range_max: f64,
}

impl TetStrainConstraint {
    pub fn new(indices: [usize; 4], weight: f64, points: &VectorField) -> Self {
        Self {
            element: TetElement::new(indices, points),
            weight,
            range_min: 1.0,
            range_max: 1.0,
        }
    }
}

impl Constraint for TetStrainConstraint {
    element_common!();

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::TetrahedronStrain
    }

    fn rows(&self) -> usize {
        3
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        self.element.add_to_system(triplets, row_offset);
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let target = match self.element.gradient(points) {
            Some(f) => svd3(f).clamped(self.range_min, self.range_max),
            None => DMat3::ZERO,
        };
        write_cols3(target, out);
    }

    fn error(&self, points: &VectorField) -> f64 {
        self.element
            .gradient(points)
            .map_or(0.0, |f| svd3(f).stretch_deviation())
    }
}

// ─── Volume ──────────────────────────────────────────────────

/// Keeps a tetrahedron's volume ratio `V / V₀ = det F` within `[min, max]`.
#[derive(Debug, Clone)]
pub struct VolumeConstraint {
    element: TetElement,
    weight: f64,
    range_min: f64,
    range_max: f64,
}

impl VolumeConstraint {
    pub fn new(indices: [usize; 4], weight: f64, points: &VectorField) -> Self {
        Self {
            element: TetElement::new(indices, points),
            weight,
            range_min: 1.0,
            range_max: 1.0,
        }
    }
}

impl Constraint for VolumeConstraint {
    element_common!();

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Volume
    }

    fn rows(&self) -> usize {
        3
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        self.element.add_to_system(triplets, row_offset);
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let Some(f) = self.element.gradient(points) else {
            write_cols3(DMat3::ZERO, out);
            return;
        };
        let det = f.determinant();
        let target_ratio = det.clamp(self.range_min, self.range_max);

        let target = if det > DEGENERATE_THRESHOLD {
            f * (target_ratio / det).cbrt()
        } else {
            // Inverted or flat: restart from the closest rotation
            svd3(f).rotation() * target_ratio.cbrt()
        };
        write_cols3(target, out);
    }

    fn error(&self, points: &VectorField) -> f64 {
        self.element
            .gradient(points)
            .map_or(0.0, |f| (f.determinant() - 1.0).abs())
    }
}
