//! Shape-matching constraints: rigid and similarity.
//!
//! The point set is aligned (rotation, plus uniform scale for similarity)
//! to each candidate shape; the best-aligned candidate is the projection.
//! Without explicit candidates the rest configuration is the only shape.

use shapeup_math::fitting::{best_alignment, centroid};
use shapeup_math::DVec3;

use super::{
    centered, mean_centered_rows, rms_distance, Constraint, ConstraintEdit, ConstraintKind,
    EditError,
};
use crate::field::VectorField;

#[derive(Debug, Clone)]
pub struct ShapeConstraint {
    indices: Vec<usize>,
    weight: f64,
    /// Candidate shapes, each centered on its centroid.
    shapes: Vec<Vec<DVec3>>,
    with_scale: bool,
}

impl ShapeConstraint {
    /// Rotation-only matching to the current configuration.
    pub fn rigid(indices: Vec<usize>, weight: f64, points: &VectorField) -> Self {
        Self::new(indices, weight, points, false)
    }

    /// Rotation and uniform-scale matching to the current configuration.
    pub fn similarity(indices: Vec<usize>, weight: f64, points: &VectorField) -> Self {
        Self::new(indices, weight, points, true)
    }

    fn new(indices: Vec<usize>, weight: f64, points: &VectorField, with_scale: bool) -> Self {
        let rest = centered(points, &indices);
        Self {
            indices,
            weight,
            shapes: vec![rest],
            with_scale,
        }
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Best-aligned candidate for the centered cluster.
    fn best_fit(&self, centered: &[DVec3]) -> Vec<DVec3> {
        let mut best: Option<(f64, Vec<DVec3>)> = None;
        for shape in &self.shapes {
            let (rotation, scale) = best_alignment(shape, centered, self.with_scale);
            let aligned: Vec<DVec3> = shape.iter().map(|s| rotation * *s * scale).collect();
            let residual = rms_distance(&aligned, centered);
            if best.as_ref().map_or(true, |(r, _)| residual < *r) {
                best = Some((residual, aligned));
            }
        }
        best.map_or_else(|| centered.to_vec(), |(_, aligned)| aligned)
    }
}

impl Constraint for ShapeConstraint {
    fn kind(&self) -> ConstraintKind {
        if self.with_scale {
            ConstraintKind::Similarity
        } else {
            ConstraintKind::Rigid
        }
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
        self.indices.len()
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        mean_centered_rows(&self.indices, triplets, row_offset);
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let centered = centered(points, &self.indices);
        out.copy_from_slice(&self.best_fit(&centered));
    }

    fn error(&self, points: &VectorField) -> f64 {
        let centered = centered(points, &self.indices);
        rms_distance(&self.best_fit(&centered), &centered)
    }

    fn edit(&mut self, edit: &ConstraintEdit) -> Result<(), EditError> {
        let ConstraintEdit::Shapes(shapes) = edit else {
            return Err(EditError::Unsupported);
        };
        if shapes.is_empty() {
            return Err(EditError::Invalid("at least one shape is required".into()));
        }
        let n = self.indices.len();
        if let Some(bad) = shapes.iter().find(|s| s.len() != n) {
            return Err(EditError::Invalid(format!(
                "shape has {} points, constraint has {n}",
                bad.len()
            )));
        }
        if shapes.iter().flatten().any(|p| !p.is_finite()) {
            return Err(EditError::Invalid("shape coordinates must be finite".into()));
        }
        self.shapes = shapes
            .iter()
            .map(|shape| {
                let c = centroid(shape);
                shape.iter().map(|p| *p - c).collect()
            })
            .collect();
        Ok(())
    }
}
