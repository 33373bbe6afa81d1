//! Closeness: pulls one point toward a fixed target position.
//!
//! The only kind whose row does not sum to zero, so it is what anchors a
//! static system against rigid translation.

use shapeup_math::DVec3;

use super::{Constraint, ConstraintEdit, ConstraintKind, EditError};
use crate::field::VectorField;

#[derive(Debug, Clone)]
pub struct ClosenessConstraint {
    indices: [usize; 1],
    weight: f64,
    target: DVec3,
}

impl ClosenessConstraint {
    /// Targets the point's current position.
    pub fn new(index: usize, weight: f64, points: &VectorField) -> Self {
        Self {
            indices: [index],
            weight,
            target: points.get(index),
        }
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }
}

impl Constraint for ClosenessConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Closeness
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
        triplets.push((row_offset, self.indices[0], 1.0));
    }

    fn project(&self, _points: &VectorField, out: &mut [DVec3]) {
        out[0] = self.target;
    }

    fn error(&self, points: &VectorField) -> f64 {
        points.get(self.indices[0]).distance(self.target)
    }

    fn edit(&mut self, edit: &ConstraintEdit) -> Result<(), EditError> {
        match *edit {
            ConstraintEdit::Target(target) => {
                if !target.is_finite() {
                    return Err(EditError::Invalid(format!("target {target} is not finite")));
                }
                self.target = target;
                Ok(())
            }
            _ => Err(EditError::Unsupported),
        }
    }
}
