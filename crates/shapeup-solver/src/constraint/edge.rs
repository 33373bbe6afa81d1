//! Edge strain: keeps the distance between two points within a range of
//! its rest length.

use shapeup_math::DVec3;
use shapeup_types::constants::DEGENERATE_THRESHOLD;

use super::{check_range, Constraint, ConstraintEdit, ConstraintKind, EditError};
use crate::field::VectorField;

#[derive(Debug, Clone)]
pub struct EdgeStrainConstraint {
    indices: [usize; 2],
    weight: f64,
    rest_length: f64,
    range_min: f64,
    range_max: f64,
}

impl EdgeStrainConstraint {
    /// Captures the current distance between the two points as rest length.
    pub fn new(indices: [usize; 2], weight: f64, points: &VectorField) -> Self {
        let rest_length = points.get(indices[0]).distance(points.get(indices[1]));
        Self {
            indices,
            weight,
            rest_length,
            range_min: 1.0,
            range_max: 1.0,
        }
    }

    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    pub fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }

    fn edge(&self, points: &VectorField) -> DVec3 {
        points.get(self.indices[1]) - points.get(self.indices[0])
    }
}

impl Constraint for EdgeStrainConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::EdgeStrain
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
        // The row does not depend on the rest length, which stays editable
        triplets.push((row_offset, self.indices[0], -1.0));
        triplets.push((row_offset, self.indices[1], 1.0));
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let edge = self.edge(points);
        let len = edge.length();
        out[0] = if len < DEGENERATE_THRESHOLD {
            edge
        } else {
            let target = len.clamp(
                self.range_min * self.rest_length,
                self.range_max * self.rest_length,
            );
            edge * (target / len)
        };
    }

    fn error(&self, points: &VectorField) -> f64 {
        let deviation = (self.edge(points).length() - self.rest_length).abs();
        if self.rest_length < DEGENERATE_THRESHOLD {
            deviation
        } else {
            deviation / self.rest_length
        }
    }

    fn edit(&mut self, edit: &ConstraintEdit) -> Result<(), EditError> {
        match *edit {
            ConstraintEdit::RestLength(length) => {
                if !length.is_finite() || length < 0.0 {
                    return Err(EditError::Invalid(format!(
                        "rest length {length} must be finite and non-negative"
                    )));
                }
                self.rest_length = length;
                Ok(())
            }
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
