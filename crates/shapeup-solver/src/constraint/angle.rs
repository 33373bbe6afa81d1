//! Angle: keeps the angle at an apex point within `[min, max]` radians.

use std::f64::consts::PI;

use glam::DQuat;
use shapeup_math::DVec3;
use shapeup_types::constants::DEGENERATE_THRESHOLD;

use super::{check_range, Constraint, ConstraintEdit, ConstraintKind, EditError};
use crate::field::VectorField;

/// Angle `∠(p0, p1, p2)` with apex `p1`.
///
/// The two rows select the arms `x0 − x1` and `x2 − x1`. Projection rotates
/// both arms by the same amount in opposite directions within their plane,
/// keeping their lengths.
#[derive(Debug, Clone)]
pub struct AngleConstraint {
    indices: [usize; 3],
    weight: f64,
    min_angle: f64,
    max_angle: f64,
}

impl AngleConstraint {
    pub fn new(indices: [usize; 3], min_angle: f64, max_angle: f64, weight: f64) -> Self {
        Self {
            indices,
            weight,
            min_angle,
            max_angle,
        }
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min_angle, self.max_angle)
    }

    fn arms(&self, points: &VectorField) -> (DVec3, DVec3) {
        let [i0, i1, i2] = self.indices;
        let apex = points.get(i1);
        (points.get(i0) - apex, points.get(i2) - apex)
    }

    /// Checks an angle range: finite and `0 ≤ min ≤ max ≤ π`.
    pub fn check_angles(min: f64, max: f64) -> Result<(), EditError> {
        check_range(min, max)?;
        if max > PI {
            return Err(EditError::Invalid(format!("max angle {max} exceeds π")));
        }
        Ok(())
    }
}

impl Constraint for AngleConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Angle
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
        2
    }

    fn add_to_system(&self, triplets: &mut Vec<(usize, usize, f64)>, row_offset: usize) {
        let [i0, i1, i2] = self.indices;
        triplets.push((row_offset, i0, 1.0));
        triplets.push((row_offset, i1, -1.0));
        triplets.push((row_offset + 1, i2, 1.0));
        triplets.push((row_offset + 1, i1, -1.0));
    }

    fn project(&self, points: &VectorField, out: &mut [DVec3]) {
        let (a, b) = self.arms(points);
        out[0] = a;
        out[1] = b;
        if a.length() < DEGENERATE_THRESHOLD || b.length() < DEGENERATE_THRESHOLD {
            return;
        }

        let angle = a.angle_between(b);
        let target = angle.clamp(self.min_angle, self.max_angle);
        if target == angle {
            return;
        }

        let axis = a
            .cross(b)
            .try_normalize()
            .unwrap_or_else(|| a.normalize().any_orthonormal_vector());
        let half = 0.5 * (target - angle);
        out[0] = DQuat::from_axis_angle(axis, -half) * a;
        out[1] = DQuat::from_axis_angle(axis, half) * b;
    }

    fn error(&self, points: &VectorField) -> f64 {
        let (a, b) = self.arms(points);
        if a.length() < DEGENERATE_THRESHOLD || b.length() < DEGENERATE_THRESHOLD {
            return 0.0;
        }
        let angle = a.angle_between(b);
        (angle - angle.clamp(self.min_angle, self.max_angle)).abs()
    }

    fn edit(&mut self, edit: &ConstraintEdit) -> Result<(), EditError> {
        match *edit {
            ConstraintEdit::Range { min, max } => {
                Self::check_angles(min, max)?;
                self.min_angle = min;
                self.max_angle = max;
                Ok(())
            }
            _ => Err(EditError::Unsupported),
        }
    }
}
