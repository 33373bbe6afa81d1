//! Best-fit shape constraints: line, plane, circle and sphere.
//!
//! The rows select the points relative to their centroid; the projection
//! fits the primitive to the centered cluster and snaps every point onto
//! it. Degenerate clusters fall back to the next weaker primitive (a
//! collinear circle becomes a plane fit, a flat sphere keeps the points).

use shapeup_math::fitting::{fit_circle, fit_sphere, principal_frame};
use shapeup_math::DVec3;

use super::{centered, mean_centered_rows, rms_distance, Constraint, ConstraintKind};
use crate::field::VectorField;

/// Which primitive a [`FittingConstraint`] fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitShape {
    Line,
    Plane,
    Circle,
    Sphere,
}

#[derive(Debug, Clone)]
pub struct FittingConstraint {
    shape: FitShape,
    indices: Vec<usize>,
    weight: f64,
}

impl FittingConstraint {
    pub fn new(shape: FitShape, indices: Vec<usize>, weight: f64) -> Self {
        Self {
            shape,
            indices,
            weight,
        }
    }

    pub fn shape(&self) -> FitShape {
        self.shape
    }

    /// Centered points snapped onto the best-fit primitive.
    fn fitted(&self, centered: &[DVec3]) -> Vec<DVec3> {
        match self.shape {
            FitShape::Line => {
                let dir = principal_frame(centered).line_direction();
                centered.iter().map(|c| dir * c.dot(dir)).collect()
            }
            FitShape::Plane => project_to_plane(centered, principal_frame(centered).plane_normal()),
            FitShape::Circle => {
                let frame = principal_frame(centered);
                let Some(circle) = fit_circle(centered, &frame) else {
                    return project_to_plane(centered, frame.plane_normal());
                };
                centered
                    .iter()
                    .map(|c| {
                        let rel = *c - circle.center;
                        let in_plane = rel - circle.normal * rel.dot(circle.normal);
                        let radial = in_plane.try_normalize().unwrap_or(frame.axes[0]);
                        circle.center + radial * circle.radius
                    })
                    .collect()
            }
            FitShape::Sphere => match fit_sphere(centered) {
                Some(sphere) => centered
                    .iter()
                    .map(|c| {
                        let radial = (*c - sphere.center).try_normalize().unwrap_or(DVec3::X);
                        sphere.center + radial * sphere.radius
                    })
                    .collect(),
                None => centered.to_vec(),
            },
        }
    }
}

fn project_to_plane(centered: &[DVec3], normal: DVec3) -> Vec<DVec3> {
    centered.iter().map(|c| *c - normal * c.dot(normal)).collect()
}

impl Constraint for FittingConstraint {
    fn kind(&self) -> ConstraintKind {
        match self.shape {
            FitShape::Line => ConstraintKind::Line,
            FitShape::Plane => ConstraintKind::Plane,
            FitShape::Circle => ConstraintKind::Circle,
            FitShape::Sphere => ConstraintKind::Sphere,
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
        out.copy_from_slice(&self.fitted(&centered));
    }

    fn error(&self, points: &VectorField) -> f64 {
        let centered = centered(points, &self.indices);
        rms_distance(&centered, &self.fitted(&centered))
    }
}
