//! 3×2 matrix type for triangle deformation gradients.
//!
//! Triangles are 2D elements embedded in 3D space, so the deformation
//! gradient F maps the 2D rest frame into world space and is 3×2.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// A 3×2 column-major matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat3x2 {
    /// First column (3 components).
    pub col0: DVec3,
    /// Second column (3 components).
    pub col1: DVec3,
}

impl Mat3x2 {
    /// Creates a new 3×2 matrix from two column vectors.
    #[inline]
    pub fn from_cols(col0: DVec3, col1: DVec3) -> Self {
        Self { col0, col1 }
    }

    /// The zero matrix.
    pub const ZERO: Self = Self {
        col0: DVec3::ZERO,
        col1: DVec3::ZERO,
    };

    /// Identity-like matrix (first two columns of 3×3 identity).
    pub const IDENTITY: Self = Self {
        col0: DVec3::X,
        col1: DVec3::Y,
    };

    /// Compute F^T * F (a 2×2 matrix), returned as [a, b; b, d].
    ///
    /// This is the right Cauchy-Green tensor C = F^T F,
    /// which measures strain independent of rotation.
    #[inline]
    pub fn ftf(&self) -> [f64; 4] {
        let a = self.col0.dot(self.col0);
        let b = self.col0.dot(self.col1);
        let d = self.col1.dot(self.col1);
        [a, b, b, d]
    }

    /// Multiply by a 2×2 matrix (column-major [a, b, c, d]):
    /// result = self * [[a, c], [b, d]]
    #[inline]
    pub fn mul_mat2(&self, m: [f64; 4]) -> Self {
        Self {
            col0: self.col0 * m[0] + self.col1 * m[1],
            col1: self.col0 * m[2] + self.col1 * m[3],
        }
    }

    /// Apply to a 2D vector: `F * v`.
    #[inline]
    pub fn mul_vec2(&self, v: DVec2) -> DVec3 {
        self.col0 * v.x + self.col1 * v.y
    }
}

impl std::ops::Mul<f64> for Mat3x2 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self {
            col0: self.col0 * rhs,
            col1: self.col1 * rhs,
        }
    }
}
