//! Matrix decompositions for strain-type projections.
//!
//! Provides the polar decomposition (F = R·S) of a 3×2 triangle
//! deformation gradient and a reflection-safe SVD of 3×3 tetrahedron
//! gradients. Both expose singular values so callers can clamp the
//! stretch into a range before rebuilding a target gradient.

use glam::{DMat3, DVec2, DVec3};
use nalgebra::Matrix3;
use shapeup_types::constants::DEGENERATE_THRESHOLD;

use crate::mat3x2::Mat3x2;

/// Result of a 3×2 polar decomposition: F = R · S
///
/// Carries the SVD factors `F = U · diag(σ) · Vᵀ`; R = U·Vᵀ and the
/// stretch S = V·diag(σ)·Vᵀ is rebuilt on demand by [`clamped`](Self::clamped).
#[derive(Debug, Clone, Copy)]
pub struct PolarDecomposition {
    /// Rotation part (3×2, orthonormal columns).
    pub rotation: Mat3x2,
    /// Singular values, largest first.
    pub singular_values: [f64; 2],
    /// Left singular vectors (world space).
    pub left_vectors: [DVec3; 2],
    /// Right singular vectors (rest frame).
    pub right_vectors: [DVec2; 2],
}

impl PolarDecomposition {
    /// Rebuild a gradient with the singular values clamped into `[min, max]`.
    ///
    /// With `min == max == 1` this is the rotation part alone.
    pub fn clamped(&self, min: f64, max: f64) -> Mat3x2 {
        let s0 = self.singular_values[0].clamp(min, max);
        let s1 = self.singular_values[1].clamp(min, max);
        let [u0, u1] = self.left_vectors;
        let [v0, v1] = self.right_vectors;
        Mat3x2::from_cols(
            u0 * (s0 * v0.x) + u1 * (s1 * v1.x),
            u0 * (s0 * v0.y) + u1 * (s1 * v1.y),
        )
    }

    /// Frobenius distance of the stretch tensor from identity: ‖S − I‖_F.
    pub fn stretch_deviation(&self) -> f64 {
        let [s0, s1] = self.singular_values;
        ((s0 - 1.0).powi(2) + (s1 - 1.0).powi(2)).sqrt()
    }
}

/// Compute the polar decomposition of a 3×2 deformation gradient.
///
/// 1. Compute C = F^T F (2×2 symmetric)
/// 2. Eigendecompose C to get V and σ = sqrt(λ)
/// 3. Left vectors uᵢ = F vᵢ / σᵢ
///
/// When the triangle is collapsed to a segment (σ₁ ≈ 0) the second left
/// vector is completed to an orthonormal pair, so R stays a rotation.
/// For a fully collapsed triangle (σ₀ ≈ 0) R falls back to the identity.
pub fn polar_decomposition_3x2(f: &Mat3x2) -> PolarDecomposition {
    let c = f.ftf(); // C = F^T F is a 2x2 symmetric matrix [a, b, b, d]
    let a = c[0];
    let b = c[1];
    let d = c[3];

    // Eigenvalues of 2x2 symmetric matrix: λ = (a+d)/2 ± sqrt(((a-d)/2)^2 + b^2)
    let half_trace = 0.5 * (a + d);
    let half_diff = 0.5 * (a - d);
    let disc = (half_diff * half_diff + b * b).sqrt();

    let lambda0 = (half_trace + disc).max(0.0);
    let lambda1 = (half_trace - disc).max(0.0);

    let s0 = lambda0.sqrt();
    let s1 = lambda1.sqrt();

    let eps = DEGENERATE_THRESHOLD;

    if s0 < eps {
        return PolarDecomposition {
            rotation: Mat3x2::IDENTITY,
            singular_values: [0.0, 0.0],
            left_vectors: [DVec3::X, DVec3::Y],
            right_vectors: [DVec2::X, DVec2::Y],
        };
    }

    // Eigenvectors of the 2x2 symmetric matrix
    let (v0, v1) = if b.abs() > eps {
        let v0 = DVec2::new(lambda0 - d, b).normalize();
        let v1 = DVec2::new(-v0.y, v0.x);
        (v0, v1)
    } else if a >= d {
        (DVec2::X, DVec2::Y)
    } else {
        (DVec2::Y, DVec2::X)
    };

    let u0 = f.mul_vec2(v0) / s0;
    let u1 = if s1 > eps {
        f.mul_vec2(v1) / s1
    } else {
        u0.any_orthonormal_vector()
    };

    // R = U * V^T
    let rotation = Mat3x2::from_cols(u0 * v0.x + u1 * v1.x, u0 * v0.y + u1 * v1.y);

    PolarDecomposition {
        rotation,
        singular_values: [s0, s1],
        left_vectors: [u0, u1],
        right_vectors: [v0, v1],
    }
}

/// Compute the deformation gradient F for a triangle.
///
/// F = Ds * Dm_inv, where Ds = [p1-p0, p2-p0] (3×2).
pub fn deformation_gradient(
    p0: DVec3,
    p1: DVec3,
    p2: DVec3,
    dm_inv: [f64; 4], // 2x2 column-major [a, b, c, d]
) -> Mat3x2 {
    let ds = Mat3x2::from_cols(p1 - p0, p2 - p0);
    ds.mul_mat2(dm_inv)
}

/// Compute the 2×2 inverse of a triangle's rest edge matrix.
///
/// Projects the 3D edge vectors into the triangle's own 2D frame
/// (u along e1, v in-plane perpendicular) and inverts.
/// Returns `None` for a degenerate rest triangle.
pub fn rest_frame_inverse(e1: DVec3, e2: DVec3) -> Option<[f64; 4]> {
    let len_e1 = e1.length();
    if len_e1 < DEGENERATE_THRESHOLD {
        return None;
    }

    let u = e1 / len_e1;
    let n = e1.cross(e2);
    if n.length() < DEGENERATE_THRESHOLD {
        return None;
    }
    let v = n.cross(u).normalize();

    // Dm = [[e1·u, e2·u], [e1·v, e2·v]]
    let dm00 = e1.dot(u);
    let dm10 = e1.dot(v);
    let dm01 = e2.dot(u);
    let dm11 = e2.dot(v);

    let det = dm00 * dm11 - dm01 * dm10;
    if det.abs() < DEGENERATE_THRESHOLD {
        return None;
    }

    let inv_det = 1.0 / det;
    Some([
        dm11 * inv_det,  // [0,0]
        -dm10 * inv_det, // [1,0]
        -dm01 * inv_det, // [0,1]
        dm00 * inv_det,  // [1,1]
    ])
}

/// Singular value decomposition of a 3×3 matrix, `M = U · diag(σ) · Vᵀ`,
/// with `det(U·Vᵀ) = +1`.
///
/// A reflection is absorbed by negating the smallest singular value
/// (and the matching column of U), so an inverted tetrahedron shows up
/// as a negative σ rather than as an improper rotation.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    pub u: DMat3,
    pub sigma: DVec3,
    pub v: DMat3,
}

impl Svd3 {
    /// Rebuild `U · diag(clamp(σ)) · Vᵀ`.
    pub fn clamped(&self, min: f64, max: f64) -> DMat3 {
        let s = DVec3::new(
            self.sigma.x.clamp(min, max),
            self.sigma.y.clamp(min, max),
            self.sigma.z.clamp(min, max),
        );
        self.u * DMat3::from_diagonal(s) * self.v.transpose()
    }

    /// The closest rotation `U · Vᵀ`.
    pub fn rotation(&self) -> DMat3 {
        self.u * self.v.transpose()
    }

    /// ‖Σ − I‖_F.
    pub fn stretch_deviation(&self) -> f64 {
        (self.sigma - DVec3::ONE).length()
    }
}

/// Reflection-safe SVD of a 3×3 matrix (see [`Svd3`]).
///
/// Falls back to the identity factorization if the decomposition
/// does not produce singular vectors.
pub fn svd3(m: DMat3) -> Svd3 {
    let svd = to_nalgebra(m).svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Svd3 {
            u: DMat3::IDENTITY,
            sigma: DVec3::ZERO,
            v: DMat3::IDENTITY,
        };
    };

    let mut u = from_nalgebra(&u);
    let v = from_nalgebra(&v_t.transpose());
    let s = &svd.singular_values;
    let mut sigma = DVec3::new(s[0], s[1], s[2]);

    if u.determinant() * v.determinant() < 0.0 {
        let k = smallest_axis(sigma);
        sigma[k] = -sigma[k];
        let col = -u.col(k);
        match k {
            0 => u.x_axis = col,
            1 => u.y_axis = col,
            _ => u.z_axis = col,
        }
    }

    Svd3 { u, sigma, v }
}

fn smallest_axis(v: DVec3) -> usize {
    if v.x <= v.y && v.x <= v.z {
        0
    } else if v.y <= v.z {
        1
    } else {
        2
    }
}

/// Convert a glam matrix to nalgebra (both column-major).
pub fn to_nalgebra(m: DMat3) -> Matrix3<f64> {
    Matrix3::from_column_slice(&m.to_cols_array())
}

/// Convert an nalgebra matrix to glam.
pub fn from_nalgebra(m: &Matrix3<f64>) -> DMat3 {
    DMat3::from_cols_slice(m.as_slice())
}
