//! Best-fit geometric primitives for point clusters.
//!
//! All fits take points already centered on their centroid and return
//! results relative to that centroid. Degenerate clusters (collinear
//! points for a circle, coplanar points for a sphere) return `None` so
//! the caller can fall back to a weaker projection.

use glam::{DMat3, DVec3};
use nalgebra::{Matrix3, Matrix4, SymmetricEigen, Vector3, Vector4};
use shapeup_types::constants::DEGENERATE_THRESHOLD;

use crate::decomposition::{svd3, to_nalgebra};

/// Mean of a point set. Returns zero for an empty slice.
pub fn centroid(points: &[DVec3]) -> DVec3 {
    if points.is_empty() {
        return DVec3::ZERO;
    }
    points.iter().copied().sum::<DVec3>() / points.len() as f64
}

/// Principal axes of a centered point cluster, largest variance first.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalFrame {
    /// Orthonormal axes sorted by decreasing variance.
    pub axes: [DVec3; 3],
    /// Sum of squared extents along each axis.
    pub variances: [f64; 3],
}

impl PrincipalFrame {
    /// Direction of the best-fit line.
    pub fn line_direction(&self) -> DVec3 {
        self.axes[0]
    }

    /// Normal of the best-fit plane.
    pub fn plane_normal(&self) -> DVec3 {
        self.axes[2]
    }
}

/// PCA of a centered point cluster via the covariance eigendecomposition.
pub fn principal_frame(centered: &[DVec3]) -> PrincipalFrame {
    let mut cov = DMat3::ZERO;
    for c in centered {
        cov += DMat3::from_cols(*c * c.x, *c * c.y, *c * c.z);
    }

    let eigen = SymmetricEigen::new(to_nalgebra(cov));
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let axis = |k: usize| {
        let col = eigen.eigenvectors.column(k);
        DVec3::new(col[0], col[1], col[2]).normalize_or(DVec3::X)
    };

    PrincipalFrame {
        axes: [axis(order[0]), axis(order[1]), axis(order[2])],
        variances: [
            eigen.eigenvalues[order[0]].max(0.0),
            eigen.eigenvalues[order[1]].max(0.0),
            eigen.eigenvalues[order[2]].max(0.0),
        ],
    }
}

/// A circle in 3D, center relative to the cluster centroid.
#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub center: DVec3,
    pub normal: DVec3,
    pub radius: f64,
}

/// Algebraic (Kåsa) circle fit in the best-fit plane of a centered cluster.
///
/// Solves min Σ (x² + y² + D·x + E·y + F)² in the plane's 2D frame.
pub fn fit_circle(centered: &[DVec3], frame: &PrincipalFrame) -> Option<Circle> {
    if centered.len() < 3 || frame.variances[1] <= DEGENERATE_THRESHOLD * frame.variances[0] {
        return None;
    }
    let (a0, a1) = (frame.axes[0], frame.axes[1]);

    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for c in centered {
        let x = c.dot(a0);
        let y = c.dot(a1);
        let row = Vector3::new(x, y, 1.0);
        ata += row * row.transpose();
        atb += row * -(x * x + y * y);
    }

    let sol = ata.lu().solve(&atb)?;
    let (cx, cy) = (-0.5 * sol[0], -0.5 * sol[1]);
    let r2 = cx * cx + cy * cy - sol[2];
    if !r2.is_finite() || r2 <= DEGENERATE_THRESHOLD {
        return None;
    }

    Some(Circle {
        center: a0 * cx + a1 * cy,
        normal: frame.plane_normal(),
        radius: r2.sqrt(),
    })
}

/// A sphere, center relative to the cluster centroid.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
}

/// Algebraic sphere fit: min Σ (|p|² + D·x + E·y + F·z + G)².
pub fn fit_sphere(centered: &[DVec3]) -> Option<Sphere> {
    if centered.len() < 4 {
        return None;
    }
    let frame = principal_frame(centered);
    if frame.variances[2] <= DEGENERATE_THRESHOLD * frame.variances[0] {
        return None;
    }

    let mut ata = Matrix4::<f64>::zeros();
    let mut atb = Vector4::<f64>::zeros();
    for c in centered {
        let row = Vector4::new(c.x, c.y, c.z, 1.0);
        ata += row * row.transpose();
        atb += row * -c.length_squared();
    }

    let sol = ata.lu().solve(&atb)?;
    let center = DVec3::new(-0.5 * sol[0], -0.5 * sol[1], -0.5 * sol[2]);
    let r2 = center.length_squared() - sol[3];
    if !r2.is_finite() || r2 <= DEGENERATE_THRESHOLD {
        return None;
    }

    Some(Sphere {
        center,
        radius: r2.sqrt(),
    })
}

/// Optimal rotation (and optionally uniform scale) aligning a centered
/// `source` shape to a centered `target` (Kabsch).
///
/// Returns `(R, s)` minimizing Σ ‖s·R·srcᵢ − tgtᵢ‖².
pub fn best_alignment(source: &[DVec3], target: &[DVec3], with_scale: bool) -> (DMat3, f64) {
    // H = Σ src · tgtᵀ
    let mut h = DMat3::ZERO;
    for (s, t) in source.iter().zip(target) {
        h += DMat3::from_cols(*s * t.x, *s * t.y, *s * t.z);
    }

    // H = U Σ Vᵀ with det(U Vᵀ) = +1, so V Uᵀ is a proper rotation
    let svd = svd3(h);
    let rotation = svd.v * svd.u.transpose();

    let scale = if with_scale {
        let denom: f64 = source.iter().map(|s| s.length_squared()).sum();
        if denom > DEGENERATE_THRESHOLD {
            let num: f64 = source
                .iter()
                .zip(target)
                .map(|(s, t)| t.dot(rotation * *s))
                .sum();
            (num / denom).max(0.0)
        } else {
            1.0
        }
    } else {
        1.0
    };

    (rotation, scale)
}
