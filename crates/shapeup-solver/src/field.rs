//! SoA point storage.
//!
//! Coordinates are stored channel by channel (`x`, `y`, `z`), matching the
//! three independent back-substitutions of the global step.

use shapeup_math::DVec3;
use shapeup_types::{ShapeError, ShapeResult};

/// An ordered set of 3D points in Structure-of-Arrays layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorField {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl VectorField {
    /// Creates `n` points at the origin.
    pub fn zeros(n: usize) -> Self {
        Self {
            x: vec![0.0; n],
            y: vec![0.0; n],
            z: vec![0.0; n],
        }
    }

    /// Builds a field from interleaved `[x0, y0, z0, x1, ...]` coordinates.
    pub fn from_flat(coords: &[f64]) -> ShapeResult<Self> {
        if coords.len() % 3 != 0 {
            return Err(ShapeError::Dimension {
                expected: coords.len() / 3 * 3 + 3,
                actual: coords.len(),
            });
        }
        let n = coords.len() / 3;
        let mut field = Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
        };
        for p in coords.chunks_exact(3) {
            field.x.push(p[0]);
            field.y.push(p[1]);
            field.z.push(p[2]);
        }
        Ok(field)
    }

    /// Builds a field from a slice of points.
    pub fn from_points(points: &[DVec3]) -> Self {
        Self {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            z: points.iter().map(|p| p.z).collect(),
        }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the field holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Position of point `i`.
    #[inline]
    pub fn get(&self, i: usize) -> DVec3 {
        DVec3::new(self.x[i], self.y[i], self.z[i])
    }

    /// Overwrites point `i`.
    #[inline]
    pub fn set(&mut self, i: usize, p: DVec3) {
        self.x[i] = p.x;
        self.y[i] = p.y;
        self.z[i] = p.z;
    }

    /// Positions of the given points, in order.
    pub fn gather(&self, indices: &[usize]) -> Vec<DVec3> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    /// Copies the coordinates out as interleaved triples.
    ///
    /// `out` must hold exactly `3 * len()` values.
    pub fn write_flat(&self, out: &mut [f64]) -> ShapeResult<()> {
        if out.len() != self.len() * 3 {
            return Err(ShapeError::Dimension {
                expected: self.len() * 3,
                actual: out.len(),
            });
        }
        for (i, p) in out.chunks_exact_mut(3).enumerate() {
            p[0] = self.x[i];
            p[1] = self.y[i];
            p[2] = self.z[i];
        }
        Ok(())
    }

    /// All points as a `Vec`.
    pub fn to_points(&self) -> Vec<DVec3> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x
            .iter()
            .chain(&self.y)
            .chain(&self.z)
            .all(|v| v.is_finite())
    }

    /// Relative change `‖self − previous‖ / ‖previous‖` (absolute change
    /// when `previous` is at the origin).
    pub fn relative_change(&self, previous: &VectorField) -> f64 {
        let mut diff_sq = 0.0;
        let mut norm_sq = 0.0;
        for i in 0..self.len() {
            let old = previous.get(i);
            diff_sq += (self.get(i) - old).length_squared();
            norm_sq += old.length_squared();
        }
        if norm_sq > 1e-12 {
            (diff_sq / norm_sq).sqrt()
        } else {
            diff_sq.sqrt()
        }
    }
}
