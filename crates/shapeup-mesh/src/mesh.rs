//! Core polygon mesh type with SoA (Structure of Arrays) layout.
//!
//! The SoA layout stores each coordinate channel contiguously:
//! - `pos_x: [x0, x1, x2, ...]`
//! - `pos_y: [y0, y1, y2, ...]`
//! - `pos_z: [z0, z1, z2, ...]`

use serde::{Deserialize, Serialize};
use shapeup_math::DVec3;
use shapeup_types::{ShapeError, ShapeResult};

/// A polygon mesh stored in Structure-of-Arrays layout.
///
/// Faces are vertex loops of any length ≥ 3, so triangle and quad
/// meshes (and mixtures) share one type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolyMesh {
    /// X coordinates of all vertices.
    pub pos_x: Vec<f64>,
    /// Y coordinates of all vertices.
    pub pos_y: Vec<f64>,
    /// Z coordinates of all vertices.
    pub pos_z: Vec<f64>,
    /// Faces as vertex index loops (counter-clockwise).
    pub faces: Vec<Vec<u32>>,
}

impl PolyMesh {
    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns the number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns the position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> DVec3 {
        DVec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, p: DVec3) -> u32 {
        self.pos_x.push(p.x);
        self.pos_y.push(p.y);
        self.pos_z.push(p.z);
        (self.pos_x.len() - 1) as u32
    }

    /// Creates an empty mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_capacity: usize, face_capacity: usize) -> Self {
        Self {
            pos_x: Vec::with_capacity(vertex_capacity),
            pos_y: Vec::with_capacity(vertex_capacity),
            pos_z: Vec::with_capacity(vertex_capacity),
            faces: Vec::with_capacity(face_capacity),
        }
    }

    /// Positions as interleaved `[x0, y0, z0, x1, ...]`, the layout the
    /// solver's point setter expects.
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.vertex_count() * 3);
        for i in 0..self.vertex_count() {
            out.extend_from_slice(&[self.pos_x[i], self.pos_y[i], self.pos_z[i]]);
        }
        out
    }

    /// Constructs a mesh from interleaved position data and faces.
    pub fn from_interleaved(positions: &[f64], faces: Vec<Vec<u32>>) -> ShapeResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(ShapeError::InvalidMesh(
                "Interleaved positions length not divisible by 3".into(),
            ));
        }

        let n = positions.len() / 3;
        let mut mesh = Self::with_capacity(n, faces.len());
        for p in positions.chunks_exact(3) {
            mesh.pos_x.push(p[0]);
            mesh.pos_y.push(p[1]);
            mesh.pos_z.push(p[2]);
        }
        mesh.faces = faces;

        mesh.validate()?;
        Ok(mesh)
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - All SoA arrays have the same length
    /// - Faces have at least three vertices, all within bounds
    /// - No face repeats a vertex
    pub fn validate(&self) -> ShapeResult<()> {
        let n = self.pos_x.len();

        if self.pos_y.len() != n || self.pos_z.len() != n {
            return Err(ShapeError::InvalidMesh(
                "Position arrays have inconsistent lengths".into(),
            ));
        }

        for (f, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(ShapeError::InvalidMesh(format!(
                    "Face {} has only {} vertices",
                    f,
                    face.len()
                )));
            }
            for &idx in face {
                if idx as usize >= n {
                    return Err(ShapeError::InvalidMesh(format!(
                        "Face {} references vertex {} (vertex count: {})",
                        f, idx, n
                    )));
                }
            }
            for (k, a) in face.iter().enumerate() {
                if face[k + 1..].contains(a) {
                    return Err(ShapeError::InvalidMesh(format!(
                        "Face {} has repeated vertex index {}",
                        f, a
                    )));
                }
            }
        }

        Ok(())
    }

    /// Index of the vertex closest to `point`, if the mesh has any.
    ///
    /// Used to pick anchor vertices by location.
    pub fn closest_vertex(&self, point: DVec3) -> Option<u32> {
        (0..self.vertex_count())
            .map(|i| (i, self.position(i).distance_squared(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i as u32)
    }
}
