//! Index patterns that turn mesh connectivity into constraint index sets.
//!
//! Each pattern yields a list of index sets; every set becomes the point
//! list of one constraint (e.g. `EdgeVertices` feeds edge-strain
//! constraints, `FaceVertices` feeds plane or area constraints).

use serde::{Deserialize, Serialize};

use crate::mesh::PolyMesh;
use crate::topology::Topology;

/// A named way of extracting index sets from a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPattern {
    /// One set per face: the face's vertex loop.
    FaceVertices,
    /// One set per vertex with at least one neighbour: the vertex, then its ring.
    VertexNeighbours,
    /// One pair per unique edge.
    EdgeVertices,
    /// One singleton per vertex.
    VerticesEach,
    /// A single set holding every vertex.
    VerticesAll,
    /// One set per interior edge: the edge pair, then the two wing vertices.
    EdgeFaceVertices,
    /// One triple per face corner: `(previous, corner, next)`.
    FaceAngleVertices,
    /// One set per boundary loop.
    BoundaryVertices,
}

impl IndexPattern {
    /// All patterns, in declaration order.
    pub const ALL: [IndexPattern; 8] = [
        IndexPattern::FaceVertices,
        IndexPattern::VertexNeighbours,
        IndexPattern::EdgeVertices,
        IndexPattern::VerticesEach,
        IndexPattern::VerticesAll,
        IndexPattern::EdgeFaceVertices,
        IndexPattern::FaceAngleVertices,
        IndexPattern::BoundaryVertices,
    ];

    /// Stable snake_case name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            IndexPattern::FaceVertices => "face_vertices",
            IndexPattern::VertexNeighbours => "vertex_neighbours",
            IndexPattern::EdgeVertices => "edge_vertices",
            IndexPattern::VerticesEach => "vertices_each",
            IndexPattern::VerticesAll => "vertices_all",
            IndexPattern::EdgeFaceVertices => "edge_face_vertices",
            IndexPattern::FaceAngleVertices => "face_angle_vertices",
            IndexPattern::BoundaryVertices => "boundary_vertices",
        }
    }

    /// Generates the index sets for `mesh` using prebuilt topology.
    pub fn index_sets(self, mesh: &PolyMesh, topology: &Topology) -> Vec<Vec<u32>> {
        match self {
            IndexPattern::FaceVertices => mesh.faces.clone(),
            IndexPattern::VertexNeighbours => topology
                .vertex_neighbours
                .iter()
                .enumerate()
                .filter(|(_, ring)| !ring.is_empty())
                .map(|(v, ring)| {
                    let mut set = Vec::with_capacity(ring.len() + 1);
                    set.push(v as u32);
                    set.extend_from_slice(ring);
                    set
                })
                .collect(),
            IndexPattern::EdgeVertices => topology.edges.iter().map(|e| e.to_vec()).collect(),
            IndexPattern::VerticesEach => {
                (0..mesh.vertex_count() as u32).map(|v| vec![v]).collect()
            }
            IndexPattern::VerticesAll => {
                if mesh.vertex_count() == 0 {
                    Vec::new()
                } else {
                    vec![(0..mesh.vertex_count() as u32).collect()]
                }
            }
            IndexPattern::EdgeFaceVertices => topology
                .interior_edges
                .iter()
                .filter(|e| e.wing_a != e.wing_b)
                .map(|e| vec![e.v0, e.v1, e.wing_a, e.wing_b])
                .collect(),
            IndexPattern::FaceAngleVertices => mesh
                .faces
                .iter()
                .flat_map(|face| {
                    let n = face.len();
                    (0..n).map(move |k| vec![face[(k + n - 1) % n], face[k], face[(k + 1) % n]])
                })
                .collect(),
            IndexPattern::BoundaryVertices => topology.boundary_loops.clone(),
        }
    }

    /// Builds topology and generates the index sets in one call.
    pub fn generate(self, mesh: &PolyMesh) -> Vec<Vec<u32>> {
        self.index_sets(mesh, &Topology::build(mesh))
    }
}

impl std::fmt::Display for IndexPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
