//! Mesh topology queries.
//!
//! Builds adjacency data structures from the polygon face list,
//! enabling the neighbour queries needed to generate constraint index
//! sets (edge wings, vertex one-rings, boundary loops).

use std::collections::{BTreeMap, BTreeSet};

use crate::mesh::PolyMesh;

/// Precomputed topology information for a polygon mesh.
///
/// Built once per mesh. Edges are canonicalized as `(v_min, v_max)` and
/// stored in ascending order, so every query is deterministic.
#[derive(Debug, Clone)]
pub struct Topology {
    /// For each vertex, the list of faces that contain it.
    pub vertex_faces: Vec<Vec<u32>>,

    /// Unique edges as `(v_min, v_max)` pairs.
    pub edges: Vec<[u32; 2]>,

    /// For each edge, the adjacent faces.
    /// Boundary edges have exactly 1 adjacent face.
    pub edge_faces: Vec<Vec<u32>>,

    /// Interior edges that have exactly 2 adjacent faces.
    /// These are the edges where bending constraints are applied.
    pub interior_edges: Vec<InteriorEdge>,

    /// For each vertex, its edge-connected neighbours in ascending order.
    pub vertex_neighbours: Vec<Vec<u32>>,

    /// Closed boundary loops, each in face winding order.
    pub boundary_loops: Vec<Vec<u32>>,
}

/// An interior (non-boundary) edge with its two adjacent faces.
///
/// The wing of a face is the vertex that follows the edge in the face's
/// winding order; for triangles it is the vertex opposite the edge.
#[derive(Debug, Clone, Copy)]
pub struct InteriorEdge {
    /// Index of vertex A of the shared edge.
    pub v0: u32,
    /// Index of vertex B of the shared edge.
    pub v1: u32,
    /// Wing vertex of face A.
    pub wing_a: u32,
    /// Wing vertex of face B.
    pub wing_b: u32,
    /// Index of adjacent face A.
    pub face_a: u32,
    /// Index of adjacent face B.
    pub face_b: u32,
}

impl Topology {
    /// Build topology from a polygon mesh.
    ///
    /// The mesh is assumed valid (see [`PolyMesh::validate`]).
    pub fn build(mesh: &PolyMesh) -> Self {
        let vertex_count = mesh.vertex_count();

        let mut vertex_faces: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
        for (f, face) in mesh.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v as usize].push(f as u32);
            }
        }

        // Key: (min_vertex, max_vertex) to canonicalize edge direction
        let mut edge_map: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();
        for (f, face) in mesh.faces.iter().enumerate() {
            for (a, b) in face_edges(face) {
                let key = if a < b { (a, b) } else { (b, a) };
                edge_map.entry(key).or_default().push(f as u32);
            }
        }

        let mut edges = Vec::with_capacity(edge_map.len());
        let mut edge_faces = Vec::with_capacity(edge_map.len());
        let mut interior_edges = Vec::new();
        let mut neighbour_sets: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); vertex_count];
        let mut boundary_next: BTreeMap<u32, u32> = BTreeMap::new();

        for (&(v0, v1), faces) in &edge_map {
            edges.push([v0, v1]);
            edge_faces.push(faces.clone());
            neighbour_sets[v0 as usize].insert(v1);
            neighbour_sets[v1 as usize].insert(v0);

            match faces.as_slice() {
                &[face_a, face_b] => {
                    interior_edges.push(InteriorEdge {
                        v0,
                        v1,
                        wing_a: find_wing_vertex(&mesh.faces[face_a as usize], v0, v1),
                        wing_b: find_wing_vertex(&mesh.faces[face_b as usize], v0, v1),
                        face_a,
                        face_b,
                    });
                }
                &[face] => {
                    // Orient the boundary edge the way its face traverses it
                    let (from, to) = oriented(&mesh.faces[face as usize], v0, v1);
                    boundary_next.entry(from).or_insert(to);
                }
                _ => {}
            }
        }

        Self {
            vertex_faces,
            edges,
            edge_faces,
            interior_edges,
            vertex_neighbours: neighbour_sets
                .into_iter()
                .map(|s| s.into_iter().collect())
                .collect(),
            boundary_loops: trace_loops(boundary_next),
        }
    }

    /// Returns the 1-ring vertex neighbourhood of vertex `v`.
    pub fn one_ring(&self, v: u32) -> &[u32] {
        &self.vertex_neighbours[v as usize]
    }

    /// Returns the number of boundary edges (edges with only 1 adjacent face).
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_faces.iter().filter(|f| f.len() == 1).count()
    }

    /// Returns true if the mesh is closed (no boundary edges).
    pub fn is_closed(&self) -> bool {
        self.boundary_edge_count() == 0
    }

    /// Returns true if `v` lies on a boundary edge.
    pub fn is_boundary_vertex(&self, v: u32) -> bool {
        self.boundary_loops.iter().any(|l| l.contains(&v))
    }
}

/// Consecutive vertex pairs of a face loop, including the closing pair.
fn face_edges(face: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    let n = face.len();
    (0..n).map(move |k| (face[k], face[(k + 1) % n]))
}

/// Returns `(v0, v1)` ordered as the face loop traverses them.
fn oriented(face: &[u32], v0: u32, v1: u32) -> (u32, u32) {
    if face_edges(face).any(|e| e == (v0, v1)) {
        (v0, v1)
    } else {
        (v1, v0)
    }
}

/// Find the vertex that follows edge `{v0, v1}` in the face's winding order.
fn find_wing_vertex(face: &[u32], v0: u32, v1: u32) -> u32 {
    let n = face.len();
    let (_, to) = oriented(face, v0, v1);
    let pos = face.iter().position(|&v| v == to).unwrap_or(0);
    face[(pos + 1) % n]
}

/// Chains directed boundary edges into closed loops.
fn trace_loops(mut next: BTreeMap<u32, u32>) -> Vec<Vec<u32>> {
    let mut loops = Vec::new();
    loop {
        let Some(start) = next.keys().next().copied() else {
            break;
        };
        let mut chain = vec![start];
        let mut current = start;
        while let Some(to) = next.remove(&current) {
            if to == start {
                break;
            }
            chain.push(to);
            current = to;
        }
        loops.push(chain);
    }
    loops
}
