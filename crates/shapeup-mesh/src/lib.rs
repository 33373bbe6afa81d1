//! # shapeup-mesh
//!
//! Polygon mesh representation with Structure-of-Arrays (SoA) positions,
//! plus the topology queries and index patterns used to turn a mesh into
//! constraint index sets.
//!
//! ## Key Types
//!
//! - [`PolyMesh`] — positions in SoA buffers and polygonal faces (triangles, quads, n-gons).
//! - [`Topology`] — adjacency queries (edges, edge faces, vertex neighbours, boundary loops).
//! - [`IndexPattern`] — named index patterns (face vertices, edge wings, one-rings, ...).
//! - Procedural generators for flat grids.

pub mod generators;
pub mod indexer;
pub mod mesh;
pub mod topology;

pub use indexer::IndexPattern;
pub use mesh::PolyMesh;
pub use topology::Topology;
