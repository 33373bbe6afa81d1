//! # shapeup-math
//!
//! Linear algebra primitives for the shapeup constraint solver.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`DVec3`, `DMat3`, etc.)
//! - 3×2 matrix type for triangle deformation gradients
//! - Polar decomposition and 3×3 SVD (reflection-safe) for strain projections
//! - Best-fit primitives: line/plane frames, circle, sphere, rigid alignment
//! - Sparse matrix representation (CSR) and Cholesky solver interface

pub mod decomposition;
pub mod faer_solver;
pub mod fitting;
pub mod mat3x2;
pub mod sparse;

// Re-export glam types as the canonical math types for shapeup.
pub use glam::{DMat3, DVec2, DVec3};
