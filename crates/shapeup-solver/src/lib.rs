//! # shapeup-solver
//!
//! Constraint-based geometry optimization with a local/global solver.
//!
//! Points are relaxed toward the configuration that best satisfies a set of
//! weighted geometric constraints. Each iteration projects every constraint
//! onto its feasible set (local step, parallel across constraints) and then
//! solves one prefactored sparse SPD system for all points (global step).
//! In dynamic mode the same machinery drives a projective-dynamics time
//! integrator with masses, damping and external forces.
//!
//! ## Key Types
//!
//! - [`Solver`] — owns points, constraints, forces and the linear system
//! - [`VectorField`] — SoA point storage
//! - [`Constraint`] — trait implemented by every constraint kind
//! - [`Force`] — trait implemented by gravity and per-vertex forces
//! - [`LinearSystem`] — stacked selection operator and its Cholesky factor
//! - [`SolverConfig`] — parallelism and dynamic-mode defaults

pub mod config;
pub mod constraint;
pub mod field;
pub mod force;
pub mod solver;
pub mod system;

pub use config::SolverConfig;
pub use constraint::{Constraint, ConstraintEdit, ConstraintKind};
pub use field::VectorField;
pub use force::{Force, ForceKind, GravityForce, VertexForce};
pub use solver::{Masses, SolveReport, Solver, SolverMode};
pub use system::LinearSystem;
