//! # shapeup-types
//!
//! Shared identifiers, error types and numeric constants
//! for the shapeup constraint solver.
//!
//! This crate has zero domain logic — it defines the vocabulary
//! that all other shapeup crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{ShapeError, ShapeResult};
pub use ids::{ConstraintId, ForceId};
