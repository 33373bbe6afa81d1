//! # shapeup-cli
//!
//! Scene files and the runner behind the `shapeup` binary.
//!
//! A scene is a TOML document describing geometry (explicit points, a
//! generated grid or a JSON mesh), constraint groups, anchors, forces and
//! solve settings. [`Scene::build`] turns it into a ready [`Solver`](shapeup_solver::Solver);
//! [`run`] initializes, solves and collects a [`SceneReport`].

pub mod runner;
pub mod scene;

pub use runner::{run, SceneReport};
pub use scene::{Scene, SceneMode};
