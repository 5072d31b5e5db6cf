// src/dag/mod.rs

//! Dependency graph construction, validation and ordering.

pub mod graph;
pub mod order;

pub use graph::DependencyGraph;
