// src/exec/mod.rs

//! Test execution: the runner, body contexts and dependency reports.

pub mod context;
pub mod runner;

pub use context::{DependencyReport, TestContext};
pub use runner::Runner;
