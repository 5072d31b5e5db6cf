// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::TestKey;

#[derive(Error, Debug)]
pub enum TestdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Test not found: {0}")]
    TestNotFound(String),

    #[error("Cycle detected in dependency graph: {}", format_cycle(path))]
    Cycle { path: Vec<TestKey> },

    #[error("Unresolved dependencies: {}", .0.join(", "))]
    UnresolvedDependencies(Vec<String>),

    #[error("Dependency '{dependency}' failed: {reason}")]
    DependencyFailed { dependency: String, reason: String },

    #[error("Test '{key}' failed: {reason}")]
    ExecutionFailed { key: TestKey, reason: String },

    #[error("Test '{key}' timed out after {timeout_ms} ms")]
    Timeout { key: TestKey, timeout_ms: u64 },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Renders a cycle path as `a -> b -> a`.
fn format_cycle(path: &[TestKey]) -> String {
    path.iter()
        .map(TestKey::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, TestdagError>;
