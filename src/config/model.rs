// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::FailurePolicy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// dependency_timeout_ms = 60000
/// on_dependency_failure = "skip"
///
/// [results]
/// file = ".testdag/results.json"
///
/// [discover]
/// patterns = ["**/*.spec.*", "**/*.test.*"]
/// exclude = ["**/node_modules/**"]
/// ```
///
/// All sections are optional and have usable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Execution policy from `[runner]`.
    #[serde(default)]
    pub runner: RunnerSection,

    /// Snapshot persistence from `[results]`.
    #[serde(default)]
    pub results: ResultsSection,

    /// Annotation scanning from `[discover]`.
    #[serde(default)]
    pub discover: DiscoverSection,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// How long a waiter gives a dependency before recording a timeout
    /// failure, in milliseconds.
    #[serde(default = "default_dependency_timeout_ms")]
    pub dependency_timeout_ms: u64,

    /// `"skip"` or `"fail"`.
    ///
    /// - `"skip"` (default): record the failure, hand dependents an empty
    ///   payload and keep going.
    /// - `"fail"`: abort the requesting chain with an error naming the
    ///   failed dependency.
    #[serde(default)]
    pub on_dependency_failure: FailurePolicy,
}

fn default_dependency_timeout_ms() -> u64 {
    60_000
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            dependency_timeout_ms: default_dependency_timeout_ms(),
            on_dependency_failure: FailurePolicy::default(),
        }
    }
}

/// `[results]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResultsSection {
    /// Path of the shared JSON snapshot, when results should survive the
    /// process or be shared across processes. `None` keeps results
    /// in-memory only.
    #[serde(default)]
    pub file: Option<String>,
}

/// `[discover]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverSection {
    /// Globs selecting the files the annotation scanner reads.
    #[serde(default = "default_discover_patterns")]
    pub patterns: Vec<String>,

    /// Globs excluding files from scanning.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_discover_patterns() -> Vec<String> {
    vec!["**/*.spec.*".to_string(), "**/*.test.*".to_string()]
}

impl Default for DiscoverSection {
    fn default() -> Self {
        Self {
            patterns: default_discover_patterns(),
            exclude: Vec::new(),
        }
    }
}

/// A configuration that has passed validation.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `config::validate`) or
/// [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub results: ResultsSection,
    pub discover: DiscoverSection,
}

impl ConfigFile {
    /// Internal constructor used after validation has succeeded.
    pub(crate) fn new_unchecked(
        runner: RunnerSection,
        results: ResultsSection,
        discover: DiscoverSection,
    ) -> Self {
        Self {
            runner,
            results,
            discover,
        }
    }

    /// The runner's view of this configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            dependency_timeout: Duration::from_millis(self.runner.dependency_timeout_ms),
            on_dependency_failure: self.runner.on_dependency_failure,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            runner: RunnerSection::default(),
            results: ResultsSection::default(),
            discover: DiscoverSection::default(),
        }
    }
}

/// Read-only inputs to the runner's scheduling behaviour.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wall-clock budget a waiter grants one dependency execution.
    pub dependency_timeout: Duration,
    pub on_dependency_failure: FailurePolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dependency_timeout: Duration::from_millis(default_dependency_timeout_ms()),
            on_dependency_failure: FailurePolicy::default(),
        }
    }
}

impl RunnerConfig {
    /// Convenience for tests and embedders that want a short timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.dependency_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_dependency_failure = policy;
        self
    }
}
