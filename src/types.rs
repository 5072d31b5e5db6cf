// src/types.rs

//! Shared key, reference, status and policy types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between the file and title components of a rendered key.
pub const KEY_SEPARATOR: &str = " > ";

/// Arbitrary JSON payload produced by a test body.
pub type Payload = serde_json::Value;

/// Structured identity of a test case.
///
/// Rendered as `"<file> > <title>"` when the declaring file is known, or as
/// the bare title otherwise. Equality and hashing are structural, so two keys
/// compare equal exactly when their rendered forms do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestKey {
    /// Base name of the file that declares the test, when known.
    pub file: Option<String>,
    /// Human-readable title. Not guaranteed unique across files.
    pub title: String,
}

impl TestKey {
    /// Key with no file component.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            file: None,
            title: title.into(),
        }
    }

    /// Key qualified by the declaring file's base name.
    pub fn in_file(file: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            title: title.into(),
        }
    }

    /// Parse a rendered key, splitting on the first `" > "`.
    ///
    /// `"auth.spec.ts > login"` becomes a file-qualified key; anything
    /// without the separator is a bare title.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(KEY_SEPARATOR) {
            Some((file, title)) if !file.trim().is_empty() => {
                Self::in_file(file.trim(), title.trim())
            }
            _ => Self::titled(raw.trim()),
        }
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}{KEY_SEPARATOR}{}", self.title),
            None => write!(f, "{}", self.title),
        }
    }
}

/// A dependency declaration as written by a test author.
///
/// Keeps the raw text for reporting alongside the parsed components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    /// The reference exactly as declared.
    pub raw: String,
    /// Explicit file component, present only for cross-file references.
    pub file: Option<String>,
    /// Referenced test title.
    pub title: String,
}

impl DependencyRef {
    /// Parse a declared reference using the same rules as [`TestKey::parse`].
    pub fn parse(raw: &str) -> Self {
        let key = TestKey::parse(raw);
        Self {
            raw: raw.trim().to_string(),
            file: key.file,
            title: key.title,
        }
    }

    /// The reference as a structured key.
    pub fn key(&self) -> TestKey {
        TestKey {
            file: self.file.clone(),
            title: self.title.clone(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Lifecycle status of one cached test result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    /// Terminal statuses end an execution generation; only an explicit rerun
    /// moves a key out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Behaviour when a dependency of a test has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure, hand dependents an empty payload and keep going.
    #[default]
    Skip,
    /// Abort the requesting chain with an error naming the failed dependency.
    Fail,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "invalid on_dependency_failure: {other} (expected \"skip\" or \"fail\")"
            )),
        }
    }
}
