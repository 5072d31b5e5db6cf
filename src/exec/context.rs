// src/exec/context.rs

//! Read-only views handed to test bodies, and dependency reports handed
//! back to the host.

use std::fmt;
use std::sync::Arc;

use crate::cache::{ResultCache, ResultRecord};
use crate::key;
use crate::types::{DependencyRef, Payload, TestKey, TestStatus};

/// What a test body sees while it runs: resolved lookups against the result
/// cache, scoped to the declaring file.
#[derive(Clone)]
pub struct TestContext {
    cache: Arc<ResultCache>,
    context_file: Option<String>,
}

impl TestContext {
    pub(crate) fn new(cache: Arc<ResultCache>, context_file: Option<String>) -> Self {
        Self {
            cache,
            context_file,
        }
    }

    /// Payload of a passed dependency, resolved with the same candidate-key
    /// and fuzzy rules the runner uses. `None` when the dependency is
    /// unknown or did not pass.
    pub fn dependency(&self, reference: &str) -> Option<Payload> {
        let reference = DependencyRef::parse(reference);
        let (_, record) =
            key::find_record(&self.cache, &reference, self.context_file.as_deref())?;
        record.passed_payload().cloned()
    }

    /// Status of a dependency; [`TestStatus::Pending`] when nothing is
    /// cached for it yet.
    pub fn dependency_status(&self, reference: &str) -> TestStatus {
        let reference = DependencyRef::parse(reference);
        key::find_record(&self.cache, &reference, self.context_file.as_deref())
            .map(|(_, record)| record.status)
            .unwrap_or(TestStatus::Pending)
    }

    /// Full record lookup, with the key it matched under. For diagnostics.
    pub fn dependency_record(&self, reference: &str) -> Option<(TestKey, ResultRecord)> {
        let reference = DependencyRef::parse(reference);
        key::find_record(&self.cache, &reference, self.context_file.as_deref())
    }

    /// Base name of the file the running test was declared in, if known.
    pub fn context_file(&self) -> Option<&str> {
        self.context_file.as_deref()
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("context_file", &self.context_file)
            .finish_non_exhaustive()
    }
}

/// How each declared dependency of a task was settled.
///
/// Under the skip policy a task still runs after a failed dependency; the
/// report is how the host learns about it and decides what to record for
/// the dependent (the runner itself never writes a skipped status).
#[derive(Debug, Clone, Default)]
pub struct DependencyReport {
    /// References that resolved to a usable result, cached or freshly
    /// executed.
    pub satisfied: Vec<String>,
    /// References whose result is failed.
    pub failed: Vec<String>,
    /// References matching neither a cached result nor a registered case.
    pub unresolved: Vec<String>,
}

impl DependencyReport {
    /// True when every declared dependency resolved and none failed.
    pub fn all_satisfied(&self) -> bool {
        self.failed.is_empty() && self.unresolved.is_empty()
    }
}
