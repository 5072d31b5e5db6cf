// src/exec/runner.rs

//! Resolve-or-execute scheduler for test cases and their dependency chains.
//!
//! One [`Runner`] owns the registry, the result cache and the execution
//! policy for a run. Executing a case settles its declared dependencies
//! first (sequentially, in declared order), then runs the body at most once
//! per key: concurrent requests for the same key attach to one shared
//! in-flight execution instead of starting another.
//!
//! Bodies are spawned detached. A waiter that hits the dependency timeout
//! records a failure and moves on, but the body task keeps running and
//! overwrites the record when it eventually settles. A rerun issued while
//! such an orphaned body is still alive starts a second body; whichever
//! settles last owns the record.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::cache::{
    Admission, ExecFailure, ExecOutcome, PendingExecution, ResultCache, ResultRecord,
};
use crate::config::RunnerConfig;
use crate::dag::DependencyGraph;
use crate::errors::{Result, TestdagError};
use crate::exec::context::{DependencyReport, TestContext};
use crate::key;
use crate::registry::{TestCase, TestRegistry};
use crate::types::{DependencyRef, FailurePolicy, Payload, TestKey, TestStatus};

/// Executes test cases after their declared dependencies, with at-most-once
/// execution per key.
///
/// Cloning is cheap; clones share the same registry, cache and
/// configuration, so concurrent callers cooperate on one run.
#[derive(Clone)]
pub struct Runner {
    registry: Arc<TestRegistry>,
    cache: Arc<ResultCache>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(registry: TestRegistry, config: RunnerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            cache: Arc::new(ResultCache::new()),
            config,
        }
    }

    /// Share an existing cache, e.g. one pre-populated from a snapshot or
    /// also written to by the host's own lifecycle reporting.
    pub fn with_cache(
        registry: TestRegistry,
        cache: Arc<ResultCache>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn registry(&self) -> &TestRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Dependency graph over the registered cases.
    pub fn graph(&self) -> DependencyGraph {
        self.registry.graph()
    }

    /// Run `case` after its declared dependencies, caching the outcome.
    /// Concurrent calls for the same key share one execution.
    pub async fn execute_case(&self, case: &TestCase) -> Result<Payload> {
        let mut chain = Vec::new();
        self.execute_case_inner(case, &mut chain).await
    }

    /// Settle a slice of dependency references without running a dependent
    /// body afterwards. The entry point hosts use for their own before-hooks.
    pub async fn execute_dependencies(
        &self,
        deps: &[DependencyRef],
        context_file: Option<&str>,
    ) -> Result<DependencyReport> {
        let mut chain = Vec::new();
        self.execute_dependencies_inner(deps, context_file, &mut chain)
            .await
    }

    /// Resolve a reference to a payload, executing the registered case on a
    /// cache miss. Fails with [`TestdagError::TestNotFound`] when the
    /// reference matches neither a cached result nor a registered case;
    /// that error is never downgraded by the failure policy.
    pub async fn require(&self, reference: &str, context_file: Option<&str>) -> Result<Payload> {
        let dep = DependencyRef::parse(reference);

        let cached = key::find_record(&self.cache, &dep, context_file);
        if let Some((matched, record)) = &cached {
            if let Some(result) = self.cached_short_circuit(matched, record) {
                return result;
            }
            if let Some(pending) = self.cache.pending(matched) {
                debug!(task = %matched, "attaching to in-flight execution");
                return self.settle(matched, pending.await);
            }
        }

        if let Some(case) = self.registry.resolve(&dep, context_file) {
            return self.execute_case(&case).await;
        }

        // A known but unsettled record with nothing in flight and no
        // registration: all we can hand back is what the cache holds.
        if let Some((matched, record)) = cached {
            warn!(task = %matched, status = %record.status, "required result is unsettled and not registered");
            return Ok(record.payload.unwrap_or(Payload::Null));
        }

        Err(TestdagError::TestNotFound(dep.raw.clone()))
    }

    /// Forget every candidate form of `reference`, then resolve-or-execute
    /// again. The only path that revisits a terminal result.
    pub async fn rerun(&self, reference: &str, context_file: Option<&str>) -> Result<Payload> {
        let dep = DependencyRef::parse(reference);
        for candidate in key::candidate_keys(&dep, context_file) {
            if self.cache.remove(&candidate).is_some() {
                debug!(task = %candidate, "cached result discarded for rerun");
            }
        }
        info!(reference = %dep.raw, "rerun requested");
        self.require(reference, context_file).await
    }

    /// Strict validation: collect every declared reference that matches
    /// neither a registered case nor a cached result into one batch error.
    /// The lenient warn-and-continue path stays the execution default; this
    /// is the opt-in pre-flight check.
    pub fn validate_dependencies(&self) -> Result<()> {
        let mut unresolved = Vec::new();
        for case in self.registry.cases() {
            let context_file = case.key.file.as_deref();
            for dep in &case.declared_deps {
                let in_cache = key::find_record(&self.cache, dep, context_file).is_some();
                if !in_cache && self.registry.resolve(dep, context_file).is_none() {
                    unresolved.push(format!("{} (wanted by {})", dep.raw, case.key));
                }
            }
        }
        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(TestdagError::UnresolvedDependencies(unresolved))
        }
    }

    /// Recursive core of [`Self::execute_case`]. `chain` carries the keys
    /// currently being resolved on this call path; re-entering one of them
    /// means the declarations form a cycle.
    fn execute_case_inner<'a>(
        &'a self,
        case: &'a TestCase,
        chain: &'a mut Vec<TestKey>,
    ) -> BoxFuture<'a, Result<Payload>> {
        Box::pin(async move {
            let key = &case.key;

            if let Some(pos) = chain.iter().position(|k| k == key) {
                let mut path: Vec<TestKey> = chain[pos..].to_vec();
                path.push(key.clone());
                return Err(TestdagError::Cycle { path });
            }

            // Fast paths before touching dependencies: an in-flight
            // execution or a terminal record ends the call here.
            if let Some(pending) = self.cache.pending(key) {
                debug!(task = %key, "attaching to in-flight execution");
                return self.settle(key, pending.await);
            }
            if let Some(record) = self.cache.get(key) {
                if let Some(result) = self.cached_short_circuit(key, &record) {
                    return result;
                }
            }

            chain.push(key.clone());
            let deps = self
                .execute_dependencies_inner(&case.declared_deps, key.file.as_deref(), chain)
                .await;
            chain.pop();
            let report = deps?;
            if !report.failed.is_empty() {
                debug!(
                    task = %key,
                    failed = ?report.failed,
                    "dependencies failed; running anyway under skip policy"
                );
            }

            // Admission is atomic: between the fast path above and here,
            // another chain may have started or even finished this key.
            match self.cache.admit(key, || self.spawn_execution(case)) {
                Admission::Cached(record) => self
                    .cached_short_circuit(key, &record)
                    .unwrap_or(Ok(Payload::Null)),
                Admission::Attached(pending) => {
                    debug!(task = %key, "attaching to in-flight execution");
                    self.settle(key, pending.await)
                }
                Admission::Started(pending) => {
                    info!(task = %key, "running test body");
                    self.settle(key, pending.await)
                }
            }
        })
    }

    /// Sequential dependency settlement in declared order.
    fn execute_dependencies_inner<'a>(
        &'a self,
        deps: &'a [DependencyRef],
        context_file: Option<&'a str>,
        chain: &'a mut Vec<TestKey>,
    ) -> BoxFuture<'a, Result<DependencyReport>> {
        Box::pin(async move {
            let mut report = DependencyReport::default();
            for dep in deps {
                // A cached result of any status settles the reference; only
                // a failed one consults the policy.
                if let Some((matched, record)) = key::find_record(&self.cache, dep, context_file)
                {
                    if record.status == TestStatus::Failed {
                        let reason = record
                            .failure_reason
                            .clone()
                            .unwrap_or_else(|| "dependency failed".to_string());
                        if self.config.on_dependency_failure == FailurePolicy::Fail {
                            return Err(TestdagError::DependencyFailed {
                                dependency: dep.raw.clone(),
                                reason,
                            });
                        }
                        warn!(
                            dependency = %dep.raw,
                            matched = %matched,
                            reason = %reason,
                            "dependency failed; continuing under skip policy"
                        );
                        report.failed.push(dep.raw.clone());
                    } else {
                        report.satisfied.push(dep.raw.clone());
                    }
                    continue;
                }

                match self.registry.resolve(dep, context_file) {
                    Some(case) => {
                        debug!(dependency = %dep.raw, task = %case.key, "executing dependency");
                        self.execute_case_inner(&case, chain).await?;
                        // Under the skip policy a failed run still comes
                        // back Ok; classify from what was recorded.
                        let failed = self
                            .cache
                            .get(&case.key)
                            .map(|r| r.status == TestStatus::Failed)
                            .unwrap_or(false);
                        if failed {
                            report.failed.push(dep.raw.clone());
                        } else {
                            report.satisfied.push(dep.raw.clone());
                        }
                    }
                    None => {
                        warn!(
                            dependency = %dep.raw,
                            "dependency matches no cached result or registered test; continuing"
                        );
                        report.unresolved.push(dep.raw.clone());
                    }
                }
            }
            Ok(report)
        })
    }

    /// Terminal-record short-circuit. `None` means the record is unsettled
    /// and the caller should proceed to execution.
    fn cached_short_circuit(
        &self,
        key: &TestKey,
        record: &ResultRecord,
    ) -> Option<Result<Payload>> {
        match record.status {
            TestStatus::Passed => {
                debug!(task = %key, "cache hit");
                Some(Ok(record.payload.clone().unwrap_or(Payload::Null)))
            }
            TestStatus::Failed => {
                let reason = record
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "test previously failed".to_string());
                Some(self.terminal_failure(key, reason))
            }
            TestStatus::Skipped => Some(self.terminal_failure(key, "test was skipped".to_string())),
            TestStatus::Pending | TestStatus::Running => None,
        }
    }

    fn terminal_failure(&self, key: &TestKey, reason: String) -> Result<Payload> {
        match self.config.on_dependency_failure {
            FailurePolicy::Skip => {
                debug!(task = %key, reason = %reason, "cached failure; skip policy yields empty payload");
                Ok(Payload::Null)
            }
            FailurePolicy::Fail => Err(TestdagError::ExecutionFailed {
                key: key.clone(),
                reason,
            }),
        }
    }

    /// Map a shared-execution outcome to the caller's result under the
    /// failure policy.
    fn settle(&self, key: &TestKey, outcome: ExecOutcome) -> Result<Payload> {
        match outcome {
            Ok(payload) => Ok(payload),
            Err(failure) => match self.config.on_dependency_failure {
                FailurePolicy::Skip => {
                    debug!(task = %key, reason = %failure, "execution failed; skip policy yields empty payload");
                    Ok(Payload::Null)
                }
                FailurePolicy::Fail => Err(match failure {
                    ExecFailure::TimedOut { timeout_ms } => TestdagError::Timeout {
                        key: key.clone(),
                        timeout_ms,
                    },
                    other => TestdagError::ExecutionFailed {
                        key: key.clone(),
                        reason: other.to_string(),
                    },
                }),
            },
        }
    }

    /// Build the shared handle for one execution: the body runs in a
    /// detached task that owns its final cache write; waiters race that task
    /// against the dependency timeout and clear the pending entry when the
    /// race settles.
    ///
    /// Called from inside [`ResultCache::admit`], so it must not touch the
    /// cache synchronously.
    fn spawn_execution(&self, case: &TestCase) -> PendingExecution {
        let key = case.key.clone();
        let cache = Arc::clone(&self.cache);
        let timeout = self.config.dependency_timeout;
        let timeout_ms = timeout.as_millis() as u64;
        let body = Arc::clone(&case.body);
        let context = TestContext::new(Arc::clone(&self.cache), case.key.file.clone());

        let body_key = key.clone();
        let body_cache = Arc::clone(&cache);
        let detached = tokio::spawn(async move {
            match body(context).await {
                Ok(payload) => {
                    body_cache.set(
                        &body_key,
                        TestStatus::Passed,
                        Some(payload.clone()),
                        None,
                    );
                    Ok(payload)
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    body_cache.set(&body_key, TestStatus::Failed, None, Some(reason.clone()));
                    Err(ExecFailure::Body(reason))
                }
            }
        });

        let settle_key = key.clone();
        let settle_cache = Arc::clone(&cache);
        let settled: PendingExecution = async move {
            match detached.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    // The body panicked before it could record anything.
                    let failure = ExecFailure::Panicked(join_err.to_string());
                    settle_cache.set(
                        &settle_key,
                        TestStatus::Failed,
                        None,
                        Some(failure.to_string()),
                    );
                    Err(failure)
                }
            }
        }
        .boxed()
        .shared();

        async move {
            let outcome = match tokio::time::timeout(timeout, settled).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let failure = ExecFailure::TimedOut { timeout_ms };
                    warn!(task = %key, timeout_ms, "test body timed out; recording failure");
                    cache.set(&key, TestStatus::Failed, None, Some(failure.to_string()));
                    Err(failure)
                }
            };
            cache.clear_pending(&key);
            outcome
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
