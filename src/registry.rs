// src/registry.rs

//! Test case registry: the set of runnable cases known before execution.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::warn;

use crate::dag::DependencyGraph;
use crate::exec::TestContext;
use crate::key;
use crate::types::{DependencyRef, Payload, TestKey};

/// Future returned by a test body.
pub type BodyFuture = BoxFuture<'static, anyhow::Result<Payload>>;

/// An asynchronous test body. Receives a [`TestContext`] for reading its
/// dependencies' results; returns the payload to cache on success.
pub type TestBody = Arc<dyn Fn(TestContext) -> BodyFuture + Send + Sync>;

/// A registered test case: its key, its declared dependencies and its body.
#[derive(Clone)]
pub struct TestCase {
    pub key: TestKey,
    pub declared_deps: Vec<DependencyRef>,
    pub body: TestBody,
}

impl TestCase {
    /// Build a case from a rendered key, raw dependency references and an
    /// async closure.
    pub fn new<F, Fut>(key: &str, deps: &[&str], body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Payload>> + Send + 'static,
    {
        Self {
            key: TestKey::parse(key),
            declared_deps: deps.iter().map(|raw| DependencyRef::parse(raw)).collect(),
            body: Arc::new(move |ctx| body(ctx).boxed()),
        }
    }

    /// Build a case from already-parsed parts.
    pub fn from_parts(key: TestKey, declared_deps: Vec<DependencyRef>, body: TestBody) -> Self {
        Self {
            key,
            declared_deps,
            body,
        }
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("key", &self.key)
            .field("declared_deps", &self.declared_deps)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered set of test cases.
///
/// Populated before execution begins and read-only afterwards; a full reset
/// means building a new registry.
#[derive(Clone, Default)]
pub struct TestRegistry {
    order: Vec<TestKey>,
    cases: HashMap<TestKey, Arc<TestCase>>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case. Re-registering a key replaces the previous body but
    /// keeps the original position.
    pub fn register(&mut self, case: TestCase) {
        let key = case.key.clone();
        if self.cases.insert(key.clone(), Arc::new(case)).is_some() {
            warn!(task = %key, "test case re-registered; previous body replaced");
        } else {
            self.order.push(key);
        }
    }

    pub fn get(&self, key: &TestKey) -> Option<Arc<TestCase>> {
        self.cases.get(key).cloned()
    }

    pub fn contains(&self, key: &TestKey) -> bool {
        self.cases.contains_key(key)
    }

    /// Resolve a dependency reference to a registered case by probing its
    /// candidate keys in order. Exact candidates only; fuzzy matching is a
    /// cache concern.
    pub fn resolve(
        &self,
        reference: &DependencyRef,
        context_file: Option<&str>,
    ) -> Option<Arc<TestCase>> {
        key::candidate_keys(reference, context_file)
            .into_iter()
            .find_map(|candidate| self.cases.get(&candidate).cloned())
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &TestKey> {
        self.order.iter()
    }

    /// Registered cases, in registration order.
    pub fn cases(&self) -> impl Iterator<Item = &Arc<TestCase>> {
        self.order.iter().filter_map(|key| self.cases.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Dependency graph over every registered case.
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_cases(
            self.cases()
                .map(|case| (&case.key, case.declared_deps.as_slice())),
        )
    }
}

impl fmt::Debug for TestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRegistry")
            .field("cases", &self.order.len())
            .finish_non_exhaustive()
    }
}
