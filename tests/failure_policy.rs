// tests/failure_policy.rs
mod common;
use crate::common::bodies;
use crate::common::{RegistryBuilder, init_tracing};

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use testdag::config::RunnerConfig;
use testdag::errors::TestdagError;
use testdag::exec::Runner;
use testdag::types::{DependencyRef, FailurePolicy, Payload, TestKey, TestStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn skip_config() -> RunnerConfig {
    RunnerConfig::default().with_policy(FailurePolicy::Skip)
}

fn fail_config() -> RunnerConfig {
    RunnerConfig::default().with_policy(FailurePolicy::Fail)
}

#[tokio::test]
async fn skip_policy_still_runs_the_dependent_body() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let runs = Arc::new(AtomicUsize::new(0));
        let registry = RegistryBuilder::new()
            .case(bodies::failing_case("broken", &[], "boom"))
            .case(bodies::counting_case("dependent", &["broken"], Arc::clone(&runs)))
            .build();
        let runner = Runner::new(registry, skip_config());

        // Settle the dependency first so its failure is a cached fact.
        let dep_result = runner.require("broken", None).await?;
        assert_eq!(dep_result, Payload::Null);
        assert_eq!(
            runner.cache().get(&TestKey::titled("broken")).unwrap().status,
            TestStatus::Failed
        );

        let payload = runner.require("dependent", None).await?;
        assert_eq!(payload, json!({ "runs": 1 }));
        assert_eq!(runs.load(Ordering::SeqCst), 1, "body must have run");

        Ok(())
    })
    .await
}

#[tokio::test]
async fn fail_policy_aborts_before_the_dependent_body() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let runs = Arc::new(AtomicUsize::new(0));
        let registry = RegistryBuilder::new()
            .case(bodies::counting_case("dependent", &["broken"], Arc::clone(&runs)))
            .build();
        let runner = Runner::new(registry, fail_config());

        // Pre-record the dependency failure, the way a host's lifecycle
        // reporting would.
        runner.cache().set(
            &TestKey::titled("broken"),
            TestStatus::Failed,
            None,
            Some("boom".to_string()),
        );

        match runner.require("dependent", None).await {
            Err(TestdagError::DependencyFailed { dependency, reason }) => {
                assert_eq!(dependency, "broken");
                assert_eq!(reason, "boom");
            }
            other => panic!("expected DependencyFailed, got {:?}", other),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0, "body must not have run");

        Ok(())
    })
    .await
}

#[tokio::test]
async fn execute_dependencies_raises_under_fail_policy() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new().build();
        let runner = Runner::new(registry, fail_config());
        runner.cache().set(
            &TestKey::titled("broken"),
            TestStatus::Failed,
            None,
            Some("boom".to_string()),
        );

        let deps = vec![DependencyRef::parse("broken")];
        assert!(matches!(
            runner.execute_dependencies(&deps, None).await,
            Err(TestdagError::DependencyFailed { .. })
        ));

        Ok(())
    })
    .await
}

#[tokio::test]
async fn fresh_failure_propagates_under_fail_policy() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .case(bodies::failing_case("broken", &[], "went wrong"))
            .build();
        let runner = Runner::new(registry, fail_config());

        match runner.require("broken", None).await {
            Err(TestdagError::ExecutionFailed { key, reason }) => {
                assert_eq!(key, TestKey::titled("broken"));
                assert!(reason.contains("went wrong"));
            }
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }

        // The failure is cached for later requesters too.
        let record = runner.cache().get(&TestKey::titled("broken")).unwrap();
        assert_eq!(record.status, TestStatus::Failed);
        assert!(record.failure_reason.unwrap().contains("went wrong"));

        Ok(())
    })
    .await
}

#[tokio::test]
async fn skip_policy_swallows_a_fresh_failure_into_a_null_payload() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .case(bodies::failing_case("broken", &[], "went wrong"))
            .build();
        let runner = Runner::new(registry, skip_config());

        let payload = runner.require("broken", None).await?;
        assert_eq!(payload, Payload::Null);

        let record = runner.cache().get(&TestKey::titled("broken")).unwrap();
        assert_eq!(record.status, TestStatus::Failed);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn a_skipped_dependency_counts_as_settled_not_failed() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let runs = Arc::new(AtomicUsize::new(0));
        let registry = RegistryBuilder::new()
            .case(bodies::counting_case("dependent", &["opted-out"], Arc::clone(&runs)))
            .build();
        let runner = Runner::new(registry, fail_config());
        runner
            .cache()
            .set(&TestKey::titled("opted-out"), TestStatus::Skipped, None, None);

        // Skipped is a known status, so even the fail policy lets the
        // dependent proceed; only a failed dependency aborts.
        let payload = runner.require("dependent", None).await?;
        assert_eq!(payload, json!({ "runs": 1 }));

        Ok(())
    })
    .await
}
