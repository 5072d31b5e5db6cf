// tests/rerun_behaviour.rs
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
use testdag::types::{FailurePolicy, TestKey, TestStatus};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn rerun_discards_a_passed_result_and_runs_the_body_again() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let runs = Arc::new(AtomicUsize::new(0));
        let registry = RegistryBuilder::new()
            .case(bodies::counting_case("counted", &[], Arc::clone(&runs)))
            .build();
        let runner = Runner::new(registry, RunnerConfig::default());

        let first = runner.require("counted", None).await?;
        assert_eq!(first, json!({ "runs": 1 }));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let second = runner.rerun("counted", None).await?;
        assert_eq!(second, json!({ "runs": 2 }));
        assert_eq!(runs.load(Ordering::SeqCst), 2, "exactly one more run");

        // The cache holds the fresh payload, not the discarded one.
        let record = runner.cache().get(&TestKey::titled("counted")).unwrap();
        assert_eq!(record.payload, Some(json!({ "runs": 2 })));

        Ok(())
    })
    .await
}

#[tokio::test]
async fn rerun_is_the_only_way_out_of_a_cached_failure() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let flaky = testdag::registry::TestCase::new("flaky", &[], move |_ctx| {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    Err(anyhow::anyhow!("first attempt fails"))
                } else {
                    Ok(json!({ "attempt": n }))
                }
            }
        });

        let registry = RegistryBuilder::new().case(flaky).build();
        let config = RunnerConfig::default().with_policy(FailurePolicy::Fail);
        let runner = Runner::new(registry, config);

        assert!(matches!(
            runner.require("flaky", None).await,
            Err(TestdagError::ExecutionFailed { .. })
        ));

        // Repeated requires keep returning the cached failure without
        // another attempt.
        assert!(runner.require("flaky", None).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        let payload = runner.rerun("flaky", None).await?;
        assert_eq!(payload, json!({ "attempt": 2 }));
        assert_eq!(
            runner.cache().get(&TestKey::titled("flaky")).unwrap().status,
            TestStatus::Passed
        );

        Ok(())
    })
    .await
}

#[tokio::test]
async fn rerun_clears_every_candidate_form_of_the_key() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let runs = Arc::new(AtomicUsize::new(0));
        let registry = RegistryBuilder::new()
            .case(bodies::counting_case(
                "auth.spec.ts > login",
                &[],
                Arc::clone(&runs),
            ))
            .build();
        let runner = Runner::new(registry, RunnerConfig::default());

        runner.require("auth.spec.ts > login", None).await?;
        // Stash a stale bare-title record alongside the qualified one.
        runner
            .cache()
            .set(&TestKey::titled("login"), TestStatus::Passed, Some(json!("stale")), None);

        runner.rerun("auth.spec.ts > login", None).await?;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(
            runner.cache().get(&TestKey::titled("login")).is_none(),
            "the bare candidate form must be discarded too"
        );

        Ok(())
    })
    .await
}

#[tokio::test]
async fn rerun_of_an_unknown_reference_is_not_found() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();

        let runner = Runner::new(RegistryBuilder::new().build(), RunnerConfig::default());
        assert!(matches!(
            runner.rerun("ghost", None).await,
            Err(TestdagError::TestNotFound(_))
        ));

        Ok(())
    })
    .await
}
