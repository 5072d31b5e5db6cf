#![allow(dead_code)]

//! Canned test bodies for exercising the runner.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use testdag::registry::TestCase;
use testdag::types::Payload;

/// A case whose body immediately succeeds with `payload`.
pub fn passing_case(key: &str, deps: &[&str], payload: Payload) -> TestCase {
    TestCase::new(key, deps, move |_ctx| {
        let payload = payload.clone();
        async move { Ok(payload) }
    })
}

/// A case whose body immediately fails with `message`.
pub fn failing_case(key: &str, deps: &[&str], message: &str) -> TestCase {
    let message = message.to_string();
    TestCase::new(key, deps, move |_ctx| {
        let message = message.clone();
        async move { Err(anyhow::anyhow!(message)) }
    })
}

/// A case whose body never settles. Used to trip the dependency timeout.
pub fn never_settling_case(key: &str, deps: &[&str]) -> TestCase {
    TestCase::new(key, deps, |_ctx| {
        std::future::pending::<anyhow::Result<Payload>>()
    })
}

/// A case whose body sleeps for `delay`, then succeeds with `payload`.
pub fn slow_passing_case(key: &str, deps: &[&str], delay: Duration, payload: Payload) -> TestCase {
    TestCase::new(key, deps, move |_ctx| {
        let payload = payload.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(payload)
        }
    })
}

/// A case that counts how many times its body ran. The payload carries the
/// new count, so at-most-once behaviour is visible from either side.
pub fn counting_case(key: &str, deps: &[&str], counter: Arc<AtomicUsize>) -> TestCase {
    TestCase::new(key, deps, move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            let runs = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!({ "runs": runs }))
        }
    })
}

/// A case that appends its rendered key to `log` when the body runs.
/// Useful for asserting execution order across a dependency chain.
pub fn recording_case(key: &str, deps: &[&str], log: Arc<Mutex<Vec<String>>>) -> TestCase {
    let rendered = key.to_string();
    TestCase::new(key, deps, move |_ctx| {
        let log = Arc::clone(&log);
        let rendered = rendered.clone();
        async move {
            log.lock().unwrap().push(rendered);
            Ok(Payload::Null)
        }
    })
}
