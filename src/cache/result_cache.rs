// src/cache/result_cache.rs

//! Result cache with a single-flight pending-execution table.
//!
//! One instance holds every result recorded during a run, keyed by
//! [`TestKey`]. Alongside the records sits the pending table: at most one
//! shared execution handle per key, so concurrent requests for the same test
//! attach to one in-flight body instead of starting a second one.
//!
//! No await happens while the internal lock is held; every operation is one
//! atomic step from the point of view of cooperating tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use tracing::debug;

use crate::cache::record::{StatusChange, now_millis};
use crate::cache::ResultRecord;
use crate::key::KeyIndex;
use crate::types::{DependencyRef, Payload, TestKey, TestStatus};

/// Failure observed by waiters on an in-flight execution.
#[derive(Debug, Clone)]
pub enum ExecFailure {
    /// The body returned an error; carries the rendered reason.
    Body(String),
    /// The waiter-side timer fired before the body settled.
    TimedOut { timeout_ms: u64 },
    /// The detached body task panicked.
    Panicked(String),
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(reason) => f.write_str(reason),
            Self::TimedOut { timeout_ms } => {
                write!(f, "timed out after {timeout_ms} ms")
            }
            Self::Panicked(detail) => write!(f, "test body panicked: {detail}"),
        }
    }
}

/// What a pending execution resolves to. Cloneable so any number of waiters
/// can share one outcome.
pub type ExecOutcome = std::result::Result<Payload, ExecFailure>;

/// Single-flight handle: the shared future every requester for a key awaits.
pub type PendingExecution = Shared<BoxFuture<'static, ExecOutcome>>;

/// Observer invoked synchronously after every status write.
pub type StatusObserver = Arc<dyn Fn(&StatusChange) + Send + Sync>;

/// Admission decision for one execution request, taken atomically.
pub enum Admission {
    /// An execution is already in flight; attach to its handle.
    Attached(PendingExecution),
    /// A terminal record already exists; use it.
    Cached(ResultRecord),
    /// This requester won: the key is now running and its handle registered.
    Started(PendingExecution),
}

#[derive(Default)]
struct CacheInner {
    records: HashMap<TestKey, StoredRecord>,
    index: KeyIndex,
    pending: HashMap<TestKey, PendingExecution>,
    next_seq: u64,
    last_stamp: u64,
}

struct StoredRecord {
    record: ResultRecord,
    /// Insertion sequence, for deterministic listing order.
    seq: u64,
}

impl CacheInner {
    /// Strictly increasing wall-clock stamp.
    fn next_stamp(&mut self) -> u64 {
        let stamp = now_millis().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        stamp
    }

    fn write_record(&mut self, key: &TestKey, record: ResultRecord) {
        match self.records.get_mut(key) {
            Some(stored) => stored.record = record,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.index.insert(key);
                self.records.insert(key.clone(), StoredRecord { record, seq });
            }
        }
    }
}

/// Shared store of test results for one run.
#[derive(Default)]
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    observer: Mutex<Option<StatusObserver>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The critical sections below never run user code or await, so a
    // poisoned lock only means some unrelated thread panicked; the maps
    // themselves are still consistent.
    fn lock_inner(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write (or overwrite) the record for `key`, stamping `recorded_at`
    /// with a strictly increasing wall-clock value, then notify the
    /// observer.
    pub fn set(
        &self,
        key: &TestKey,
        status: TestStatus,
        payload: Option<Payload>,
        failure_reason: Option<String>,
    ) {
        let change = {
            let mut inner = self.lock_inner();
            let stamp = inner.next_stamp();
            let previous = inner.records.get(key).map(|s| s.record.status);
            inner.write_record(
                key,
                ResultRecord {
                    status,
                    payload,
                    failure_reason,
                    recorded_at: stamp,
                },
            );
            StatusChange {
                key: key.clone(),
                previous,
                status,
                recorded_at: stamp,
            }
        };
        debug!(key = %change.key, status = %change.status, "result recorded");
        self.notify(&change);
    }

    /// Adopt a record verbatim, keeping its `recorded_at`. Used when merging
    /// a persisted snapshot; does not notify the observer. Later writes
    /// still stamp strictly after the adopted value.
    pub fn restore(&self, key: &TestKey, record: ResultRecord) {
        let mut inner = self.lock_inner();
        inner.last_stamp = inner.last_stamp.max(record.recorded_at);
        inner.write_record(key, record);
    }

    /// Copy of the record for `key`, if any.
    pub fn get(&self, key: &TestKey) -> Option<ResultRecord> {
        self.lock_inner()
            .records
            .get(key)
            .map(|stored| stored.record.clone())
    }

    pub fn has(&self, key: &TestKey) -> bool {
        self.lock_inner().records.contains_key(key)
    }

    /// Forget a key entirely: record, index entry and pending handle.
    pub fn remove(&self, key: &TestKey) -> Option<ResultRecord> {
        let mut inner = self.lock_inner();
        inner.pending.remove(key);
        inner.index.remove(key);
        inner.records.remove(key).map(|stored| stored.record)
    }

    /// Passed results carrying a payload, in first-recorded order. Failed,
    /// skipped and unsettled records are filtered out.
    pub fn passed_results(&self) -> Vec<(TestKey, Payload)> {
        let inner = self.lock_inner();
        let mut rows: Vec<(u64, TestKey, Payload)> = inner
            .records
            .iter()
            .filter_map(|(key, stored)| {
                stored
                    .record
                    .passed_payload()
                    .map(|payload| (stored.seq, key.clone(), payload.clone()))
            })
            .collect();
        rows.sort_by_key(|(seq, _, _)| *seq);
        rows.into_iter().map(|(_, key, payload)| (key, payload)).collect()
    }

    /// Every record, in first-recorded order. The persistence layer's view.
    pub fn snapshot_records(&self) -> Vec<(TestKey, ResultRecord)> {
        let inner = self.lock_inner();
        let mut rows: Vec<(u64, TestKey, ResultRecord)> = inner
            .records
            .iter()
            .map(|(key, stored)| (stored.seq, key.clone(), stored.record.clone()))
            .collect();
        rows.sort_by_key(|(seq, _, _)| *seq);
        rows.into_iter().map(|(_, key, record)| (key, record)).collect()
    }

    /// Fuzzy lookup through the secondary index. Only file-qualified
    /// references match; ties go to the earliest-recorded key.
    pub fn fuzzy_get(&self, reference: &DependencyRef) -> Option<(TestKey, ResultRecord)> {
        let inner = self.lock_inner();
        let key = inner.index.fuzzy_match(reference)?;
        let record = inner.records.get(&key).map(|s| s.record.clone())?;
        Some((key, record))
    }

    /// The in-flight execution handle for `key`, if one is registered.
    pub fn pending(&self, key: &TestKey) -> Option<PendingExecution> {
        self.lock_inner().pending.get(key).cloned()
    }

    pub fn has_pending(&self, key: &TestKey) -> bool {
        self.lock_inner().pending.contains_key(key)
    }

    /// Register the shared handle for an execution that is about to run.
    /// Replaces any previous handle for the key.
    pub fn register_pending(&self, key: &TestKey, handle: PendingExecution) {
        self.lock_inner().pending.insert(key.clone(), handle);
    }

    /// Drop the pending handle once its raced future has settled.
    pub fn clear_pending(&self, key: &TestKey) {
        self.lock_inner().pending.remove(key);
    }

    /// Atomic admission: attach to an in-flight execution, short-circuit on
    /// a terminal record, or mark the key running and register the handle
    /// built by `build` in one step.
    ///
    /// `build` runs under the cache lock and must not touch the cache.
    pub fn admit(
        &self,
        key: &TestKey,
        build: impl FnOnce() -> PendingExecution,
    ) -> Admission {
        let (admission, change) = {
            let mut inner = self.lock_inner();
            if let Some(handle) = inner.pending.get(key) {
                return Admission::Attached(handle.clone());
            }
            if let Some(stored) = inner.records.get(key) {
                if stored.record.status.is_terminal() {
                    return Admission::Cached(stored.record.clone());
                }
            }
            let stamp = inner.next_stamp();
            let previous = inner.records.get(key).map(|s| s.record.status);
            inner.write_record(
                key,
                ResultRecord {
                    status: TestStatus::Running,
                    payload: None,
                    failure_reason: None,
                    recorded_at: stamp,
                },
            );
            let handle = build();
            inner.pending.insert(key.clone(), handle.clone());
            let change = StatusChange {
                key: key.clone(),
                previous,
                status: TestStatus::Running,
                recorded_at: stamp,
            };
            (Admission::Started(handle), change)
        };
        self.notify(&change);
        admission
    }

    /// Register the lifecycle observer, replacing any previous one. The
    /// observer runs synchronously after each write, outside the cache lock,
    /// so it may call back into the cache.
    pub fn set_observer(&self, observer: StatusObserver) {
        let mut slot = self
            .observer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(observer);
    }

    fn notify(&self, change: &StatusChange) {
        let observer = {
            self.observer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        };
        if let Some(observer) = observer {
            observer(change);
        }
    }

    pub fn len(&self) -> usize {
        self.lock_inner().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_inner().records.is_empty()
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("ResultCache")
            .field("records", &inner.records.len())
            .field("pending", &inner.pending.len())
            .finish_non_exhaustive()
    }
}
