// src/cache/mod.rs

//! Result storage: records, the cache itself, and its pending table.

pub mod record;
pub mod result_cache;

pub use record::{ResultRecord, StatusChange};
pub use result_cache::{
    Admission, ExecFailure, ExecOutcome, PendingExecution, ResultCache, StatusObserver,
};
