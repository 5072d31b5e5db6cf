// src/cache/record.rs

//! Cached result records and status-change notifications.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::{Payload, TestKey, TestStatus};

/// The cached outcome of one test execution.
///
/// Serializes in the snapshot-file shape: `status`, optional `payload`,
/// optional `failureReason`, and `recordedAt` in milliseconds since the
/// UNIX epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub status: TestStatus,
    /// Present only for passed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// Present only for failed results.
    #[serde(
        default,
        rename = "failureReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,
    /// When the status was last written. Never moves backwards within one
    /// cache instance, even across clock adjustments.
    #[serde(rename = "recordedAt")]
    pub recorded_at: u64,
}

impl ResultRecord {
    /// Payload if this record represents a pass, `None` otherwise.
    pub fn passed_payload(&self) -> Option<&Payload> {
        match self.status {
            TestStatus::Passed => self.payload.as_ref(),
            _ => None,
        }
    }
}

/// A status transition observed on the cache.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub key: TestKey,
    /// Status the key held before this write, if any record existed.
    pub previous: Option<TestStatus>,
    pub status: TestStatus,
    pub recorded_at: u64,
}

/// Wall-clock milliseconds since the UNIX epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
