// src/persist.rs

//! Shared results snapshot for cross-process result reuse.
//!
//! One JSON object, rewritten whole on every save:
//!
//! ```json
//! { "results": { "auth.spec.ts > login": { "status": "passed",
//!   "payload": { "id": 1 }, "recordedAt": 1724400000000 } } }
//! ```
//!
//! Saving re-reads the file first and merges it into the cache, so two
//! processes interleaving save calls lose as little as possible; within one
//! merge an existing cache record always wins unless it is still pending.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{ResultCache, ResultRecord};
use crate::errors::Result;
use crate::types::{TestKey, TestStatus};

/// On-disk snapshot of a result cache.
///
/// Keys are rendered `TestKey`s; a `BTreeMap` keeps the file content stable
/// across saves of the same state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub results: BTreeMap<String, ResultRecord>,
}

impl Snapshot {
    /// Capture every record currently in the cache.
    pub fn capture(cache: &ResultCache) -> Self {
        let results = cache
            .snapshot_records()
            .into_iter()
            .map(|(key, record)| (key.to_string(), record))
            .collect();
        Self { results }
    }

    /// Read a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        Ok(snapshot)
    }

    /// Merge this snapshot into `cache`.
    ///
    /// A record already in the cache wins unless it is still pending;
    /// adopted records keep their original `recordedAt`.
    pub fn merge_into(&self, cache: &ResultCache) {
        for (raw, record) in &self.results {
            let key = TestKey::parse(raw);
            let cache_wins = cache
                .get(&key)
                .map(|existing| existing.status != TestStatus::Pending)
                .unwrap_or(false);
            if cache_wins {
                continue;
            }
            cache.restore(&key, record.clone());
        }
        debug!(records = self.results.len(), "snapshot merged into cache");
    }

    /// Statuses by key, for annotating rendered graphs.
    pub fn statuses(&self) -> HashMap<TestKey, TestStatus> {
        self.results
            .iter()
            .map(|(raw, record)| (TestKey::parse(raw), record.status))
            .collect()
    }
}

/// Refresh the cache from what is currently on disk, then rewrite the file
/// with the merged view. Last writer wins per key across processes.
pub fn save(path: impl AsRef<Path>, cache: &ResultCache) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        match Snapshot::load(path) {
            Ok(on_disk) => on_disk.merge_into(cache),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "existing snapshot unreadable; overwriting");
            }
        }
    }

    let snapshot = Snapshot::capture(cache);
    let contents = serde_json::to_string_pretty(&snapshot)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    debug!(path = %path.display(), records = snapshot.results.len(), "results snapshot saved");
    Ok(())
}

/// Load the snapshot at `path` into `cache`, ignoring a missing file.
pub fn load_into(path: impl AsRef<Path>, cache: &ResultCache) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no results snapshot to load");
        return Ok(());
    }
    Snapshot::load(path)?.merge_into(cache);
    Ok(())
}
