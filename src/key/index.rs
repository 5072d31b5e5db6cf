// src/key/index.rs

//! Secondary lookup index for fuzzy key matching.
//!
//! The result cache's record map is keyed for exact lookups; fuzzy probes
//! would otherwise have to walk it in unspecified order. This index keeps a
//! compact, insertion-ordered list of every cached key with its rendered
//! form precomputed, so a fuzzy probe is one ordered scan over titles and
//! rendered strings and the first hit is the earliest-recorded match.

use std::collections::HashSet;

use crate::types::{DependencyRef, TestKey};

#[derive(Debug, Clone)]
struct IndexEntry {
    key: TestKey,
    rendered: String,
}

/// Insertion-ordered index of cached keys.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    entries: Vec<IndexEntry>,
    members: HashSet<TestKey>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key. Idempotent; a key keeps its original position until
    /// removed.
    pub fn insert(&mut self, key: &TestKey) {
        if self.members.insert(key.clone()) {
            self.entries.push(IndexEntry {
                key: key.clone(),
                rendered: key.to_string(),
            });
        }
    }

    /// Drop a key. A later re-insert appends at the end, so a rerun key
    /// loses its original tie-break position.
    pub fn remove(&mut self, key: &TestKey) {
        if self.members.remove(key) {
            self.entries.retain(|entry| entry.key != *key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fuzzy match for a file-qualified reference.
    ///
    /// A stored key qualifies when its title ends with the reference's title
    /// and it either has the same file component or its rendered form
    /// contains the reference's file name. Scanning in insertion order makes
    /// the earliest-recorded qualifying key win ties.
    pub fn fuzzy_match(&self, reference: &DependencyRef) -> Option<TestKey> {
        let file = reference.file.as_deref()?;
        let title = reference.title.as_str();
        for entry in &self.entries {
            if !entry.key.title.ends_with(title) {
                continue;
            }
            let same_file = entry.key.file.as_deref() == Some(file);
            if same_file || entry.rendered.contains(file) {
                return Some(entry.key.clone());
            }
        }
        None
    }
}
