// src/key/resolver.rs

//! Candidate-key normalization and cache probing.
//!
//! Dependency references arrive in loose forms: a bare title, a
//! `"file > title"` pair, or a title that only makes sense relative to the
//! requesting file. Normalization turns one reference into an ordered list
//! of concrete keys to try, most specific first, and probing walks that list
//! against the cache before falling back to fuzzy matching.

use tracing::debug;

use crate::cache::{ResultCache, ResultRecord};
use crate::types::{DependencyRef, TestKey};

/// Reduce a path-like file reference to its base name.
///
/// Context files usually arrive as full paths from the host runner, while
/// declarations name files the short way (`"auth.spec.ts"`).
pub fn file_base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Ordered, deduplicated candidate keys for a reference, most specific
/// first.
///
/// A reference with an explicit file yields the file-qualified key and then
/// the bare title; a bare reference yields itself and then, when the
/// requester's file is known, the title qualified by that file's base name.
/// The literal reference is always the first candidate.
pub fn candidate_keys(reference: &DependencyRef, context_file: Option<&str>) -> Vec<TestKey> {
    let mut keys: Vec<TestKey> = Vec::new();
    let mut push = |key: TestKey| {
        if !keys.contains(&key) {
            keys.push(key);
        }
    };

    push(reference.key());
    if reference.file.is_some() {
        push(TestKey::titled(reference.title.clone()));
    } else if let Some(context) = context_file {
        push(TestKey::in_file(
            file_base_name(context),
            reference.title.clone(),
        ));
    }
    keys
}

/// Probe the cache with each candidate key in order, then fall back to
/// fuzzy suffix matching when the reference names a file explicitly.
///
/// Returns the matched key together with a copy of its record.
pub fn find_record(
    cache: &ResultCache,
    reference: &DependencyRef,
    context_file: Option<&str>,
) -> Option<(TestKey, ResultRecord)> {
    for key in candidate_keys(reference, context_file) {
        if let Some(record) = cache.get(&key) {
            return Some((key, record));
        }
    }
    if reference.file.is_some() {
        if let Some((key, record)) = cache.fuzzy_get(reference) {
            debug!(reference = %reference.raw, matched = %key, "fuzzy-matched dependency reference");
            return Some((key, record));
        }
    }
    None
}
