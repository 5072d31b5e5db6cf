// src/discover.rs

//! Static discovery of annotated test declarations.
//!
//! The scanner reads test sources looking for `@depends(...)` annotations
//! attached to `test('title', ...)` / `it("title", ...)` declarations and
//! produces the key + declared-dependency tuples that the registry and the
//! dependency graph consume. It is line-based on purpose: annotations
//! accumulate until the next declaration claims them, which is how the
//! annotations are written in practice.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{Result, TestdagError};
use crate::key;
use crate::types::{DependencyRef, TestKey};

/// A test declaration found by the scanner.
#[derive(Debug, Clone)]
pub struct DiscoveredTest {
    pub key: TestKey,
    pub deps: Vec<DependencyRef>,
    /// 1-based line of the declaration, for reporting.
    pub line: usize,
}

/// Compiled file selection and annotation patterns.
pub struct Scanner {
    include: GlobSet,
    exclude: GlobSet,
    annotation: Regex,
    declaration: Regex,
}

impl Scanner {
    /// Compile include/exclude globs and the annotation patterns.
    pub fn new(patterns: &[String], excludes: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(patterns)?,
            exclude: build_globset(excludes)?,
            annotation: compile_regex(r"@depends\(([^)]*)\)")?,
            declaration: compile_regex(r#"\b(?:test|it)\s*\(\s*['"]([^'"]+)['"]"#)?,
        })
    }

    /// Scan one file's source text. `file` is the base name used in the
    /// discovered keys.
    ///
    /// Annotations accumulate across lines and attach to the next test
    /// declaration; an annotation on the declaration line itself also
    /// counts. Leftover annotations at end of file are dropped with a
    /// warning.
    pub fn scan_source(&self, file: &str, source: &str) -> Vec<DiscoveredTest> {
        let mut found = Vec::new();
        let mut pending: Vec<DependencyRef> = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            for captures in self.annotation.captures_iter(line) {
                for raw in captures[1].split(',') {
                    let raw = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
                    if !raw.is_empty() {
                        pending.push(DependencyRef::parse(raw));
                    }
                }
            }
            if let Some(captures) = self.declaration.captures(line) {
                let title = captures[1].to_string();
                found.push(DiscoveredTest {
                    key: TestKey::in_file(file, title),
                    deps: std::mem::take(&mut pending),
                    line: idx + 1,
                });
            }
        }

        if !pending.is_empty() {
            warn!(
                file,
                dangling = pending.len(),
                "annotations with no following test declaration; dropped"
            );
        }
        found
    }

    /// Walk `root` and scan every file the include globs select and the
    /// exclude globs do not. Directory entries are visited in sorted order
    /// so the discovered list is stable across platforms.
    pub fn scan_dir(&self, root: &Path) -> Result<Vec<DiscoveredTest>> {
        let mut found = Vec::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
                .collect::<std::io::Result<Vec<_>>>()?
                .into_iter()
                .map(|entry| entry.path())
                .collect();
            entries.sort();
            let (dirs, files): (Vec<PathBuf>, Vec<PathBuf>) =
                entries.into_iter().partition(|path| path.is_dir());
            // Reverse so the LIFO stack walks subdirectories in sorted order.
            for path in dirs.into_iter().rev() {
                stack.push(path);
            }
            for path in files {
                let rel = path.strip_prefix(root).unwrap_or(&path);
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if !self.include.is_match(&rel_str) || self.exclude.is_match(&rel_str) {
                    continue;
                }
                let source = match fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(file = %rel_str, error = %err, "failed to read test file; skipping");
                        continue;
                    }
                };
                let base = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let tests = self.scan_source(&base, &source);
                debug!(file = %rel_str, count = tests.len(), "scanned test file");
                found.extend(tests);
            }
        }

        Ok(found)
    }
}

/// Declared references that match no discovered test, with the declaring
/// key attached for reporting. Resolution uses the same candidate-key rules
/// as execution, with each test's own file as context.
pub fn unresolved_references(tests: &[DiscoveredTest]) -> Vec<String> {
    let known: HashSet<&TestKey> = tests.iter().map(|test| &test.key).collect();
    let mut unresolved = Vec::new();
    for test in tests {
        let context_file = test.key.file.as_deref();
        for dep in &test.deps {
            let matched = key::candidate_keys(dep, context_file)
                .iter()
                .any(|candidate| known.contains(candidate));
            if !matched {
                unresolved.push(format!("{} (wanted by {})", dep.raw, test.key));
            }
        }
    }
    unresolved
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| {
            TestdagError::ConfigError(format!("invalid glob pattern: {pattern}: {err}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| TestdagError::ConfigError(format!("building globset: {err}")))
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|err| TestdagError::ConfigError(format!("invalid scanner regex: {err}")))
}
