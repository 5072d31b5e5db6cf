// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod discover;
pub mod errors;
pub mod exec;
pub mod key;
pub mod logging;
pub mod persist;
pub mod registry;
pub mod render;
pub mod types;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, OutputFormat};
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::dag::DependencyGraph;
use crate::discover::{DiscoveredTest, Scanner};
use crate::errors::TestdagError;
use crate::persist::Snapshot;
use crate::types::{TestKey, TestStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - source scanning for test declarations
/// - dependency graph construction
/// - `--validate` checks, or tree / mermaid rendering
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    let patterns = if args.patterns.is_empty() {
        cfg.discover.patterns.clone()
    } else {
        args.patterns.clone()
    };
    let mut excludes = cfg.discover.exclude.clone();
    excludes.extend(args.excludes.iter().cloned());

    let scanner = Scanner::new(&patterns, &excludes)?;
    let tests = scanner.scan_dir(Path::new(&args.scan))?;
    info!(count = tests.len(), root = %args.scan, "discovered test declarations");

    let graph = DependencyGraph::from_cases(tests.iter().map(|t| (&t.key, t.deps.as_slice())));

    if args.validate {
        return validate(&graph, &tests);
    }

    let statuses = load_statuses(results_path(&args, &cfg))?;
    let output = match args.format {
        OutputFormat::Ascii => render::ascii(&graph, &statuses),
        OutputFormat::Mermaid => render::mermaid(&graph, &statuses),
    };
    print!("{output}");
    Ok(())
}

/// `--validate` mode: fail on cycles or on dependency references that do
/// not match any discovered test.
fn validate(graph: &DependencyGraph, tests: &[DiscoveredTest]) -> Result<()> {
    graph.validate_acyclic()?;

    let unresolved = discover::unresolved_references(tests);
    if !unresolved.is_empty() {
        return Err(TestdagError::UnresolvedDependencies(unresolved).into());
    }

    println!(
        "ok: {} tests, {} dependency edges, no cycles",
        graph.len(),
        graph.edge_count()
    );
    Ok(())
}

/// Snapshot path for rendering statuses: `--results` wins over
/// `[results].file` from the config.
fn results_path<'a>(args: &'a CliArgs, cfg: &'a ConfigFile) -> Option<&'a str> {
    args.results.as_deref().or(cfg.results.file.as_deref())
}

/// Load recorded statuses from a snapshot file, if one is configured.
/// A missing file just means nothing has run yet.
fn load_statuses(path: Option<&str>) -> Result<HashMap<TestKey, TestStatus>> {
    let Some(path) = path else {
        return Ok(HashMap::new());
    };
    if !Path::new(path).exists() {
        debug!(path, "results snapshot not found; rendering without statuses");
        return Ok(HashMap::new());
    }
    Ok(Snapshot::load(path)?.statuses())
}
