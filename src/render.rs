// src/render.rs

//! Plain-text renderers for dependency graphs.
//!
//! Both renderers are pure string builders so they can be unit-tested and
//! so the CLI owns all printing. Output is deterministic: it follows the
//! graph's registration order everywhere.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::dag::DependencyGraph;
use crate::types::{TestKey, TestStatus};

/// Indented dependents tree, one block per root (a task with no
/// dependencies), arrows pointing at the tasks that depend on it.
///
/// Each task is expanded once; a task reachable from several roots or via
/// several paths renders as a reference after its first expansion, which
/// also makes the renderer safe on cyclic graphs.
pub fn ascii(graph: &DependencyGraph, statuses: &HashMap<TestKey, TestStatus>) -> String {
    let mut out = String::new();
    let roots: Vec<&TestKey> = graph
        .tasks()
        .filter(|key| graph.dependencies_of(key).is_empty())
        .collect();

    if roots.is_empty() {
        if graph.is_empty() {
            return "(no tests discovered)\n".to_string();
        }
        // Every task has a dependency, so the graph must contain a cycle.
        let _ = writeln!(out, "(no roots; dependency graph contains a cycle)");
        for key in graph.tasks() {
            let _ = writeln!(out, "{}", label(key, statuses));
        }
        return out;
    }

    let mut expanded: HashSet<TestKey> = HashSet::new();
    for root in roots {
        if !expanded.insert(root.clone()) {
            continue;
        }
        let _ = writeln!(out, "{}", label(root, statuses));
        render_dependents(graph, statuses, root, "  ", &mut expanded, &mut out);
        out.push('\n');
    }
    out
}

fn render_dependents(
    graph: &DependencyGraph,
    statuses: &HashMap<TestKey, TestStatus>,
    key: &TestKey,
    prefix: &str,
    expanded: &mut HashSet<TestKey>,
    out: &mut String,
) {
    for dependent in graph.dependents_of(key) {
        if expanded.insert(dependent.clone()) {
            let _ = writeln!(out, "{prefix}└─> {}", label(&dependent, statuses));
            let deeper = format!("{prefix}    ");
            render_dependents(graph, statuses, &dependent, &deeper, expanded, out);
        } else {
            let _ = writeln!(out, "{prefix}└─> {} (shown above)", dependent);
        }
    }
}

/// Mermaid `graph TD` flowchart: one node per task, one edge per
/// dependency, arrows pointing from dependency to dependent (execution
/// direction).
pub fn mermaid(graph: &DependencyGraph, statuses: &HashMap<TestKey, TestStatus>) -> String {
    let mut out = String::from("graph TD\n");
    let ids: HashMap<TestKey, String> = graph
        .tasks()
        .enumerate()
        .map(|(i, key)| (key.clone(), format!("t{i}")))
        .collect();

    for key in graph.tasks() {
        let Some(id) = ids.get(key) else { continue };
        let _ = writeln!(out, "    {id}[\"{}\"]", escape(&label(key, statuses)));
    }
    for key in graph.tasks() {
        let Some(to) = ids.get(key) else { continue };
        for dep in graph.dependencies_of(key) {
            if let Some(from) = ids.get(&dep) {
                let _ = writeln!(out, "    {from} --> {to}");
            }
        }
    }
    out
}

fn label(key: &TestKey, statuses: &HashMap<TestKey, TestStatus>) -> String {
    match statuses.get(key) {
        Some(status) => format!("{key} [{status}]"),
        None => key.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "#quot;")
}
