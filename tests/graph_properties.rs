// tests/graph_properties.rs

use std::collections::HashSet;

use proptest::prelude::*;
use testdag::dag::DependencyGraph;
use testdag::types::TestKey;

// Strategy to generate a valid DAG as (key, dependency keys) pairs.
// Acyclicity is guaranteed by only allowing task N to depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<(TestKey, Vec<TestKey>)>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(move |raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential_deps)| {
                    let key = TestKey::titled(format!("task_{i}"));
                    // Sanitize dependencies: only allow deps < i.
                    let mut valid: HashSet<usize> = HashSet::new();
                    for dep_idx in potential_deps {
                        if i > 0 {
                            valid.insert(dep_idx % i);
                        }
                    }
                    let deps = valid
                        .into_iter()
                        .map(|d| TestKey::titled(format!("task_{d}")))
                        .collect();
                    (key, deps)
                })
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn topological_sort_respects_every_edge(cases in dag_strategy(12)) {
        let mut graph = DependencyGraph::new();
        for (key, deps) in &cases {
            graph.add_case(key.clone(), deps);
        }

        let order = graph.topological_sort().expect("generated graphs are acyclic");
        prop_assert_eq!(order.len(), graph.len());

        let position = |k: &TestKey| order.iter().position(|o| o == k).unwrap();
        for (key, deps) in &cases {
            for dep in deps {
                prop_assert!(
                    position(dep) < position(key),
                    "{} must precede {}", dep, key
                );
            }
        }
    }

    #[test]
    fn execution_order_contains_exactly_the_closure(cases in dag_strategy(12)) {
        let mut graph = DependencyGraph::new();
        for (key, deps) in &cases {
            graph.add_case(key.clone(), deps);
        }

        for (key, _) in &cases {
            let order = graph.execution_order(key).expect("acyclic");
            prop_assert_eq!(order.last(), Some(key));

            // Everything listed must be reachable, and every direct
            // dependency of a listed task must also be listed before it.
            let position = |k: &TestKey| order.iter().position(|o| o == k);
            for listed in &order {
                for dep in graph.dependencies_of(listed) {
                    let dep_pos = position(&dep);
                    prop_assert!(dep_pos.is_some(), "{} missing from closure", dep);
                    prop_assert!(dep_pos.unwrap() < position(listed).unwrap());
                }
            }
        }
    }
}
