use healthcheck_core::constants::HealthStatus;
use healthcheck_core::dependencies::DependencyGraph;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

fn node(index: usize) -> String {
    format!("svc-{index:02}")
}

/// Node `i` may only depend on nodes with a smaller index, so the graph is
/// always acyclic
fn dag_strategy() -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1usize..20).prop_flat_map(|size| {
        prop::collection::vec(prop::collection::btree_set(0..size, 0..4), size).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(index, deps)| deps.into_iter().filter(|dep| *dep < index).collect())
                .collect()
        })
    })
}

fn build_graph(edges: &[BTreeSet<usize>]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    // Insert in reverse so placeholder back-filling is exercised
    for (index, deps) in edges.iter().enumerate().rev() {
        graph.add_node(&node(index), deps.iter().map(|dep| node(*dep)));
    }
    graph
}

fn status_strategy() -> impl Strategy<Value = HealthStatus> {
    prop_oneof![
        Just(HealthStatus::Healthy),
        Just(HealthStatus::Degraded),
        Just(HealthStatus::Unhealthy),
    ]
}

fn severity(status: HealthStatus) -> u8 {
    match status {
        HealthStatus::Healthy => 0,
        HealthStatus::Degraded => 1,
        HealthStatus::Unhealthy => 2,
    }
}

proptest! {
    /// Property: every dependency precedes its dependents in the order
    #[test]
    fn topological_order_respects_every_edge(edges in dag_strategy()) {
        let graph = build_graph(&edges);
        let order = graph.topological_sort();
        prop_assert_eq!(order.len(), edges.len());

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();

        for (index, deps) in edges.iter().enumerate() {
            let dependent = node(index);
            for dep in deps {
                let dependency = node(*dep);
                prop_assert!(
                    position[dependency.as_str()] < position[dependent.as_str()],
                    "{} must come before {}", dependency, dependent
                );
            }
        }
        prop_assert!(graph.validate_cycles().is_ok());
    }

    /// Property: the order is a pure function of the graph contents
    #[test]
    fn topological_order_is_deterministic(edges in dag_strategy()) {
        let first = build_graph(&edges).topological_sort();
        let second = build_graph(&edges).topological_sort();
        prop_assert_eq!(first, second);
    }

    /// Property: closing a chain into a ring always yields an empty order
    #[test]
    fn closed_chain_is_a_cycle(size in 2usize..15) {
        let mut graph = DependencyGraph::new();
        for index in 1..size {
            graph.add_node(&node(index), [node(index - 1)]);
        }
        graph.add_node(&node(0), [node(size - 1)]);

        prop_assert!(graph.topological_sort().is_empty());
        prop_assert!(graph.validate_cycles().is_err());
    }

    /// Property: the aggregate status is the most severe input, in any order
    #[test]
    fn worst_status_is_most_severe(statuses in prop::collection::vec(status_strategy(), 0..12)) {
        let folded = HealthStatus::worst_of(statuses.iter().copied());
        let expected = statuses.iter().map(|s| severity(*s)).max().unwrap_or(0);
        prop_assert_eq!(severity(folded), expected);

        let reversed = HealthStatus::worst_of(statuses.iter().rev().copied());
        prop_assert_eq!(folded, reversed);
    }
}
