//! Topological ordering and component analysis
//!
//! # Algorithms
//!
//! Topological sort uses Kahn's algorithm: compute in-degree per node, seed
//! a min-heap with zero-in-degree nodes, repeatedly pop the smallest id,
//! append it to the result, and decrement dependents. Ready nodes come out
//! in id order, so the result is a pure function of graph structure rather
//! than of insertion history — structurally equal graphs sort identically.
//! If fewer nodes come out than went in, the graph contains a cycle — a
//! hard failure here, since analytics assume callers validated admission.
//!
//! Strongly connected components use Tarjan's algorithm with an explicit
//! frame stack (no recursion, so arbitrarily deep graphs cannot overflow
//! the call stack). Any component with more than one member is a cycle that
//! slipped past validation; [`crate::analysis::analyze`] uses this as a
//! defensive consistency check.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{ResolverError, Result};
use crate::graph::DependencyGraph;

/// Full topological order over the graph, dependencies before dependents.
///
/// Ties break by id, so the order does not depend on insertion history.
pub fn topological_sort(graph: &DependencyGraph) -> Result<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut ready: BinaryHeap<Reverse<&str>> = BinaryHeap::new();
    let mut result: Vec<String> = Vec::with_capacity(graph.len());

    for node in graph.iter() {
        // Count only edges that resolve inside the graph.
        let degree = node
            .dependencies()
            .iter()
            .filter(|d| graph.contains(d))
            .count();
        in_degree.insert(node.id(), degree);
        if degree == 0 {
            ready.push(Reverse(node.id()));
        }
    }

    while let Some(Reverse(id)) = ready.pop() {
        result.push(id.to_string());

        let node = graph.get(id).expect("ready id exists in the graph");
        for dependent in node.dependents() {
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push(Reverse(dependent.as_str()));
                }
            }
        }
    }

    if result.len() < graph.len() {
        let mut stuck: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        stuck.sort_unstable();
        return Err(ResolverError::CycleDetected(stuck));
    }

    Ok(result)
}

/// Strongly connected components, Tarjan's algorithm.
///
/// Singleton components are included; components with more than one member
/// indicate a cycle. Members and the component list are sorted, so the
/// output does not depend on insertion history.
pub fn strongly_connected_components(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let successors = |id: &str| -> Vec<&str> {
        graph
            .get(id)
            .map(|node| node.dependents().iter().map(String::as_str).collect())
            .unwrap_or_default()
    };

    let mut counter = 0usize;
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut lowlink: HashMap<&str, usize> = HashMap::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut components: Vec<Vec<String>> = Vec::new();

    // (node, successor list, cursor) frames for the iterative DFS.
    let mut frames: Vec<(&str, Vec<&str>, usize)> = Vec::new();

    for root in graph.ids() {
        if index.contains_key(root) {
            continue;
        }

        index.insert(root, counter);
        lowlink.insert(root, counter);
        counter += 1;
        stack.push(root);
        on_stack.insert(root);
        frames.push((root, successors(root), 0));

        while !frames.is_empty() {
            let (current, next_child) = {
                let (id, succ, cursor) = frames.last_mut().expect("frames is non-empty");
                let child = succ.get(*cursor).copied();
                if child.is_some() {
                    *cursor += 1;
                }
                (*id, child)
            };

            match next_child {
                Some(child) if !index.contains_key(child) => {
                    index.insert(child, counter);
                    lowlink.insert(child, counter);
                    counter += 1;
                    stack.push(child);
                    on_stack.insert(child);
                    frames.push((child, successors(child), 0));
                }
                Some(child) => {
                    if on_stack.contains(child) {
                        let child_index = index[child];
                        let entry = lowlink.get_mut(current).expect("visited node has lowlink");
                        *entry = (*entry).min(child_index);
                    }
                }
                None => {
                    let (id, _, _) = frames.pop().expect("frames is non-empty");
                    if lowlink[id] == index[id] {
                        let mut component = Vec::new();
                        loop {
                            let member = stack.pop().expect("root is still on the stack");
                            on_stack.remove(member);
                            component.push(member.to_string());
                            if member == id {
                                break;
                            }
                        }
                        components.push(component);
                    }
                    if let Some((parent, _, _)) = frames.last() {
                        let child_low = lowlink[id];
                        let entry = lowlink.get_mut(*parent).expect("visited node has lowlink");
                        *entry = (*entry).min(child_low);
                    }
                }
            }
        }
    }

    for component in &mut components {
        component.sort_unstable();
    }
    components.sort_unstable();
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{IndicatorNode, NodeMetadata};

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (id, deps) in edges {
            g.add_node(IndicatorNode::new(
                *id,
                deps.iter().map(|d| d.to_string()),
                NodeMetadata::default(),
            ))
            .unwrap();
        }
        g
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    #[test]
    fn topological_sort_orders_dependencies_first() {
        let g = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);

        let order = topological_sort(&g).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
        assert!(position(&order, "b") < position(&order, "d"));
        assert!(position(&order, "c") < position(&order, "d"));
    }

    #[test]
    fn topological_sort_ignores_insertion_history() {
        let one = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);
        let two = graph(&[
            ("d", &["b", "c"]),
            ("c", &["a"]),
            ("b", &["a"]),
            ("a", &[]),
        ]);

        let order = topological_sort(&one).unwrap();
        assert_eq!(order, topological_sort(&two).unwrap());
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn topological_sort_of_empty_graph() {
        let g = DependencyGraph::new();
        assert!(topological_sort(&g).unwrap().is_empty());
    }

    #[test]
    fn topological_sort_fails_on_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);

        let err = topological_sort(&g).unwrap_err();
        match err {
            ResolverError::CycleDetected(ids) => {
                assert!(ids.contains(&"a".to_string()));
                assert!(ids.contains(&"b".to_string()));
                assert!(!ids.contains(&"c".to_string()));
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn scc_on_acyclic_graph_is_all_singletons() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);

        let components = strongly_connected_components(&g);
        assert_eq!(components.len(), 3);
        assert!(components.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn scc_groups_cycle_members() {
        let g = graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"]), ("d", &["c"])]);

        let components = strongly_connected_components(&g);
        let big: Vec<_> = components.iter().filter(|c| c.len() > 1).collect();
        assert_eq!(big.len(), 1);
        let mut members = big[0].clone();
        members.sort();
        assert_eq!(members, vec!["a", "b", "c"]);
    }

    #[test]
    fn scc_handles_two_disjoint_cycles() {
        let g = graph(&[
            ("a", &["b"]),
            ("b", &["a"]),
            ("x", &["y"]),
            ("y", &["x"]),
        ]);

        let components = strongly_connected_components(&g);
        let big: Vec<_> = components.iter().filter(|c| c.len() > 1).collect();
        assert_eq!(big.len(), 2);
    }
}
