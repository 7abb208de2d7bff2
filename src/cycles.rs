use std::collections::HashSet;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::{DependencyEdge, DependencyGraph, DependencyNode};
use crate::types::NodeId;

/// Size-based severity of a circular reference chain.
/// Canonical thresholds: length <= 3 is low, 4-6 medium, above high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    Low,
    Medium,
    High,
}

impl CycleSeverity {
    pub fn from_length(len: usize) -> Self {
        match len {
            0..=3 => CycleSeverity::Low,
            4..=6 => CycleSeverity::Medium,
            _ => CycleSeverity::High,
        }
    }
}

/// A closed dependency path. `nodes` lists each member once, in traversal
/// order; the last node points back to the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyCycle {
    pub nodes: Vec<NodeId>,
    pub severity: CycleSeverity,
}

/// Finds circular reference chains with a depth-first traversal keeping an
/// explicit recursion stack. Cycles are deduplicated by their member node
/// set, so rotations found from different start points report once.
/// Start nodes and successors are walked in node-id order, so the reported
/// cycles do not depend on the order declarations arrived in.
pub struct CycleDetector;

impl CycleDetector {
    pub fn detect(graph: &DependencyGraph) -> Vec<DependencyCycle> {
        let g = graph.inner();
        // Node indices are compact: the graph is append-only.
        let n = g.node_count();

        let mut starts: Vec<NodeIndex> = g.node_indices().collect();
        starts.sort_by(|&a, &b| g[a].id.cmp(&g[b].id));

        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut seen: HashSet<Vec<NodeId>> = HashSet::new();
        let mut cycles = Vec::new();

        for start in starts {
            if visited[start.index()] {
                continue;
            }

            visited[start.index()] = true;
            on_stack[start.index()] = true;
            path.push(start);
            let mut stack = vec![(start, Self::successors(g, start))];

            while !stack.is_empty() {
                let next = stack.last_mut().and_then(|(_, iter)| iter.next());
                match next {
                    Some(succ) => {
                        let current = stack.last().map(|(node, _)| *node).unwrap_or(start);
                        if succ == current {
                            // Self-loops are not reported: a cycle has at
                            // least two distinct members.
                            continue;
                        }
                        if on_stack[succ.index()] {
                            let pos = path
                                .iter()
                                .position(|&idx| idx == succ)
                                .unwrap_or(path.len() - 1);
                            let ids: Vec<NodeId> =
                                path[pos..].iter().map(|&idx| g[idx].id.clone()).collect();

                            let mut key = ids.clone();
                            key.sort();
                            if seen.insert(key) {
                                cycles.push(DependencyCycle {
                                    severity: CycleSeverity::from_length(ids.len()),
                                    nodes: ids,
                                });
                            }
                        } else if !visited[succ.index()] {
                            visited[succ.index()] = true;
                            on_stack[succ.index()] = true;
                            path.push(succ);
                            stack.push((succ, Self::successors(g, succ)));
                        }
                    }
                    None => {
                        if let Some((node, _)) = stack.pop() {
                            on_stack[node.index()] = false;
                            path.pop();
                        }
                    }
                }
            }
        }

        cycles
    }

    /// Distinct successors in node-id order.
    fn successors(
        g: &DiGraph<DependencyNode, DependencyEdge>,
        node: NodeIndex,
    ) -> std::vec::IntoIter<NodeIndex> {
        let mut succ: Vec<NodeIndex> = g.neighbors(node).collect();
        succ.sort_by(|&a, &b| g[a].id.cmp(&g[b].id));
        succ.dedup();
        succ.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyNode, EdgeKind};
    use crate::types::{DeclKind, SourceLang};

    fn graph_with(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for name in nodes {
            graph.add_node(DependencyNode {
                id: NodeId(name.to_string()),
                class_name: name.to_string(),
                package: String::new(),
                language: SourceLang::Java,
                kind: DeclKind::Class,
                layer: None,
            });
        }
        for (from, to) in edges {
            graph.add_edge(
                &NodeId(from.to_string()),
                &NodeId(to.to_string()),
                EdgeKind::Usage,
            );
        }
        graph
    }

    #[test]
    fn test_two_node_cycle_reported_once() {
        let graph = graph_with(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let cycles = CycleDetector::detect(&graph);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes.len(), 2);
        assert_eq!(cycles[0].severity, CycleSeverity::Low);
    }

    #[test]
    fn test_no_cycle_in_dag() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(CycleDetector::detect(&graph).is_empty());
    }

    #[test]
    fn test_self_loop_not_reported() {
        let graph = graph_with(&["a"], &[("a", "a")]);
        assert!(CycleDetector::detect(&graph).is_empty());
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(CycleSeverity::from_length(2), CycleSeverity::Low);
        assert_eq!(CycleSeverity::from_length(3), CycleSeverity::Low);
        assert_eq!(CycleSeverity::from_length(4), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::from_length(6), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::from_length(7), CycleSeverity::High);
    }

    #[test]
    fn test_long_cycle_severity() {
        let names: Vec<String> = (0..7).map(|i| format!("n{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut edges: Vec<(&str, &str)> = Vec::new();
        for i in 0..7 {
            edges.push((name_refs[i], name_refs[(i + 1) % 7]));
        }
        let graph = graph_with(&name_refs, &edges);
        let cycles = CycleDetector::detect(&graph);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes.len(), 7);
        assert_eq!(cycles[0].severity, CycleSeverity::High);
    }

    #[test]
    fn test_two_disjoint_cycles() {
        let graph = graph_with(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")],
        );
        let cycles = CycleDetector::detect(&graph);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn test_overlapping_cycles_insertion_order_invariant() {
        // {a,b}, {b,c}, and {a,b,c} all close over shared edges
        let edges = [("a", "b"), ("b", "a"), ("b", "c"), ("c", "b"), ("c", "a")];
        let mut reversed = edges;
        reversed.reverse();

        let forward = CycleDetector::detect(&graph_with(&["a", "b", "c"], &edges));
        let backward = CycleDetector::detect(&graph_with(&["c", "b", "a"], &reversed));

        let member_sets = |cycles: &[DependencyCycle]| -> Vec<Vec<NodeId>> {
            let mut sets: Vec<Vec<NodeId>> = cycles
                .iter()
                .map(|c| {
                    let mut nodes = c.nodes.clone();
                    nodes.sort();
                    nodes
                })
                .collect();
            sets.sort();
            sets
        };

        assert_eq!(forward.len(), 3);
        assert_eq!(member_sets(&forward), member_sets(&backward));
    }

    #[test]
    fn test_multi_edges_do_not_duplicate_cycle() {
        let mut graph = graph_with(&["a", "b"], &[("a", "b"), ("b", "a")]);
        // Second kind between the same pair
        graph.add_edge(
            &NodeId("a".to_string()),
            &NodeId("b".to_string()),
            EdgeKind::Composition,
        );
        let cycles = CycleDetector::detect(&graph);
        assert_eq!(cycles.len(), 1);
    }
}
