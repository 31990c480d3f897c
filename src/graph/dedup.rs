//! Edge deduplication
//!
//! A traversal may report one relation from both ends. Sources are walked in
//! sorted order and the first orientation seen for an unordered pair is kept;
//! each surviving edge list is sorted by target.

use std::collections::HashSet;

use super::{AdjacencyList, Edge};

pub fn dedup_edges(edges: &AdjacencyList) -> AdjacencyList {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut deduped = AdjacencyList::new();

    for (source, targets) in edges {
        for edge in targets {
            let target = edge.node.as_str();
            if target == source.as_str() {
                continue;
            }
            let pair = if source.as_str() < target {
                (source.as_str(), target)
            } else {
                (target, source.as_str())
            };
            if seen.insert(pair) {
                deduped
                    .entry(source.clone())
                    .or_insert_with(Vec::new)
                    .push(edge.clone());
            }
        }
    }

    for targets in deduped.values_mut() {
        targets.sort_by(|a, b| a.node.cmp(&b.node));
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(pairs: &[(&str, &str)]) -> AdjacencyList {
        let mut edges = AdjacencyList::new();
        for (source, target) in pairs {
            edges
                .entry(source.to_string())
                .or_default()
                .push(Edge::explicit(*target));
        }
        edges
    }

    #[test]
    fn test_reverse_edge_is_dropped() {
        let deduped = dedup_edges(&adjacency(&[("svc", "web pods"), ("web pods", "svc")]));
        assert_eq!(deduped, adjacency(&[("svc", "web pods")]));
    }

    #[test]
    fn test_duplicates_and_self_loops_are_dropped() {
        let deduped = dedup_edges(&adjacency(&[("a", "b"), ("a", "b"), ("a", "a")]));
        assert_eq!(deduped, adjacency(&[("a", "b")]));
    }

    #[test]
    fn test_targets_are_sorted() {
        let deduped = dedup_edges(&adjacency(&[("d", "z"), ("d", "b"), ("d", "m")]));
        let targets: Vec<_> = deduped["d"].iter().map(|e| e.node.as_str()).collect();
        assert_eq!(targets, vec!["b", "m", "z"]);
    }

    #[test]
    fn test_result_is_independent_of_insertion_order() {
        let forward = dedup_edges(&adjacency(&[("a", "b"), ("b", "a"), ("b", "c")]));
        let backward = dedup_edges(&adjacency(&[("b", "c"), ("b", "a"), ("a", "b")]));
        assert_eq!(forward, backward);
    }
}
