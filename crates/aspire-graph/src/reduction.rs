//! Transitive reduction analysis
//!
//! An edge `u → v` is redundant when `v` is already reachable from `u`
//! through some other concept. The result is advisory; callers decide
//! whether to highlight or propose deletion.

use std::collections::{BTreeMap, BTreeSet};

use aspire_types::{Edge, EdgeKey};

/// Node id → direct successors
pub type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// Node id → every node reachable from it
pub type ReachableSets = BTreeMap<String, BTreeSet<String>>;

/// Successor lists over edges not marked for deletion
pub fn adjacency_list<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for edge in edges.into_iter().filter(|e| e.is_active()) {
        adjacency
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone());
        adjacency.entry(edge.target.clone()).or_default();
    }
    adjacency
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Visiting,
    Done,
}

/// Reachable sets via iterative DFS with memoization.
///
/// A successor that is still on the stack contributes itself but not its
/// (incomplete) set, so cycles terminate. Inside a cycle the sets are
/// therefore partial.
pub fn reachable_sets(adjacency: &Adjacency) -> ReachableSets {
    let mut state: BTreeMap<&str, Visit> = BTreeMap::new();
    let mut reach = ReachableSets::new();

    for root in adjacency.keys() {
        if state.contains_key(root.as_str()) {
            continue;
        }
        let root = root.as_str();
        state.insert(root, Visit::Visiting);
        let mut stack: Vec<(&str, Vec<&str>)> = vec![(root, successors(adjacency, root))];

        loop {
            let next = match stack.last_mut() {
                Some((_, pending)) => pending.pop(),
                None => break,
            };

            if let Some(child) = next {
                if !state.contains_key(child) {
                    state.insert(child, Visit::Visiting);
                    stack.push((child, successors(adjacency, child)));
                }
                continue;
            }

            let Some((node, _)) = stack.pop() else {
                break;
            };
            let mut set = BTreeSet::new();
            for child in adjacency.get(node).into_iter().flatten() {
                set.insert(child.clone());
                if state.get(child.as_str()) == Some(&Visit::Done) {
                    if let Some(child_set) = reach.get(child) {
                        set.extend(child_set.iter().cloned());
                    }
                }
            }
            state.insert(node, Visit::Done);
            reach.insert(node.to_string(), set);
        }
    }

    reach
}

fn successors<'a>(adjacency: &'a Adjacency, node: &str) -> Vec<&'a str> {
    adjacency
        .get(node)
        .map(|targets| targets.iter().rev().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Keys of every active edge implied by a longer path
pub fn redundant_edges(edges: &BTreeMap<EdgeKey, Edge>) -> BTreeSet<EdgeKey> {
    let adjacency = adjacency_list(edges.values());
    let reach = reachable_sets(&adjacency);
    let empty = BTreeSet::new();

    let redundant: BTreeSet<EdgeKey> = edges
        .values()
        .filter(|e| e.is_active())
        .filter(|edge| {
            let (u, v) = (&edge.source, &edge.target);
            reach.get(u).unwrap_or(&empty).iter().any(|w| {
                w != u && w != v && reach.get(w).is_some_and(|from_w| from_w.contains(v))
            })
        })
        .map(Edge::key)
        .collect();

    tracing::debug!(redundant = redundant.len(), "transitive reduction computed");
    redundant
}
