//! Module-level cycle resolution
//!
//! Concept edges that cross module boundaries are aggregated into directed
//! module-to-module counts. Wherever both directions exist between a pair of
//! modules, only the stronger one survives; ties go to the direction that was
//! counted first.

use std::collections::{BTreeMap, HashMap, HashSet};

use aspire_types::{CollectionId, Edge, EdgeKey, Node};

/// Directed module pair with the number of concept edges behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleEdge {
    pub source: CollectionId,
    pub target: CollectionId,
    pub count: usize,
}

/// Directed counts in first-seen order.
///
/// Counting `a → b` also registers `b → a` with zero so the pair is
/// considered exactly once, at the position where it first appeared.
#[derive(Debug, Clone, Default)]
pub struct ModuleEdgeCounts {
    entries: Vec<ModuleEdge>,
    index: HashMap<(CollectionId, CollectionId), usize>,
}

impl ModuleEdgeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, source: CollectionId, target: CollectionId) -> usize {
        if let Some(&i) = self.index.get(&(source, target)) {
            return i;
        }
        self.entries.push(ModuleEdge {
            source,
            target,
            count: 0,
        });
        let i = self.entries.len() - 1;
        self.index.insert((source, target), i);
        i
    }

    pub fn increment(&mut self, source: CollectionId, target: CollectionId) {
        let i = self.slot(source, target);
        self.entries[i].count += 1;
        self.slot(target, source);
    }

    pub fn count(&self, source: CollectionId, target: CollectionId) -> usize {
        self.index
            .get(&(source, target))
            .map(|&i| self.entries[i].count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleEdge> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count every active concept edge whose endpoints sit in different
    /// modules. A concept in several modules contributes once per
    /// (source module, target module) combination.
    pub fn aggregate(
        nodes: &BTreeMap<String, Node>,
        edges: &BTreeMap<EdgeKey, Edge>,
        module_ids: &[CollectionId],
    ) -> Self {
        let modules: HashSet<CollectionId> = module_ids.iter().copied().collect();
        let mut counts = Self::new();

        for edge in edges.values().filter(|e| e.is_active()) {
            let (Some(source), Some(target)) = (nodes.get(&edge.source), nodes.get(&edge.target))
            else {
                continue;
            };
            for &s in source.module.iter().filter(|m| modules.contains(m)) {
                for &t in target.module.iter().filter(|m| modules.contains(m)) {
                    if s != t {
                        counts.increment(s, t);
                    }
                }
            }
        }

        counts
    }
}

/// Keep one direction per module pair: the larger count, first-seen on a tie
pub fn resolve_module_cycles(counts: &ModuleEdgeCounts) -> Vec<ModuleEdge> {
    let mut decided: HashSet<(CollectionId, CollectionId)> = HashSet::new();
    let mut kept = Vec::new();

    for edge in counts.iter() {
        let pair = if edge.source < edge.target {
            (edge.source, edge.target)
        } else {
            (edge.target, edge.source)
        };
        if !decided.insert(pair) {
            continue;
        }

        let reverse = counts.count(edge.target, edge.source);
        if edge.count >= reverse {
            kept.push(*edge);
        } else {
            kept.push(ModuleEdge {
                source: edge.target,
                target: edge.source,
                count: reverse,
            });
        }
    }

    tracing::debug!(pairs = kept.len(), "module cycles resolved");
    kept
}
