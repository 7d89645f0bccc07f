//! Layered layout core
//!
//! Phases, in order:
//!
//! 1. cycle breaking (edges reversed for ranking only)
//! 2. rank assignment
//! 3. long edges split with virtual nodes
//! 4. barycenter crossing reduction
//! 5. coordinate assignment, then the rank direction transform
//!
//! All phases iterate nodes in input order, so equal inputs give equal output.

use std::collections::{BTreeSet, HashMap};

use super::config::{Acyclicer, LayoutConfig, RankDirection, Ranker};
use super::{Layout, Point, PositionMap};

/// Maximum barycenter sweep rounds
const ORDER_ITERATIONS: usize = 8;

/// A box to place; `width`/`height` are in final (x/y) space
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NodeBox {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

impl NodeBox {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    pub fn square(id: impl Into<String>, size: f64) -> Self {
        Self::new(id, size, size)
    }
}

/// Dense working graph. Real nodes occupy `0..real`, virtual nodes follow.
struct LayeredGraph {
    real: usize,
    /// Extent along the in-rank axis
    breadth: Vec<f64>,
    /// Extent along the rank axis
    depth: Vec<f64>,
    rank: Vec<usize>,
    succ: Vec<Vec<usize>>,
    pred: Vec<Vec<usize>>,
}

impl LayeredGraph {
    fn len(&self) -> usize {
        self.rank.len()
    }

    fn is_virtual(&self, v: usize) -> bool {
        v >= self.real
    }

    fn push_virtual(&mut self, rank: usize) -> usize {
        self.breadth.push(0.0);
        self.depth.push(0.0);
        self.rank.push(rank);
        self.succ.push(Vec::new());
        self.pred.push(Vec::new());
        self.len() - 1
    }

    fn link(&mut self, u: usize, v: usize) {
        self.succ[u].push(v);
        self.pred[v].push(u);
    }
}

pub(crate) fn layered_layout(
    boxes: &[NodeBox],
    links: &[(String, String)],
    config: &LayoutConfig,
) -> Layout {
    if boxes.is_empty() {
        return Layout::default();
    }

    let n = boxes.len();
    let index: HashMap<&str, usize> = boxes
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id.as_str(), i))
        .collect();

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (source, target) in links {
        match (index.get(source.as_str()), index.get(target.as_str())) {
            (Some(&u), Some(&v)) if u != v => {
                pairs.insert((u, v));
            }
            _ => tracing::debug!(%source, %target, "edge ignored by layered layout"),
        }
    }
    let edges: Vec<(usize, usize)> = pairs.into_iter().collect();

    // Phase 1 + 2
    let dag = break_cycles(n, &edges, config.acyclicer);
    let (mut ranks, topo) = longest_path_ranks(n, &dag);
    if config.ranker == Ranker::TightTree {
        tighten_ranks(&dag, &topo, &mut ranks);
    }
    compact_ranks(&mut ranks);

    // Phase 3
    let horizontal = config.direction.is_horizontal();
    let mut graph = LayeredGraph {
        real: n,
        breadth: boxes
            .iter()
            .map(|b| if horizontal { b.height } else { b.width })
            .collect(),
        depth: boxes
            .iter()
            .map(|b| if horizontal { b.width } else { b.height })
            .collect(),
        rank: ranks,
        succ: vec![Vec::new(); n],
        pred: vec![Vec::new(); n],
    };
    for &(u, v) in &dag {
        let mut prev = u;
        for r in (graph.rank[u] + 1)..graph.rank[v] {
            let dummy = graph.push_virtual(r);
            graph.link(prev, dummy);
            prev = dummy;
        }
        graph.link(prev, v);
    }

    // Phase 4
    let mut rank_order = rank_buckets(&graph);
    minimize_crossings(&mut rank_order, &graph);

    // Phase 5
    let (breadth_pos, order_extent) = assign_breadth(&rank_order, &graph, config);
    let (depth_pos, rank_extent) = assign_depth(&rank_order, &graph, config);

    let mut positions = PositionMap::new();
    for (v, node) in boxes.iter().enumerate() {
        let along = breadth_pos[v];
        let across = depth_pos[v];
        let point = match config.direction {
            RankDirection::TB => Point::new(along, across),
            RankDirection::BT => Point::new(along, rank_extent - across),
            RankDirection::LR => Point::new(across, along),
            RankDirection::RL => Point::new(rank_extent - across, along),
        };
        positions.insert(node.id.clone(), point);
    }

    let (width, height) = if horizontal {
        (rank_extent, order_extent)
    } else {
        (order_extent, rank_extent)
    };

    Layout {
        positions,
        width,
        height,
    }
}

// ── Phase 1: cycle breaking ──────────────────────────────────────────

/// Returns a duplicate-free edge list with no directed cycle
fn break_cycles(n: usize, edges: &[(usize, usize)], acyclicer: Acyclicer) -> Vec<(usize, usize)> {
    let reversed = match acyclicer {
        Acyclicer::Greedy => greedy_feedback_arcs(n, edges),
        Acyclicer::Dfs => dfs_back_edges(n, edges),
    };

    let dag: BTreeSet<(usize, usize)> = edges
        .iter()
        .map(|&(u, v)| if reversed.contains(&(u, v)) { (v, u) } else { (u, v) })
        .collect();

    if !reversed.is_empty() {
        tracing::debug!(reversed = reversed.len(), "reversed edges to break cycles");
    }
    dag.into_iter().collect()
}

/// Eades-Lin-Smyth: peel sinks to the right, sources to the left, otherwise
/// the node with the largest out-in degree difference to the left. Edges
/// pointing backwards in the resulting sequence form the feedback arc set.
fn greedy_feedback_arcs(n: usize, edges: &[(usize, usize)]) -> BTreeSet<(usize, usize)> {
    let mut succ = vec![Vec::new(); n];
    let mut pred = vec![Vec::new(); n];
    for &(u, v) in edges {
        succ[u].push(v);
        pred[v].push(u);
    }
    let mut out_degree: Vec<usize> = succ.iter().map(Vec::len).collect();
    let mut in_degree: Vec<usize> = pred.iter().map(Vec::len).collect();
    let mut removed = vec![false; n];
    let mut remaining = n;

    let mut left: Vec<usize> = Vec::with_capacity(n);
    let mut right: Vec<usize> = Vec::new();

    let remove = |v: usize,
                      removed: &mut Vec<bool>,
                      out_degree: &mut Vec<usize>,
                      in_degree: &mut Vec<usize>| {
        removed[v] = true;
        for &w in &succ[v] {
            if !removed[w] {
                in_degree[w] -= 1;
            }
        }
        for &u in &pred[v] {
            if !removed[u] {
                out_degree[u] -= 1;
            }
        }
    };

    while remaining > 0 {
        let mut progressed = true;
        while progressed {
            progressed = false;
            for v in 0..n {
                if !removed[v] && out_degree[v] == 0 {
                    remove(v, &mut removed, &mut out_degree, &mut in_degree);
                    right.push(v);
                    remaining -= 1;
                    progressed = true;
                }
            }
            for v in 0..n {
                if !removed[v] && in_degree[v] == 0 {
                    remove(v, &mut removed, &mut out_degree, &mut in_degree);
                    left.push(v);
                    remaining -= 1;
                    progressed = true;
                }
            }
        }

        let pick = (0..n)
            .filter(|&v| !removed[v])
            .max_by(|&a, &b| {
                let da = out_degree[a] as i64 - in_degree[a] as i64;
                let db = out_degree[b] as i64 - in_degree[b] as i64;
                // lowest index wins ties
                da.cmp(&db).then_with(|| b.cmp(&a))
            });
        if let Some(v) = pick {
            remove(v, &mut removed, &mut out_degree, &mut in_degree);
            left.push(v);
            remaining -= 1;
        }
    }

    left.extend(right.into_iter().rev());
    let mut position = vec![0usize; n];
    for (i, &v) in left.iter().enumerate() {
        position[v] = i;
    }

    edges
        .iter()
        .copied()
        .filter(|&(u, v)| position[u] > position[v])
        .collect()
}

/// Edges that close a cycle during an iterative DFS in index order
fn dfs_back_edges(n: usize, edges: &[(usize, usize)]) -> BTreeSet<(usize, usize)> {
    let mut succ = vec![Vec::new(); n];
    for &(u, v) in edges {
        succ[u].push(v);
    }

    // 0 = unvisited, 1 = on stack, 2 = finished
    let mut state = vec![0u8; n];
    let mut back = BTreeSet::new();

    for root in 0..n {
        if state[root] != 0 {
            continue;
        }
        state[root] = 1;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(v, next)) = stack.last() {
            if let Some(&w) = succ[v].get(next) {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match state[w] {
                    0 => {
                        state[w] = 1;
                        stack.push((w, 0));
                    }
                    1 => {
                        back.insert((v, w));
                    }
                    _ => {}
                }
            } else {
                state[v] = 2;
                stack.pop();
            }
        }
    }

    back
}

// ── Phase 2: rank assignment ─────────────────────────────────────────

/// Kahn's algorithm; every node lands one rank after its latest predecessor.
/// Also returns the topological order used.
fn longest_path_ranks(n: usize, dag: &[(usize, usize)]) -> (Vec<usize>, Vec<usize>) {
    let mut succ = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for &(u, v) in dag {
        succ[u].push(v);
        in_degree[v] += 1;
    }

    let mut ranks = vec![0usize; n];
    let mut order: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut head = 0;
    while head < order.len() {
        let u = order[head];
        head += 1;
        for &v in &succ[u] {
            ranks[v] = ranks[v].max(ranks[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                order.push(v);
            }
        }
    }

    (ranks, order)
}

/// Pull every node with successors up to just below its nearest successor,
/// shortening edges out of sources and side branches.
fn tighten_ranks(dag: &[(usize, usize)], topo: &[usize], ranks: &mut [usize]) {
    let mut succ = vec![Vec::new(); ranks.len()];
    for &(u, v) in dag {
        succ[u].push(v);
    }
    for &u in topo.iter().rev() {
        if let Some(nearest) = succ[u].iter().map(|&v| ranks[v]).min() {
            ranks[u] = nearest - 1;
        }
    }
}

/// Renumber used ranks to 0..k so no rank is empty
fn compact_ranks(ranks: &mut [usize]) {
    let used: BTreeSet<usize> = ranks.iter().copied().collect();
    let remap: HashMap<usize, usize> = used.into_iter().enumerate().map(|(i, r)| (r, i)).collect();
    for rank in ranks.iter_mut() {
        *rank = remap[&*rank];
    }
}

// ── Phase 4: ordering within ranks ───────────────────────────────────

fn rank_buckets(graph: &LayeredGraph) -> Vec<Vec<usize>> {
    let max_rank = graph.rank.iter().copied().max().unwrap_or(0);
    let mut buckets = vec![Vec::new(); max_rank + 1];
    for v in 0..graph.len() {
        buckets[graph.rank[v]].push(v);
    }
    buckets
}

fn positions_of(rank_order: &[Vec<usize>], len: usize) -> Vec<usize> {
    let mut position = vec![0usize; len];
    for rank in rank_order {
        for (i, &v) in rank.iter().enumerate() {
            position[v] = i;
        }
    }
    position
}

/// Reorder one rank by the mean position of its neighbours in the adjacent
/// rank. Nodes without neighbours keep their current slot.
fn reorder_by_barycenter(rank: &mut Vec<usize>, neighbours: &[Vec<usize>], position: &[usize]) {
    let mut scored: Vec<(usize, f64, usize)> = rank
        .iter()
        .enumerate()
        .map(|(slot, &v)| {
            let adjacent = &neighbours[v];
            let barycenter = if adjacent.is_empty() {
                slot as f64
            } else {
                adjacent.iter().map(|&w| position[w] as f64).sum::<f64>() / adjacent.len() as f64
            };
            (v, barycenter, slot)
        })
        .collect();

    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
    });

    *rank = scored.into_iter().map(|(v, _, _)| v).collect();
}

/// Crossings between `upper` and the rank below: with segments sorted by
/// upper position, every inversion of the lower positions is one crossing.
fn count_crossings(upper: &[usize], graph: &LayeredGraph, position: &[usize]) -> usize {
    let mut segments: Vec<(usize, usize)> = upper
        .iter()
        .flat_map(|&u| graph.succ[u].iter().map(move |&v| (position[u], position[v])))
        .collect();
    segments.sort_unstable();

    let mut lower: Vec<usize> = segments.into_iter().map(|(_, b)| b).collect();
    let mut scratch = vec![0; lower.len()];
    count_inversions(&mut lower, &mut scratch)
}

/// Merge sort that counts pairs `i < j` with `values[i] > values[j]`
fn count_inversions(values: &mut [usize], scratch: &mut [usize]) -> usize {
    let n = values.len();
    if n < 2 {
        return 0;
    }
    let mid = n / 2;
    let mut count = {
        let (left, right) = values.split_at_mut(mid);
        let (left_scratch, right_scratch) = scratch.split_at_mut(mid);
        count_inversions(left, left_scratch) + count_inversions(right, right_scratch)
    };

    let (mut i, mut j, mut k) = (0, mid, 0);
    while i < mid && j < n {
        if values[i] <= values[j] {
            scratch[k] = values[i];
            i += 1;
        } else {
            scratch[k] = values[j];
            count += mid - i;
            j += 1;
        }
        k += 1;
    }
    scratch[k..k + mid - i].copy_from_slice(&values[i..mid]);
    k += mid - i;
    scratch[k..n].copy_from_slice(&values[j..n]);
    values.copy_from_slice(&scratch[..n]);
    count
}

fn total_crossings(rank_order: &[Vec<usize>], graph: &LayeredGraph) -> usize {
    let position = positions_of(rank_order, graph.len());
    rank_order
        .iter()
        .map(|rank| count_crossings(rank, graph, &position))
        .sum()
}

/// Alternate downward and upward sweeps, keeping the best ordering seen
fn minimize_crossings(rank_order: &mut Vec<Vec<usize>>, graph: &LayeredGraph) {
    if rank_order.len() <= 1 {
        return;
    }

    let mut best = total_crossings(rank_order, graph);
    let mut best_order = rank_order.clone();

    for _ in 0..ORDER_ITERATIONS {
        if best == 0 {
            break;
        }

        for r in 1..rank_order.len() {
            let position = positions_of(rank_order, graph.len());
            reorder_by_barycenter(&mut rank_order[r], &graph.pred, &position);
        }
        for r in (0..rank_order.len() - 1).rev() {
            let position = positions_of(rank_order, graph.len());
            reorder_by_barycenter(&mut rank_order[r], &graph.succ, &position);
        }

        let crossings = total_crossings(rank_order, graph);
        if crossings < best {
            best = crossings;
            best_order = rank_order.clone();
        } else {
            break;
        }
    }

    *rank_order = best_order;
}

// ── Phase 5: coordinates ─────────────────────────────────────────────

/// In-rank centers. Virtual nodes take no room and contribute no gap.
/// Returns positions and the widest rank's extent.
fn assign_breadth(
    rank_order: &[Vec<usize>],
    graph: &LayeredGraph,
    config: &LayoutConfig,
) -> (Vec<f64>, f64) {
    let half_gap = |v: usize| {
        if graph.is_virtual(v) {
            0.0
        } else {
            config.node_gap() / 2.0
        }
    };

    let mut coord = vec![0.0; graph.len()];
    let mut extents = Vec::with_capacity(rank_order.len());
    for rank in rank_order {
        let mut cursor = 0.0;
        let mut prev: Option<usize> = None;
        for &v in rank {
            if let Some(p) = prev {
                cursor += half_gap(p) + half_gap(v);
            }
            coord[v] = cursor + graph.breadth[v] / 2.0;
            cursor += graph.breadth[v];
            prev = Some(v);
        }
        extents.push(cursor);
    }

    let widest = extents.iter().copied().fold(0.0_f64, f64::max);
    for (rank, extent) in rank_order.iter().zip(&extents) {
        let shift = match config.anchors_left() {
            None => (widest - extent) / 2.0,
            Some(true) => 0.0,
            Some(false) => widest - extent,
        };
        for &v in rank {
            coord[v] += shift;
        }
    }

    (coord, widest)
}

/// Rank centers; each rank is as thick as its deepest node
fn assign_depth(
    rank_order: &[Vec<usize>],
    graph: &LayeredGraph,
    config: &LayoutConfig,
) -> (Vec<f64>, f64) {
    let mut coord = vec![0.0; graph.len()];
    let mut cursor = 0.0;
    for (r, rank) in rank_order.iter().enumerate() {
        if r > 0 {
            cursor += config.rank_gap();
        }
        let thickness = rank.iter().map(|&v| graph.depth[v]).fold(0.0_f64, f64::max);
        let center = cursor + thickness / 2.0;
        for &v in rank {
            coord[v] = center;
        }
        cursor += thickness;
    }
    (coord, cursor)
}
