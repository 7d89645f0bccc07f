//! Aspire Domain Graph Algorithms
//!
//! Pure, synchronous computations over a snapshot of the domain graph.
//! Nothing in this crate talks to the backend or mutates the store.
//!
//! # Architecture
//!
//! ```text
//! nodes + edges + collections (from GraphStore)
//!        │
//!        ├──► layout::layout_flat      (layered drawing of the whole graph)
//!        │
//!        ├──► layout::layout_modules   (per-module drawings placed on a module graph)
//!        │          │
//!        │          └──► cycles        (inter-module edge counts, strongest direction wins)
//!        │
//!        └──► reduction                (edges implied by a longer path)
//! ```

pub mod cycles;
pub mod layout;
pub mod reduction;

pub use cycles::{resolve_module_cycles, ModuleEdge, ModuleEdgeCounts};
pub use layout::{
    layout_flat, layout_modules, Acyclicer, Alignment, Layout, LayoutConfig, LayoutMethod,
    Point, PositionMap, RankDirection, Ranker,
};
pub use reduction::{adjacency_list, reachable_sets, redundant_edges, Adjacency, ReachableSets};
