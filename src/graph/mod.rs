//! Immutable influence graph in compressed incoming-adjacency (CSC) form.
//!
//! An edge `u -> v` means "`u` influences `v`". The diffusion update only ever
//! asks "who points into `v`?", so edges are stored column-major: the sources
//! of every node sit contiguously in one flat array.
//!
//! Memory layout:
//! - `offsets`: `Vec<usize>` of length `n + 1`, `offsets[0] == 0`, non-decreasing
//! - `sources`: `Vec<NodeId>` of length `offsets[n]`; `sources[offsets[v]..offsets[v + 1]]`
//!   lists every `u` with an edge `u -> v`, duplicates included
//!
//! The graph is built once (usually by [`GraphLoader`]) and only read afterwards,
//! so it is shared by reference across worker threads without locking.

mod loader;

pub use loader::{GraphLoader, LoadReport, OutOfRangePolicy};

use std::fmt;

/// Index handle for a node in an [`InfluenceGraph`].
///
/// Handles are plain indices in `0..node_count()`; the graph owns all storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Wraps a raw node index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw index, usable to address per-node state.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A static directed graph stored as compressed incoming adjacency.
///
/// ### Performance Characteristics
/// | Operation | Complexity | Notes |
/// |-----------|------------|-------|
/// | `from_edges` | \(O(n + m)\) | Counting pass + fill pass |
/// | `in_neighbors` | \(O(1)\) | Returns a slice of sources |
/// | `in_degree` | \(O(1)\) | Offset difference |
/// | `has_edge` | \(O(\text{in-degree})\) | Linear scan of sources |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluenceGraph {
    offsets: Vec<usize>,
    sources: Vec<NodeId>,
}

impl InfluenceGraph {
    /// Builds the incoming adjacency of `node_count` nodes from `(u, v)` edges.
    ///
    /// Sources within a node keep the order in which their edges appear.
    ///
    /// # Panics
    ///
    /// Panics if `node_count == 0` or any edge references a node out of bounds.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Self {
        assert!(node_count > 0, "graph must have at least one node");

        // Count incoming edges for each node.
        let mut in_degrees = vec![0usize; node_count];
        for &(u, v) in edges {
            assert!(
                u < node_count && v < node_count,
                "edge {u}->{v} is out of bounds for n={node_count}"
            );
            in_degrees[v] += 1;
        }

        // Prefix sums of in-degrees.
        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut total = 0usize;
        offsets.push(total);
        for deg in in_degrees {
            total += deg;
            offsets.push(total);
        }

        // Second pass: place each source at its target's write cursor.
        let mut sources = vec![NodeId(0); total];
        let mut cursor = offsets[..node_count].to_vec();
        for &(u, v) in edges {
            sources[cursor[v]] = NodeId(u);
            cursor[v] += 1;
        }

        Self { offsets, sources }
    }

    /// Builds a graph directly from CSC parts.
    ///
    /// # Panics
    /// - if `offsets.len() < 2` or `offsets[0] != 0`
    /// - if offsets are not monotone
    /// - if `offsets.last() != sources.len()`
    /// - if any source is out of bounds
    pub fn from_parts(offsets: Vec<usize>, sources: Vec<usize>) -> Self {
        assert!(offsets.len() >= 2, "offsets must have length n+1 with n >= 1");
        assert_eq!(offsets[0], 0, "offsets must start at 0");
        let n = offsets.len() - 1;
        for w in offsets.windows(2) {
            assert!(w[0] <= w[1], "offsets must be monotone");
        }
        assert!(
            offsets[n] == sources.len(),
            "offsets last must equal sources length"
        );
        for &u in &sources {
            assert!(u < n, "source {u} out of bounds for n={n}");
        }
        let sources = sources.into_iter().map(NodeId).collect();
        Self { offsets, sources }
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of stored edges (duplicates counted).
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.sources.len()
    }

    /// Iterates over every node handle in index order.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId)
    }

    /// The nodes with an edge into `node`, with multiplicity.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of bounds.
    #[inline]
    pub fn in_neighbors(&self, node: NodeId) -> &[NodeId] {
        let v = node.index();
        assert!(v < self.node_count(), "node {v} out of bounds");
        &self.sources[self.offsets[v]..self.offsets[v + 1]]
    }

    /// The in-degree of `node`.
    #[inline]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.in_neighbors(node).len()
    }

    /// `true` if no edge points into `node`; such nodes never change state.
    #[inline]
    pub fn is_isolated(&self, node: NodeId) -> bool {
        self.in_degree(node) == 0
    }

    /// Checks if an edge exists from `source` to `target`.
    pub fn has_edge(&self, source: NodeId, target: NodeId) -> bool {
        assert!(
            source.index() < self.node_count(),
            "source {source} out of bounds"
        );
        self.in_neighbors(target).contains(&source)
    }

    /// Iterates over all edges as `(source, target)`, grouped by target.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes()
            .flat_map(move |v| self.in_neighbors(v).iter().map(move |&u| (u, v)))
    }

    /// Largest in-degree in the graph.
    pub fn max_in_degree(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes without incoming edges.
    pub fn isolated_count(&self) -> usize {
        self.offsets.windows(2).filter(|w| w[0] == w[1]).count()
    }

    /// Returns the underlying CSC data.
    pub fn csc_parts(&self) -> (&[usize], &[NodeId]) {
        (&self.offsets, &self.sources)
    }
}
