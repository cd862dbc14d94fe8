//! Edge-list parser producing an [`InfluenceGraph`].
//!
//! Format: blank lines and lines starting with `#` are ignored. The first line
//! holding two integers is the header `N M`; `N` is authoritative, `M` is only
//! the expected edge count. Every later line holding two integers is an edge
//! `u v`; anything else is skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::InfluenceGraph;
use crate::error::{Error, IoStage, Result};
use crate::persist::LossyLines;

/// Upper bound on the edge buffer reserved from an untrusted header.
const MAX_RESERVED_EDGES: usize = 1 << 24;

/// What to do with an edge whose endpoint lies outside `[0, N)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Drop the edge, count it in [`LoadReport::dropped_edges`] and continue.
    #[default]
    Drop,
    /// Fail the load with [`Error::GraphFormat`].
    Reject,
}

/// Data-quality summary of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// `N` from the header.
    pub declared_nodes: usize,
    /// `M` from the header, as written.
    pub declared_edges: i64,
    /// Lines parsed as edges, including ones later dropped.
    pub parsed_edges: usize,
    /// Edges dropped for an endpoint outside `[0, N)`.
    pub dropped_edges: usize,
    /// Significant lines after the header that did not hold two integers.
    pub skipped_lines: usize,
}

impl LoadReport {
    /// Edges kept in the graph.
    pub fn kept_edges(&self) -> usize {
        self.parsed_edges - self.dropped_edges
    }

    /// `true` when the header's `M` disagrees with the edges actually parsed.
    pub fn edge_count_mismatch(&self) -> bool {
        i64::try_from(self.parsed_edges).map_or(true, |read| read != self.declared_edges)
    }

    /// `true` if the load raised any consistency warning.
    pub fn has_warnings(&self) -> bool {
        self.edge_count_mismatch() || self.dropped_edges > 0
    }
}

/// Reads edge-list files into [`InfluenceGraph`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphLoader {
    out_of_range: OutOfRangePolicy,
}

impl GraphLoader {
    /// A loader with the default (dropping) out-of-range policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects how out-of-range endpoints are handled.
    #[must_use]
    pub fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }

    /// Loads the graph file at `path`.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<(InfluenceGraph, LoadReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(IoStage::GraphOpen, path, e))?;
        self.parse(BufReader::new(file), path)
    }

    /// Loads a graph from any buffered reader.
    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<(InfluenceGraph, LoadReport)> {
        self.parse(reader, Path::new("<reader>"))
    }

    fn parse<R: BufRead>(&self, reader: R, origin: &Path) -> Result<(InfluenceGraph, LoadReport)> {
        let mut lines = LossyLines::new(reader).enumerate();
        let mut report = LoadReport::default();

        let (n, m) = loop {
            let Some((_, line)) = lines.next() else {
                return Err(Error::GraphFormat(format!(
                    "{}: no `N M` header line",
                    origin.display()
                )));
            };
            let line = line.map_err(|e| Error::io(IoStage::GraphOpen, origin, e))?;
            if is_significant(&line) {
                if let Some(header) = parse_pair(&line) {
                    break header;
                }
            }
        };
        if n <= 0 {
            return Err(Error::GraphFormat(format!(
                "{}: header declares N={n}, expected N > 0",
                origin.display()
            )));
        }
        let n = usize::try_from(n)
            .map_err(|_| Error::GraphFormat(format!("{}: N={n} is too large", origin.display())))?;
        report.declared_nodes = n;
        report.declared_edges = m;

        let reserve = usize::try_from(m).unwrap_or(0).min(MAX_RESERVED_EDGES);
        let mut edges: Vec<(usize, usize)> = Vec::with_capacity(reserve);
        for (lineno, line) in lines {
            let line = line.map_err(|e| Error::io(IoStage::GraphOpen, origin, e))?;
            if !is_significant(&line) {
                continue;
            }
            let Some((u, v)) = parse_pair(&line) else {
                report.skipped_lines += 1;
                continue;
            };
            report.parsed_edges += 1;
            match (in_range(u, n), in_range(v, n)) {
                (Some(u), Some(v)) => edges.push((u, v)),
                _ => match self.out_of_range {
                    OutOfRangePolicy::Drop => report.dropped_edges += 1,
                    OutOfRangePolicy::Reject => {
                        return Err(Error::GraphFormat(format!(
                            "{}:{}: edge {u}->{v} outside node range [0, {n})",
                            origin.display(),
                            lineno + 1
                        )));
                    }
                },
            }
        }

        if report.edge_count_mismatch() {
            warn!(
                expected = report.declared_edges,
                read = report.parsed_edges,
                "edge count differs from header; proceeding with edges read"
            );
        }
        if report.dropped_edges > 0 {
            warn!(
                dropped = report.dropped_edges,
                nodes = n,
                "dropped edges with endpoints outside node range"
            );
        }

        let graph = InfluenceGraph::from_edges(n, &edges);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            isolated = graph.isolated_count(),
            max_in_degree = graph.max_in_degree(),
            skipped_lines = report.skipped_lines,
            "graph loaded"
        );
        Ok((graph, report))
    }
}

#[inline]
fn is_significant(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with('#')
}

/// First two whitespace-separated integers of `line`; trailing tokens are ignored.
fn parse_pair(line: &str) -> Option<(i64, i64)> {
    let mut tokens = line.split_whitespace();
    let a = tokens.next()?.parse().ok()?;
    let b = tokens.next()?.parse().ok()?;
    Some((a, b))
}

#[inline]
fn in_range(raw: i64, n: usize) -> Option<usize> {
    usize::try_from(raw).ok().filter(|&i| i < n)
}
