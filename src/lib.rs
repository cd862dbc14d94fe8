//! # `tonegraph` - Parallel Tone Diffusion
//!
//! Iterative, shared-memory-parallel diffusion of a scalar "emotional tone"
//! over a static directed graph. Every step, each node blends its own previous
//! value with the mean of its incoming neighbors' previous values:
//!
//! ```text
//! next[v] = (1 - alpha) * prev[v] + alpha * mean(prev[u] for u -> v)
//! ```
//!
//! Nodes without incoming edges keep their value. After every step the mean of
//! the whole state vector is appended to a [`History`].
//!
//! ## Guarantees
//!
//! - **Snapshot reads**: every update of a step reads the same pre-step buffer and
//!   writes a distinct buffer; buffers swap only after all workers joined.
//! - **Single writer**: the node range is partitioned into disjoint `&mut` chunks,
//!   so each state slot has exactly one writer per step and no locks are needed.
//! - **Thread-count independence**: final states are bit-identical for any worker
//!   count or [`Schedule`]; history means differ at most in rounding.
//!
//! ## Architecture
//!
//! 1. [`graph`]: edge-list loader and the immutable CSC [`InfluenceGraph`]
//! 2. [`engine`]: worker pool, schedules and the step loop
//! 3. [`history`]: per-step means
//! 4. [`persist`]: text formats for states, histories and graphs
//! 5. [`config`]: JSON/env configuration layered under the CLI
//!
//! ## Example
//!
//! ```rust
//! use tonegraph::{engine, GraphLoader, RunParams, Threads};
//!
//! let text = "3 2\n0 1\n1 2\n";
//! let (graph, _report) = GraphLoader::new().load_reader(text.as_bytes()).unwrap();
//!
//! let params = RunParams::new(1).alpha(0.5).threads(Threads::from_count(2));
//! let out = engine::run(&graph, &[1.0, 0.0, 0.0], &params).unwrap();
//!
//! assert_eq!(out.final_state, vec![1.0, 0.5, 0.0]);
//! assert_eq!(out.history.as_slice(), &[0.5]);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod history;
pub mod persist;

pub use config::RunConfig;
pub use engine::{run, DiffusionEngine, RunOutput, RunParams, Schedule, SchedulePolicy, Threads};
pub use error::{Error, IoStage, Result};
pub use graph::{GraphLoader, InfluenceGraph, LoadReport, NodeId, OutOfRangePolicy};
pub use history::History;

const _: () = {
    use core::mem;

    // Node handles are plain indices.
    assert!(mem::size_of::<NodeId>() == mem::size_of::<usize>());
    assert!(mem::align_of::<NodeId>() == mem::align_of::<usize>());
};
