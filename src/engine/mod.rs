//! Double-buffered, fork-join diffusion engine.
//!
//! Each step recomputes every node from the same snapshot `prev`:
//!
//! - isolated node: `next[v] = prev[v]`
//! - otherwise: `next[v] = (1 - alpha) * prev[v] + alpha * mean(prev[u] for u -> v)`
//!
//! The node range is split into chunks by a [`Schedule`]; every chunk of
//! `next` is handed to exactly one task as a disjoint `&mut` slice while all
//! tasks share `&prev` and `&InfluenceGraph`. Tasks return partial sums which
//! are combined in chunk order after the join, which is also the step barrier:
//! buffers are swapped only once every task has returned.
//!
//! Per-node values never depend on the partition, so final states are
//! bit-identical across thread counts; only the history mean may differ in its
//! low-order bits through summation order.

mod progress;
pub mod schedule;
mod serial;

pub use schedule::{Partition, Schedule, SchedulePolicy};
pub use serial::simulate_serial;

use core::fmt;
use core::num::NonZeroUsize;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::{InfluenceGraph, NodeId};
use crate::history::History;
use progress::Progress;

/// Default propagation coefficient.
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Worker count for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Threads {
    /// Whatever the platform reports as available parallelism.
    #[default]
    Platform,
    /// Exactly this many workers.
    Fixed(NonZeroUsize),
}

impl Threads {
    /// `0` selects the platform default.
    pub fn from_count(count: usize) -> Self {
        NonZeroUsize::new(count).map_or(Self::Platform, Self::Fixed)
    }

    /// The concrete worker count.
    pub fn resolve(self) -> usize {
        match self {
            Self::Platform => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            Self::Fixed(n) => n.get(),
        }
    }
}

impl fmt::Display for Threads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform => f.write_str("platform"),
            Self::Fixed(n) => n.fmt(f),
        }
    }
}

/// Immutable inputs of a single run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    /// Number of diffusion steps `T`.
    pub steps: usize,
    /// Propagation coefficient, in `[0, 1]`.
    pub alpha: f64,
    /// Worker count.
    pub threads: Threads,
    /// Partitioning policy.
    pub schedule: SchedulePolicy,
    /// Overrides the computed chunk size.
    pub chunk_size: Option<NonZeroUsize>,
    /// Suppresses progress events.
    pub quiet: bool,
}

impl RunParams {
    /// `steps` steps with default alpha, threads and schedule.
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            alpha: DEFAULT_ALPHA,
            threads: Threads::Platform,
            schedule: SchedulePolicy::Auto,
            chunk_size: None,
            quiet: false,
        }
    }

    /// Sets the propagation coefficient.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the partitioning policy.
    #[must_use]
    pub fn schedule(mut self, schedule: SchedulePolicy) -> Self {
        self.schedule = schedule;
        self
    }

    /// Sets the chunk size override.
    #[must_use]
    pub fn chunk_size(mut self, chunk: Option<NonZeroUsize>) -> Self {
        self.chunk_size = chunk;
        self
    }

    /// Enables or disables progress events.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// State vector after the last step.
    pub final_state: Vec<f64>,
    /// Mean state after every step.
    pub history: History,
}

/// Checks that `alpha` is a finite value in `[0, 1]`.
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(Error::InvalidAlpha(alpha))
    }
}

/// Runs `params.steps` diffusion steps over `graph` starting from `initial_state`.
///
/// Fails with [`Error::StateSizeMismatch`] if the state does not have one value
/// per node and with [`Error::InvalidAlpha`] if `alpha` lies outside `[0, 1]`.
/// `steps == 0` returns the initial state and an empty history.
pub fn run(graph: &InfluenceGraph, initial_state: &[f64], params: &RunParams) -> Result<RunOutput> {
    DiffusionEngine::new(graph, params.threads, params.schedule, params.chunk_size)?
        .quiet(params.quiet)
        .run(initial_state, params.steps, params.alpha)
}

/// A worker pool and node partition bound to one graph.
///
/// The pool size and partition are fixed at construction; [`run`](Self::run)
/// can be called repeatedly with different initial states.
pub struct DiffusionEngine<'g> {
    graph: &'g InfluenceGraph,
    pool: ThreadPool,
    threads: usize,
    schedule: Schedule,
    partition: Partition,
    quiet: bool,
}

/// A chunk of the next-state buffer owned by one task for one step.
struct Block<'a> {
    start: usize,
    out: &'a mut [f64],
}

impl<'g> DiffusionEngine<'g> {
    /// Starts a worker pool and partitions `graph` for it.
    pub fn new(
        graph: &'g InfluenceGraph,
        threads: Threads,
        policy: SchedulePolicy,
        chunk: Option<NonZeroUsize>,
    ) -> Result<Self> {
        let threads = threads.resolve();
        let nodes = graph.node_count();
        let schedule = policy.resolve(nodes, threads, chunk);
        let partition = schedule.partition(nodes, threads);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tonegraph-worker-{i}"))
            .build()?;
        debug!(
            threads,
            %schedule,
            chunks = partition.chunk_count(),
            tasks = partition.task_count(),
            "engine ready"
        );
        Ok(Self {
            graph,
            pool,
            threads,
            schedule,
            partition,
            quiet: false,
        })
    }

    /// Enables or disables progress events.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Number of pool workers.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// The resolved schedule.
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// The node partition used for every step.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Runs `steps` steps from `initial_state` with coefficient `alpha`.
    pub fn run(&self, initial_state: &[f64], steps: usize, alpha: f64) -> Result<RunOutput> {
        let nodes = self.graph.node_count();
        if initial_state.len() != nodes {
            return Err(Error::StateSizeMismatch {
                expected: nodes,
                found: initial_state.len(),
            });
        }
        validate_alpha(alpha)?;

        let progress = Progress::start(steps, !self.quiet && steps > 0);
        if !self.quiet {
            tracing::info!(
                steps,
                nodes,
                edges = self.graph.edge_count(),
                alpha,
                threads = self.threads,
                schedule = %self.schedule,
                "starting diffusion"
            );
        }

        let mut current = initial_state.to_vec();
        let mut next = vec![0.0; nodes];
        let mut history = History::with_capacity(steps);

        for t in 0..steps {
            let sum = self.step(&current, &mut next, alpha);
            core::mem::swap(&mut current, &mut next);
            let mean = sum / nodes as f64;
            history.record(mean);
            progress.step(t, mean);
        }
        progress.finish();

        Ok(RunOutput {
            final_state: current,
            history,
        })
    }

    /// One fork-join step: fills `next` from `prev` and returns `sum(next)`.
    fn step(&self, prev: &[f64], next: &mut [f64], alpha: f64) -> f64 {
        let graph = self.graph;
        let mut work: Vec<Vec<Block<'_>>> = (0..self.partition.task_count())
            .map(|_| Vec::new())
            .collect();
        let mut rest = next;
        for (range, &owner) in self.partition.ranges().iter().zip(self.partition.owners()) {
            let (out, tail) = core::mem::take(&mut rest).split_at_mut(range.len());
            work[owner].push(Block {
                start: range.start,
                out,
            });
            rest = tail;
        }

        let partials: Vec<f64> = self.pool.install(|| {
            work.into_par_iter()
                .map(|blocks| {
                    blocks
                        .into_iter()
                        .map(|block| update_block(graph, prev, alpha, block))
                        .sum::<f64>()
                })
                .collect()
        });
        partials.iter().sum()
    }
}

fn update_block(graph: &InfluenceGraph, prev: &[f64], alpha: f64, block: Block<'_>) -> f64 {
    let mut sum = 0.0;
    for (offset, slot) in block.out.iter_mut().enumerate() {
        let value = next_state(graph, prev, alpha, NodeId::new(block.start + offset));
        *slot = value;
        sum += value;
    }
    sum
}

/// New state of `node` computed from the snapshot `prev`.
#[inline]
pub(crate) fn next_state(graph: &InfluenceGraph, prev: &[f64], alpha: f64, node: NodeId) -> f64 {
    let own = prev[node.index()];
    let sources = graph.in_neighbors(node);
    if sources.is_empty() {
        return own;
    }
    let total: f64 = sources.iter().map(|u| prev[u.index()]).sum();
    let avg = total / sources.len() as f64;
    (1.0 - alpha) * own + alpha * avg
}

/// `true` if every state moved by less than `tol` between `old` and `new`.
///
/// # Panics
///
/// Panics if the vectors differ in length.
pub fn converged(old: &[f64], new: &[f64], tol: f64) -> bool {
    assert_eq!(old.len(), new.len(), "state vectors differ in length");
    old.iter().zip(new).all(|(a, b)| (a - b).abs() < tol)
}

#[cfg(test)]
mod tests;
