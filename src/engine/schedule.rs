//! Work partitioning of the node range `[0, N)` across workers.
//!
//! A [`Schedule`] only affects performance: every policy yields a
//! [`Partition`] in which each node belongs to exactly one chunk and each chunk
//! to exactly one task, so the per-node results are identical for all of them.

use core::fmt;
use core::num::NonZeroUsize;
use core::ops::Range;
use core::str::FromStr;

use serde::Deserialize;

/// Below this node count the guided schedule is used regardless of threads.
const SMALL_GRAPH_NODES: usize = 500;
/// Above this thread count dynamic scheduling is preferred.
const FEW_THREADS: usize = 4;

/// User-facing scheduling choice; [`SchedulePolicy::Auto`] picks by graph size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePolicy {
    /// Choose with [`Schedule::auto`].
    #[default]
    Auto,
    /// Fixed chunks dealt round-robin to workers ahead of time.
    Static,
    /// Fixed chunks claimed by whichever worker is free.
    Dynamic,
    /// Shrinking chunks claimed by whichever worker is free.
    Guided,
}

impl SchedulePolicy {
    /// Resolves the policy into a concrete schedule for `nodes` and `threads`.
    pub fn resolve(self, nodes: usize, threads: usize, chunk: Option<NonZeroUsize>) -> Schedule {
        let fixed = || chunk.map_or_else(|| default_chunk(nodes, threads), NonZeroUsize::get);
        match self {
            Self::Auto => Schedule::auto(nodes, threads, chunk),
            Self::Static => Schedule::Static { chunk: fixed() },
            Self::Dynamic => Schedule::Dynamic { chunk: fixed() },
            Self::Guided => Schedule::Guided {
                min_chunk: chunk.map_or(1, NonZeroUsize::get),
            },
        }
    }
}

impl FromStr for SchedulePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            "guided" => Ok(Self::Guided),
            other => Err(format!(
                "unknown schedule `{other}` (expected auto, static, dynamic or guided)"
            )),
        }
    }
}

/// A concrete partitioning policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Chunks of `chunk` nodes; chunk `i` goes to worker `i % threads`.
    Static {
        /// Nodes per chunk.
        chunk: usize,
    },
    /// Chunks of `chunk` nodes, each an independent stealable task.
    Dynamic {
        /// Nodes per chunk.
        chunk: usize,
    },
    /// Each chunk is `remaining / threads` nodes, but at least `min_chunk`.
    Guided {
        /// Lower bound on chunk size.
        min_chunk: usize,
    },
}

impl Schedule {
    /// Picks a schedule from graph size and thread count.
    ///
    /// Small graphs use guided chunks to keep overhead low; more than four
    /// threads use dynamic chunks to absorb hub-node imbalance; otherwise
    /// static chunks. `chunk` overrides the computed chunk size.
    pub fn auto(nodes: usize, threads: usize, chunk: Option<NonZeroUsize>) -> Self {
        let fixed = chunk.map_or_else(|| default_chunk(nodes, threads), NonZeroUsize::get);
        if nodes < SMALL_GRAPH_NODES {
            Self::Guided {
                min_chunk: chunk.map_or(1, NonZeroUsize::get),
            }
        } else if threads > FEW_THREADS {
            Self::Dynamic { chunk: fixed }
        } else {
            Self::Static { chunk: fixed }
        }
    }

    /// Splits `[0, nodes)` into chunks and assigns them to tasks.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn partition(&self, nodes: usize, threads: usize) -> Partition {
        assert!(threads != 0, "threads must be > 0");
        let mut ranges = Vec::new();
        let mut start = 0usize;
        while start < nodes {
            let remaining = nodes - start;
            let len = match *self {
                Self::Static { chunk } | Self::Dynamic { chunk } => chunk.max(1),
                Self::Guided { min_chunk } => remaining.div_ceil(threads).max(min_chunk.max(1)),
            }
            .min(remaining);
            ranges.push(start..start + len);
            start += len;
        }

        let (owners, tasks) = match *self {
            Self::Static { .. } => {
                let tasks = threads.min(ranges.len());
                ((0..ranges.len()).map(|i| i % threads).collect(), tasks)
            }
            Self::Dynamic { .. } | Self::Guided { .. } => {
                ((0..ranges.len()).collect(), ranges.len())
            }
        };

        Partition {
            ranges,
            owners,
            tasks,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { chunk } => write!(f, "static(chunk={chunk})"),
            Self::Dynamic { chunk } => write!(f, "dynamic(chunk={chunk})"),
            Self::Guided { min_chunk } => write!(f, "guided(min_chunk={min_chunk})"),
        }
    }
}

/// Chunk size tuned to graph size and thread count; always at least 1.
///
/// Larger graphs get relatively smaller chunks for balance, but more than four
/// threads get relatively larger ones to limit memory-bandwidth contention.
pub fn default_chunk(nodes: usize, threads: usize) -> usize {
    let threads = threads.max(1);
    let per_thread_chunks = if nodes < 1_000 {
        4
    } else if nodes < 10_000 {
        if threads <= FEW_THREADS {
            8
        } else {
            4
        }
    } else if threads <= FEW_THREADS {
        16
    } else {
        8
    };
    (nodes / (threads * per_thread_chunks)).max(1)
}

/// Chunks of the node range and their task assignment for one run.
///
/// Invariants: `ranges` are non-empty, sorted, contiguous and cover
/// `[0, nodes)` exactly; `owners[i] < tasks` for every chunk `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    ranges: Vec<Range<usize>>,
    owners: Vec<usize>,
    tasks: usize,
}

impl Partition {
    /// The chunks in node order.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Task index owning each chunk.
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Number of independent tasks per step.
    pub fn task_count(&self) -> usize {
        self.tasks
    }

    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.ranges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(p: &Partition, nodes: usize) {
        let mut next = 0;
        for r in p.ranges() {
            assert_eq!(r.start, next, "chunks must be contiguous");
            assert!(r.end > r.start, "chunks must be non-empty");
            next = r.end;
        }
        assert_eq!(next, nodes);
        assert_eq!(p.owners().len(), p.chunk_count());
        assert!(p.owners().iter().all(|&o| o < p.task_count()));
    }

    #[test]
    fn every_schedule_covers_the_node_range_once() {
        let schedules = [
            Schedule::Static { chunk: 3 },
            Schedule::Dynamic { chunk: 7 },
            Schedule::Guided { min_chunk: 1 },
            Schedule::Guided { min_chunk: 50 },
        ];
        for schedule in schedules {
            for nodes in [1, 2, 10, 99, 1_000] {
                for threads in [1, 2, 4, 8] {
                    assert_covers(&schedule.partition(nodes, threads), nodes);
                }
            }
        }
    }

    #[test]
    fn static_deals_chunks_round_robin() {
        let p = Schedule::Static { chunk: 2 }.partition(9, 2);
        assert_eq!(p.ranges(), &[0..2, 2..4, 4..6, 6..8, 8..9]);
        assert_eq!(p.owners(), &[0, 1, 0, 1, 0]);
        assert_eq!(p.task_count(), 2);

        // Fewer chunks than threads: one task per chunk.
        let p = Schedule::Static { chunk: 10 }.partition(15, 8);
        assert_eq!(p.task_count(), 2);
    }

    #[test]
    fn guided_chunks_shrink() {
        let p = Schedule::Guided { min_chunk: 1 }.partition(100, 4);
        let lens: Vec<usize> = p.ranges().iter().map(|r| r.len()).collect();
        assert_eq!(lens[0], 25);
        assert!(lens.windows(2).all(|w| w[0] >= w[1]), "{lens:?}");
        assert_eq!(p.task_count(), p.chunk_count());
    }

    #[test]
    fn auto_follows_size_and_thread_thresholds() {
        assert!(matches!(Schedule::auto(100, 8, None), Schedule::Guided { min_chunk: 1 }));
        assert_eq!(
            Schedule::auto(5_000, 8, None),
            Schedule::Dynamic { chunk: 5_000 / 32 }
        );
        assert_eq!(
            Schedule::auto(5_000, 4, None),
            Schedule::Static { chunk: 5_000 / 32 }
        );
        assert_eq!(
            Schedule::auto(100_000, 2, NonZeroUsize::new(64)),
            Schedule::Static { chunk: 64 }
        );
    }

    #[test]
    fn default_chunk_never_zero() {
        assert_eq!(default_chunk(1, 64), 1);
        assert_eq!(default_chunk(999, 1), 249);
        assert_eq!(default_chunk(20_000, 4), 20_000 / 64);
        assert_eq!(default_chunk(20_000, 8), 20_000 / 64);
    }

    #[test]
    fn policy_parses_and_resolves() {
        assert_eq!("Dynamic".parse::<SchedulePolicy>(), Ok(SchedulePolicy::Dynamic));
        assert!("fastest".parse::<SchedulePolicy>().is_err());
        assert_eq!(
            SchedulePolicy::Static.resolve(100, 2, None),
            Schedule::Static { chunk: 12 }
        );
        assert_eq!(
            SchedulePolicy::Guided.resolve(100, 2, NonZeroUsize::new(5)),
            Schedule::Guided { min_chunk: 5 }
        );
    }
}
