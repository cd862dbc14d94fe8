//! Single-threaded reference path.

use crate::error::{Error, Result};
use crate::graph::InfluenceGraph;
use crate::history::{mean, History};

use super::{next_state, validate_alpha, RunOutput};

/// Runs the diffusion on the calling thread with a left-to-right history sum.
///
/// Uses the same per-node update as [`DiffusionEngine`](super::DiffusionEngine),
/// so final states match the parallel engine exactly; history means may differ
/// only in rounding of the reduction.
pub fn simulate_serial(
    graph: &InfluenceGraph,
    initial_state: &[f64],
    steps: usize,
    alpha: f64,
) -> Result<RunOutput> {
    if initial_state.len() != graph.node_count() {
        return Err(Error::StateSizeMismatch {
            expected: graph.node_count(),
            found: initial_state.len(),
        });
    }
    validate_alpha(alpha)?;

    let mut current = initial_state.to_vec();
    let mut next = vec![0.0; current.len()];
    let mut history = History::with_capacity(steps);
    for _ in 0..steps {
        for (v, slot) in graph.nodes().zip(next.iter_mut()) {
            *slot = next_state(graph, &current, alpha, v);
        }
        core::mem::swap(&mut current, &mut next);
        history.record(mean(&current));
    }
    Ok(RunOutput {
        final_state: current,
        history,
    })
}
