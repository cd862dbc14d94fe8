//! Tests for the diffusion engine.

use super::*;
use crate::history::mean;

fn quiet(steps: usize, alpha: f64, threads: usize) -> RunParams {
    RunParams::new(steps)
        .alpha(alpha)
        .threads(Threads::from_count(threads))
        .quiet(true)
}

/// A hub-heavy graph: node 0 receives from everyone, others form a ring.
fn skewed_graph(n: usize) -> InfluenceGraph {
    let mut edges = Vec::new();
    for u in 1..n {
        edges.push((u, 0));
        edges.push((u - 1, u));
    }
    edges.push((n - 1, 1));
    InfluenceGraph::from_edges(n, &edges)
}

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 37) % 101) as f64 / 50.0 - 1.0).collect()
}

#[test]
fn three_node_chain_single_step() {
    let g = InfluenceGraph::from_edges(3, &[(0, 1), (1, 2)]);
    let out = run(&g, &[1.0, 0.0, 0.0], &quiet(1, 0.5, 2)).unwrap();
    assert_eq!(out.final_state, vec![1.0, 0.5, 0.0]);
    assert_eq!(out.history.as_slice(), &[0.5]);
}

#[test]
fn zero_steps_returns_initial_state() {
    let g = skewed_graph(10);
    let initial = ramp(10);
    let out = run(&g, &initial, &quiet(0, 0.3, 4)).unwrap();
    assert_eq!(out.final_state, initial);
    assert!(out.history.is_empty());
}

#[test]
fn state_size_mismatch_is_rejected() {
    let g = skewed_graph(5);
    let err = run(&g, &[0.0; 4], &quiet(3, 0.3, 1)).unwrap_err();
    assert!(matches!(
        err,
        Error::StateSizeMismatch {
            expected: 5,
            found: 4
        }
    ));
}

#[test]
fn alpha_outside_unit_interval_is_rejected() {
    let g = skewed_graph(5);
    for alpha in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
        let err = run(&g, &ramp(5), &quiet(1, alpha, 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidAlpha(_)), "{alpha}: {err}");
    }
    assert!(validate_alpha(0.0).is_ok());
    assert!(validate_alpha(1.0).is_ok());
}

#[test]
fn final_state_is_identical_across_thread_counts_and_schedules() {
    let g = skewed_graph(1_200);
    let initial = ramp(1_200);
    let reference = simulate_serial(&g, &initial, 25, 0.35).unwrap();

    for threads in [1, 2, 4, 8] {
        for policy in [
            SchedulePolicy::Auto,
            SchedulePolicy::Static,
            SchedulePolicy::Dynamic,
            SchedulePolicy::Guided,
        ] {
            let params = quiet(25, 0.35, threads).schedule(policy);
            let out = run(&g, &initial, &params).unwrap();
            assert_eq!(out.final_state, reference.final_state, "{threads} threads, {policy:?}");
            for (a, b) in out.history.iter().zip(reference.history.iter()) {
                assert!((a - b).abs() < 1e-9, "{threads} threads, {policy:?}: {a} vs {b}");
            }
        }
    }
}

#[test]
fn history_matches_mean_of_each_snapshot() {
    let g = skewed_graph(64);
    let initial = ramp(64);
    let engine = DiffusionEngine::new(&g, Threads::from_count(3), SchedulePolicy::Dynamic, None)
        .unwrap()
        .quiet(true);

    let full = engine.run(&initial, 6, 0.4).unwrap();
    assert_eq!(full.history.len(), 6);

    // Step-by-step replay: each one-step run starts from the previous snapshot.
    let mut state = initial;
    for t in 0..6 {
        let one = engine.run(&state, 1, 0.4).unwrap();
        state = one.final_state;
        assert!((full.history[t] - mean(&state)).abs() < 1e-12);
    }
    assert_eq!(state, full.final_state);
}

#[test]
fn isolated_nodes_stay_frozen() {
    // Nodes 0 and 3 have no incoming edges.
    let g = InfluenceGraph::from_edges(4, &[(0, 1), (3, 1), (1, 2), (2, 1)]);
    let initial = vec![0.9, -0.4, 0.2, -1.0];
    let out = run(&g, &initial, &quiet(50, 0.7, 2)).unwrap();
    assert_eq!(out.final_state[0], 0.9);
    assert_eq!(out.final_state[3], -1.0);
}

#[test]
fn alpha_zero_is_identity() {
    let g = skewed_graph(40);
    let initial = ramp(40);
    let out = run(&g, &initial, &quiet(10, 0.0, 4)).unwrap();
    assert_eq!(out.final_state, initial);
}

#[test]
fn alpha_one_replaces_with_neighbor_mean() {
    let g = InfluenceGraph::from_edges(3, &[(0, 2), (1, 2), (1, 2), (2, 0)]);
    let initial = vec![0.3, 0.9, -0.6];
    let out = run(&g, &initial, &quiet(1, 1.0, 2)).unwrap();
    assert_eq!(out.final_state[0], -0.6);
    assert_eq!(out.final_state[1], 0.9);
    assert_eq!(out.final_state[2], (0.3 + 0.9 + 0.9) / 3.0);
}

#[test]
fn engine_reports_its_configuration() {
    let g = skewed_graph(2_000);
    let engine = DiffusionEngine::new(
        &g,
        Threads::from_count(2),
        SchedulePolicy::Static,
        NonZeroUsize::new(100),
    )
    .unwrap();
    assert_eq!(engine.threads(), 2);
    assert_eq!(engine.schedule(), Schedule::Static { chunk: 100 });
    assert_eq!(engine.partition().chunk_count(), 20);
    assert_eq!(engine.partition().task_count(), 2);
}

#[test]
fn threads_from_count() {
    assert_eq!(Threads::from_count(0), Threads::Platform);
    assert_eq!(Threads::from_count(3).resolve(), 3);
    assert!(Threads::Platform.resolve() >= 1);
}

#[test]
fn converged_uses_strict_tolerance() {
    assert!(converged(&[1.0, 2.0], &[1.0, 2.0 + 1e-9], 1e-6));
    assert!(!converged(&[1.0, 2.0], &[1.0, 2.1], 1e-6));

    let g = skewed_graph(30);
    let out = run(&g, &ramp(30), &quiet(5_000, 0.5, 2)).unwrap();
    let next = run(&g, &out.final_state, &quiet(1, 0.5, 2)).unwrap();
    assert!(converged(&out.final_state, &next.final_state, 1e-6));
}
