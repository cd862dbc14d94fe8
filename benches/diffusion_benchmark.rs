use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tonegraph::{DiffusionEngine, InfluenceGraph, SchedulePolicy, Threads};

const STEPS: usize = 10;

fn skewed_graph(nodes: usize) -> InfluenceGraph {
    // Every node listens to its predecessor and a handful of pseudo-random peers;
    // the first 1% of nodes are hubs that everybody also listens to.
    let hubs = (nodes / 100).max(1);
    let mut edges = Vec::with_capacity(nodes * 6);
    for v in 0..nodes {
        edges.push(((v + nodes - 1) % nodes, v));
        for j in 1..4 {
            edges.push(((v * 31 + j * 7919) % nodes, v));
        }
        edges.push((v % hubs, v));
        if v % 3 == 0 {
            edges.push((v, v % hubs));
        }
    }
    InfluenceGraph::from_edges(nodes, &edges)
}

fn bench_threads(c: &mut Criterion) {
    let nodes = 100_000;
    let graph = skewed_graph(nodes);
    let state: Vec<f64> = (0..nodes).map(|i| ((i % 200) as f64 - 100.0) / 100.0).collect();

    let mut group = c.benchmark_group("diffusion_threads");
    group.throughput(Throughput::Elements((graph.edge_count() * STEPS) as u64));
    for threads in [1usize, 2, 4, 8] {
        let engine = DiffusionEngine::new(&graph, Threads::from_count(threads), SchedulePolicy::Auto, None)
            .unwrap()
            .quiet(true);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| black_box(engine.run(&state, STEPS, 0.3).unwrap()));
        });
    }
    group.finish();
}

fn bench_schedules(c: &mut Criterion) {
    let nodes = 100_000;
    let graph = skewed_graph(nodes);
    let state: Vec<f64> = (0..nodes).map(|i| (i % 2) as f64).collect();

    let mut group = c.benchmark_group("diffusion_schedules");
    for policy in [SchedulePolicy::Static, SchedulePolicy::Dynamic, SchedulePolicy::Guided] {
        let engine = DiffusionEngine::new(&graph, Threads::from_count(4), policy, None)
            .unwrap()
            .quiet(true);
        group.bench_function(BenchmarkId::from_parameter(engine.schedule()), |b| {
            b.iter(|| black_box(engine.run(&state, STEPS, 0.3).unwrap()));
        });
    }
    group.finish();
}

fn bench_graph_build(c: &mut Criterion) {
    let nodes = 100_000;
    let edges: Vec<(usize, usize)> = (0..nodes * 5).map(|i| ((i * 7) % nodes, (i * 13 + 1) % nodes)).collect();

    c.bench_function("csc_from_edges", |b| {
        b.iter(|| black_box(InfluenceGraph::from_edges(nodes, black_box(&edges))));
    });
}

criterion_group!(benches, bench_threads, bench_schedules, bench_graph_build);
criterion_main!(benches);
