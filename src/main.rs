use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tonegraph::{engine, persist, Error, GraphLoader, OutOfRangePolicy, RunConfig, SchedulePolicy};

const DEFAULT_LOG_FILTER: &str = "tonegraph=info";

#[derive(Parser, Debug)]
#[command(name = "tonegraph", version)]
#[command(about = "Diffuse per-node tone over a directed graph for a fixed number of steps")]
struct Cli {
    /// Edge list: `N M` header, then one `u v` edge per line
    graph: PathBuf,

    /// Initial state: one value per node, in node order
    states: PathBuf,

    /// Where to write the final state vector
    out_states: PathBuf,

    /// Where to write the per-step mean history
    out_history: PathBuf,

    /// Number of diffusion steps
    steps: usize,

    /// Propagation coefficient in [0, 1] (default 0.3)
    #[arg(allow_negative_numbers = true)]
    alpha: Option<f64>,

    /// Worker threads; 0 selects the platform default
    threads: Option<usize>,

    /// Work partitioning: auto, static, dynamic or guided
    #[arg(long)]
    schedule: Option<SchedulePolicy>,

    /// Nodes per chunk for static and dynamic schedules
    #[arg(long)]
    chunk_size: Option<NonZeroUsize>,

    /// JSON file with alpha, threads, schedule and chunk_size defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `tonegraph=debug` (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Fail on edges whose endpoints lie outside the declared node range
    #[arg(long, default_value_t = false)]
    strict_edges: bool,

    /// Suppress progress events
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(Error::Usage(err.to_string()).exit_code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.log_level.as_deref());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(err.downcast_ref::<Error>().map_or(1, Error::exit_code))
        }
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Builds the effective configuration: defaults < config file < env < CLI.
fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    }
    .with_env();

    if let Some(alpha) = cli.alpha {
        config.alpha = alpha;
    }
    if let Some(threads) = cli.threads {
        config.threads = Some(threads);
    }
    if let Some(schedule) = cli.schedule {
        config.schedule = schedule;
    }
    if cli.chunk_size.is_some() {
        config.chunk_size = cli.chunk_size;
    }
    if cli.strict_edges {
        config.out_of_range = OutOfRangePolicy::Reject;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let params = config.run_params(cli.steps)?.quiet(cli.quiet);

    let (graph, report) = GraphLoader::new()
        .with_out_of_range(config.out_of_range)
        .load_path(&cli.graph)?;
    info!(
        path = %cli.graph.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        dropped = report.dropped_edges,
        "graph loaded"
    );

    let initial = persist::read_states(&cli.states, graph.node_count())?;

    let output = engine::run(&graph, &initial, &params)
        .with_context(|| format!("diffusion over {} failed", cli.graph.display()))?;

    persist::write_history(&cli.out_history, &output.history)?;
    persist::write_states(&cli.out_states, &output.final_state)?;
    info!(
        states = %cli.out_states.display(),
        history = %cli.out_history.display(),
        final_mean = ?output.history.last(),
        "outputs written"
    );
    Ok(())
}
