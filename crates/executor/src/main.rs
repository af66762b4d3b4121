pub mod config;
pub mod csv_streamer;
pub mod error;
pub mod producer;
pub mod types;
pub mod worker;

use std::env;
use std::process;
use std::sync::Arc;
use tokio::sync::{mpsc, mpsc::Sender, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::types::Graph;
use csv_streamer::{CsvGraphLoader, CsvQueryStreamer};
use error::Error;
use path_solver_core::CycleResolver;
use producer::Producer;
use types::{PathQuery, QuerySummary};
use worker::QueryWorker;

/// Input files, taken from the command line or falling back to configuration.
struct InputPaths {
    graph: String,
    queries: String,
}

#[tokio::main]
async fn main() {
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    init_tracing(&config.executor.log_level);

    if let Err(e) = run(config).await {
        error!("Executor failed: {}", e);
        process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parse command-line arguments: `[graph.csv] [queries.csv]`.
fn parse_args(config: &config::Config) -> InputPaths {
    let args: Vec<String> = env::args().collect();
    InputPaths {
        graph: args
            .get(1)
            .cloned()
            .unwrap_or_else(|| config.input.graph_path.clone()),
        queries: args
            .get(2)
            .cloned()
            .unwrap_or_else(|| config.input.queries_path.clone()),
    }
}

async fn run(config: config::Config) -> Result<(), Error> {
    let paths = parse_args(&config);

    let graph = Arc::new(CsvGraphLoader::new(paths.graph, config.input.undirected).load()?);

    let (sender, receiver) = mpsc::channel::<Vec<PathQuery>>(config.executor.buffer_size.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    let resolver = config
        .solver
        .resolve_cycles
        .then(|| CycleResolver::new(config.solver.max_resolve_attempts));

    // Spawn tasks
    let producer_handle = spawn_producer(paths.queries, config.input.batch_size, sender);
    let worker_handle = spawn_worker(graph, receiver, shutdown_rx, resolver);

    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down.");
            let _ = signal_tx.send(());
        }
    });

    let (producer_result, worker_result) = tokio::join!(producer_handle, worker_handle);
    producer_result??;
    let summary = worker_result??;

    summarize(&summary);
    info!("Pipeline shut down.");
    Ok(())
}

fn spawn_producer(
    path: String,
    batch_size: usize,
    sender: Sender<Vec<PathQuery>>,
) -> JoinHandle<Result<(), Error>> {
    info!("Starting CsvQueryStreamer producer task...");
    let streamer = CsvQueryStreamer::new(path, batch_size);
    Producer::new(streamer).spawn(sender)
}

/// Spawn worker task
fn spawn_worker(
    graph: Arc<Graph>,
    receiver: mpsc::Receiver<Vec<PathQuery>>,
    shutdown: watch::Receiver<()>,
    resolver: Option<CycleResolver>,
) -> JoinHandle<Result<QuerySummary, Error>> {
    QueryWorker::new(graph, receiver, shutdown, resolver).spawn_task()
}

fn summarize(summary: &QuerySummary) {
    info!(
        total = summary.total,
        failed = summary.failed,
        cycles = summary.cycles,
        resolved = summary.resolved,
        "all queries processed"
    );
}
