use std::sync::Arc;
use tokio::select;
use tokio::sync::{mpsc::Receiver, watch};
use tracing::{info, warn};

use super::error::Error;
use super::types::{PathQuery, QueryAnswer, QueryOutcome, QuerySummary};
use common::error::Error as PathSolverError;
use common::types::Graph;
use path_solver_core::{CycleResolver, PathOptimizer};

/// Async consumer that answers path queries against a shared, read-only graph.
pub struct QueryWorker {
    graph: Arc<Graph>,
    receiver: Receiver<Vec<PathQuery>>,
    shutdown: watch::Receiver<()>, // signal for graceful shutdown
    resolver: Option<CycleResolver>,
}

/// Runs one query to completion on the calling thread.
fn answer_query(
    graph: &Graph,
    query: PathQuery,
    resolver: Option<CycleResolver>,
) -> Result<QueryAnswer, PathSolverError> {
    let optimizer = PathOptimizer;
    let result = optimizer.optimal_path(graph, query.start, query.end, query.mode)?;

    let (resolved, resolve_attempts) = match resolver {
        Some(resolver) if result.cycle_detected => {
            let resolution =
                resolver.resolve_until_stable(graph, query.start, query.end, query.mode)?;
            let resolved = optimizer.optimal_path(
                &resolution.graph,
                query.start,
                query.end,
                query.mode,
            )?;
            (Some(resolved), resolution.attempts)
        }
        _ => (None, 0),
    };

    Ok(QueryAnswer {
        result,
        resolved,
        resolve_attempts,
    })
}

fn log_outcome(outcome: &QueryOutcome) {
    let PathQuery { start, end, mode } = outcome.query;
    match &outcome.answer {
        Ok(answer) if answer.result.cycle_detected => match &answer.resolved {
            Some(resolved) => info!(
                start, end, ?mode,
                cycle_edges = answer.result.cycle_edges.len(),
                attempts = answer.resolve_attempts,
                path = ?resolved.path,
                weight = resolved.weight,
                "negative cycle resolved"
            ),
            None => warn!(
                start, end, ?mode,
                cycle_edges = ?answer.result.cycle_edges,
                "negative cycle blocks the query"
            ),
        },
        Ok(answer) if answer.result.is_reachable() => info!(
            start, end, ?mode,
            path = ?answer.result.path,
            weight = answer.result.weight,
            "optimal path found"
        ),
        Ok(_) => info!(start, end, ?mode, "destination unreachable"),
        Err(e) => warn!(start, end, ?mode, "query failed: {}", e),
    }
}

impl QueryWorker {
    pub fn new(
        graph: Arc<Graph>,
        receiver: Receiver<Vec<PathQuery>>,
        shutdown: watch::Receiver<()>,
        resolver: Option<CycleResolver>,
    ) -> Self {
        Self {
            graph,
            receiver,
            shutdown,
            resolver,
        }
    }

    /// Run the worker asynchronously.
    ///
    /// Each query runs on the blocking pool and is awaited before the next
    /// one starts, so at most one computation per request is in flight.
    /// A failing query is logged and does not stop the worker. Outcomes are
    /// logged and counted, not kept.
    /// Exits gracefully when the receiver is closed or shutdown signal is received.
    pub async fn process_queries(mut self) -> Result<QuerySummary, Error> {
        info!("Worker ready.");
        let mut summary = QuerySummary::default();

        loop {
            select! {
                batch = self.receiver.recv() => {
                    match batch {
                        Some(queries) => {
                            for query in queries {
                                let graph = Arc::clone(&self.graph);
                                let resolver = self.resolver;
                                let answer = tokio::task::spawn_blocking(move || {
                                    answer_query(&graph, query, resolver)
                                })
                                .await?;

                                let outcome = QueryOutcome { query, answer };
                                log_outcome(&outcome);
                                summary.record(&outcome);
                            }
                        }
                        None => {
                            info!("Receiver closed, shutting down worker.");
                            break;
                        }
                    }
                }

                _ = self.shutdown.changed() => {
                    info!("Shutdown signal received, stopping worker.");
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Public method that spawns the Worker task onto the Tokio runtime.
    pub fn spawn_task(self) -> tokio::task::JoinHandle<Result<QuerySummary, Error>> {
        tokio::spawn(self.process_queries())
    }
}
