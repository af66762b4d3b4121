use serde::Deserialize;
use tokio::sync::mpsc::Sender;

use super::error::Error;
use common::error::Error as PathSolverError;
use common::types::{AggregationMode, NodeId, PathResult};

/// A trait defining the contract for any source that generates and streams
/// path queries into the worker.
///
/// The trait bounds (`Send`, `Sync`, `'static`) are mandatory to ensure the
/// implementation can be safely executed by the multi-threaded asynchronous runtime (Tokio).
#[async_trait::async_trait]
pub trait QueryStreamer: Send + Sync + 'static {
    async fn run_stream(self, sender: Sender<Vec<PathQuery>>) -> Result<(), Error>;
}

/// One optimal-path request against the loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PathQuery {
    pub start: NodeId,
    pub end: NodeId,
    #[serde(default)]
    pub mode: AggregationMode,
}

/// What the worker produced for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub result: PathResult,
    /// Result on the resolved graph, when a cycle was found and resolution is enabled.
    pub resolved: Option<PathResult>,
    /// Resolver adjustments applied before `resolved` was computed.
    pub resolve_attempts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query: PathQuery,
    pub answer: Result<QueryAnswer, PathSolverError>,
}

/// Running totals over every query a worker has answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerySummary {
    pub total: usize,
    pub failed: usize,
    pub cycles: usize,
    pub resolved: usize,
}

impl QuerySummary {
    pub fn record(&mut self, outcome: &QueryOutcome) {
        self.total += 1;
        match &outcome.answer {
            Err(_) => self.failed += 1,
            Ok(answer) => {
                if answer.result.cycle_detected {
                    self.cycles += 1;
                }
                if answer.resolved.is_some() {
                    self.resolved += 1;
                }
            }
        }
    }
}
