use tracing::{debug, warn};

use super::bellman_ford::{BellmanFordSolver, CycleSearch};
use super::optimizer::{additive_weights, without_outgoing};
use common::{
    error::Error,
    numeric_kernel::cycle_increment,
    types::{AggregationMode, Edge, Graph, NodeId},
};

/// Retry budget used by `CycleResolver::default()`.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Returns a new graph in which every edge matching a cycle edge is made
/// heavier by `ceil(|cycle weight| / cycle edges) + 1`.
///
/// Matching is by `(from, to)`; on undirected graphs the swapped pair
/// matches too. Only matching edges change. A cycle set that is empty or
/// already non-negative leaves the graph as it is.
pub fn resolve_negative_cycle(graph: &Graph, cycle_edges: &[Edge]) -> Result<Graph, Error> {
    let cycle_weight: f64 = cycle_edges.iter().map(|e| e.weight).sum();
    if cycle_edges.is_empty() || cycle_weight >= 0.0 {
        return Ok(graph.clone());
    }

    let increment = cycle_increment(cycle_weight, cycle_edges.len());
    let undirected = graph.is_undirected();

    let edges = graph
        .edges()
        .iter()
        .map(|edge| {
            let on_cycle = cycle_edges.iter().any(|c| {
                (c.from == edge.from && c.to == edge.to)
                    || (undirected && edge.same_endpoints_unordered(c))
            });
            if on_cycle {
                edge.with_weight(edge.weight + increment)
            } else {
                *edge
            }
        })
        .collect();

    debug!(cycle_weight, increment, "adjusted negative cycle");
    graph.with_edges(edges)
}

/// Maps adjusted additive weights back onto `original` for `mode`.
///
/// Under `Product` adjusted edges are recovered with `exp`; untouched edges
/// keep their exact original weight.
pub(crate) fn restore_weights(original: &Graph, working: &Graph, mode: AggregationMode) -> Result<Graph, Error> {
    match mode {
        AggregationMode::Sum => Ok(working.clone()),
        AggregationMode::Product => {
            // Adjustment preserves edge order, so positions line up.
            let edges = original
                .edges()
                .iter()
                .zip(working.edges())
                .map(|(raw, log)| {
                    if raw.weight.ln() == log.weight {
                        *raw
                    } else {
                        raw.with_weight(log.weight.exp())
                    }
                })
                .collect();
            original.with_edges(edges)
        }
    }
}

/// A graph with no negative cycle reachable from the query's start.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub graph: Graph,
    /// Number of adjustments applied; zero when the input was already clean.
    pub attempts: usize,
}

/// Repeatedly detects and neutralizes negative cycles within a fixed budget.
#[derive(Debug, Clone, Copy)]
pub struct CycleResolver {
    max_attempts: usize,
}

impl Default for CycleResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl CycleResolver {
    pub fn new(max_attempts: usize) -> Self {
        CycleResolver { max_attempts }
    }

    /// Adjusts weights until no negative cycle is reachable from `start` in
    /// the graph `PathOptimizer::optimal_path` would search for `end`.
    ///
    /// Under `Product` the adjustment happens in the log domain; adjusted
    /// edges are mapped back with `exp`, untouched edges keep their exact
    /// original weight. Edges leaving `end` are kept but never adjusted.
    ///
    /// # Errors
    /// `Error::ResolutionBudgetExceeded` when cycles remain after
    /// `max_attempts` detections, plus any validation error from the input.
    pub fn resolve_until_stable(
        &self,
        graph: &Graph,
        start: NodeId,
        end: NodeId,
        mode: AggregationMode,
    ) -> Result<Resolution, Error> {
        let mut working = additive_weights(graph, mode)?;

        for attempt in 0..self.max_attempts {
            let searched = without_outgoing(&working, end)?;

            match BellmanFordSolver.detect_cycle(&searched, start)? {
                CycleSearch::NoCycle => {
                    return Ok(Resolution {
                        graph: restore_weights(graph, &working, mode)?,
                        attempts: attempt,
                    });
                }
                CycleSearch::Cycle(cycle_edges) => {
                    debug!(attempt, edges = cycle_edges.len(), "resolving negative cycle");
                    working = resolve_negative_cycle(&working, &cycle_edges)?;
                }
            }
        }

        warn!(attempts = self.max_attempts, "negative cycles remain after retry budget");
        Err(Error::ResolutionBudgetExceeded {
            attempts: self.max_attempts,
        })
    }
}
