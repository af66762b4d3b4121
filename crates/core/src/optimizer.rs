use tracing::debug;

use super::bellman_ford::BellmanFordSolver;
use super::dijkstra::DijkstraSolver;
use super::resolver;
use super::traits::PathSolver;
use common::{
    error::Error,
    numeric_kernel::{from_log_weight, to_log_weight},
    types::{AggregationMode, Edge, Graph, NodeId, PathResult},
};

/// Maps every weight of a multiplicative graph into the log domain.
///
/// # Errors
/// Returns `Error::Validation` on the first weight that is not strictly positive.
pub(crate) fn to_log_domain(graph: &Graph) -> Result<Graph, Error> {
    let edges = graph
        .edges()
        .iter()
        .map(|e| to_log_weight(e).map(|w| e.with_weight(w)))
        .collect::<Result<Vec<Edge>, Error>>()?;
    graph.with_edges(edges)
}

/// Weights the additive solvers should see for `mode`.
pub(crate) fn additive_weights(graph: &Graph, mode: AggregationMode) -> Result<Graph, Error> {
    match mode {
        AggregationMode::Sum => Ok(graph.clone()),
        AggregationMode::Product => to_log_domain(graph),
    }
}

/// Drops every edge leaving `end`: a simple path never continues past its
/// destination, and loops through it would otherwise look like cycles.
pub(crate) fn without_outgoing(graph: &Graph, end: NodeId) -> Result<Graph, Error> {
    let edges = graph
        .edges()
        .iter()
        .filter(|e| e.from != end)
        .copied()
        .collect();
    graph.with_edges(edges)
}

/// Picks the solver for a query, handles the multiplicative transform and
/// normalizes the result for the caller.
///
/// Every call is independent: the input graph is never modified and no
/// state is kept between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathOptimizer;

impl PathOptimizer {
    /// Optimal path from `start` to `end` under `mode`.
    ///
    /// A detected negative cycle is reported as-is (`cycle_detected = true`);
    /// resolving it is a separate, explicit call to
    /// [`PathOptimizer::resolve_negative_cycle`].
    ///
    /// # Errors
    /// `Error::UnknownNode` for a `start`/`end` outside the graph, and
    /// `Error::Validation` for a non-positive weight under `Product`.
    pub fn optimal_path(
        &self,
        graph: &Graph,
        start: NodeId,
        end: NodeId,
        mode: AggregationMode,
    ) -> Result<PathResult, Error> {
        for id in [start, end] {
            if !graph.contains(id) {
                return Err(Error::UnknownNode(id));
            }
        }

        let weighted = additive_weights(graph, mode)?;
        let prepared = without_outgoing(&weighted, end)?;

        let result = if prepared.has_negative_weight() {
            debug!(start, end, ?mode, "negative weights present, using Bellman-Ford");
            BellmanFordSolver.shortest_path(&prepared, start, end)?
        } else {
            debug!(start, end, ?mode, "all weights non-negative, using Dijkstra");
            DijkstraSolver.shortest_path(&prepared, start, end)?
        };

        if result.cycle_detected {
            debug!(edges = result.cycle_edges.len(), "negative cycle blocks the query");
            return Ok(match mode {
                AggregationMode::Sum => result,
                AggregationMode::Product => {
                    PathResult::negative_cycle(Self::raw_cycle_edges(graph, &result.cycle_edges))
                }
            });
        }

        Ok(match mode {
            AggregationMode::Sum => result,
            AggregationMode::Product => PathResult {
                weight: from_log_weight(result.weight),
                ..result
            },
        })
    }

    /// Maps log-domain cycle edges back to the caller's original records.
    fn raw_cycle_edges(graph: &Graph, log_edges: &[Edge]) -> Vec<Edge> {
        log_edges
            .iter()
            .map(|log_edge| {
                graph
                    .edges()
                    .iter()
                    .find(|e| {
                        e.from == log_edge.from
                            && e.to == log_edge.to
                            && e.weight.ln() == log_edge.weight
                    })
                    .copied()
                    .unwrap_or_else(|| log_edge.with_weight(log_edge.weight.exp()))
            })
            .collect()
    }

    /// Returns a new graph in which the given cycle's edges carry enough
    /// extra weight to make the cycle positive. See [`resolver::resolve_negative_cycle`].
    ///
    /// `cycle_edges` are taken as reported by [`PathOptimizer::optimal_path`]
    /// for the same `mode`. Under `Product` both the graph and the cycle are
    /// adjusted in the log domain and the adjusted edges are mapped back
    /// with `exp`.
    ///
    /// # Errors
    /// `Error::Validation` for a non-positive weight under `Product`.
    pub fn resolve_negative_cycle(
        &self,
        graph: &Graph,
        cycle_edges: &[Edge],
        mode: AggregationMode,
    ) -> Result<Graph, Error> {
        match mode {
            AggregationMode::Sum => resolver::resolve_negative_cycle(graph, cycle_edges),
            AggregationMode::Product => {
                let log_graph = to_log_domain(graph)?;
                let log_cycle = cycle_edges
                    .iter()
                    .map(|e| to_log_weight(e).map(|w| e.with_weight(w)))
                    .collect::<Result<Vec<Edge>, Error>>()?;

                let adjusted = resolver::resolve_negative_cycle(&log_graph, &log_cycle)?;
                resolver::restore_weights(graph, &adjusted, mode)
            }
        }
    }

    /// Aggregated cost of walking `path` node by node.
    ///
    /// Between consecutive nodes the cheapest parallel edge is used. An
    /// empty or single-node path costs the mode's identity.
    ///
    /// # Errors
    /// `Error::UnknownNode` for a node outside the graph and
    /// `Error::Validation` when two consecutive nodes are not joined by an edge.
    pub fn path_weight(&self, graph: &Graph, path: &[NodeId], mode: AggregationMode) -> Result<f64, Error> {
        if let Some(&unknown) = path.iter().find(|&&id| !graph.contains(id)) {
            return Err(Error::UnknownNode(unknown));
        }

        path.windows(2).try_fold(mode.identity(), |total, step| {
            let (from, to) = (step[0], step[1]);
            let weight = graph
                .edges()
                .iter()
                .filter(|e| e.from == from && e.to == to)
                .map(|e| e.weight)
                .min_by(f64::total_cmp)
                .ok_or_else(|| Error::Validation(format!("no edge from {} to {}", from, to)))?;

            if mode == AggregationMode::Product && weight <= 0.0 {
                return Err(Error::Validation(format!(
                    "edge {}->{} has weight {} which cannot be multiplied along a path",
                    from, to, weight
                )));
            }
            Ok(mode.combine(total, weight))
        })
    }
}

#[cfg(test)]
mod optimizer_tests {
    use super::*;
    use common::types::Node;

    fn nodes(ids: &[NodeId]) -> Vec<Node> {
        ids.iter().copied().map(Node::new).collect()
    }

    fn scenario_a() -> Graph {
        Graph::new(
            nodes(&[1, 2, 3]),
            vec![Edge::new(1, 2, 1.0), Edge::new(2, 3, 1.0), Edge::new(1, 3, 5.0)],
        )
        .unwrap()
    }

    fn scenario_b() -> Graph {
        Graph::new(
            nodes(&[1, 2, 3]),
            vec![Edge::new(1, 2, 2.0), Edge::new(2, 1, -5.0), Edge::new(2, 3, 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn sum_mode_picks_two_hop_route() {
        let result = PathOptimizer
            .optimal_path(&scenario_a(), 1, 3, AggregationMode::Sum)
            .unwrap();
        assert_eq!(result.path, vec![1, 2, 3]);
        assert_eq!(result.weight, 2.0);
    }

    #[test]
    fn negative_cycle_is_reported_not_resolved() {
        let graph = scenario_b();
        let result = PathOptimizer
            .optimal_path(&graph, 1, 3, AggregationMode::Sum)
            .unwrap();

        assert!(result.cycle_detected);
        assert_eq!(result.weight, f64::INFINITY);
        assert!(result.path.is_empty());
        assert!(result.cycle_edges.contains(&Edge::new(1, 2, 2.0)));
        assert!(result.cycle_edges.contains(&Edge::new(2, 1, -5.0)));
        assert_eq!(graph, scenario_b(), "the query must not touch its input");
    }

    #[test]
    fn resolved_cycle_yields_finite_path() {
        let graph = scenario_b();
        let blocked = PathOptimizer
            .optimal_path(&graph, 1, 3, AggregationMode::Sum)
            .unwrap();

        let resolved = PathOptimizer
            .resolve_negative_cycle(&graph, &blocked.cycle_edges, AggregationMode::Sum)
            .unwrap();
        let cycle_sum: f64 = resolved
            .edges()
            .iter()
            .filter(|e| (e.from, e.to) == (1, 2) || (e.from, e.to) == (2, 1))
            .map(|e| e.weight)
            .sum();
        assert!(cycle_sum > 0.0);

        let result = PathOptimizer
            .optimal_path(&resolved, 1, 3, AggregationMode::Sum)
            .unwrap();
        assert!(!result.cycle_detected);
        assert!(result.weight.is_finite());
        assert_eq!(result.path, vec![1, 2, 3]);
    }

    #[test]
    fn product_mode_multiplies_weights() {
        let graph = Graph::new(
            nodes(&[0, 1, 2]),
            vec![Edge::new(0, 1, 2.0), Edge::new(1, 2, 3.0)],
        )
        .unwrap();

        let result = PathOptimizer
            .optimal_path(&graph, 0, 2, AggregationMode::Product)
            .unwrap();
        assert!((result.weight - 6.0).abs() < 1e-6, "got {}", result.weight);
        assert_eq!(result.path, vec![0, 1, 2]);
    }

    #[test]
    fn product_mode_prefers_fractional_weights() {
        // 0.5 * 4 = 2 beats the direct 3.
        let graph = Graph::new(
            nodes(&[0, 1, 2]),
            vec![Edge::new(0, 1, 0.5), Edge::new(1, 2, 4.0), Edge::new(0, 2, 3.0)],
        )
        .unwrap();

        let result = PathOptimizer
            .optimal_path(&graph, 0, 2, AggregationMode::Product)
            .unwrap();
        assert_eq!(result.path, vec![0, 1, 2]);
        assert!((result.weight - 2.0).abs() < 1e-6);
    }

    #[test]
    fn product_mode_cycle_is_reported_with_raw_weights() {
        // 0.25 * 2 < 1 is a shrinking loop.
        let graph = Graph::new(
            nodes(&[0, 1, 2]),
            vec![Edge::new(0, 1, 0.25), Edge::new(1, 0, 2.0), Edge::new(1, 2, 3.0)],
        )
        .unwrap();

        let result = PathOptimizer
            .optimal_path(&graph, 0, 2, AggregationMode::Product)
            .unwrap();
        assert!(result.cycle_detected);
        assert!(result.cycle_edges.contains(&Edge::new(0, 1, 0.25)));
        assert!(result.cycle_edges.contains(&Edge::new(1, 0, 2.0)));
    }

    #[test]
    fn product_mode_cycle_resolves_through_the_optimizer() {
        let graph = Graph::new(
            nodes(&[0, 1, 2]),
            vec![Edge::new(0, 1, 0.25), Edge::new(1, 0, 2.0), Edge::new(1, 2, 3.0)],
        )
        .unwrap();

        let blocked = PathOptimizer
            .optimal_path(&graph, 0, 2, AggregationMode::Product)
            .unwrap();
        assert!(blocked.cycle_detected);

        let resolved = PathOptimizer
            .resolve_negative_cycle(&graph, &blocked.cycle_edges, AggregationMode::Product)
            .unwrap();
        assert_ne!(resolved, graph);
        assert_eq!(resolved.edges()[2], Edge::new(1, 2, 3.0));
        assert!(resolved.edges()[0].weight * resolved.edges()[1].weight > 1.0);

        let result = PathOptimizer
            .optimal_path(&resolved, 0, 2, AggregationMode::Product)
            .unwrap();
        assert!(!result.cycle_detected);
        assert_eq!(result.path, vec![0, 1, 2]);
        assert!(result.weight.is_finite());
    }

    #[test]
    fn product_mode_rejects_non_positive_weights() {
        let graph = Graph::new(nodes(&[0, 1]), vec![Edge::new(0, 1, 0.0)]).unwrap();

        let result = PathOptimizer.optimal_path(&graph, 0, 1, AggregationMode::Product);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn start_equals_end_returns_mode_identity() {
        let graph = scenario_a();

        let sum = PathOptimizer.optimal_path(&graph, 2, 2, AggregationMode::Sum).unwrap();
        assert_eq!(sum.path, vec![2]);
        assert_eq!(sum.weight, 0.0);

        let product = PathOptimizer
            .optimal_path(&graph, 2, 2, AggregationMode::Product)
            .unwrap();
        assert_eq!(product.path, vec![2]);
        assert_eq!(product.weight, 1.0);
    }

    #[test]
    fn loops_through_the_end_node_are_not_cycles() {
        // 3->1 only matters after reaching the end; dropping it removes the loop.
        let graph = Graph::new(
            nodes(&[1, 2, 3]),
            vec![Edge::new(1, 2, 1.0), Edge::new(2, 3, -2.0), Edge::new(3, 1, -1.0)],
        )
        .unwrap();

        let result = PathOptimizer.optimal_path(&graph, 1, 3, AggregationMode::Sum).unwrap();
        assert!(!result.cycle_detected);
        assert_eq!(result.path, vec![1, 2, 3]);
        assert_eq!(result.weight, -1.0);
    }

    #[test]
    fn unreachable_end_is_a_normal_result() {
        let graph = Graph::new(nodes(&[0, 1, 2]), vec![Edge::new(0, 1, 1.0)]).unwrap();

        let result = PathOptimizer.optimal_path(&graph, 0, 2, AggregationMode::Product).unwrap();
        assert_eq!(result.weight, f64::INFINITY);
        assert!(result.path.is_empty());
        assert!(!result.cycle_detected);
    }

    #[test]
    fn unknown_nodes_are_rejected() {
        let graph = scenario_a();
        assert_eq!(
            PathOptimizer.optimal_path(&graph, 1, 9, AggregationMode::Sum),
            Err(Error::UnknownNode(9))
        );
    }

    #[test]
    fn path_weight_scores_a_chosen_route() {
        let graph = scenario_a();

        let direct = PathOptimizer.path_weight(&graph, &[1, 3], AggregationMode::Sum).unwrap();
        let optimal = PathOptimizer.optimal_path(&graph, 1, 3, AggregationMode::Sum).unwrap();
        assert_eq!(direct, 5.0);
        assert!(!AggregationMode::Sum.weights_match(direct, optimal.weight));

        let via_two = PathOptimizer.path_weight(&graph, &[1, 2, 3], AggregationMode::Sum).unwrap();
        assert!(AggregationMode::Sum.weights_match(via_two, optimal.weight));

        assert_eq!(PathOptimizer.path_weight(&graph, &[], AggregationMode::Product), Ok(1.0));
    }

    #[test]
    fn path_weight_rejects_missing_edges() {
        let graph = scenario_a();
        let result = PathOptimizer.path_weight(&graph, &[3, 1], AggregationMode::Sum);
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
