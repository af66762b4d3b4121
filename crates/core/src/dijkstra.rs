use std::f64;

use super::csr::GraphCSR;
use super::traits::PathSolver;
use common::{
    error::Error,
    types::{Graph, NodeId, PathResult},
};

/// Label-setting shortest path solver for graphs whose edge weights are all
/// non-negative.
///
/// Negative weights are not detected here; `PathOptimizer` routes such
/// graphs to `BellmanFordSolver` instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct DijkstraSolver;

impl DijkstraSolver {
    /// Unsettled node with the smallest finite tentative distance.
    ///
    /// A linear scan is enough for the graph sizes this crate targets.
    fn next_unsettled(distance: &[f64], settled: &[bool]) -> Option<usize> {
        (0..distance.len())
            .filter(|&i| !settled[i] && distance[i].is_finite())
            .min_by(|&a, &b| distance[a].total_cmp(&distance[b]))
    }
}

impl PathSolver for DijkstraSolver {
    fn shortest_path(
        &self,
        graph: &Graph,
        start: NodeId,
        end: NodeId,
    ) -> Result<PathResult, Error> {
        let csr = GraphCSR::from_graph(graph);
        let source = csr.index_of(start)?;
        let target = csr.index_of(end)?;

        let num_nodes = csr.num_nodes;
        let mut distance = vec![f64::INFINITY; num_nodes];
        let mut predecessor: Vec<Option<usize>> = vec![None; num_nodes];
        let mut settled = vec![false; num_nodes];

        distance[source] = 0.0;

        while let Some(u) = Self::next_unsettled(&distance, &settled) {
            settled[u] = true;
            if u == target {
                break;
            }

            for i in csr.outgoing(u) {
                let v = csr.edge_targets[i];
                // Also skips self-loops, since `u` is already settled.
                if settled[v] {
                    continue;
                }

                let candidate = distance[u] + csr.edge_weights[i];
                if candidate < distance[v] {
                    distance[v] = candidate;
                    predecessor[v] = Some(u);
                }
            }
        }

        Ok(csr.path_result(&distance, &predecessor, source, target))
    }
}
