use std::collections::HashSet;
use std::f64;

use tracing::debug;

use super::csr::GraphCSR;
use super::traits::PathSolver;
use common::{
    error::Error,
    types::{Edge, Graph, NodeId, PathResult},
};

/// Outcome of a negative-cycle search.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleSearch {
    NoCycle,
    /// Deduplicated edges of every negative cycle found, in traversal order.
    Cycle(Vec<Edge>),
}

/// Distances and predecessor edges left by the relaxation passes.
#[derive(Debug, Clone)]
struct Relaxation {
    distance: Vec<f64>,
    // CSR slot of the edge that last improved each node.
    pred_edge_idx: Vec<Option<usize>>,
}

impl Relaxation {
    fn pred_node(&self, csr: &GraphCSR, node: usize) -> Option<usize> {
        self.pred_edge_idx[node].map(|i| csr.edge_source_by_index[i])
    }

    fn predecessors(&self, csr: &GraphCSR) -> Vec<Option<usize>> {
        (0..csr.num_nodes).map(|n| self.pred_node(csr, n)).collect()
    }

    /// Whether CSR slot `i` would strictly improve its target.
    ///
    /// Self-loops are never relaxed. On undirected graphs an edge leading
    /// straight back to the current predecessor is skipped, so a single
    /// connection cannot be walked back and forth.
    fn can_relax(&self, csr: &GraphCSR, undirected: bool, i: usize) -> bool {
        let u = csr.edge_source_by_index[i];
        let v = csr.edge_targets[i];
        if u == v || !self.distance[u].is_finite() {
            return false;
        }
        if undirected && self.pred_node(csr, u) == Some(v) {
            return false;
        }
        self.distance[u] + csr.edge_weights[i] < self.distance[v]
    }

    fn apply(&mut self, csr: &GraphCSR, i: usize) {
        let u = csr.edge_source_by_index[i];
        let v = csr.edge_targets[i];
        self.distance[v] = self.distance[u] + csr.edge_weights[i];
        self.pred_edge_idx[v] = Some(i);
    }
}

/// Bellman-Ford shortest paths over arbitrary weights, with detection and
/// extraction of negative cycles reachable from the start.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellmanFordSolver;

impl BellmanFordSolver {
    /// Relaxes every edge for up to `|V| - 1` passes, stopping early once a
    /// pass changes nothing.
    fn relax(&self, csr: &GraphCSR, undirected: bool, source: usize) -> Relaxation {
        let mut state = Relaxation {
            distance: vec![f64::INFINITY; csr.num_nodes],
            pred_edge_idx: vec![None; csr.num_nodes],
        };
        state.distance[source] = 0.0;

        for _ in 1..csr.num_nodes {
            let mut updated = false;
            for i in 0..csr.num_edges() {
                if state.can_relax(csr, undirected, i) {
                    state.apply(csr, i);
                    updated = true;
                }
            }
            if !updated {
                break;
            }
        }

        state
    }

    /// Walks predecessors from `start` and returns the nodes of the first
    /// loop it enters, newest first. `None` if the chain ends, or runs past
    /// `2 × |V|` steps, without repeating a node.
    fn find_cycle_nodes(&self, csr: &GraphCSR, state: &Relaxation, start: usize) -> Option<Vec<usize>> {
        let mut visited = vec![false; csr.num_nodes];
        let mut trail: Vec<usize> = Vec::new();
        let mut current = Some(start);

        while let Some(node) = current {
            if visited[node] {
                let entry = trail.iter().position(|&n| n == node)?;
                return Some(trail.split_off(entry));
            }
            if trail.len() > 2 * csr.num_nodes {
                return None;
            }
            visited[node] = true;
            trail.push(node);
            current = state.pred_node(csr, node);
        }

        None
    }

    /// Collects the edges that close the loop over `cycle_nodes`, in forward
    /// order. Undirected graphs also contribute each edge's reverse twin,
    /// the materialised record with the same weight.
    ///
    /// # Errors
    /// Returns `Error::CycleReconstructionFailed` if a node on the loop has
    /// no predecessor edge.
    fn reconstruct_cycle(
        &self,
        graph: &Graph,
        csr: &GraphCSR,
        state: &Relaxation,
        cycle_nodes: &[usize],
    ) -> Result<Vec<Edge>, Error> {
        let mut path: Vec<Edge> = Vec::with_capacity(cycle_nodes.len());

        for &node in cycle_nodes {
            let edge_idx = state.pred_edge_idx[node].ok_or(Error::CycleReconstructionFailed)?;
            let edge = graph.edges()[csr.edge_origin[edge_idx]];
            path.push(edge);

            if graph.is_undirected() {
                path.extend(
                    graph
                        .edges()
                        .iter()
                        .filter(|e| {
                            e.from == edge.to && e.to == edge.from && e.weight == edge.weight
                        }),
                );
            }
        }

        // The trail was collected walking backwards.
        path.reverse();
        Ok(path)
    }

    /// Final pass: every edge that still relaxes points at or into a
    /// negative cycle. Each one is traced and the cycles found are merged.
    fn extract_cycles(
        &self,
        graph: &Graph,
        csr: &GraphCSR,
        relaxed: &Relaxation,
    ) -> Result<CycleSearch, Error> {
        let undirected = graph.is_undirected();
        let min_cycle_len = if undirected { 3 } else { 2 };

        let mut probe = relaxed.clone();
        let mut seen_cycles: HashSet<Vec<usize>> = HashSet::new();
        let mut cycle_edges: Vec<Edge> = Vec::new();

        for i in 0..csr.num_edges() {
            if !probe.can_relax(csr, undirected, i) {
                continue;
            }
            probe.apply(csr, i);

            let u = csr.edge_source_by_index[i];
            let v = csr.edge_targets[i];
            let Some(cycle_nodes) = self
                .find_cycle_nodes(csr, &probe, u)
                .or_else(|| self.find_cycle_nodes(csr, &probe, v))
            else {
                continue;
            };

            if cycle_nodes.len() < min_cycle_len {
                continue;
            }

            let mut key = cycle_nodes.clone();
            key.sort_unstable();
            if !seen_cycles.insert(key) {
                continue;
            }

            let edges = self.reconstruct_cycle(graph, csr, &probe, &cycle_nodes)?;
            let ids: Vec<NodeId> = cycle_nodes.iter().map(|&n| csr.node_id(n)).collect();
            debug!(nodes = ?ids, "negative cycle found");

            for edge in edges {
                if !cycle_edges.contains(&edge) {
                    cycle_edges.push(edge);
                }
            }
        }

        if cycle_edges.is_empty() {
            Ok(CycleSearch::NoCycle)
        } else {
            Ok(CycleSearch::Cycle(cycle_edges))
        }
    }

    /// Detects negative cycles reachable from `start` without computing a
    /// path.
    pub fn detect_cycle(&self, graph: &Graph, start: NodeId) -> Result<CycleSearch, Error> {
        let csr = GraphCSR::from_graph(graph);
        let source = csr.index_of(start)?;
        let relaxed = self.relax(&csr, graph.is_undirected(), source);
        self.extract_cycles(graph, &csr, &relaxed)
    }
}

impl PathSolver for BellmanFordSolver {
    /// A negative cycle reachable from `start` leaves the shortest path
    /// undefined: the result then carries the cycle's edges, an empty path
    /// and `+∞`, never a partial answer.
    fn shortest_path(
        &self,
        graph: &Graph,
        start: NodeId,
        end: NodeId,
    ) -> Result<PathResult, Error> {
        let csr = GraphCSR::from_graph(graph);
        let source = csr.index_of(start)?;
        let target = csr.index_of(end)?;

        let relaxed = self.relax(&csr, graph.is_undirected(), source);

        match self.extract_cycles(graph, &csr, &relaxed)? {
            CycleSearch::Cycle(edges) => Ok(PathResult::negative_cycle(edges)),
            CycleSearch::NoCycle => {
                let predecessors = relaxed.predecessors(&csr);
                Ok(csr.path_result(&relaxed.distance, &predecessors, source, target))
            }
        }
    }
}
