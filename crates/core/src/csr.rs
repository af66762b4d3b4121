use std::collections::HashMap;
use std::ops::Range;

use common::error::Error;
use common::types::{Graph, NodeId, PathResult};

/// Graph in Compressed Sparse Row (CSR) format for fast graph traversal.
///
/// Node ids are mapped to dense indices `0..num_nodes` in node-set order.
/// CSR format stores outgoing edges of each node contiguously in memory:
/// - `node_pointers[u]..node_pointers[u+1]` → edges from node `u`
/// - `edge_targets[i]` -> target node of edge `i`
/// - `edge_weights[i]` -> weight of edge `i`
/// - `edge_source_by_index[i]` -> source node of edge `i`
/// - `edge_origin[i]` -> position of edge `i` in `Graph::edges()`
#[derive(Debug, Clone)]
pub struct GraphCSR {
    pub num_nodes: usize,
    pub node_ids: Vec<NodeId>,
    pub node_pointers: Vec<usize>,
    pub edge_targets: Vec<usize>,
    pub edge_weights: Vec<f64>,
    pub edge_source_by_index: Vec<usize>,
    pub edge_origin: Vec<usize>,
    index_by_id: HashMap<NodeId, usize>,
}

impl GraphCSR {
    /// Builds the CSR view of a validated graph.
    ///
    /// Edges keep their relative input order within each source block, so
    /// parallel edges are visited in the order the caller supplied them.
    pub fn from_graph(graph: &Graph) -> Self {
        let node_ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id).collect();
        let index_by_id: HashMap<NodeId, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let num_nodes = node_ids.len();
        let m = graph.edges().len();
        let mut node_pointers = vec![0; num_nodes + 1];

        // `Graph` guarantees every endpoint is in the node set.
        let dense: Vec<(usize, usize, f64)> = graph
            .edges()
            .iter()
            .map(|e| (index_by_id[&e.from], index_by_id[&e.to], e.weight))
            .collect();

        for &(u, _, _) in &dense {
            node_pointers[u + 1] += 1;
        }

        for i in 1..=num_nodes {
            node_pointers[i] += node_pointers[i - 1];
        }

        let mut edge_targets = vec![0; m];
        let mut edge_weights = vec![0.0; m];
        let mut edge_source_by_index = vec![0; m];
        let mut edge_origin = vec![0; m];

        let mut cursor = node_pointers.clone();

        for (origin, &(u, v, weight)) in dense.iter().enumerate() {
            let pos = cursor[u]; // Get the next available position for node 'u'
            edge_weights[pos] = weight;
            edge_targets[pos] = v;
            edge_source_by_index[pos] = u;
            edge_origin[pos] = origin;

            cursor[u] += 1;
        }

        Self {
            num_nodes,
            node_ids,
            node_pointers,
            edge_targets,
            edge_weights,
            edge_source_by_index,
            edge_origin,
            index_by_id,
        }
    }

    pub fn num_edges(&self) -> usize {
        self.edge_targets.len()
    }

    /// Dense index of a node id.
    ///
    /// # Errors
    /// Returns `Error::UnknownNode` if the id is not part of the graph.
    pub fn index_of(&self, id: NodeId) -> Result<usize, Error> {
        self.index_by_id
            .get(&id)
            .copied()
            .ok_or(Error::UnknownNode(id))
    }

    pub fn node_id(&self, idx: usize) -> NodeId {
        self.node_ids[idx]
    }

    /// CSR slot range holding the outgoing edges of `u`.
    pub fn outgoing(&self, u: usize) -> Range<usize> {
        self.node_pointers[u]..self.node_pointers[u + 1]
    }

    /// O(1) lookup for the source node of a given edge index.
    ///
    /// # Errors
    /// Returns `Error::CycleReconstructionFailed` if `edge_idx` is out of bounds.
    pub fn get_edge_source_node(&self, edge_idx: usize) -> Result<usize, Error> {
        self.edge_source_by_index
            .get(edge_idx)
            .copied()
            .ok_or(Error::CycleReconstructionFailed)
    }

    /// Walks predecessors back from `end` and returns the node ids from
    /// `start` to `end`.
    ///
    /// The walk stops on a repeated node or a missing predecessor; in either
    /// case the chain never reached `start` and the path is empty.
    pub fn trace_path(&self, predecessors: &[Option<usize>], start: usize, end: usize) -> Vec<NodeId> {
        let mut visited = vec![false; self.num_nodes];
        let mut path = Vec::new();
        let mut current = Some(end);

        while let Some(node) = current {
            if visited[node] {
                return Vec::new();
            }
            visited[node] = true;
            path.push(self.node_id(node));

            if node == start {
                path.reverse();
                return path;
            }
            current = predecessors[node];
        }

        Vec::new()
    }

    /// Turns final distances and predecessors into a `PathResult`.
    pub fn path_result(
        &self,
        distance: &[f64],
        predecessors: &[Option<usize>],
        start: usize,
        end: usize,
    ) -> PathResult {
        if !distance[end].is_finite() {
            return PathResult::unreachable();
        }

        let path = self.trace_path(predecessors, start, end);
        if path.is_empty() {
            return PathResult::unreachable();
        }

        PathResult::found(path, distance[end])
    }
}
