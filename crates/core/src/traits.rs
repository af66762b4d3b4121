use common::{
    error::Error,
    types::{Graph, NodeId, PathResult},
};

/// Trait for single-source shortest path solvers.
pub trait PathSolver {
    /// Computes the cheapest path from `start` to `end` under additive costs.
    ///
    /// Returns an unreachable result (`weight = +∞`, empty path) when no
    /// path exists, or `Err(e)` when `start`/`end` are not in the graph.
    fn shortest_path(&self, graph: &Graph, start: NodeId, end: NodeId)
    -> Result<PathResult, Error>;
}
