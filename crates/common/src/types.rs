use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::Error;
use crate::numeric_kernel::{PRODUCT_TOLERANCE, SUM_TOLERANCE};

/// Stable identifier of a node inside a graph.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Node { id }
    }
}

/// A directed, weighted edge. Endpoints are looked up by id.
///
/// Equality is structural over `(from, to, weight)`, so two edges built from
/// the same record compare equal regardless of where they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Edge { from, to, weight }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// True if both edges join the same endpoints, ignoring direction.
    pub fn same_endpoints_unordered(&self, other: &Edge) -> bool {
        (self.from == other.from && self.to == other.to)
            || (self.from == other.to && self.to == other.from)
    }

    /// Same edge with a different weight.
    pub fn with_weight(&self, weight: f64) -> Self {
        Edge { weight, ..*self }
    }
}

/// How the edge collection of a graph was built.
///
/// An undirected graph still stores two directed edges per connection; the
/// orientation only changes how cycles are recognised and matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Directed,
    Undirected,
}

/// Immutable graph snapshot: a node set plus a collection of directed edges.
///
/// Parallel edges between the same ordered pair are allowed and are all
/// considered during relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    orientation: Orientation,
}

impl Graph {
    /// Builds a directed graph, validating every edge against the node set.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, Error> {
        Self::build(nodes, edges, Orientation::Directed)
    }

    /// Builds an undirected graph by materialising both directions of every
    /// supplied edge with the same weight.
    pub fn undirected(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, Error> {
        let doubled = edges
            .iter()
            .flat_map(|e| {
                let reverse = Edge::new(e.to, e.from, e.weight);
                if e.is_self_loop() {
                    vec![*e]
                } else {
                    vec![*e, reverse]
                }
            })
            .collect();

        Self::build(nodes, doubled, Orientation::Undirected)
    }

    fn build(nodes: Vec<Node>, edges: Vec<Edge>, orientation: Orientation) -> Result<Self, Error> {
        let mut ids = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !ids.insert(node.id) {
                return Err(Error::Validation(format!("duplicate node id {}", node.id)));
            }
        }

        for edge in &edges {
            if !ids.contains(&edge.from) {
                return Err(Error::UnknownNode(edge.from));
            }
            if !ids.contains(&edge.to) {
                return Err(Error::UnknownNode(edge.to));
            }
            if !edge.weight.is_finite() {
                return Err(Error::Validation(format!(
                    "edge {}->{} has non-finite weight {}",
                    edge.from, edge.to, edge.weight
                )));
            }
        }

        Ok(Graph {
            nodes,
            edges,
            orientation,
        })
    }

    /// Returns a new graph with the same nodes and orientation but a
    /// different edge collection.
    pub fn with_edges(&self, edges: Vec<Edge>) -> Result<Self, Error> {
        Self::build(self.nodes.clone(), edges, self.orientation)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_undirected(&self) -> bool {
        self.orientation == Orientation::Undirected
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn has_negative_weight(&self) -> bool {
        self.edges.iter().any(|e| e.weight < 0.0)
    }
}

/// Operator used to combine edge weights into a path cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    #[default]
    Sum,
    Product,
}

impl AggregationMode {
    /// Cost of the empty path.
    pub fn identity(&self) -> f64 {
        match self {
            AggregationMode::Sum => 0.0,
            AggregationMode::Product => 1.0,
        }
    }

    pub fn combine(&self, acc: f64, weight: f64) -> f64 {
        match self {
            AggregationMode::Sum => acc + weight,
            AggregationMode::Product => acc * weight,
        }
    }

    pub fn tolerance(&self) -> f64 {
        match self {
            AggregationMode::Sum => SUM_TOLERANCE,
            AggregationMode::Product => PRODUCT_TOLERANCE,
        }
    }

    /// Compares two path totals within this mode's tolerance.
    pub fn weights_match(&self, a: f64, b: f64) -> bool {
        if a.is_infinite() || b.is_infinite() {
            return a == b;
        }
        (a - b).abs() <= self.tolerance()
    }
}

/// Outcome of a single optimal-path query.
///
/// An unreachable destination and a blocking negative cycle are ordinary
/// results: both carry `weight = +∞` and an empty path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub path: Vec<NodeId>,
    pub weight: f64,
    pub cycle_detected: bool,
    pub cycle_edges: Vec<Edge>,
}

impl PathResult {
    pub fn found(path: Vec<NodeId>, weight: f64) -> Self {
        PathResult {
            path,
            weight,
            cycle_detected: false,
            cycle_edges: Vec::new(),
        }
    }

    pub fn unreachable() -> Self {
        PathResult {
            path: Vec::new(),
            weight: f64::INFINITY,
            cycle_detected: false,
            cycle_edges: Vec::new(),
        }
    }

    pub fn negative_cycle(cycle_edges: Vec<Edge>) -> Self {
        PathResult {
            path: Vec::new(),
            weight: f64::INFINITY,
            cycle_detected: true,
            cycle_edges,
        }
    }

    pub fn is_reachable(&self) -> bool {
        !self.cycle_detected && self.weight.is_finite() && !self.path.is_empty()
    }
}
