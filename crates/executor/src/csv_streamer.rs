use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use tokio::sync::mpsc::Sender;
use tracing::{error, info};

use super::error::Error;
use super::types::{PathQuery, QueryStreamer};
use common::types::{Edge, Graph, Node, NodeId};

// Helper struct for CSV parsing
#[derive(Debug, Deserialize, Default)]
pub struct CsvEdgeRecord {
    #[serde(rename = "from")]
    pub from_node: NodeId,

    #[serde(rename = "to")]
    pub to_node: NodeId,

    #[serde(rename = "weight")]
    pub weight_value: f64,
}

fn open(path: &str) -> Result<File, Error> {
    File::open(path).map_err(|e| {
        error!(path, error = %e, "failed to read file");
        Error::IoError(e)
    })
}

/// Reads a `from,to,weight` edge list into a validated graph.
///
/// The node set is the union of all edge endpoints.
pub struct CsvGraphLoader {
    path: String,
    undirected: bool,
}

impl CsvGraphLoader {
    pub fn new(path: String, undirected: bool) -> Self {
        CsvGraphLoader { path, undirected }
    }

    fn parse_csv_to_edges(&self) -> Result<Vec<Edge>, Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(open(&self.path)?);

        let mut edges = Vec::new();

        for result in rdr.deserialize() {
            let record: CsvEdgeRecord = result?;
            edges.push(Edge::new(record.from_node, record.to_node, record.weight_value));
        }
        Ok(edges)
    }

    pub fn load(&self) -> Result<Graph, Error> {
        let edges = self.parse_csv_to_edges()?;
        let ids: BTreeSet<NodeId> = edges.iter().flat_map(|e| [e.from, e.to]).collect();
        let nodes: Vec<Node> = ids.into_iter().map(Node::new).collect();

        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            undirected = self.undirected,
            "graph loaded from {}",
            self.path
        );

        let graph = if self.undirected {
            Graph::undirected(nodes, edges)?
        } else {
            Graph::new(nodes, edges)?
        };
        Ok(graph)
    }
}

/// Streams `start,end,mode` rows from a CSV file in fixed-size batches.
pub struct CsvQueryStreamer {
    path: String,
    batch_size: usize,
}

impl CsvQueryStreamer {
    pub fn new(path: String, batch_size: usize) -> Self {
        CsvQueryStreamer { path, batch_size }
    }

    fn parse_csv_to_queries(&self) -> Result<Vec<PathQuery>, Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(open(&self.path)?);

        let mut queries = Vec::new();
        for result in rdr.deserialize() {
            let query: PathQuery = result?;
            queries.push(query);
        }
        Ok(queries)
    }
}

#[async_trait::async_trait]
impl QueryStreamer for CsvQueryStreamer {
    async fn run_stream(self, sender: Sender<Vec<PathQuery>>) -> Result<(), Error> {
        let all_queries = self.parse_csv_to_queries()?;
        let mut queries_sent = 0;

        info!("CsvQueryStreamer: starting transfer of {} queries", all_queries.len());

        for chunk in all_queries.chunks(self.batch_size.max(1)) {
            if let Err(e) = sender.send(chunk.to_vec()).await {
                error!(
                    "CsvQueryStreamer shutting down: worker receiver dropped during send. Error: {}",
                    e
                );
                return Err(Error::ChannelSendFailed);
            }

            queries_sent += chunk.len();
        }

        info!("CsvQueryStreamer: transferred {} queries in batches", queries_sent);
        Ok(())
    }
}
