use thiserror::Error;

use crate::types::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The supplied graph or weights cannot be used for a computation.
    #[error("Invalid graph input: {0}")]
    Validation(String),

    /// A start, end or edge endpoint is not part of the graph's node set.
    #[error("Node {0} is not part of the graph.")]
    UnknownNode(NodeId),

    /// The resolver kept finding negative cycles after its retry budget ran out.
    #[error("Negative cycles remain after {attempts} resolution attempts.")]
    ResolutionBudgetExceeded { attempts: usize },

    /// Failed to trace the full cycle path, usually due to broken predecessor chains.
    #[error("Cycle path reconstruction failed due to broken predecessor chain.")]
    CycleReconstructionFailed,
}
