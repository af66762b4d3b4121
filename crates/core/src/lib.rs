//! Optimal-path search over small weighted graphs under additive or
//! multiplicative cost composition, with negative-cycle detection and
//! explicit, bounded cycle resolution.

pub mod bellman_ford;
pub mod csr;
pub mod dijkstra;
pub mod optimizer;
pub mod resolver;
pub mod traits;

pub use bellman_ford::{BellmanFordSolver, CycleSearch};
pub use csr::GraphCSR;
pub use dijkstra::DijkstraSolver;
pub use optimizer::PathOptimizer;
pub use resolver::{CycleResolver, Resolution, resolve_negative_cycle};
pub use traits::PathSolver;
