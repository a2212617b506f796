//! Network-flow algorithms over a compact directed graph with an implicit
//! dual (residual) arc for every forward arc: BFS/Dijkstra reachability,
//! feasible-flow and minimum-cost-flow primitives via successive shortest
//! paths, Goldberg-Tarjan cost-scaling push/relabel minimum-cost flow, and
//! approximate/constrained Fixed-Charge Network-Flow Problem solvers.
//!
//! All quantities are 64-bit integers; there is no floating-point cost
//! support and no distributed or concurrent execution model. The crate is
//! an in-process library: it has no CLI, no file parsers, and no I/O.

pub mod error;
pub mod graph;

pub use error::NetflowError;
pub use graph::{ArcId, Graph, NodeId, INVALID_INDEX};
