//! Error type for the convenience, validating wrappers around the crate's
//! infallible (panic-on-contract-violation) core algorithms.

use thiserror::Error;

/// Failure modes observable by callers of the `Result`-returning wrappers.
/// The low-level solver functions (`bfs_path`, `mcf_refinement`, ...) do not
/// use this type: they return `bool`/sentinel values per their documented
/// contracts, and panic on programmer error (malformed arrays, violated
/// invariants).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetflowError {
    /// A caller-supplied array has the wrong length, or an amount/bound
    /// argument violates a documented precondition (e.g. `amount <= 0`).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No feasible solution exists for the given supply/demand and capacity.
    #[error("no feasible flow exists for the given supply/demand and capacity")]
    Infeasible,

    /// A solver reached its iteration cap before converging or proving
    /// infeasibility.
    #[error("solver reached its iteration limit ({0}) before converging")]
    IterationLimit(usize),
}
