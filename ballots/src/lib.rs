//! Vote submission engine.
//!
//! Accepts at most one ballot per (election, effective voter), appends it to
//! the election's hash-chained append-only log, and returns a signed-hash
//! receipt that never discloses the choices. Submission runs under a
//! per-election single-writer lane: sequence assignment, the duplicate
//! check and the conditional append are one atomic unit, while distinct
//! elections proceed fully in parallel.

pub mod ballot;
pub mod chain;
pub mod engine;
pub mod error;
pub mod receipt;

pub use ballot::Ballot;
pub use chain::{BallotChain, ChainFrontier};
pub use engine::SubmissionEngine;
pub use error::SubmitError;
pub use receipt::Receipt;
