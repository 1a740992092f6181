//! LMDB storage backend for the Tessera voting ledger.
//!
//! Implements all storage traits from `tessera-store` using the `heed` LMDB
//! bindings. One environment holds six databases: the ballot logs and their
//! commit counters, the delegation revision log, the transition logs, and
//! the snapshot and final-tally tables. LMDB's single-writer transactions
//! give the conditional append its atomicity for free.

pub mod error;
mod keys;
pub mod store;

pub use error::LmdbError;
pub use store::LmdbStore;
