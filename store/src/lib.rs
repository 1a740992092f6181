//! Abstract storage traits for the Tessera voting ledger.
//!
//! The persisted state is three append-only logs (ballots, delegation
//! revisions, election status transitions) plus two keyed tables (eligibility
//! snapshots, finalized tallies). Every storage backend (LMDB, in-memory for
//! testing) implements these traits; the engines depend only on the traits.
//!
//! Values cross the trait boundary as serialized bytes so backends stay
//! oblivious to record schemas.

pub mod ballots;
pub mod delegations;
pub mod error;
pub mod snapshots;
pub mod tallies;
pub mod transitions;

pub use ballots::BallotLogStore;
pub use delegations::DelegationLogStore;
pub use error::StoreError;
pub use snapshots::SnapshotStore;
pub use tallies::TallyStore;
pub use transitions::TransitionLogStore;
