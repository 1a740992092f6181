//! Fundamental types for the Tessera voting ledger.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: identifiers, hashes, weights, timestamps, ledger parameters,
//! and status enums.

pub mod hash;
pub mod id;
pub mod params;
pub mod state;
pub mod time;
pub mod weight;

pub use hash::{EntryHash, ReceiptHash};
pub use id::{AgendaItemId, DelegationId, ElectionId, OptionId, ShareholderId};
pub use params::LedgerParams;
pub use state::{DelegationStatus, ElectionStatus};
pub use time::Timestamp;
pub use weight::Weight;
