//! Identity & entitlement registry.
//!
//! Maps each shareholder to a token balance (voting weight). Balance changes
//! originate from the external corporate share ledger and arrive as
//! append-only deposits; this core never mutates balances on its own.
//! Publishing an election freezes the current weights into an immutable
//! [`EligibilitySnapshot`] — later balance changes never retroactively affect
//! a published election.

pub mod error;
pub mod registry;
pub mod shareholder;
pub mod snapshot;

pub use error::RegistryError;
pub use registry::{RegistrySummary, ShareRegistry};
pub use shareholder::{ShareClass, Shareholder};
pub use snapshot::{EligibilitySnapshot, SnapshotEntry};
