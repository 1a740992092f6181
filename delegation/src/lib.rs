//! Delegation ledger — entrust voting weight to a proxy holder.
//!
//! Delegations are weight-scoped (a share count, not a wholesale transfer),
//! carry either blanket or per-election scope, and are recorded as an
//! append-only revision chain: a modification revokes the old record and
//! creates a successor with back-references, preserving the full history for
//! audit. Writes are serialized per delegator so two concurrent assignments
//! cannot both spend the same undelegated balance.
//!
//! Once an election's voting window opens, delegations bound to it are
//! immutable, and scope resolution for that election evaluates records as of
//! the window-open instant so captured weights stay deterministic.

pub mod calendar;
pub mod error;
pub mod ledger;
pub mod record;

pub use calendar::ElectionCalendar;
pub use error::DelegationError;
pub use ledger::DelegationLedger;
pub use record::{DelegationRecord, DelegationScope};
