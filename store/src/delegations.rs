//! Delegation revision log storage trait.

use crate::StoreError;

/// Trait for the global append-only delegation revision log.
///
/// Every state change to a delegation record (creation, revocation,
/// supersession, expiry materialization) is appended as a full serialized
/// record, preserving the complete revision history for audit without a
/// separate audit-log component.
pub trait DelegationLogStore {
    /// Append one serialized delegation record revision.
    fn append_revision(&self, record_bytes: &[u8]) -> Result<(), StoreError>;

    /// All revisions in append order.
    fn revisions(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Number of appended revisions.
    fn revision_count(&self) -> Result<u64, StoreError>;
}
