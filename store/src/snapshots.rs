//! Eligibility snapshot storage trait.

use crate::StoreError;
use tessera_types::ElectionId;

/// Trait for the per-election eligibility snapshot table.
///
/// One snapshot per election, written exactly once at publish time.
pub trait SnapshotStore {
    /// Store the snapshot for an election.
    ///
    /// Fails with [`StoreError::Duplicate`] if one already exists — a
    /// published election's snapshot is immutable.
    fn put_snapshot(&self, election: &ElectionId, snapshot_bytes: &[u8]) -> Result<(), StoreError>;

    /// Get the snapshot for an election.
    fn get_snapshot(&self, election: &ElectionId) -> Result<Vec<u8>, StoreError>;

    /// Whether a snapshot exists for an election.
    fn has_snapshot(&self, election: &ElectionId) -> Result<bool, StoreError>;
}
