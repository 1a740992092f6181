//! Finalized tally storage trait.

use crate::StoreError;
use tessera_types::ElectionId;

/// Trait for the finalized tally table.
///
/// The final tally of a completed election is persisted exactly once;
/// concurrent finalizers converge on whichever result landed first (they are
/// deterministic, so the bytes are identical anyway).
pub trait TallyStore {
    /// Store the final tally for an election.
    ///
    /// Fails with [`StoreError::Duplicate`] if one is already persisted.
    fn put_final_tally(&self, election: &ElectionId, tally_bytes: &[u8]) -> Result<(), StoreError>;

    /// Get the final tally for an election, if finalized.
    fn get_final_tally(&self, election: &ElectionId) -> Result<Option<Vec<u8>>, StoreError>;
}
