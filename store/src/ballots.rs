//! Ballot log storage trait.

use crate::StoreError;
use tessera_types::ElectionId;

/// Trait for the per-election append-only ballot log.
///
/// The log is hash-chained by the submission engine; the store's only
/// integrity duty is the conditional append: an append names the sequence
/// number it expects to occupy, and the backend must reject it atomically if
/// the log has moved past that point. This is what makes the duplicate-check
/// + append pair in the engine an all-or-nothing unit even across restarts.
pub trait BallotLogStore {
    /// Append a serialized ballot at `expected_seq`.
    ///
    /// Fails with [`StoreError::SequenceConflict`] unless `expected_seq`
    /// equals the current log length. Must be atomic: on failure the log is
    /// unchanged.
    fn append_ballot(
        &self,
        election: &ElectionId,
        expected_seq: u64,
        ballot_bytes: &[u8],
    ) -> Result<(), StoreError>;

    /// Get one ballot by sequence number.
    fn get_ballot(&self, election: &ElectionId, seq: u64) -> Result<Vec<u8>, StoreError>;

    /// Get the first `limit` ballots in sequence order.
    ///
    /// Readers pair this with [`ballot_count`](Self::ballot_count) for a
    /// snapshot-isolated view: read the committed length first, then the
    /// prefix up to it.
    fn ballots(&self, election: &ElectionId, limit: u64) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Number of committed ballots for an election.
    fn ballot_count(&self, election: &ElectionId) -> Result<u64, StoreError>;
}
