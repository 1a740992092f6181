//! Election status-transition log storage trait.

use crate::StoreError;
use tessera_types::ElectionId;

/// Trait for the per-election append-only status-transition log.
pub trait TransitionLogStore {
    /// Append one serialized transition record.
    fn append_transition(
        &self,
        election: &ElectionId,
        transition_bytes: &[u8],
    ) -> Result<(), StoreError>;

    /// All transitions for an election in append order.
    fn transitions(&self, election: &ElectionId) -> Result<Vec<Vec<u8>>, StoreError>;
}
