//! The seam between the delegation ledger and the election store.
//!
//! The ledger needs exactly four facts about an election: whether it exists,
//! whether voting has started (the lock), when its window opened (the frozen
//! evaluation instant), and a holder's frozen snapshot weight. This trait
//! keeps the ledger testable without standing up a full election store.

use tessera_elections::ElectionStore;
use tessera_store::{SnapshotStore, TransitionLogStore};
use tessera_types::{ElectionId, ShareholderId, Timestamp, Weight};

/// What the delegation ledger may ask about elections.
pub trait ElectionCalendar {
    /// Whether the election id is known.
    fn contains(&self, election: &ElectionId) -> bool;

    /// Whether the election's voting window has opened at `now`.
    fn voting_started(&self, election: &ElectionId, now: Timestamp) -> bool;

    /// The instant the window opened, if it has.
    fn opened_at(&self, election: &ElectionId, now: Timestamp) -> Option<Timestamp>;

    /// Whether the election has a published eligibility snapshot.
    fn has_snapshot(&self, election: &ElectionId) -> bool;

    /// A holder's frozen weight in the election's snapshot.
    fn snapshot_weight(&self, election: &ElectionId, holder: &ShareholderId) -> Option<Weight>;
}

impl<S: TransitionLogStore + SnapshotStore> ElectionCalendar for ElectionStore<S> {
    fn contains(&self, election: &ElectionId) -> bool {
        ElectionStore::contains(self, election)
    }

    fn voting_started(&self, election: &ElectionId, now: Timestamp) -> bool {
        ElectionStore::voting_started(self, election, now).unwrap_or(false)
    }

    fn opened_at(&self, election: &ElectionId, now: Timestamp) -> Option<Timestamp> {
        ElectionStore::opened_at(self, election, now).ok().flatten()
    }

    fn has_snapshot(&self, election: &ElectionId) -> bool {
        ElectionStore::snapshot(self, election).is_ok()
    }

    fn snapshot_weight(&self, election: &ElectionId, holder: &ShareholderId) -> Option<Weight> {
        ElectionStore::snapshot(self, election)
            .ok()
            .and_then(|snapshot| snapshot.weight_of(holder))
    }
}
