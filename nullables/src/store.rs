//! Nullable store — thread-safe in-memory storage for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use tessera_store::{
    BallotLogStore, DelegationLogStore, SnapshotStore, StoreError, TallyStore, TransitionLogStore,
};
use tessera_types::ElectionId;

/// An in-memory implementation of every Tessera storage trait.
///
/// Thread-safe; the conditional-append check runs under the ballot table's
/// mutex so concurrent submitters see the same atomicity the LMDB backend
/// provides.
pub struct NullStore {
    ballots: Mutex<HashMap<ElectionId, Vec<Vec<u8>>>>,
    revisions: Mutex<Vec<Vec<u8>>>,
    transitions: Mutex<HashMap<ElectionId, Vec<Vec<u8>>>>,
    snapshots: Mutex<HashMap<ElectionId, Vec<u8>>>,
    tallies: Mutex<HashMap<ElectionId, Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            ballots: Mutex::new(HashMap::new()),
            revisions: Mutex::new(Vec::new()),
            transitions: Mutex::new(HashMap::new()),
            snapshots: Mutex::new(HashMap::new()),
            tallies: Mutex::new(HashMap::new()),
        }
    }

    /// Overwrite a committed ballot in place — tamper helper for audit tests.
    ///
    /// Deliberately violates the append-only contract; only reachable from
    /// test code that wants to prove chain verification catches corruption.
    pub fn tamper_ballot(&self, election: &ElectionId, seq: u64, ballot_bytes: Vec<u8>) {
        let mut table = self.ballots.lock().unwrap();
        if let Some(log) = table.get_mut(election) {
            if let Some(slot) = log.get_mut(seq as usize) {
                *slot = ballot_bytes;
            }
        }
    }

    /// Drop a committed ballot — tamper helper producing a sequence gap.
    pub fn truncate_ballots(&self, election: &ElectionId, len: u64) {
        let mut table = self.ballots.lock().unwrap();
        if let Some(log) = table.get_mut(election) {
            log.truncate(len as usize);
        }
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BallotLogStore for NullStore {
    fn append_ballot(
        &self,
        election: &ElectionId,
        expected_seq: u64,
        ballot_bytes: &[u8],
    ) -> Result<(), StoreError> {
        let mut table = self.ballots.lock().unwrap();
        let log = table.entry(election.clone()).or_default();
        let actual = log.len() as u64;
        if actual != expected_seq {
            return Err(StoreError::SequenceConflict {
                expected: expected_seq,
                actual,
            });
        }
        log.push(ballot_bytes.to_vec());
        Ok(())
    }

    fn get_ballot(&self, election: &ElectionId, seq: u64) -> Result<Vec<u8>, StoreError> {
        self.ballots
            .lock()
            .unwrap()
            .get(election)
            .and_then(|log| log.get(seq as usize))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("ballot {}#{}", election, seq)))
    }

    fn ballots(&self, election: &ElectionId, limit: u64) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .ballots
            .lock()
            .unwrap()
            .get(election)
            .map(|log| log.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    fn ballot_count(&self, election: &ElectionId) -> Result<u64, StoreError> {
        Ok(self
            .ballots
            .lock()
            .unwrap()
            .get(election)
            .map(|log| log.len() as u64)
            .unwrap_or(0))
    }
}

impl DelegationLogStore for NullStore {
    fn append_revision(&self, record_bytes: &[u8]) -> Result<(), StoreError> {
        self.revisions.lock().unwrap().push(record_bytes.to_vec());
        Ok(())
    }

    fn revisions(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.revisions.lock().unwrap().clone())
    }

    fn revision_count(&self) -> Result<u64, StoreError> {
        Ok(self.revisions.lock().unwrap().len() as u64)
    }
}

impl TransitionLogStore for NullStore {
    fn append_transition(
        &self,
        election: &ElectionId,
        transition_bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.transitions
            .lock()
            .unwrap()
            .entry(election.clone())
            .or_default()
            .push(transition_bytes.to_vec());
        Ok(())
    }

    fn transitions(&self, election: &ElectionId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .transitions
            .lock()
            .unwrap()
            .get(election)
            .cloned()
            .unwrap_or_default())
    }
}

impl SnapshotStore for NullStore {
    fn put_snapshot(&self, election: &ElectionId, snapshot_bytes: &[u8]) -> Result<(), StoreError> {
        let mut table = self.snapshots.lock().unwrap();
        if table.contains_key(election) {
            return Err(StoreError::Duplicate(format!("snapshot {}", election)));
        }
        table.insert(election.clone(), snapshot_bytes.to_vec());
        Ok(())
    }

    fn get_snapshot(&self, election: &ElectionId) -> Result<Vec<u8>, StoreError> {
        self.snapshots
            .lock()
            .unwrap()
            .get(election)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("snapshot {}", election)))
    }

    fn has_snapshot(&self, election: &ElectionId) -> Result<bool, StoreError> {
        Ok(self.snapshots.lock().unwrap().contains_key(election))
    }
}

impl TallyStore for NullStore {
    fn put_final_tally(&self, election: &ElectionId, tally_bytes: &[u8]) -> Result<(), StoreError> {
        let mut table = self.tallies.lock().unwrap();
        if table.contains_key(election) {
            return Err(StoreError::Duplicate(format!("final tally {}", election)));
        }
        table.insert(election.clone(), tally_bytes.to_vec());
        Ok(())
    }

    fn get_final_tally(&self, election: &ElectionId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tallies.lock().unwrap().get(election).cloned())
    }
}
