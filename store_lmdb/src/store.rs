//! The LMDB-backed store.

use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use tessera_store::{
    BallotLogStore, DelegationLogStore, SnapshotStore, StoreError, TallyStore, TransitionLogStore,
};
use tessera_types::ElectionId;

use crate::error::LmdbError;
use crate::keys::{election_prefix, prefix_upper, sequence_key};

/// Default LMDB map size: 1 GiB of virtual address space.
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

const DB_COUNT: u32 = 6;

/// One LMDB environment implementing every Tessera storage trait.
pub struct LmdbStore {
    env: Arc<Env>,
    ballots_db: Database<Bytes, Bytes>,
    /// Commit counter per election — the compare half of conditional append.
    ballot_counts_db: Database<Bytes, Bytes>,
    revisions_db: Database<Bytes, Bytes>,
    transitions_db: Database<Bytes, Bytes>,
    snapshots_db: Database<Bytes, Bytes>,
    tallies_db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open or create the environment at `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        // Safety: one process owns the environment directory; no other
        // mapping of the same path exists in this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(DB_COUNT)
                .map_size(map_size)
                .open(path)?
        };
        let mut wtxn = env.write_txn()?;
        let ballots_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("ballots"))?;
        let ballot_counts_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("ballot_counts"))?;
        let revisions_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("delegation_revisions"))?;
        let transitions_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("transitions"))?;
        let snapshots_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("snapshots"))?;
        let tallies_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("tallies"))?;
        wtxn.commit()?;
        info!(path = %path.display(), "LMDB store opened");
        Ok(Self {
            env: Arc::new(env),
            ballots_db,
            ballot_counts_db,
            revisions_db,
            transitions_db,
            snapshots_db,
            tallies_db,
        })
    }

    fn count_in_txn(
        &self,
        txn: &heed::RoTxn,
        election: &ElectionId,
    ) -> Result<u64, LmdbError> {
        let prefix = election_prefix(election);
        match self.ballot_counts_db.get(txn, &prefix)? {
            Some(bytes) if bytes.len() == 8 => {
                let arr: [u8; 8] = bytes.try_into().expect("checked length");
                Ok(u64::from_le_bytes(arr))
            }
            Some(_) => Err(LmdbError::Serialization(
                "ballot count has unexpected byte length".to_string(),
            )),
            None => Ok(0),
        }
    }

    fn scan_prefix(
        &self,
        db: &Database<Bytes, Bytes>,
        prefix: &[u8],
        limit: u64,
    ) -> Result<Vec<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let upper = prefix_upper(prefix);
        let bounds = match &upper {
            Some(hi) => (Bound::Included(prefix), Bound::Excluded(hi.as_slice())),
            None => (Bound::Included(prefix), Bound::Unbounded),
        };
        let iter = db.range(&rtxn, &bounds)?;
        let mut results = Vec::new();
        for entry in iter.take(limit as usize) {
            let (_key, value) = entry?;
            results.push(value.to_vec());
        }
        Ok(results)
    }
}

impl BallotLogStore for LmdbStore {
    fn append_ballot(
        &self,
        election: &ElectionId,
        expected_seq: u64,
        ballot_bytes: &[u8],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let actual = self.count_in_txn(&wtxn, election)?;
        if actual != expected_seq {
            return Err(StoreError::SequenceConflict {
                expected: expected_seq,
                actual,
            });
        }
        self.ballots_db
            .put(&mut wtxn, &sequence_key(election, expected_seq), ballot_bytes)
            .map_err(LmdbError::from)?;
        self.ballot_counts_db
            .put(
                &mut wtxn,
                &election_prefix(election),
                &(actual + 1).to_le_bytes(),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_ballot(&self, election: &ElectionId, seq: u64) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .ballots_db
            .get(&rtxn, &sequence_key(election, seq))
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("ballot {}#{}", election, seq)))?;
        Ok(value.to_vec())
    }

    fn ballots(&self, election: &ElectionId, limit: u64) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.scan_prefix(&self.ballots_db, &election_prefix(election), limit)?)
    }

    fn ballot_count(&self, election: &ElectionId) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.count_in_txn(&rtxn, election)?)
    }
}

impl DelegationLogStore for LmdbStore {
    fn append_revision(&self, record_bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let next = self.revisions_db.len(&wtxn).map_err(LmdbError::from)?;
        self.revisions_db
            .put(&mut wtxn, &next.to_be_bytes(), record_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn revisions(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.revisions_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_key, value) = entry.map_err(LmdbError::from)?;
            results.push(value.to_vec());
        }
        Ok(results)
    }

    fn revision_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.revisions_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl TransitionLogStore for LmdbStore {
    fn append_transition(
        &self,
        election: &ElectionId,
        transition_bytes: &[u8],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        // Transitions per election are few; counting by scan keeps the
        // schema to one database.
        let prefix = election_prefix(election);
        let upper = prefix_upper(&prefix);
        let bounds = match &upper {
            Some(hi) => (
                Bound::Included(prefix.as_slice()),
                Bound::Excluded(hi.as_slice()),
            ),
            None => (Bound::Included(prefix.as_slice()), Bound::Unbounded),
        };
        let next = self
            .transitions_db
            .range(&wtxn, &bounds)
            .map_err(LmdbError::from)?
            .count() as u64;
        self.transitions_db
            .put(&mut wtxn, &sequence_key(election, next), transition_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn transitions(&self, election: &ElectionId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.scan_prefix(&self.transitions_db, &election_prefix(election), u64::MAX)?)
    }
}

impl SnapshotStore for LmdbStore {
    fn put_snapshot(&self, election: &ElectionId, snapshot_bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = election_prefix(election);
        if self
            .snapshots_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("snapshot {}", election)));
        }
        self.snapshots_db
            .put(&mut wtxn, &key, snapshot_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_snapshot(&self, election: &ElectionId) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .snapshots_db
            .get(&rtxn, &election_prefix(election))
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("snapshot {}", election)))?;
        Ok(value.to_vec())
    }

    fn has_snapshot(&self, election: &ElectionId) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .snapshots_db
            .get(&rtxn, &election_prefix(election))
            .map_err(LmdbError::from)?
            .is_some())
    }
}

impl TallyStore for LmdbStore {
    fn put_final_tally(&self, election: &ElectionId, tally_bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = election_prefix(election);
        if self
            .tallies_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("final tally {}", election)));
        }
        self.tallies_db
            .put(&mut wtxn, &key, tally_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_final_tally(&self, election: &ElectionId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .tallies_db
            .get(&rtxn, &election_prefix(election))
            .map_err(LmdbError::from)?
            .map(|v| v.to_vec()))
    }
}
