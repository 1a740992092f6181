//! Eligibility snapshots — frozen weights for one election.
//!
//! Taken once at publish time and immutable afterwards. The snapshot hash is
//! computed deterministically from the sorted entries so any party holding
//! the serialized snapshot can verify its integrity.

use serde::{Deserialize, Serialize};

use tessera_crypto::blake2b_256_multi;
use tessera_types::{ElectionId, ShareholderId, Timestamp, Weight};

/// One (shareholder, weight) pair in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub holder: ShareholderId,
    pub weight: Weight,
}

/// The frozen eligibility set of one election.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EligibilitySnapshot {
    pub election: ElectionId,
    /// Blake2b-256 over the election id and sorted entries.
    pub hash: [u8; 32],
    pub taken_at: Timestamp,
    /// Entries sorted by shareholder id for deterministic hashing and lookup.
    pub entries: Vec<SnapshotEntry>,
    pub total_weight: Weight,
}

impl EligibilitySnapshot {
    /// Build a snapshot from unsorted (holder, weight) pairs.
    pub fn create(
        election: ElectionId,
        mut eligible: Vec<(ShareholderId, Weight)>,
        now: Timestamp,
    ) -> Self {
        eligible.sort_by(|a, b| a.0.cmp(&b.0));
        let total_weight = eligible.iter().map(|(_, w)| *w).sum();
        let entries = eligible
            .into_iter()
            .map(|(holder, weight)| SnapshotEntry { holder, weight })
            .collect();
        let mut snap = Self {
            election,
            hash: [0u8; 32],
            taken_at: now,
            entries,
            total_weight,
        };
        snap.hash = snap.compute_hash();
        snap
    }

    /// Compute the Blake2b-256 hash of this snapshot deterministically.
    ///
    /// `taken_at` is metadata and excluded: two snapshots of the same weights
    /// for the same election hash identically.
    fn compute_hash(&self) -> [u8; 32] {
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(1 + self.entries.len() * 2);
        parts.push(self.election.as_str().as_bytes().to_vec());
        for entry in &self.entries {
            parts.push(entry.holder.as_str().as_bytes().to_vec());
            parts.push(entry.weight.raw().to_le_bytes().to_vec());
        }
        let part_refs: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        blake2b_256_multi(&part_refs)
    }

    /// Verify the snapshot hash matches the entry data.
    pub fn verify(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// The frozen weight of one shareholder, if eligible.
    pub fn weight_of(&self, holder: &ShareholderId) -> Option<Weight> {
        self.entries
            .binary_search_by(|e| e.holder.cmp(holder))
            .ok()
            .map(|idx| self.entries[idx].weight)
    }

    /// Whether a shareholder is in the eligibility set.
    pub fn contains(&self, holder: &ShareholderId) -> bool {
        self.weight_of(holder).is_some()
    }

    /// Number of eligible shareholders.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Serialize the snapshot to bytes (bincode).
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("snapshot serialization should not fail")
    }

    /// Deserialize a snapshot from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }
}
