//! The ballot record — one immutable entry in an election's hash chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tessera_crypto::{blake2b_256_multi, voter_token};
use tessera_types::{
    AgendaItemId, ElectionId, EntryHash, OptionId, ReceiptHash, ShareholderId, Timestamp, Weight,
};

/// One committed ballot.
///
/// Append-only: never mutated or deleted. The content hash covers every
/// recorded field, so altering any of them in storage is detectable, and
/// `previous` links each entry to its predecessor's content hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ballot {
    pub election: ElectionId,
    /// The effective caster: the shareholder themselves, or the proxy holder
    /// voting the weight delegated to them.
    pub voter: ShareholderId,
    /// Choice per agenda item. Ordered map so hashing is deterministic.
    pub choices: BTreeMap<AgendaItemId, OptionId>,
    /// Effective weight at cast time (own undelegated + incoming delegated).
    pub weight: Weight,
    /// Position in the election's chain, starting at zero.
    pub sequence: u64,
    pub cast_at: Timestamp,
    /// Content hash of the previous entry; zero for the first entry.
    pub previous: EntryHash,
    pub content_hash: EntryHash,
    pub receipt_hash: ReceiptHash,
}

impl Ballot {
    /// Recompute the content hash from the recorded fields.
    ///
    /// The voter enters as an opaque token, not the raw shareholder id, so a
    /// party verifying an export learns chain integrity without a directory
    /// of identities baked into the hash preimage.
    pub fn compute_content_hash(&self) -> EntryHash {
        let token = voter_token(&self.election, &self.voter);
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(6 + self.choices.len() * 2);
        parts.push(self.election.as_str().as_bytes().to_vec());
        parts.push(token.to_vec());
        for (item, choice) in &self.choices {
            parts.push(item.as_str().as_bytes().to_vec());
            parts.push(choice.as_str().as_bytes().to_vec());
        }
        parts.push(self.weight.raw().to_le_bytes().to_vec());
        parts.push(self.cast_at.as_secs().to_le_bytes().to_vec());
        parts.push(self.sequence.to_le_bytes().to_vec());
        parts.push(self.previous.as_bytes().to_vec());

        let part_refs: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        EntryHash::new(blake2b_256_multi(&part_refs))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("ballot serialization should not fail")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }
}
