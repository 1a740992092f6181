//! Vote receipts — the caster's verification anchor.

use serde::{Deserialize, Serialize};

use tessera_types::{ElectionId, EntryHash, ReceiptHash, Timestamp};

/// Returned to the caster after a committed submission.
///
/// Carries the ballot's content hash and chain position but never the
/// choices: the receipt proves inclusion, it does not disclose the vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_hash: ReceiptHash,
    pub content_hash: EntryHash,
    pub election: ElectionId,
    /// Chain position (sequence number) of the committed ballot.
    pub position: u64,
    pub cast_at: Timestamp,
}
