//! Binary key layouts.
//!
//! Election ids are variable-length strings, so composite keys carry a
//! big-endian u16 length prefix; sequence numbers are big-endian u64 so
//! lexicographic key order equals numeric order and prefix range-scans walk
//! a log in sequence.

use tessera_types::ElectionId;

/// The length-prefixed election-id portion of a composite key.
pub(crate) fn election_prefix(election: &ElectionId) -> Vec<u8> {
    let id = election.as_str().as_bytes();
    let mut prefix = Vec::with_capacity(2 + id.len());
    prefix.extend_from_slice(&(id.len() as u16).to_be_bytes());
    prefix.extend_from_slice(id);
    prefix
}

/// Composite key `election_prefix ++ seq_be_u64`.
pub(crate) fn sequence_key(election: &ElectionId, seq: u64) -> Vec<u8> {
    let mut key = election_prefix(election);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// The exclusive upper bound for a prefix range-scan.
///
/// `None` means the prefix is all `0xff` bytes and the scan is unbounded
/// above.
pub(crate) fn prefix_upper(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last == 0xff {
            upper.pop();
        } else {
            *last += 1;
            return Some(upper);
        }
    }
    None
}
