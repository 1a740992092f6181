//! Blake2b hashing for ballot-log entries, voter tokens and receipts.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use tessera_types::{ElectionId, EntryHash, ReceiptHash, ShareholderId};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Derive the opaque voter token hashed into ballot content.
///
/// The token binds a voter to one election without exposing the raw
/// shareholder id to parties holding only export access.
pub fn voter_token(election: &ElectionId, voter: &ShareholderId) -> [u8; 32] {
    blake2b_256_multi(&[
        b"tessera.voter",
        election.as_str().as_bytes(),
        voter.as_str().as_bytes(),
    ])
}

/// Derive the receipt hash for a committed ballot from its content hash.
pub fn receipt_hash(content: &EntryHash) -> ReceiptHash {
    ReceiptHash::new(blake2b_256_multi(&[b"tessera.receipt", content.as_bytes()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        let h1 = blake2b_256(b"hello tessera");
        let h2 = blake2b_256(b"hello tessera");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_different_inputs() {
        let h1 = blake2b_256(b"hello");
        let h2 = blake2b_256(b"world");
        assert_ne!(h1, h2);
    }

    #[test]
    fn blake2b_empty() {
        let h = blake2b_256(b"");
        assert_ne!(h, [0u8; 32]);
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn voter_token_bound_to_election() {
        let voter = ShareholderId::new("shr-1");
        let t1 = voter_token(&ElectionId::new("board-2024"), &voter);
        let t2 = voter_token(&ElectionId::new("merger-2024"), &voter);
        assert_ne!(t1, t2);
    }

    #[test]
    fn voter_token_bound_to_voter() {
        let election = ElectionId::new("board-2024");
        let t1 = voter_token(&election, &ShareholderId::new("shr-1"));
        let t2 = voter_token(&election, &ShareholderId::new("shr-2"));
        assert_ne!(t1, t2);
    }

    #[test]
    fn receipt_hash_differs_from_content() {
        let content = EntryHash::new(blake2b_256(b"some ballot"));
        let receipt = receipt_hash(&content);
        assert_ne!(receipt.as_bytes(), content.as_bytes());
        assert!(!receipt.is_zero());
    }
}
