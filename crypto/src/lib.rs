//! Cryptographic primitives for the Tessera voting ledger.
//!
//! The core needs exactly one primitive: Blake2b-256 hashing, used for the
//! ballot hash chain, voter tokens, receipt derivation, and eligibility
//! snapshot integrity. Key management and signatures belong to the external
//! wallet collaborator.

pub mod hash;

pub use hash::{blake2b_256, blake2b_256_multi, receipt_hash, voter_token};
