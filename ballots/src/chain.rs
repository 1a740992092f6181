//! Per-election hash chains and the frontier of chain heads.

use std::collections::HashMap;

use tessera_types::{ElectionId, EntryHash};

use crate::ballot::Ballot;
use crate::error::SubmitError;

/// One election's chain state: the head hash and the committed length.
pub struct BallotChain {
    pub election: ElectionId,
    /// Content hash of the most recent entry; zero for an empty chain.
    pub head: EntryHash,
    pub length: u64,
}

impl BallotChain {
    pub fn genesis(election: ElectionId) -> Self {
        Self {
            election,
            head: EntryHash::ZERO,
            length: 0,
        }
    }

    /// Validate that a new ballot extends this chain.
    pub fn validate_append(&self, ballot: &Ballot) -> Result<(), SubmitError> {
        if ballot.sequence != self.length {
            return Err(SubmitError::ChainGap {
                expected: self.length,
                got: ballot.sequence,
            });
        }
        if ballot.previous != self.head {
            return Err(SubmitError::ChainGap {
                expected: self.length,
                got: ballot.sequence,
            });
        }
        Ok(())
    }

    /// Append a validated ballot, advancing the head.
    pub fn append(&mut self, ballot: &Ballot) {
        self.head = ballot.content_hash;
        self.length += 1;
    }
}

/// The set of all chain heads: one per election.
pub struct ChainFrontier {
    heads: HashMap<ElectionId, BallotChain>,
}

impl ChainFrontier {
    pub fn new() -> Self {
        Self {
            heads: HashMap::new(),
        }
    }

    /// The chain for an election, created empty on first touch.
    pub fn chain_mut(&mut self, election: &ElectionId) -> &mut BallotChain {
        self.heads
            .entry(election.clone())
            .or_insert_with(|| BallotChain::genesis(election.clone()))
    }

    pub fn get(&self, election: &ElectionId) -> Option<&BallotChain> {
        self.heads.get(election)
    }

    pub fn election_count(&self) -> usize {
        self.heads.len()
    }
}

impl Default for ChainFrontier {
    fn default() -> Self {
        Self::new()
    }
}
