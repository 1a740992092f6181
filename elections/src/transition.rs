//! Status-transition records — the election lifecycle audit trail.

use serde::{Deserialize, Serialize};

use tessera_types::{ElectionId, ElectionStatus, Timestamp};

/// One entry in the per-election status-transition log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub election: ElectionId,
    pub from: ElectionStatus,
    pub to: ElectionStatus,
    pub at: Timestamp,
    /// Whether an operator forced the transition ahead of the clock.
    pub forced: bool,
}

impl StatusTransition {
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transition serialization should not fail")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }
}
