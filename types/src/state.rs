//! Status enums for elections and delegation records.

use serde::{Deserialize, Serialize};

/// The lifecycle status of an election.
///
/// `Draft` and `Scheduled` are the only pre-lock states; `Completed` and
/// `Suspended` are terminal for voting purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// Being assembled; agenda and window still editable.
    Draft,
    /// Published: agenda and eligibility snapshot are frozen, window not yet open.
    Scheduled,
    /// Voting window is open; ballots accepted.
    Active,
    /// Operator-suspended; no ballots accepted, no automatic resume.
    Suspended,
    /// Window closed; ballot log frozen, final tally allowed.
    Completed,
}

impl ElectionStatus {
    /// Whether ballots may be accepted in this status (window check is separate).
    pub fn accepts_ballots(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the agenda and snapshot are still mutable.
    pub fn pre_publish(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether this status ends voting permanently.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Suspended)
    }
}

/// The status of a delegation record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelegationStatus {
    /// Awaiting proxy-holder acceptance. Assignments currently activate
    /// immediately, so this status is part of the vocabulary but not produced.
    Pending,
    /// In force: the delegated weight counts toward the proxy holder.
    Active,
    /// Explicitly revoked or superseded by a modification. Terminal.
    Revoked,
    /// Blanket expiry passed. Terminal.
    Expired,
}

impl DelegationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked | Self::Expired)
    }
}
