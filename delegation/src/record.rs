//! Delegation records and their revision chain.

use serde::{Deserialize, Serialize};

use tessera_types::{DelegationId, DelegationStatus, ElectionId, ShareholderId, Timestamp, Weight};

/// Scope of a delegation — which elections it applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationScope {
    /// Applies to every election, optionally until an expiry instant.
    Blanket { expires: Option<Timestamp> },
    /// Applies only to one election.
    Election(ElectionId),
}

impl DelegationScope {
    pub fn is_blanket(&self) -> bool {
        matches!(self, Self::Blanket { .. })
    }

    pub fn is_election(&self, id: &ElectionId) -> bool {
        matches!(self, Self::Election(e) if e == id)
    }

    /// The bound election, if election-scoped.
    pub fn election(&self) -> Option<&ElectionId> {
        match self {
            Self::Election(id) => Some(id),
            Self::Blanket { .. } => None,
        }
    }
}

/// One revision in a delegation's history.
///
/// Never mutated in storage: every state change appends an updated copy to
/// the revision log, and a modification creates a successor record linked
/// through `supersedes` / `superseded_by`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub id: DelegationId,
    pub delegator: ShareholderId,
    pub proxy: ShareholderId,
    pub weight: Weight,
    pub scope: DelegationScope,
    pub status: DelegationStatus,
    pub created_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    /// The record this one replaced, if created by `modify`.
    pub supersedes: Option<DelegationId>,
    /// The record that replaced this one, once modified.
    pub superseded_by: Option<DelegationId>,
}

impl DelegationRecord {
    /// Whether the blanket expiry has passed at `at`. Election-scoped
    /// records never expire on their own.
    fn expired_by(&self, at: Timestamp) -> bool {
        matches!(self.scope, DelegationScope::Blanket { expires: Some(e) } if at >= e)
    }

    /// Whether this record is in force at `now`, evaluating blanket expiry
    /// lazily — an `Active` record past its expiry no longer counts even if
    /// the `Expired` status was never materialized.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status.is_active() && !self.expired_by(now)
    }

    /// Whether this record was in force just before the frozen instant
    /// `freeze` (an election's window-open time).
    ///
    /// Revocations and expiries landing after `freeze` do not count against
    /// the frozen view; records created at or after `freeze` are not part of
    /// it.
    pub fn was_active_at(&self, freeze: Timestamp) -> bool {
        if self.created_at >= freeze || self.expired_by(freeze) {
            return false;
        }
        match self.status {
            DelegationStatus::Active => true,
            DelegationStatus::Expired => true, // expiry materialized after freeze
            DelegationStatus::Revoked => self.revoked_at.map_or(false, |at| at > freeze),
            DelegationStatus::Pending => false,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("delegation record serialization should not fail")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: DelegationStatus, scope: DelegationScope) -> DelegationRecord {
        DelegationRecord {
            id: DelegationId::new(1),
            delegator: ShareholderId::new("alice"),
            proxy: ShareholderId::new("proxy-1"),
            weight: Weight::new(50),
            scope,
            status,
            created_at: Timestamp::new(1000),
            revoked_at: None,
            supersedes: None,
            superseded_by: None,
        }
    }

    #[test]
    fn blanket_expiry_is_lazy() {
        let rec = record(
            DelegationStatus::Active,
            DelegationScope::Blanket {
                expires: Some(Timestamp::new(2000)),
            },
        );
        assert!(rec.is_active_at(Timestamp::new(1999)));
        assert!(!rec.is_active_at(Timestamp::new(2000)));
    }

    #[test]
    fn election_scope_never_self_expires() {
        let rec = record(
            DelegationStatus::Active,
            DelegationScope::Election(ElectionId::new("e1")),
        );
        assert!(rec.is_active_at(Timestamp::new(u64::MAX)));
    }

    #[test]
    fn frozen_view_keeps_later_revocations() {
        let mut rec = record(DelegationStatus::Revoked, DelegationScope::Blanket { expires: None });
        rec.revoked_at = Some(Timestamp::new(5000));

        // Frozen at 3000: the revocation at 5000 has not happened yet.
        assert!(rec.was_active_at(Timestamp::new(3000)));
        // Frozen at 5000 or later: revoked.
        assert!(!rec.was_active_at(Timestamp::new(5000)));
        assert!(!rec.was_active_at(Timestamp::new(6000)));
    }

    #[test]
    fn frozen_view_excludes_later_creations() {
        let rec = record(DelegationStatus::Active, DelegationScope::Blanket { expires: None });
        assert!(!rec.was_active_at(Timestamp::new(1000))); // created exactly at freeze
        assert!(!rec.was_active_at(Timestamp::new(500)));
        assert!(rec.was_active_at(Timestamp::new(1001)));
    }

    #[test]
    fn frozen_view_respects_expiry_before_freeze() {
        let rec = record(
            DelegationStatus::Active,
            DelegationScope::Blanket {
                expires: Some(Timestamp::new(2000)),
            },
        );
        assert!(rec.was_active_at(Timestamp::new(1999)));
        assert!(!rec.was_active_at(Timestamp::new(2000)));
    }

    #[test]
    fn bytes_roundtrip() {
        let rec = record(DelegationStatus::Active, DelegationScope::Blanket { expires: None });
        let restored = DelegationRecord::from_bytes(&rec.to_bytes()).unwrap();
        assert_eq!(restored.id, rec.id);
        assert_eq!(restored.weight, rec.weight);
        assert_eq!(restored.scope, rec.scope);
    }
}
