//! Shareholder records.

use serde::{Deserialize, Serialize};
use tessera_types::{ShareholderId, Timestamp, Weight};

/// Share class of a holding. Voting weight is class-agnostic in this core;
/// the class is carried for presentation and export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareClass {
    Common,
    Preferred,
}

/// One shareholder known to the registry.
///
/// Never deleted — deactivation keeps the record for audit but removes the
/// holder from future eligibility snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shareholder {
    pub id: ShareholderId,
    /// Current token balance (voting weight).
    pub balance: Weight,
    pub class: Option<ShareClass>,
    pub active: bool,
    pub registered_at: Timestamp,
}

impl Shareholder {
    /// Whether this holder belongs in a new eligibility snapshot.
    pub fn is_eligible(&self) -> bool {
        self.active && !self.balance.is_zero()
    }
}
