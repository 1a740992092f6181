//! The share registry — balances and snapshot creation.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::info;

use tessera_types::{ElectionId, ShareholderId, Timestamp, Weight};

use crate::error::RegistryError;
use crate::shareholder::{ShareClass, Shareholder};
use crate::snapshot::EligibilitySnapshot;

/// The live registry of shareholders and their token balances.
///
/// No mutation API beyond registration, feed deposits and deactivation is
/// exposed; corporate-action processing lives with the external share ledger.
pub struct ShareRegistry {
    holders: RwLock<HashMap<ShareholderId, Shareholder>>,
}

/// Summary statistics for admin dashboards.
#[derive(Clone, Debug)]
pub struct RegistrySummary {
    pub holders: u64,
    pub active: u64,
    pub total_weight: Weight,
}

impl ShareRegistry {
    pub fn new() -> Self {
        Self {
            holders: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new shareholder with an opening balance.
    pub fn register(
        &self,
        id: ShareholderId,
        balance: Weight,
        class: Option<ShareClass>,
        now: Timestamp,
    ) -> Result<Shareholder, RegistryError> {
        let mut holders = self.holders.write().unwrap();
        if holders.contains_key(&id) {
            return Err(RegistryError::DuplicateShareholder(id.to_string()));
        }
        let holder = Shareholder {
            id: id.clone(),
            balance,
            class,
            active: true,
            registered_at: now,
        };
        holders.insert(id.clone(), holder.clone());
        info!(shareholder = %id, %balance, "registered shareholder");
        Ok(holder)
    }

    /// Credit a balance change arriving from the external share-ledger feed.
    ///
    /// Returns the new balance.
    pub fn deposit(&self, id: &ShareholderId, delta: Weight) -> Result<Weight, RegistryError> {
        let mut holders = self.holders.write().unwrap();
        let holder = holders
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownShareholder(id.to_string()))?;
        if !holder.active {
            return Err(RegistryError::Deactivated(id.to_string()));
        }
        holder.balance = holder
            .balance
            .checked_add(delta)
            .ok_or_else(|| RegistryError::BalanceOverflow(id.to_string()))?;
        info!(shareholder = %id, %delta, balance = %holder.balance, "deposit credited");
        Ok(holder.balance)
    }

    /// Deactivate a shareholder. The record stays; future snapshots skip it.
    pub fn deactivate(&self, id: &ShareholderId) -> Result<(), RegistryError> {
        let mut holders = self.holders.write().unwrap();
        let holder = holders
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownShareholder(id.to_string()))?;
        holder.active = false;
        info!(shareholder = %id, "deactivated shareholder");
        Ok(())
    }

    /// Current balance of a shareholder.
    pub fn balance(&self, id: &ShareholderId) -> Result<Weight, RegistryError> {
        let holders = self.holders.read().unwrap();
        holders
            .get(id)
            .map(|h| h.balance)
            .ok_or_else(|| RegistryError::UnknownShareholder(id.to_string()))
    }

    /// Full record of a shareholder.
    pub fn shareholder(&self, id: &ShareholderId) -> Result<Shareholder, RegistryError> {
        let holders = self.holders.read().unwrap();
        holders
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownShareholder(id.to_string()))
    }

    /// Freeze current weights into an immutable snapshot for one election.
    ///
    /// Only active holders with a non-zero balance are eligible.
    pub fn snapshot(&self, election: ElectionId, now: Timestamp) -> EligibilitySnapshot {
        let holders = self.holders.read().unwrap();
        let eligible = holders
            .values()
            .filter(|h| h.is_eligible())
            .map(|h| (h.id.clone(), h.balance))
            .collect();
        let snapshot = EligibilitySnapshot::create(election.clone(), eligible, now);
        info!(
            election = %election,
            holders = snapshot.entry_count(),
            total = %snapshot.total_weight,
            "eligibility snapshot taken"
        );
        snapshot
    }

    /// Registry summary statistics.
    pub fn summary(&self) -> RegistrySummary {
        let holders = self.holders.read().unwrap();
        RegistrySummary {
            holders: holders.len() as u64,
            active: holders.values().filter(|h| h.active).count() as u64,
            total_weight: holders
                .values()
                .filter(|h| h.active)
                .map(|h| h.balance)
                .sum(),
        }
    }
}

impl Default for ShareRegistry {
    fn default() -> Self {
        Self::new()
    }
}
