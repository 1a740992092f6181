//! The delegation ledger engine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use tessera_registry::ShareRegistry;
use tessera_store::DelegationLogStore;
use tessera_types::{
    DelegationId, DelegationStatus, ElectionId, LedgerParams, ShareholderId, Timestamp, Weight,
};

use crate::calendar::ElectionCalendar;
use crate::error::DelegationError;
use crate::record::{DelegationRecord, DelegationScope};

/// In-memory projection of the revision log: latest revision per record id
/// plus the delegator/proxy indexes.
struct LedgerState {
    records: HashMap<DelegationId, DelegationRecord>,
    by_delegator: HashMap<ShareholderId, Vec<DelegationId>>,
    by_proxy: HashMap<ShareholderId, Vec<DelegationId>>,
    next_id: u64,
}

impl LedgerState {
    fn empty() -> Self {
        Self {
            records: HashMap::new(),
            by_delegator: HashMap::new(),
            by_proxy: HashMap::new(),
            next_id: 1,
        }
    }

    fn index(&mut self, record: &DelegationRecord) {
        self.by_delegator
            .entry(record.delegator.clone())
            .or_default()
            .push(record.id);
        self.by_proxy
            .entry(record.proxy.clone())
            .or_default()
            .push(record.id);
    }
}

/// The delegation ledger.
///
/// Writes run under a per-delegator lane so the undelegated-balance check and
/// the record write are one exclusive unit; the capacity check shares the
/// state write lock with the insertion, closing the proxy-side race as well.
pub struct DelegationLedger<S, C> {
    params: LedgerParams,
    registry: Arc<ShareRegistry>,
    calendar: Arc<C>,
    store: Arc<S>,
    state: RwLock<LedgerState>,
    /// One write lane per delegator.
    lanes: Mutex<HashMap<ShareholderId, Arc<Mutex<()>>>>,
}

impl<S: DelegationLogStore, C: ElectionCalendar> DelegationLedger<S, C> {
    pub fn new(
        params: LedgerParams,
        registry: Arc<ShareRegistry>,
        calendar: Arc<C>,
        store: Arc<S>,
    ) -> Self {
        Self {
            params,
            registry,
            calendar,
            store,
            state: RwLock::new(LedgerState::empty()),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuild the ledger from the persisted revision log.
    ///
    /// Later revisions of a record id win; indexes are derived from the final
    /// projection.
    pub fn replay(
        params: LedgerParams,
        registry: Arc<ShareRegistry>,
        calendar: Arc<C>,
        store: Arc<S>,
    ) -> Result<Self, DelegationError> {
        let mut state = LedgerState::empty();
        for bytes in store.revisions()? {
            let record = DelegationRecord::from_bytes(&bytes)
                .map_err(tessera_store::StoreError::Serialization)?;
            state.next_id = state.next_id.max(record.id.raw() + 1);
            if !state.records.contains_key(&record.id) {
                state.index(&record);
            }
            state.records.insert(record.id, record);
        }
        info!(records = state.records.len(), "delegation ledger replayed");
        Ok(Self {
            params,
            registry,
            calendar,
            store,
            state: RwLock::new(state),
            lanes: Mutex::new(HashMap::new()),
        })
    }

    fn lane(&self, delegator: &ShareholderId) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().unwrap();
        lanes
            .entry(delegator.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Delegate `weight` shares from `delegator` to `proxy`.
    pub fn assign(
        &self,
        delegator: &ShareholderId,
        proxy: &ShareholderId,
        weight: Weight,
        scope: DelegationScope,
        now: Timestamp,
    ) -> Result<DelegationRecord, DelegationError> {
        if delegator == proxy {
            return Err(DelegationError::SelfDelegation);
        }
        if weight.is_zero() {
            return Err(DelegationError::ZeroWeight);
        }
        if let Some(election) = scope.election() {
            if !self.calendar.contains(election) {
                return Err(DelegationError::UnknownElection(election.to_string()));
            }
            if self.calendar.voting_started(election, now) {
                return Err(DelegationError::VotingWindowLocked(election.to_string()));
            }
        }
        // Both parties must exist in the registry.
        self.registry.shareholder(proxy)?;

        let lane = self.lane(delegator);
        let _guard = lane.lock().unwrap();

        // Balance and undelegated weight re-validated inside the lane: a
        // concurrent assign for the same delegator waits here and sees the
        // committed record.
        let balance = self.registry.balance(delegator)?;
        let mut state = self.state.write().unwrap();

        let outgoing = Self::outgoing_total(&state, delegator, None, now);
        let available = balance.saturating_sub(outgoing);
        if weight > available {
            warn!(%delegator, %weight, %available, "assignment exceeds undelegated weight");
            return Err(DelegationError::InsufficientWeight {
                requested: weight,
                available,
            });
        }

        if Self::active_incoming_count(&state, proxy, now) >= self.params.max_delegations {
            return Err(DelegationError::ProxyCapacityExceeded {
                capacity: self.params.max_delegations,
            });
        }

        let record = DelegationRecord {
            id: DelegationId::new(state.next_id),
            delegator: delegator.clone(),
            proxy: proxy.clone(),
            weight,
            scope,
            status: DelegationStatus::Active,
            created_at: now,
            revoked_at: None,
            supersedes: None,
            superseded_by: None,
        };
        self.store.append_revision(&record.to_bytes())?;

        state.next_id += 1;
        state.index(&record);
        state.records.insert(record.id, record.clone());
        info!(record = %record.id, %delegator, %proxy, %weight, "delegation assigned");
        Ok(record)
    }

    /// Revoke a delegation. Idempotent: revoking an already-terminal record
    /// returns its current state instead of erroring.
    pub fn revoke(
        &self,
        id: DelegationId,
        now: Timestamp,
    ) -> Result<DelegationRecord, DelegationError> {
        let delegator = self.record(id)?.delegator;
        let lane = self.lane(&delegator);
        let _guard = lane.lock().unwrap();

        let mut state = self.state.write().unwrap();
        let record = state
            .records
            .get(&id)
            .cloned()
            .ok_or(DelegationError::UnknownDelegation(id))?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        if let Some(election) = record.scope.election() {
            if self.calendar.voting_started(election, now) {
                return Err(DelegationError::VotingWindowLocked(election.to_string()));
            }
        }

        let mut updated = record;
        updated.status = DelegationStatus::Revoked;
        updated.revoked_at = Some(now);
        self.store.append_revision(&updated.to_bytes())?;
        state.records.insert(id, updated.clone());
        info!(record = %id, delegator = %updated.delegator, "delegation revoked");
        Ok(updated)
    }

    /// Change the weight of a delegation by superseding it: the old record is
    /// revoked and a successor preserving proxy and scope is created, both in
    /// one exclusive step.
    pub fn modify(
        &self,
        id: DelegationId,
        new_weight: Weight,
        now: Timestamp,
    ) -> Result<DelegationRecord, DelegationError> {
        if new_weight.is_zero() {
            return Err(DelegationError::ZeroWeight);
        }
        let delegator = self.record(id)?.delegator;
        let lane = self.lane(&delegator);
        let _guard = lane.lock().unwrap();

        let balance = self.registry.balance(&delegator)?;
        let mut state = self.state.write().unwrap();
        let old = state
            .records
            .get(&id)
            .cloned()
            .ok_or(DelegationError::UnknownDelegation(id))?;
        if !old.is_active_at(now) {
            return Err(DelegationError::NotActive(id));
        }
        if let Some(election) = old.scope.election() {
            if self.calendar.voting_started(election, now) {
                return Err(DelegationError::VotingWindowLocked(election.to_string()));
            }
        }

        // The old record's weight is released by the same atomic step.
        let outgoing = Self::outgoing_total(&state, &delegator, Some(id), now);
        let available = balance.saturating_sub(outgoing);
        if new_weight > available {
            return Err(DelegationError::InsufficientWeight {
                requested: new_weight,
                available,
            });
        }

        let successor = DelegationRecord {
            id: DelegationId::new(state.next_id),
            delegator: delegator.clone(),
            proxy: old.proxy.clone(),
            weight: new_weight,
            scope: old.scope.clone(),
            status: DelegationStatus::Active,
            created_at: now,
            revoked_at: None,
            supersedes: Some(old.id),
            superseded_by: None,
        };
        let mut revoked = old;
        revoked.status = DelegationStatus::Revoked;
        revoked.revoked_at = Some(now);
        revoked.superseded_by = Some(successor.id);

        self.store.append_revision(&revoked.to_bytes())?;
        self.store.append_revision(&successor.to_bytes())?;

        state.next_id += 1;
        state.records.insert(revoked.id, revoked);
        state.index(&successor);
        state.records.insert(successor.id, successor.clone());
        info!(
            old = %id,
            new = %successor.id,
            weight = %new_weight,
            "delegation modified via supersession"
        );
        Ok(successor)
    }

    /// Materialize `Expired` status on blanket records whose expiry passed.
    ///
    /// Purely housekeeping — expiry already takes effect lazily on read.
    /// Returns the number of records flipped.
    pub fn expire_due(&self, now: Timestamp) -> Result<u32, DelegationError> {
        let mut state = self.state.write().unwrap();
        let due: Vec<DelegationId> = state
            .records
            .values()
            .filter(|r| r.status.is_active() && !r.is_active_at(now))
            .map(|r| r.id)
            .collect();
        let mut flipped = 0;
        for id in due {
            let mut record = state.records[&id].clone();
            record.status = DelegationStatus::Expired;
            self.store.append_revision(&record.to_bytes())?;
            state.records.insert(id, record);
            flipped += 1;
        }
        if flipped > 0 {
            info!(count = flipped, "expired blanket delegations materialized");
        }
        Ok(flipped)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// A shareholder's undelegated weight for a scope: the base weight minus
    /// outgoing delegations in force for that scope.
    ///
    /// `election = None` is the blanket view against the live registry
    /// balance. For an election, the base is the frozen snapshot weight once
    /// published, and election-scoped records supersede blanket ones.
    pub fn effective_weight(
        &self,
        holder: &ShareholderId,
        election: Option<&ElectionId>,
        now: Timestamp,
    ) -> Result<Weight, DelegationError> {
        let base = match election {
            Some(e) => {
                if !self.calendar.contains(e) {
                    return Err(DelegationError::UnknownElection(e.to_string()));
                }
                if self.calendar.has_snapshot(e) {
                    self.calendar.snapshot_weight(e, holder).unwrap_or(Weight::ZERO)
                } else {
                    self.registry.balance(holder)?
                }
            }
            None => self.registry.balance(holder)?,
        };
        let state = self.state.read().unwrap();
        let outgoing = self.resolved(&state, holder, election, now).iter().map(|r| r.weight).sum();
        Ok(base.saturating_sub(outgoing))
    }

    /// Total weight delegated to a proxy holder, resolved for a scope.
    pub fn incoming_weight(
        &self,
        proxy: &ShareholderId,
        election: Option<&ElectionId>,
        now: Timestamp,
    ) -> Result<Weight, DelegationError> {
        if let Some(e) = election {
            if !self.calendar.contains(e) {
                return Err(DelegationError::UnknownElection(e.to_string()));
            }
        }
        let state = self.state.read().unwrap();
        let delegators: HashSet<ShareholderId> = state
            .by_proxy
            .get(proxy)
            .into_iter()
            .flatten()
            .filter_map(|id| state.records.get(id))
            .map(|r| r.delegator.clone())
            .collect();

        let mut total = Weight::ZERO;
        for delegator in &delegators {
            for record in self.resolved(&state, delegator, election, now) {
                if &record.proxy == proxy {
                    total = total + record.weight;
                }
            }
        }
        Ok(total)
    }

    /// How many more delegations a proxy holder can accept.
    pub fn capacity_remaining(&self, proxy: &ShareholderId, now: Timestamp) -> u32 {
        let state = self.state.read().unwrap();
        self.params
            .max_delegations
            .saturating_sub(Self::active_incoming_count(&state, proxy, now))
    }

    /// One record by id.
    pub fn record(&self, id: DelegationId) -> Result<DelegationRecord, DelegationError> {
        self.state
            .read()
            .unwrap()
            .records
            .get(&id)
            .cloned()
            .ok_or(DelegationError::UnknownDelegation(id))
    }

    /// Every revision head for a delegator, oldest first.
    pub fn records_for(&self, delegator: &ShareholderId) -> Vec<DelegationRecord> {
        let state = self.state.read().unwrap();
        let mut records: Vec<DelegationRecord> = state
            .by_delegator
            .get(delegator)
            .into_iter()
            .flatten()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    // ── Scope resolution ───────────────────────────────────────────────

    /// The delegator's records in force for a scope.
    ///
    /// For an open election the records are evaluated as of the window-open
    /// instant, so later revocations and expiries of blanket records do not
    /// change captured weights mid-vote.
    fn resolved(
        &self,
        state: &LedgerState,
        delegator: &ShareholderId,
        election: Option<&ElectionId>,
        now: Timestamp,
    ) -> Vec<DelegationRecord> {
        let records: Vec<&DelegationRecord> = state
            .by_delegator
            .get(delegator)
            .into_iter()
            .flatten()
            .filter_map(|id| state.records.get(id))
            .collect();

        match election {
            None => records
                .into_iter()
                .filter(|r| r.scope.is_blanket() && r.is_active_at(now))
                .cloned()
                .collect(),
            Some(e) => {
                let freeze = self.calendar.opened_at(e, now);
                let in_force = |r: &DelegationRecord| match freeze {
                    Some(f) => r.was_active_at(f),
                    None => r.is_active_at(now),
                };
                let scoped: Vec<DelegationRecord> = records
                    .iter()
                    .filter(|r| r.scope.is_election(e) && in_force(r))
                    .map(|r| (*r).clone())
                    .collect();
                if !scoped.is_empty() {
                    scoped
                } else {
                    records
                        .into_iter()
                        .filter(|r| r.scope.is_blanket() && in_force(r))
                        .cloned()
                        .collect()
                }
            }
        }
    }

    /// Sum of a delegator's active outgoing weight across every scope —
    /// the admission check keeping total outgoing within the balance.
    fn outgoing_total(
        state: &LedgerState,
        delegator: &ShareholderId,
        excluding: Option<DelegationId>,
        now: Timestamp,
    ) -> Weight {
        state
            .by_delegator
            .get(delegator)
            .into_iter()
            .flatten()
            .filter_map(|id| state.records.get(id))
            .filter(|r| Some(r.id) != excluding && r.is_active_at(now))
            .map(|r| r.weight)
            .sum()
    }

    fn active_incoming_count(state: &LedgerState, proxy: &ShareholderId, now: Timestamp) -> u32 {
        state
            .by_proxy
            .get(proxy)
            .into_iter()
            .flatten()
            .filter_map(|id| state.records.get(id))
            .filter(|r| r.is_active_at(now))
            .count() as u32
    }
}
