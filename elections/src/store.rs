//! The election definition store and lifecycle engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use tessera_registry::{EligibilitySnapshot, ShareRegistry};
use tessera_store::{SnapshotStore, TransitionLogStore};
use tessera_types::{ElectionId, ElectionStatus, LedgerParams, Timestamp};

use crate::definition::{BallotOptions, ElectionDefinition, ElectionDraft};
use crate::error::ElectionError;
use crate::transition::StatusTransition;

/// Store and state machine for election definitions.
///
/// Status transitions are serialized per election id: `refresh`, `close`,
/// `force_open` and `suspend` all run under that election's lane, so a
/// double-close or open-after-close race cannot occur. Clock-driven
/// transitions are applied lazily — readers call [`refresh`](Self::refresh)
/// before relying on the status.
pub struct ElectionStore<S> {
    params: LedgerParams,
    store: Arc<S>,
    elections: RwLock<HashMap<ElectionId, ElectionDefinition>>,
    snapshots: RwLock<HashMap<ElectionId, Arc<EligibilitySnapshot>>>,
    /// One transition lane per election id.
    lanes: Mutex<HashMap<ElectionId, Arc<Mutex<()>>>>,
}

impl<S: TransitionLogStore + SnapshotStore> ElectionStore<S> {
    pub fn new(params: LedgerParams, store: Arc<S>) -> Self {
        Self {
            params,
            store,
            elections: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    fn lane(&self, id: &ElectionId) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().unwrap();
        lanes
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a new election in `Draft` status.
    pub fn create(
        &self,
        draft: ElectionDraft,
        now: Timestamp,
    ) -> Result<ElectionDefinition, ElectionError> {
        let count = draft.agenda.len() as u32;
        if count > self.params.max_agenda_items {
            return Err(ElectionError::AgendaTooLarge {
                count,
                max: self.params.max_agenda_items,
            });
        }
        let mut elections = self.elections.write().unwrap();
        if elections.contains_key(&draft.id) {
            return Err(ElectionError::DuplicateElection(draft.id.to_string()));
        }
        let definition = ElectionDefinition::from_draft(draft, now);
        elections.insert(definition.id.clone(), definition.clone());
        info!(election = %definition.id, "election created in draft");
        Ok(definition)
    }

    /// Publish a draft: validate, freeze the eligibility snapshot, schedule.
    pub fn publish(
        &self,
        id: &ElectionId,
        registry: &ShareRegistry,
        now: Timestamp,
    ) -> Result<ElectionDefinition, ElectionError> {
        let lane = self.lane(id);
        let _guard = lane.lock().unwrap();

        let definition = self.definition(id)?;
        if definition.status != ElectionStatus::Draft {
            return Err(ElectionError::InvalidTransition {
                from: definition.status,
                to: ElectionStatus::Scheduled,
            });
        }
        Self::validate_agenda(&definition)?;
        self.validate_window(&definition, now)?;

        let snapshot = registry.snapshot(id.clone(), now);
        self.store.put_snapshot(id, &snapshot.to_bytes())?;
        self.append_transition(id, definition.status, ElectionStatus::Scheduled, now, false)?;

        let mut elections = self.elections.write().unwrap();
        let stored = elections
            .get_mut(id)
            .ok_or_else(|| ElectionError::UnknownElection(id.to_string()))?;
        stored.status = ElectionStatus::Scheduled;
        let published = stored.clone();
        drop(elections);

        self.snapshots
            .write()
            .unwrap()
            .insert(id.clone(), Arc::new(snapshot));
        info!(election = %id, "election published");
        Ok(published)
    }

    /// Apply clock-due transitions: open at `start`, close at `end`.
    ///
    /// Both may fire in one call when `refresh` happens after the window has
    /// already passed. Returns the status after refreshing.
    pub fn refresh(&self, id: &ElectionId, now: Timestamp) -> Result<ElectionStatus, ElectionError> {
        let lane = self.lane(id);
        let _guard = lane.lock().unwrap();

        let definition = self.definition(id)?;
        let mut status = definition.status;

        if status == ElectionStatus::Scheduled && now >= definition.window.start {
            // The semantic open instant is the window start, not the instant
            // this lazy transition happened to be materialized.
            self.transition_locked(id, ElectionStatus::Active, now, false, Some(definition.window.start))?;
            status = ElectionStatus::Active;
        }
        if status == ElectionStatus::Active && now >= definition.window.end {
            self.transition_locked(id, ElectionStatus::Completed, now, false, None)?;
            status = ElectionStatus::Completed;
        }
        Ok(status)
    }

    /// Operator override: open a scheduled election ahead of its window.
    pub fn force_open(&self, id: &ElectionId, now: Timestamp) -> Result<(), ElectionError> {
        let lane = self.lane(id);
        let _guard = lane.lock().unwrap();
        self.expect_status(id, ElectionStatus::Scheduled, ElectionStatus::Active)?;
        self.transition_locked(id, ElectionStatus::Active, now, true, Some(now))
    }

    /// Close an active election, freezing its ballot log.
    pub fn close(&self, id: &ElectionId, now: Timestamp) -> Result<(), ElectionError> {
        let lane = self.lane(id);
        let _guard = lane.lock().unwrap();
        let definition = self.definition(id)?;
        if definition.status != ElectionStatus::Active {
            return Err(ElectionError::InvalidTransition {
                from: definition.status,
                to: ElectionStatus::Completed,
            });
        }
        let forced = now < definition.window.end;
        self.transition_locked(id, ElectionStatus::Completed, now, forced, None)
    }

    /// Operator-forced suspension. Terminal for voting; no automatic resume.
    pub fn suspend(&self, id: &ElectionId, now: Timestamp) -> Result<(), ElectionError> {
        let lane = self.lane(id);
        let _guard = lane.lock().unwrap();
        self.expect_status(id, ElectionStatus::Active, ElectionStatus::Suspended)?;
        self.transition_locked(id, ElectionStatus::Suspended, now, true, None)
    }

    /// Full definition of an election.
    pub fn definition(&self, id: &ElectionId) -> Result<ElectionDefinition, ElectionError> {
        self.elections
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ElectionError::UnknownElection(id.to_string()))
    }

    /// Current status (without applying clock transitions).
    pub fn status(&self, id: &ElectionId) -> Result<ElectionStatus, ElectionError> {
        Ok(self.definition(id)?.status)
    }

    /// The frozen eligibility snapshot of a published election.
    pub fn snapshot(&self, id: &ElectionId) -> Result<Arc<EligibilitySnapshot>, ElectionError> {
        if let Some(snapshot) = self.snapshots.read().unwrap().get(id) {
            return Ok(snapshot.clone());
        }
        let bytes = self.store.get_snapshot(id)?;
        let snapshot = Arc::new(
            EligibilitySnapshot::from_bytes(&bytes)
                .map_err(tessera_store::StoreError::Serialization)?,
        );
        self.snapshots
            .write()
            .unwrap()
            .insert(id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// The status-transition history of an election, oldest first.
    pub fn transitions(&self, id: &ElectionId) -> Result<Vec<StatusTransition>, ElectionError> {
        let raw = self.store.transitions(id)?;
        raw.iter()
            .map(|bytes| {
                StatusTransition::from_bytes(bytes)
                    .map_err(|e| tessera_store::StoreError::Serialization(e).into())
            })
            .collect()
    }

    /// Whether the election's voting window has opened — the delegation lock.
    ///
    /// True from the wall-clock start instant even before the lazy
    /// `Scheduled → Active` transition has been materialized.
    pub fn voting_started(&self, id: &ElectionId, now: Timestamp) -> Result<bool, ElectionError> {
        let definition = self.definition(id)?;
        Ok(match definition.status {
            ElectionStatus::Draft => false,
            ElectionStatus::Scheduled => now >= definition.window.start,
            ElectionStatus::Active | ElectionStatus::Suspended | ElectionStatus::Completed => true,
        })
    }

    /// The effective open instant, if the window has opened.
    ///
    /// The anchor for frozen delegation-expiry evaluation: `window.start` for
    /// clock-driven opens, the forced-open instant otherwise.
    pub fn opened_at(
        &self,
        id: &ElectionId,
        now: Timestamp,
    ) -> Result<Option<Timestamp>, ElectionError> {
        let definition = self.definition(id)?;
        if let Some(at) = definition.opened_at {
            return Ok(Some(at));
        }
        if definition.status == ElectionStatus::Scheduled && now >= definition.window.start {
            return Ok(Some(definition.window.start));
        }
        Ok(None)
    }

    /// Whether an election id is known to this store.
    pub fn contains(&self, id: &ElectionId) -> bool {
        self.elections.read().unwrap().contains_key(id)
    }

    /// Every known election id.
    pub fn ids(&self) -> Vec<ElectionId> {
        self.elections.read().unwrap().keys().cloned().collect()
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn validate_agenda(definition: &ElectionDefinition) -> Result<(), ElectionError> {
        if definition.agenda.is_empty() {
            return Err(ElectionError::EmptyAgenda);
        }
        let mut seen = std::collections::HashSet::new();
        for item in &definition.agenda {
            if !seen.insert(item.id.clone()) {
                return Err(ElectionError::DuplicateAgendaItem(item.id.to_string()));
            }
            if let BallotOptions::Custom(options) = &item.options {
                if options.is_empty() {
                    return Err(ElectionError::InvalidWindow(format!(
                        "agenda item {} has no options",
                        item.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_window(
        &self,
        definition: &ElectionDefinition,
        now: Timestamp,
    ) -> Result<(), ElectionError> {
        let window = definition.window;
        if window.end <= window.start {
            return Err(ElectionError::InvalidWindow(
                "end must be after start".to_string(),
            ));
        }
        if window.start < now {
            return Err(ElectionError::InvalidWindow(
                "start is in the past".to_string(),
            ));
        }
        if window.span_secs() < self.params.min_voting_window_secs {
            return Err(ElectionError::InvalidWindow(format!(
                "window span {}s is below the {}s minimum",
                window.span_secs(),
                self.params.min_voting_window_secs
            )));
        }
        Ok(())
    }

    fn expect_status(
        &self,
        id: &ElectionId,
        expected: ElectionStatus,
        target: ElectionStatus,
    ) -> Result<(), ElectionError> {
        let status = self.status(id)?;
        if status != expected {
            return Err(ElectionError::InvalidTransition {
                from: status,
                to: target,
            });
        }
        Ok(())
    }

    /// Apply a validated transition: durable log append first, memory second.
    /// Caller must hold the election's lane.
    fn transition_locked(
        &self,
        id: &ElectionId,
        to: ElectionStatus,
        now: Timestamp,
        forced: bool,
        opened_at: Option<Timestamp>,
    ) -> Result<(), ElectionError> {
        let from = self.status(id)?;
        self.append_transition(id, from, to, now, forced)?;

        let mut elections = self.elections.write().unwrap();
        let stored = elections
            .get_mut(id)
            .ok_or_else(|| ElectionError::UnknownElection(id.to_string()))?;
        stored.status = to;
        if opened_at.is_some() {
            stored.opened_at = opened_at;
        }
        info!(election = %id, ?from, ?to, forced, "election status transition");
        Ok(())
    }

    fn append_transition(
        &self,
        id: &ElectionId,
        from: ElectionStatus,
        to: ElectionStatus,
        at: Timestamp,
        forced: bool,
    ) -> Result<(), ElectionError> {
        let record = StatusTransition {
            election: id.clone(),
            from,
            to,
            at,
            forced,
        };
        self.store.append_transition(id, &record.to_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AgendaItem, VotingWindow};
    use tessera_nullables::NullStore;
    use tessera_registry::ShareClass;
    use tessera_types::{AgendaItemId, ShareholderId, Weight};

    fn agenda_item(id: &str, required: bool) -> AgendaItem {
        AgendaItem {
            id: AgendaItemId::new(id),
            title: format!("Item {}", id),
            description: None,
            required,
            options: BallotOptions::YesNoAbstain,
        }
    }

    fn draft(id: &str) -> ElectionDraft {
        ElectionDraft {
            id: ElectionId::new(id),
            title: "Annual meeting".to_string(),
            agenda: vec![agenda_item("a1", true)],
            window: VotingWindow::new(Timestamp::new(10_000), Timestamp::new(20_000)),
            quorum_bps: 6000,
        }
    }

    fn registry() -> ShareRegistry {
        let registry = ShareRegistry::new();
        registry
            .register(
                ShareholderId::new("alice"),
                Weight::new(100),
                Some(ShareClass::Common),
                Timestamp::new(0),
            )
            .unwrap();
        registry
    }

    fn store() -> ElectionStore<NullStore> {
        let mut params = LedgerParams::default();
        params.min_voting_window_secs = 100;
        ElectionStore::new(params, Arc::new(NullStore::new()))
    }

    #[test]
    fn create_rejects_duplicate_ids() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        assert!(matches!(
            elections.create(draft("e1"), Timestamp::new(1)),
            Err(ElectionError::DuplicateElection(_))
        ));
    }

    #[test]
    fn publish_requires_agenda() {
        let elections = store();
        let mut d = draft("e1");
        d.agenda.clear();
        elections.create(d, Timestamp::new(0)).unwrap();
        assert!(matches!(
            elections.publish(&ElectionId::new("e1"), &registry(), Timestamp::new(100)),
            Err(ElectionError::EmptyAgenda)
        ));
    }

    #[test]
    fn publish_rejects_duplicate_agenda_items() {
        let elections = store();
        let mut d = draft("e1");
        d.agenda.push(agenda_item("a1", false));
        elections.create(d, Timestamp::new(0)).unwrap();
        assert!(matches!(
            elections.publish(&ElectionId::new("e1"), &registry(), Timestamp::new(100)),
            Err(ElectionError::DuplicateAgendaItem(_))
        ));
    }

    #[test]
    fn publish_rejects_past_start_and_inverted_window() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        // Start is in the past relative to `now`.
        assert!(matches!(
            elections.publish(&ElectionId::new("e1"), &registry(), Timestamp::new(15_000)),
            Err(ElectionError::InvalidWindow(_))
        ));

        let mut d = draft("e2");
        d.window = VotingWindow::new(Timestamp::new(20_000), Timestamp::new(10_000));
        elections.create(d, Timestamp::new(0)).unwrap();
        assert!(matches!(
            elections.publish(&ElectionId::new("e2"), &registry(), Timestamp::new(100)),
            Err(ElectionError::InvalidWindow(_))
        ));
    }

    #[test]
    fn publish_freezes_snapshot() {
        let elections = store();
        let reg = registry();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        let published = elections
            .publish(&ElectionId::new("e1"), &reg, Timestamp::new(100))
            .unwrap();
        assert_eq!(published.status, ElectionStatus::Scheduled);

        // Later deposits do not change the frozen snapshot.
        reg.deposit(&ShareholderId::new("alice"), Weight::new(900))
            .unwrap();
        let snap = elections.snapshot(&ElectionId::new("e1")).unwrap();
        assert_eq!(
            snap.weight_of(&ShareholderId::new("alice")),
            Some(Weight::new(100))
        );
        assert!(snap.verify());
    }

    #[test]
    fn refresh_opens_and_closes_on_the_clock() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        let id = ElectionId::new("e1");
        elections.publish(&id, &registry(), Timestamp::new(100)).unwrap();

        assert_eq!(
            elections.refresh(&id, Timestamp::new(9_999)).unwrap(),
            ElectionStatus::Scheduled
        );
        assert_eq!(
            elections.refresh(&id, Timestamp::new(10_000)).unwrap(),
            ElectionStatus::Active
        );
        // End instant is excluded from the window: at exactly `end` the
        // election closes.
        assert_eq!(
            elections.refresh(&id, Timestamp::new(20_000)).unwrap(),
            ElectionStatus::Completed
        );
    }

    #[test]
    fn late_refresh_passes_through_active_to_completed() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        let id = ElectionId::new("e1");
        elections.publish(&id, &registry(), Timestamp::new(100)).unwrap();

        assert_eq!(
            elections.refresh(&id, Timestamp::new(50_000)).unwrap(),
            ElectionStatus::Completed
        );
        let transitions = elections.transitions(&id).unwrap();
        assert_eq!(transitions.len(), 3); // publish, open, close
        assert_eq!(transitions[1].to, ElectionStatus::Active);
        assert_eq!(transitions[2].to, ElectionStatus::Completed);
    }

    #[test]
    fn suspend_only_from_active() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        let id = ElectionId::new("e1");
        elections.publish(&id, &registry(), Timestamp::new(100)).unwrap();

        assert!(matches!(
            elections.suspend(&id, Timestamp::new(200)),
            Err(ElectionError::InvalidTransition { .. })
        ));

        elections.refresh(&id, Timestamp::new(10_000)).unwrap();
        elections.suspend(&id, Timestamp::new(10_500)).unwrap();
        assert_eq!(elections.status(&id).unwrap(), ElectionStatus::Suspended);

        // Suspended is terminal: the clock no longer closes it.
        assert_eq!(
            elections.refresh(&id, Timestamp::new(50_000)).unwrap(),
            ElectionStatus::Suspended
        );
    }

    #[test]
    fn force_open_records_forced_transition() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        let id = ElectionId::new("e1");
        elections.publish(&id, &registry(), Timestamp::new(100)).unwrap();

        elections.force_open(&id, Timestamp::new(5_000)).unwrap();
        assert_eq!(elections.status(&id).unwrap(), ElectionStatus::Active);

        let transitions = elections.transitions(&id).unwrap();
        assert!(transitions.last().unwrap().forced);
        assert_eq!(
            elections.opened_at(&id, Timestamp::new(5_001)).unwrap(),
            Some(Timestamp::new(5_000))
        );
    }

    #[test]
    fn voting_started_tracks_the_wall_clock_before_refresh() {
        let elections = store();
        elections.create(draft("e1"), Timestamp::new(0)).unwrap();
        let id = ElectionId::new("e1");
        elections.publish(&id, &registry(), Timestamp::new(100)).unwrap();

        // No refresh has run, but the wall clock passed the start instant.
        assert!(!elections.voting_started(&id, Timestamp::new(9_999)).unwrap());
        assert!(elections.voting_started(&id, Timestamp::new(10_000)).unwrap());
        assert_eq!(
            elections.opened_at(&id, Timestamp::new(10_001)).unwrap(),
            Some(Timestamp::new(10_000))
        );
    }

    #[test]
    fn unknown_election_is_a_distinct_error() {
        let elections = store();
        assert!(matches!(
            elections.status(&ElectionId::new("ghost")),
            Err(ElectionError::UnknownElection(_))
        ));
    }
}
