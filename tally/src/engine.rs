//! The tallying engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use tessera_ballots::Ballot;
use tessera_elections::ElectionStore;
use tessera_store::{
    BallotLogStore, SnapshotStore, StoreError, TallyStore, TransitionLogStore,
};
use tessera_types::{ElectionId, ElectionStatus, Timestamp, Weight};

use crate::error::TallyError;
use crate::result::{participation_bps, TallyResult};

/// Computes live (advisory) and final (authoritative) tallies.
///
/// Reads are snapshot-isolated over the committed log prefix and never block
/// the submission path.
pub struct TallyEngine<S> {
    elections: Arc<ElectionStore<S>>,
    store: Arc<S>,
}

impl<S> TallyEngine<S>
where
    S: BallotLogStore + SnapshotStore + TransitionLogStore + TallyStore,
{
    pub fn new(elections: Arc<ElectionStore<S>>, store: Arc<S>) -> Self {
        Self { elections, store }
    }

    /// Advisory live tally over the ballots committed so far.
    ///
    /// Deterministic: the same log prefix and `now` produce an identical
    /// result, so overlapping live and final tallies always agree.
    pub fn tally(&self, election: &ElectionId, now: Timestamp) -> Result<TallyResult, TallyError> {
        self.compute(election, now)
    }

    /// The authoritative final tally of a completed election.
    ///
    /// Persisted exactly once; every later call returns the stored result
    /// regardless of `now`. Idempotent under concurrency — losers of the
    /// put-once race adopt the winner's (identical) result.
    pub fn finalize(
        &self,
        election: &ElectionId,
        now: Timestamp,
    ) -> Result<TallyResult, TallyError> {
        let status = self.elections.refresh(election, now)?;
        if status != ElectionStatus::Completed {
            return Err(TallyError::ElectionNotClosed(status));
        }

        if let Some(bytes) = self.store.get_final_tally(election)? {
            return Ok(TallyResult::from_bytes(&bytes).map_err(StoreError::Serialization)?);
        }

        let result = self.compute(election, now)?;
        match self.store.put_final_tally(election, &result.to_bytes()) {
            Ok(()) => {
                info!(
                    %election,
                    participation_bps = result.participation_bps,
                    quorum_met = result.quorum_met,
                    "final tally persisted"
                );
                Ok(result)
            }
            // Another finalizer won the race; adopt its stored result.
            Err(StoreError::Duplicate(_)) => {
                let bytes = self
                    .store
                    .get_final_tally(election)?
                    .ok_or_else(|| StoreError::NotFound(format!("final tally {}", election)))?;
                Ok(TallyResult::from_bytes(&bytes).map_err(StoreError::Serialization)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn compute(&self, election: &ElectionId, now: Timestamp) -> Result<TallyResult, TallyError> {
        let definition = self.elections.definition(election)?;
        if definition.status == ElectionStatus::Draft {
            return Err(TallyError::NotPublished(election.to_string()));
        }
        let snapshot = self.elections.snapshot(election)?;

        // Snapshot-isolated read: commit point first, then the prefix.
        let count = self.store.ballot_count(election)?;
        let raw = self.store.ballots(election, count)?;

        // Seed every allowed option so displays render zero rows and the
        // result shape is independent of which options received votes.
        let mut items: BTreeMap<_, BTreeMap<_, Weight>> = BTreeMap::new();
        for item in &definition.agenda {
            let options = items.entry(item.id.clone()).or_default();
            for option in item.options.all() {
                options.insert(option, Weight::ZERO);
            }
        }

        let mut total_weight_cast = Weight::ZERO;
        for bytes in &raw {
            let ballot = Ballot::from_bytes(bytes).map_err(StoreError::Serialization)?;
            total_weight_cast = total_weight_cast + ballot.weight;
            for (item, choice) in &ballot.choices {
                let slot = items
                    .entry(item.clone())
                    .or_default()
                    .entry(choice.clone())
                    .or_insert(Weight::ZERO);
                *slot = *slot + ballot.weight;
            }
        }

        let participation = participation_bps(total_weight_cast, snapshot.total_weight);
        Ok(TallyResult {
            election: election.clone(),
            items,
            total_weight_cast,
            eligible_weight: snapshot.total_weight,
            participation_bps: participation,
            quorum_bps: definition.quorum_bps,
            quorum_met: participation >= definition.quorum_bps,
            ballot_count: count,
            computed_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as ChoiceMap;
    use tessera_ballots::SubmissionEngine;
    use tessera_delegation::DelegationLedger;
    use tessera_elections::{AgendaItem, BallotOptions, ElectionDraft, VotingWindow};
    use tessera_nullables::NullStore;
    use tessera_registry::ShareRegistry;
    use tessera_types::{AgendaItemId, LedgerParams, OptionId, ShareholderId};

    struct Fixture {
        elections: Arc<ElectionStore<NullStore>>,
        engine: SubmissionEngine<NullStore>,
        tally: TallyEngine<NullStore>,
        election: ElectionId,
    }

    /// One required yes/no/abstain item, quorum 60%, window [10_000, 20_000).
    fn fixture(holders: &[(&str, u64)]) -> Fixture {
        let store = Arc::new(NullStore::new());
        let registry = Arc::new(ShareRegistry::new());
        for (name, balance) in holders {
            registry
                .register(
                    ShareholderId::new(*name),
                    Weight::new(*balance),
                    None,
                    Timestamp::new(0),
                )
                .unwrap();
        }
        let mut params = LedgerParams::default();
        params.min_voting_window_secs = 100;
        let elections = Arc::new(ElectionStore::new(params.clone(), store.clone()));
        let delegations = Arc::new(DelegationLedger::new(
            params,
            registry.clone(),
            elections.clone(),
            store.clone(),
        ));
        let engine = SubmissionEngine::new(elections.clone(), delegations, store.clone());
        let tally = TallyEngine::new(elections.clone(), store);

        let election = ElectionId::new("board-2024");
        elections
            .create(
                ElectionDraft {
                    id: election.clone(),
                    title: "Board election".to_string(),
                    agenda: vec![AgendaItem {
                        id: AgendaItemId::new("a1"),
                        title: "Approve".to_string(),
                        description: None,
                        required: true,
                        options: BallotOptions::YesNoAbstain,
                    }],
                    window: VotingWindow::new(Timestamp::new(10_000), Timestamp::new(20_000)),
                    quorum_bps: 6000,
                },
                Timestamp::new(50),
            )
            .unwrap();
        elections.publish(&election, &registry, Timestamp::new(100)).unwrap();
        Fixture {
            elections,
            engine,
            tally,
            election,
        }
    }

    fn cast(f: &Fixture, voter: &str, choice: OptionId, at: u64) {
        let mut choices = ChoiceMap::new();
        choices.insert(AgendaItemId::new("a1"), choice);
        f.engine
            .submit(&f.election, &ShareholderId::new(voter), choices, Timestamp::new(at))
            .unwrap();
    }

    #[test]
    fn quorum_boundary_is_inclusive() {
        // Eligible weight 1000; exactly 600 cast meets a 60% quorum.
        let f = fixture(&[("alice", 600), ("rest", 400)]);
        cast(&f, "alice", OptionId::yes(), 10_500);

        let result = f.tally.tally(&f.election, Timestamp::new(10_600)).unwrap();
        assert_eq!(result.eligible_weight, Weight::new(1000));
        assert_eq!(result.total_weight_cast, Weight::new(600));
        assert_eq!(result.participation_bps, 6000);
        assert!(result.quorum_met);
    }

    #[test]
    fn one_weight_short_misses_quorum() {
        let f = fixture(&[("alice", 599), ("rest", 401)]);
        cast(&f, "alice", OptionId::yes(), 10_500);

        let result = f.tally.tally(&f.election, Timestamp::new(10_600)).unwrap();
        assert_eq!(result.participation_bps, 5990);
        assert!(!result.quorum_met);
    }

    #[test]
    fn abstain_counts_toward_participation() {
        let f = fixture(&[("alice", 600), ("rest", 400)]);
        cast(&f, "alice", OptionId::abstain(), 10_500);

        let result = f.tally.tally(&f.election, Timestamp::new(10_600)).unwrap();
        assert!(result.quorum_met);
        assert_eq!(
            result.option_weight(&AgendaItemId::new("a1"), &OptionId::abstain()),
            Weight::new(600)
        );
        assert_eq!(
            result.option_weight(&AgendaItemId::new("a1"), &OptionId::yes()),
            Weight::ZERO
        );
    }

    #[test]
    fn tally_is_deterministic_over_the_same_prefix() {
        let f = fixture(&[("alice", 100), ("bob", 50)]);
        cast(&f, "alice", OptionId::yes(), 10_500);
        cast(&f, "bob", OptionId::no(), 10_600);

        let now = Timestamp::new(11_000);
        let first = f.tally.tally(&f.election, now).unwrap();
        let second = f.tally.tally(&f.election, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_bytes(), second.to_bytes());
        assert_eq!(first.ballot_count, 2);
    }

    #[test]
    fn finalize_requires_completion_and_persists_once() {
        let f = fixture(&[("alice", 600), ("rest", 400)]);
        cast(&f, "alice", OptionId::yes(), 10_500);

        assert!(matches!(
            f.tally.finalize(&f.election, Timestamp::new(10_600)),
            Err(TallyError::ElectionNotClosed(ElectionStatus::Active))
        ));

        let final_tally = f.tally.finalize(&f.election, Timestamp::new(20_000)).unwrap();
        assert!(final_tally.quorum_met);

        // A later finalize returns the stored result verbatim, including its
        // original computed-at instant.
        let again = f.tally.finalize(&f.election, Timestamp::new(99_999)).unwrap();
        assert_eq!(again, final_tally);
        assert_eq!(again.computed_at, Timestamp::new(20_000));
    }

    #[test]
    fn live_and_final_agree_on_the_full_log() {
        let f = fixture(&[("alice", 100), ("bob", 50)]);
        cast(&f, "alice", OptionId::yes(), 10_500);
        cast(&f, "bob", OptionId::abstain(), 10_600);

        let live = f.tally.tally(&f.election, Timestamp::new(19_999)).unwrap();
        f.elections.refresh(&f.election, Timestamp::new(20_000)).unwrap();
        let final_tally = f.tally.finalize(&f.election, Timestamp::new(19_999)).unwrap();

        assert_eq!(live.items, final_tally.items);
        assert_eq!(live.total_weight_cast, final_tally.total_weight_cast);
        assert_eq!(live.participation_bps, final_tally.participation_bps);
    }

    #[test]
    fn zero_option_rows_are_always_present() {
        let f = fixture(&[("alice", 100)]);
        let result = f.tally.tally(&f.election, Timestamp::new(10_100)).unwrap();
        let options = &result.items[&AgendaItemId::new("a1")];
        assert_eq!(options.len(), 3);
        assert!(options.values().all(|w| w.is_zero()));
        assert_eq!(result.ballot_count, 0);
    }
}
