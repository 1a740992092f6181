//! The vote submission engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use tessera_crypto::receipt_hash;
use tessera_delegation::DelegationLedger;
use tessera_elections::ElectionStore;
use tessera_store::{
    BallotLogStore, DelegationLogStore, SnapshotStore, StoreError, TransitionLogStore,
};
use tessera_types::{
    AgendaItemId, ElectionId, EntryHash, OptionId, ReceiptHash, ShareholderId, Timestamp,
};

use crate::ballot::Ballot;
use crate::chain::ChainFrontier;
use crate::error::SubmitError;
use crate::receipt::Receipt;

/// Accepts ballots, enforces one-per-effective-voter, and maintains the
/// per-election hash chains.
///
/// The only hot write path in the system: each election has a single-writer
/// lane under which the duplicate check, sequence assignment and conditional
/// append happen as one unit. Readers never take the lane — they see the
/// committed log prefix through the store.
pub struct SubmissionEngine<S> {
    elections: Arc<ElectionStore<S>>,
    delegations: Arc<DelegationLedger<S, ElectionStore<S>>>,
    store: Arc<S>,
    frontier: RwLock<ChainFrontier>,
    /// Effective voters who have already cast, per election.
    voted: RwLock<HashMap<ElectionId, HashSet<ShareholderId>>>,
    /// One submission lane per election id.
    lanes: Mutex<HashMap<ElectionId, Arc<Mutex<()>>>>,
}

impl<S> SubmissionEngine<S>
where
    S: BallotLogStore + SnapshotStore + TransitionLogStore + DelegationLogStore,
{
    pub fn new(
        elections: Arc<ElectionStore<S>>,
        delegations: Arc<DelegationLedger<S, ElectionStore<S>>>,
        store: Arc<S>,
    ) -> Self {
        Self {
            elections,
            delegations,
            store,
            frontier: RwLock::new(ChainFrontier::new()),
            voted: RwLock::new(HashMap::new()),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuild the chain frontier and duplicate index from the persisted
    /// ballot logs, validating every link on the way.
    pub fn open(
        elections: Arc<ElectionStore<S>>,
        delegations: Arc<DelegationLedger<S, ElectionStore<S>>>,
        store: Arc<S>,
    ) -> Result<Self, SubmitError> {
        let engine = Self::new(elections, delegations, store);
        for id in engine.elections.ids() {
            let count = engine.store.ballot_count(&id)?;
            let raw = engine.store.ballots(&id, count)?;
            let mut frontier = engine.frontier.write().unwrap();
            let mut voted = engine.voted.write().unwrap();
            let chain = frontier.chain_mut(&id);
            for bytes in raw {
                let ballot =
                    Ballot::from_bytes(&bytes).map_err(StoreError::Serialization)?;
                chain.validate_append(&ballot)?;
                chain.append(&ballot);
                voted
                    .entry(id.clone())
                    .or_default()
                    .insert(ballot.voter.clone());
            }
        }
        info!("submission engine replayed from ballot logs");
        Ok(engine)
    }

    fn lane(&self, election: &ElectionId) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().unwrap();
        lanes
            .entry(election.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Cast a ballot. Returns the receipt on commit.
    ///
    /// All-or-nothing: any failure before the conditional append leaves no
    /// trace, and the append itself either commits the full ballot or
    /// nothing.
    pub fn submit(
        &self,
        election: &ElectionId,
        caster: &ShareholderId,
        choices: BTreeMap<AgendaItemId, OptionId>,
        now: Timestamp,
    ) -> Result<Receipt, SubmitError> {
        let status = self.elections.refresh(election, now)?;
        let definition = self.elections.definition(election)?;
        if !status.accepts_ballots() || !definition.window.contains(now) {
            return Err(SubmitError::ElectionNotActive(election.to_string()));
        }

        // Effective weight: own undelegated remainder plus everything
        // delegated to the caster for this election. Frozen at window open,
        // so the value is stable for the whole voting window.
        let own = self
            .delegations
            .effective_weight(caster, Some(election), now)?;
        let incoming = self
            .delegations
            .incoming_weight(caster, Some(election), now)?;
        let weight = own + incoming;
        if weight.is_zero() {
            warn!(%caster, %election, "submission without voting weight");
            return Err(SubmitError::NoVotingWeight(caster.to_string()));
        }

        for (item_id, choice) in &choices {
            let item = definition
                .agenda_item(item_id)
                .ok_or_else(|| SubmitError::UnknownAgendaItem(item_id.to_string()))?;
            if !item.options.contains(choice) {
                return Err(SubmitError::UnknownChoice {
                    item: item_id.to_string(),
                    choice: choice.to_string(),
                });
            }
        }
        for item in definition.agenda.iter().filter(|i| i.required) {
            if !choices.contains_key(&item.id) {
                return Err(SubmitError::MissingRequiredVote(item.id.to_string()));
            }
        }

        let lane = self.lane(election);
        let _guard = lane.lock().unwrap();

        if self
            .voted
            .read()
            .unwrap()
            .get(election)
            .map_or(false, |set| set.contains(caster))
        {
            return Err(SubmitError::DuplicateBallot {
                election: election.to_string(),
                voter: caster.to_string(),
            });
        }

        let mut frontier = self.frontier.write().unwrap();
        let chain = frontier.chain_mut(election);
        let mut ballot = Ballot {
            election: election.clone(),
            voter: caster.clone(),
            choices,
            weight,
            sequence: chain.length,
            cast_at: now,
            previous: chain.head,
            content_hash: EntryHash::ZERO,
            receipt_hash: ReceiptHash::ZERO,
        };
        ballot.content_hash = ballot.compute_content_hash();
        ballot.receipt_hash = receipt_hash(&ballot.content_hash);
        chain.validate_append(&ballot)?;

        self.store
            .append_ballot(election, ballot.sequence, &ballot.to_bytes())?;

        chain.append(&ballot);
        self.voted
            .write()
            .unwrap()
            .entry(election.clone())
            .or_default()
            .insert(caster.clone());

        info!(
            %election,
            voter = %caster,
            sequence = ballot.sequence,
            weight = %ballot.weight,
            "ballot committed"
        );
        Ok(Receipt {
            receipt_hash: ballot.receipt_hash,
            content_hash: ballot.content_hash,
            election: election.clone(),
            position: ballot.sequence,
            cast_at: ballot.cast_at,
        })
    }

    /// Number of committed ballots for an election.
    pub fn ballot_count(&self, election: &ElectionId) -> Result<u64, SubmitError> {
        Ok(self.store.ballot_count(election)?)
    }

    /// Snapshot-isolated read of the committed ballots: the length is read
    /// first, then the prefix up to it, so a concurrent submit never yields
    /// a torn view.
    pub fn ballots(&self, election: &ElectionId) -> Result<Vec<Ballot>, SubmitError> {
        let count = self.store.ballot_count(election)?;
        let raw = self.store.ballots(election, count)?;
        raw.iter()
            .map(|bytes| {
                Ballot::from_bytes(bytes)
                    .map_err(StoreError::Serialization)
                    .map_err(SubmitError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_elections::{AgendaItem, BallotOptions, ElectionDraft, VotingWindow};
    use tessera_nullables::NullStore;
    use tessera_registry::ShareRegistry;
    use tessera_types::{LedgerParams, Weight};

    pub(crate) struct Fixture {
        pub registry: Arc<ShareRegistry>,
        pub elections: Arc<ElectionStore<NullStore>>,
        pub delegations: Arc<DelegationLedger<NullStore, ElectionStore<NullStore>>>,
        pub store: Arc<NullStore>,
        pub engine: SubmissionEngine<NullStore>,
    }

    pub(crate) fn fixture(holders: &[(&str, u64)]) -> Fixture {
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
        let engine =
            SubmissionEngine::new(elections.clone(), delegations.clone(), store.clone());
        Fixture {
            registry,
            elections,
            delegations,
            store,
            engine,
        }
    }

    pub(crate) fn publish_election(fixture: &Fixture, id: &str) -> ElectionId {
        let election = ElectionId::new(id);
        fixture
            .elections
            .create(
                ElectionDraft {
                    id: election.clone(),
                    title: "Annual meeting".to_string(),
                    agenda: vec![
                        AgendaItem {
                            id: AgendaItemId::new("a1"),
                            title: "Approve the budget".to_string(),
                            description: None,
                            required: true,
                            options: BallotOptions::YesNoAbstain,
                        },
                        AgendaItem {
                            id: AgendaItemId::new("a2"),
                            title: "Advisory question".to_string(),
                            description: None,
                            required: false,
                            options: BallotOptions::YesNoAbstain,
                        },
                    ],
                    window: VotingWindow::new(Timestamp::new(10_000), Timestamp::new(20_000)),
                    quorum_bps: 6000,
                },
                Timestamp::new(50),
            )
            .unwrap();
        fixture
            .elections
            .publish(&election, &fixture.registry, Timestamp::new(100))
            .unwrap();
        election
    }

    fn yes_on_a1() -> BTreeMap<AgendaItemId, OptionId> {
        let mut choices = BTreeMap::new();
        choices.insert(AgendaItemId::new("a1"), OptionId::yes());
        choices
    }

    #[test]
    fn submit_commits_and_returns_receipt() {
        let f = fixture(&[("alice", 100)]);
        let election = publish_election(&f, "e1");

        let receipt = f
            .engine
            .submit(&election, &ShareholderId::new("alice"), yes_on_a1(), Timestamp::new(10_500))
            .unwrap();
        assert_eq!(receipt.position, 0);
        assert!(!receipt.receipt_hash.is_zero());

        let ballots = f.engine.ballots(&election).unwrap();
        assert_eq!(ballots.len(), 1);
        assert_eq!(ballots[0].weight, Weight::new(100));
        assert_eq!(ballots[0].previous, EntryHash::ZERO);
        assert_eq!(ballots[0].content_hash, receipt.content_hash);
    }

    #[test]
    fn duplicate_ballot_rejected() {
        let f = fixture(&[("alice", 100)]);
        let election = publish_election(&f, "e1");
        let alice = ShareholderId::new("alice");

        f.engine
            .submit(&election, &alice, yes_on_a1(), Timestamp::new(10_500))
            .unwrap();
        assert!(matches!(
            f.engine.submit(&election, &alice, yes_on_a1(), Timestamp::new(10_600)),
            Err(SubmitError::DuplicateBallot { .. })
        ));
        assert_eq!(f.engine.ballot_count(&election).unwrap(), 1);
    }

    #[test]
    fn window_end_is_excluded() {
        let f = fixture(&[("alice", 100)]);
        let election = publish_election(&f, "e1");

        // Exactly at the end instant the half-open window has closed.
        assert!(matches!(
            f.engine.submit(
                &election,
                &ShareholderId::new("alice"),
                yes_on_a1(),
                Timestamp::new(20_000)
            ),
            Err(SubmitError::ElectionNotActive(_))
        ));
        // And before the start it has not opened.
        assert!(matches!(
            f.engine.submit(
                &election,
                &ShareholderId::new("alice"),
                yes_on_a1(),
                Timestamp::new(9_999)
            ),
            Err(SubmitError::ElectionNotActive(_))
        ));
    }

    #[test]
    fn missing_required_vote_rejected() {
        let f = fixture(&[("alice", 100)]);
        let election = publish_election(&f, "e1");

        let mut only_optional = BTreeMap::new();
        only_optional.insert(AgendaItemId::new("a2"), OptionId::no());
        assert!(matches!(
            f.engine.submit(
                &election,
                &ShareholderId::new("alice"),
                only_optional,
                Timestamp::new(10_500)
            ),
            Err(SubmitError::MissingRequiredVote(_))
        ));
    }

    #[test]
    fn unknown_item_and_choice_rejected() {
        let f = fixture(&[("alice", 100)]);
        let election = publish_election(&f, "e1");
        let alice = ShareholderId::new("alice");

        let mut unknown_item = yes_on_a1();
        unknown_item.insert(AgendaItemId::new("ghost"), OptionId::yes());
        assert!(matches!(
            f.engine.submit(&election, &alice, unknown_item, Timestamp::new(10_500)),
            Err(SubmitError::UnknownAgendaItem(_))
        ));

        let mut bad_choice = BTreeMap::new();
        bad_choice.insert(AgendaItemId::new("a1"), OptionId::new("maybe"));
        assert!(matches!(
            f.engine.submit(&election, &alice, bad_choice, Timestamp::new(10_500)),
            Err(SubmitError::UnknownChoice { .. })
        ));
    }

    #[test]
    fn fully_delegated_caster_has_no_weight() {
        let f = fixture(&[("alice", 100), ("proxy", 10)]);
        let election = publish_election(&f, "e1");
        f.delegations
            .assign(
                &ShareholderId::new("alice"),
                &ShareholderId::new("proxy"),
                Weight::new(100),
                tessera_delegation::DelegationScope::Election(election.clone()),
                Timestamp::new(200),
            )
            .unwrap();

        assert!(matches!(
            f.engine.submit(
                &election,
                &ShareholderId::new("alice"),
                yes_on_a1(),
                Timestamp::new(10_500)
            ),
            Err(SubmitError::NoVotingWeight(_))
        ));
    }

    #[test]
    fn proxy_casts_aggregated_weight_once() {
        let f = fixture(&[("alice", 100), ("bob", 40), ("proxy", 10)]);
        let election = publish_election(&f, "e1");
        let proxy = ShareholderId::new("proxy");
        for name in ["alice", "bob"] {
            f.delegations
                .assign(
                    &ShareholderId::new(name),
                    &proxy,
                    f.registry.balance(&ShareholderId::new(name)).unwrap(),
                    tessera_delegation::DelegationScope::Election(election.clone()),
                    Timestamp::new(200),
                )
                .unwrap();
        }

        let receipt = f
            .engine
            .submit(&election, &proxy, yes_on_a1(), Timestamp::new(10_500))
            .unwrap();
        let ballots = f.engine.ballots(&election).unwrap();
        // Own snapshot weight (10) plus both incoming delegations.
        assert_eq!(ballots[0].weight, Weight::new(150));
        assert_eq!(receipt.position, 0);

        // The proxy is one effective voter: no second ballot.
        assert!(matches!(
            f.engine.submit(&election, &proxy, yes_on_a1(), Timestamp::new(10_600)),
            Err(SubmitError::DuplicateBallot { .. })
        ));
    }

    #[test]
    fn chain_links_consecutive_ballots() {
        let f = fixture(&[("alice", 100), ("bob", 50)]);
        let election = publish_election(&f, "e1");

        f.engine
            .submit(&election, &ShareholderId::new("alice"), yes_on_a1(), Timestamp::new(10_500))
            .unwrap();
        f.engine
            .submit(&election, &ShareholderId::new("bob"), yes_on_a1(), Timestamp::new(10_600))
            .unwrap();

        let ballots = f.engine.ballots(&election).unwrap();
        assert_eq!(ballots[1].previous, ballots[0].content_hash);
        assert_eq!(ballots[1].sequence, 1);
    }

    #[test]
    fn open_replays_committed_chains() {
        let f = fixture(&[("alice", 100), ("bob", 50)]);
        let election = publish_election(&f, "e1");
        f.engine
            .submit(&election, &ShareholderId::new("alice"), yes_on_a1(), Timestamp::new(10_500))
            .unwrap();

        let reopened = SubmissionEngine::open(
            f.elections.clone(),
            f.delegations.clone(),
            f.store.clone(),
        )
        .unwrap();

        // The duplicate index survives the restart.
        assert!(matches!(
            reopened.submit(
                &election,
                &ShareholderId::new("alice"),
                yes_on_a1(),
                Timestamp::new(10_700)
            ),
            Err(SubmitError::DuplicateBallot { .. })
        ));
        // And the chain continues where it left off.
        let receipt = reopened
            .submit(&election, &ShareholderId::new("bob"), yes_on_a1(), Timestamp::new(10_800))
            .unwrap();
        assert_eq!(receipt.position, 1);
    }
}
