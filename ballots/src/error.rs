use tessera_delegation::DelegationError;
use tessera_elections::ElectionError;
use tessera_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("election {0} is not accepting ballots")]
    ElectionNotActive(String),

    #[error("caster {0} has no voting weight for this election")]
    NoVotingWeight(String),

    #[error("required agenda item {0} has no choice")]
    MissingRequiredVote(String),

    #[error("unknown agenda item: {0}")]
    UnknownAgendaItem(String),

    #[error("choice {choice} is not an allowed option for agenda item {item}")]
    UnknownChoice { item: String, choice: String },

    #[error("a ballot for election {election} was already cast by {voter}")]
    DuplicateBallot { election: String, voter: String },

    #[error("ballot does not extend the chain: expected sequence {expected}, got {got}")]
    ChainGap { expected: u64, got: u64 },

    #[error(transparent)]
    Election(#[from] ElectionError),

    #[error(transparent)]
    Delegation(#[from] DelegationError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
