use tessera_store::StoreError;
use tessera_types::ElectionStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("election {0} already exists")]
    DuplicateElection(String),

    #[error("unknown election: {0}")]
    UnknownElection(String),

    #[error("election has no agenda items")]
    EmptyAgenda,

    #[error("duplicate agenda item id: {0}")]
    DuplicateAgendaItem(String),

    #[error("agenda has {count} items, maximum is {max}")]
    AgendaTooLarge { count: u32, max: u32 },

    #[error("invalid voting window: {0}")]
    InvalidWindow(String),

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ElectionStatus,
        to: ElectionStatus,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
