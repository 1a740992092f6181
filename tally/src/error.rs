use tessera_elections::ElectionError;
use tessera_store::StoreError;
use tessera_types::ElectionStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("election {0} is not published; nothing to tally")]
    NotPublished(String),

    #[error("election is {0:?}; only completed elections can be finalized")]
    ElectionNotClosed(ElectionStatus),

    #[error(transparent)]
    Election(#[from] ElectionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
