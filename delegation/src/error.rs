use tessera_registry::RegistryError;
use tessera_store::StoreError;
use tessera_types::{DelegationId, Weight};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("cannot delegate to self")]
    SelfDelegation,

    #[error("delegated weight must be positive")]
    ZeroWeight,

    #[error("insufficient undelegated weight: requested {requested}, available {available}")]
    InsufficientWeight {
        requested: Weight,
        available: Weight,
    },

    #[error("proxy holder is at its delegation capacity of {capacity}")]
    ProxyCapacityExceeded { capacity: u32 },

    #[error("election {0} has started voting; delegation is locked")]
    VotingWindowLocked(String),

    #[error("unknown delegation record: {0}")]
    UnknownDelegation(DelegationId),

    #[error("delegation record {0} is no longer active")]
    NotActive(DelegationId),

    #[error("unknown election: {0}")]
    UnknownElection(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
