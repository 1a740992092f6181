use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("shareholder {0} is already registered")]
    DuplicateShareholder(String),

    #[error("unknown shareholder: {0}")]
    UnknownShareholder(String),

    #[error("shareholder {0} is deactivated")]
    Deactivated(String),

    #[error("balance overflow for shareholder {0}")]
    BalanceOverflow(String),
}
