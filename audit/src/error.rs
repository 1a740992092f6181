use tessera_elections::ElectionError;
use tessera_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// The hash chain does not verify. Fatal to trust in the election's
    /// data; surfaced as-is and never auto-repaired.
    #[error("ballot chain broken for election {election} at sequence {sequence}: {reason}")]
    ChainBroken {
        election: String,
        sequence: u64,
        reason: String,
    },

    #[error(transparent)]
    Election(#[from] ElectionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("export serialization failed: {0}")]
    Export(String),
}
