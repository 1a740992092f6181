//! Audit & verification service.
//!
//! Read-only consumer of the ballot logs: recomputes every entry's hashes to
//! detect retroactive tampering (failing closed on the first defect), looks
//! up receipts without disclosing choices, and exports ordered logs so an
//! external party can re-run the verification with no privileged access.

pub mod error;
pub mod service;

pub use error::AuditError;
pub use service::{AuditService, ChainSummary, ReceiptLocation};
