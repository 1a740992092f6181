//! Tallying & quorum engine.
//!
//! Folds an election's ballot log into per-item, per-option weighted sums,
//! participation and quorum. A tally is derived state, always recomputable
//! from the log plus the eligibility snapshot. The one exception is the
//! final tally of a completed election, which is persisted exactly once and
//! returned unchanged ever after.

pub mod engine;
pub mod error;
pub mod result;

pub use engine::TallyEngine;
pub use error::TallyError;
pub use result::TallyResult;
