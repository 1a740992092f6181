//! Ledger parameters — the operational tunables of the voting core.
//!
//! Can be loaded from a TOML file via [`LedgerParams::from_toml_file`] or
//! built programmatically (e.g. for tests). Missing keys fall back to the
//! defaults, so a partial config file is valid.

use serde::{Deserialize, Serialize};

/// All tunable parameters of the voting ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Maximum number of active delegation records a single proxy holder may
    /// carry, counted in records regardless of their weight.
    #[serde(default = "default_max_delegations")]
    pub max_delegations: u32,

    /// Minimum span of a voting window in seconds; `publish` rejects shorter.
    #[serde(default = "default_min_voting_window_secs")]
    pub min_voting_window_secs: u64,

    /// Maximum number of agenda items an election may carry.
    #[serde(default = "default_max_agenda_items")]
    pub max_agenda_items: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_max_delegations() -> u32 {
    15
}

fn default_min_voting_window_secs() -> u64 {
    3600
}

fn default_max_agenda_items() -> u32 {
    50
}

// ── Impl ───────────────────────────────────────────────────────────────

impl LedgerParams {
    /// Load parameters from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::from_toml_str(&content)
    }

    /// Parse parameters from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    /// Serialize the parameters to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("LedgerParams is always serializable to TOML")
    }
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            max_delegations: default_max_delegations(),
            min_voting_window_secs: default_min_voting_window_secs(),
            max_agenda_items: default_max_agenda_items(),
        }
    }
}
