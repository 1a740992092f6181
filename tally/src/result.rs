//! Tally results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tessera_types::{AgendaItemId, ElectionId, OptionId, Timestamp, Weight};

/// The outcome of folding one election's ballot log.
///
/// A pure function of (log prefix, snapshot, quorum threshold, `now`):
/// ordered maps keep recomputation byte-identical, which is what lets a live
/// tally and the final tally agree on overlapping history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub election: ElectionId,
    /// Weighted sum per agenda item and option. Every allowed option is
    /// present, zero-weighted if nobody chose it.
    pub items: BTreeMap<AgendaItemId, BTreeMap<OptionId, Weight>>,
    /// Total weight cast by distinct effective voters. Abstentions count.
    pub total_weight_cast: Weight,
    /// Total eligible weight from the election's snapshot.
    pub eligible_weight: Weight,
    /// Participation as a fraction of eligible weight, in basis points.
    pub participation_bps: u32,
    /// The election's quorum threshold, in basis points.
    pub quorum_bps: u32,
    pub quorum_met: bool,
    /// Length of the ballot-log prefix this tally was computed over.
    pub ballot_count: u64,
    pub computed_at: Timestamp,
}

impl TallyResult {
    /// Weighted votes for one option of one agenda item.
    pub fn option_weight(&self, item: &AgendaItemId, option: &OptionId) -> Weight {
        self.items
            .get(item)
            .and_then(|options| options.get(option))
            .copied()
            .unwrap_or(Weight::ZERO)
    }

    /// One option's share of its item's cast weight, in basis points.
    pub fn option_share_bps(&self, item: &AgendaItemId, option: &OptionId) -> u32 {
        let Some(options) = self.items.get(item) else {
            return 0;
        };
        let item_total: u64 = options.values().map(|w| w.raw()).sum();
        if item_total == 0 {
            return 0;
        }
        ((self.option_weight(item, option).raw() as u128 * 10_000) / item_total as u128) as u32
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("tally serialization should not fail")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }
}

/// Participation in basis points: `cast / eligible`, floor division.
pub(crate) fn participation_bps(cast: Weight, eligible: Weight) -> u32 {
    if eligible.is_zero() {
        return 0;
    }
    ((cast.raw() as u128 * 10_000) / eligible.raw() as u128) as u32
}
