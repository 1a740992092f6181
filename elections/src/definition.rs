//! Election definitions — agenda, voting window, quorum.

use serde::{Deserialize, Serialize};

use tessera_types::{AgendaItemId, ElectionId, ElectionStatus, OptionId, Timestamp};

/// The options voters may choose from on one agenda item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotOptions {
    /// The standard fixed set: yes / no / abstain.
    YesNoAbstain,
    /// A custom ordered set (e.g. board candidates).
    Custom(Vec<OptionId>),
}

impl BallotOptions {
    /// Whether a choice is one of the allowed options.
    pub fn contains(&self, choice: &OptionId) -> bool {
        match self {
            Self::YesNoAbstain => {
                *choice == OptionId::yes() || *choice == OptionId::no() || *choice == OptionId::abstain()
            }
            Self::Custom(options) => options.contains(choice),
        }
    }

    /// The allowed options in display order.
    pub fn all(&self) -> Vec<OptionId> {
        match self {
            Self::YesNoAbstain => vec![OptionId::yes(), OptionId::no(), OptionId::abstain()],
            Self::Custom(options) => options.clone(),
        }
    }
}

/// One item on an election's agenda.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: AgendaItemId,
    pub title: String,
    pub description: Option<String>,
    /// Required items must carry a choice on every ballot.
    pub required: bool,
    pub options: BallotOptions,
}

/// A half-open voting window `[start, end)` over UTC instants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl VotingWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Whether `now` falls inside the window. The end instant is excluded.
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start <= now && now < self.end
    }

    /// Window span in seconds.
    pub fn span_secs(&self) -> u64 {
        self.end.as_secs().saturating_sub(self.start.as_secs())
    }
}

/// The mutable input to [`ElectionStore::create`](crate::ElectionStore::create).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionDraft {
    pub id: ElectionId,
    pub title: String,
    pub agenda: Vec<AgendaItem>,
    pub window: VotingWindow,
    /// Quorum threshold as a fraction of eligible weight, in basis points.
    pub quorum_bps: u32,
}

/// A stored election definition.
///
/// Immutable once published except for `status` and `opened_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionDefinition {
    pub id: ElectionId,
    pub title: String,
    pub agenda: Vec<AgendaItem>,
    pub window: VotingWindow,
    pub quorum_bps: u32,
    pub status: ElectionStatus,
    pub created_at: Timestamp,
    /// The instant the window actually opened (transition to `Active`).
    pub opened_at: Option<Timestamp>,
}

impl ElectionDefinition {
    pub fn from_draft(draft: ElectionDraft, now: Timestamp) -> Self {
        Self {
            id: draft.id,
            title: draft.title,
            agenda: draft.agenda,
            window: draft.window,
            quorum_bps: draft.quorum_bps,
            status: ElectionStatus::Draft,
            created_at: now,
            opened_at: None,
        }
    }

    /// Look up one agenda item by id.
    pub fn agenda_item(&self, id: &AgendaItemId) -> Option<&AgendaItem> {
        self.agenda.iter().find(|item| &item.id == id)
    }
}
