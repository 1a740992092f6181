//! Stable identifiers for shareholders, elections, agenda items and delegations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A shareholder's stable identifier, supplied by the external identity layer.
///
/// Opaque to this core: the authentication collaborator guarantees uniqueness
/// and stability; the registry only requires equality and hashing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShareholderId(String);

impl ShareholderId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ShareholderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An election's stable identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ElectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of one agenda item within an election.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgendaItemId(String);

impl AgendaItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgendaItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One selectable option on an agenda item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(String);

impl OptionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The standard approval option.
    pub fn yes() -> Self {
        Self("yes".to_string())
    }

    /// The standard rejection option.
    pub fn no() -> Self {
        Self("no".to_string())
    }

    /// The standard abstention option. Abstaining still counts toward quorum.
    pub fn abstain() -> Self {
        Self("abstain".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a delegation record, assigned sequentially by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DelegationId(u64);

impl DelegationId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The next identifier in sequence.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for DelegationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dlg-{}", self.0)
    }
}
