//! Due-deck snapshot: the ranked, immutable result of one store fetch.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Review counts for a single deck as reported by the deck store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStatus {
    /// Display name, also used as the deck identity when opening it.
    pub name: String,
    /// Cards failed in a previous review and due again.
    #[serde(default)]
    pub failed_count: u32,
    /// Cards due for review now.
    #[serde(default)]
    pub due_count: u32,
    /// Cards never studied.
    #[serde(default)]
    pub new_count: u32,
}

impl DeckStatus {
    #[must_use]
    pub fn new(name: impl Into<String>, failed_count: u32, due_count: u32, new_count: u32) -> Self {
        Self {
            name: name.into(),
            failed_count,
            due_count,
            new_count,
        }
    }

    /// A deck is "due" when at least one card is ready for review.
    #[must_use]
    pub const fn is_due(&self) -> bool {
        self.due_count > 0
    }
}

/// Ranked list of due decks plus the aggregate due total.
///
/// Built once per refresh and never mutated afterwards; a refresh replaces the
/// whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    decks: Vec<DeckStatus>,
    total_due: u64,
}

impl Snapshot {
    /// Snapshot with no due decks.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the store's ranking, dropping decks with nothing due.
    ///
    /// Store order is preserved as-is.
    pub fn from_ranked(decks: impl IntoIterator<Item = DeckStatus>) -> Self {
        let decks: Vec<DeckStatus> = decks.into_iter().filter(DeckStatus::is_due).collect();
        let total_due = decks.iter().map(|d| u64::from(d.due_count)).sum();
        Self { decks, total_due }
    }

    #[must_use]
    pub fn decks(&self) -> &[DeckStatus] {
        &self.decks
    }

    #[must_use]
    pub const fn total_due(&self) -> u64 {
        self.total_due
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }
}
