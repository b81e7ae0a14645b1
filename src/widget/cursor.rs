//! Cursor tracker: which due deck the widget is currently showing.
//!
//! `advance` is deliberately unchecked so next/previous respond without a store
//! round-trip; the index is revalidated by `clamp` whenever the snapshot size
//! is about to matter. Between those two points the index may sit outside the
//! snapshot, and readers must go through [`CursorTracker::current`].

use serde::{Deserialize, Serialize};

use crate::deck::status::DeckStatus;

/// Selected position within the current due-deck snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorTracker {
    index: i64,
}

impl CursorTracker {
    /// Cursor at the first deck.
    #[must_use]
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Cursor restored at a previously persisted index (may be out of range).
    #[must_use]
    pub const fn with_index(index: i64) -> Self {
        Self { index }
    }

    /// Raw index, possibly out of range until the next clamp.
    #[must_use]
    pub const fn index(&self) -> i64 {
        self.index
    }

    /// Move by `delta` without any bounds check.
    pub fn advance(&mut self, delta: i64) {
        self.index = self.index.saturating_add(delta);
    }

    /// Back to the first deck.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Wrap an out-of-range index back to the first deck.
    ///
    /// With `size == 0` the index is irrelevant and left untouched.
    pub fn clamp(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        if !self.is_within(size) {
            self.index = 0;
        }
    }

    /// Whether the index addresses an element of a sequence of `size` items.
    #[must_use]
    pub fn is_within(&self, size: usize) -> bool {
        usize::try_from(self.index).is_ok_and(|i| i < size)
    }

    /// The deck under the cursor, or `None` when the index is out of range.
    #[must_use]
    pub fn current<'a>(&self, decks: &'a [DeckStatus]) -> Option<&'a DeckStatus> {
        usize::try_from(self.index).ok().and_then(|i| decks.get(i))
    }
}
