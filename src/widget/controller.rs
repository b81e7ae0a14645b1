//! Refresh controller: per request, decide whether to pull a fresh due-deck
//! snapshot or reuse the cached one, and move the cursor accordingly.
//!
//! Request policy:
//!
//! | request                  | store fetch                  | cursor                 |
//! |--------------------------|------------------------------|------------------------|
//! | `InitialLoad`, `Refresh` | always                       | clamped to new size    |
//! | `Next`, `Previous`       | only if nothing cached yet   | advanced, not clamped  |
//! | `Open`                   | never                        | read only              |
//! | `Ignore`                 | never                        | untouched              |
//!
//! Every fetch runs inside a [`DeckHandleGuard`], so the store's open deck is
//! closed for the duration of the fetch and reopened afterwards even when the
//! fetch fails.

#![allow(missing_docs)]

use std::sync::Arc;

use crate::core::errors::Result;
use crate::deck::status::{DeckStatus, Snapshot};
use crate::deck::store::{DeckHandleGuard, DeckStore};
use crate::widget::cursor::CursorTracker;
use crate::widget::request::WidgetRequest;
use crate::widget::view::{self, ViewModel};

/// What the caller should do after a request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Render a frame from the cached snapshot.
    Render { fetched: bool },
    /// Open this deck in the host application.
    OpenDeck(DeckStatus),
    /// Nothing further to do.
    Idle,
    /// The deck store is unreachable; render the degraded frame.
    StorageUnavailable,
}

/// Owns the deck store and the cached snapshot for one widget instance.
pub struct RefreshController<S: DeckStore> {
    store: S,
    snapshot: Option<Arc<Snapshot>>,
    fetch_count: u64,
}

impl<S: DeckStore> RefreshController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            snapshot: None,
            fetch_count: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Latest snapshot, `None` until the first successful fetch.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// Number of fetches attempted through this controller.
    pub const fn fetch_count(&self) -> u64 {
        self.fetch_count
    }

    /// Apply one request to the cursor and the cached snapshot.
    pub fn handle(
        &mut self,
        cursor: &mut CursorTracker,
        request: WidgetRequest,
    ) -> Result<HandleOutcome> {
        match request {
            WidgetRequest::Ignore => Ok(HandleOutcome::Idle),
            WidgetRequest::Open => Ok(self
                .open_target(cursor)
                .map_or(HandleOutcome::Idle, HandleOutcome::OpenDeck)),
            WidgetRequest::Next
            | WidgetRequest::Previous
            | WidgetRequest::Refresh
            | WidgetRequest::InitialLoad => {
                match request {
                    WidgetRequest::Next => cursor.advance(1),
                    WidgetRequest::Previous => cursor.advance(-1),
                    _ => {}
                }

                if !self.store.is_available() {
                    return Ok(HandleOutcome::StorageUnavailable);
                }

                let fetched = request.forces_fetch() || self.snapshot.is_none();
                if fetched {
                    let snapshot = self.fetch_snapshot()?;
                    cursor.clamp(snapshot.len());
                    self.snapshot = Some(Arc::new(snapshot));
                }
                Ok(HandleOutcome::Render { fetched })
            }
        }
    }

    /// Clamp the cursor against the cached snapshot and build the frame.
    pub fn render(&self, cursor: &mut CursorTracker) -> ViewModel {
        let empty = Snapshot::empty();
        let snapshot = self.snapshot.as_deref().unwrap_or(&empty);
        cursor.clamp(snapshot.len());
        view::build(snapshot, cursor)
    }

    /// The deck `Open` would launch, if the cursor is within the snapshot.
    pub fn open_target(&self, cursor: &CursorTracker) -> Option<DeckStatus> {
        let snapshot = self.snapshot.as_deref()?;
        cursor.current(snapshot.decks()).cloned()
    }

    fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        self.fetch_count += 1;
        let mut guard = DeckHandleGuard::acquire(&mut self.store)?;
        let fetched = guard.store().fetch_due_decks();
        guard.release()?;
        Ok(Snapshot::from_ranked(fetched?))
    }
}
