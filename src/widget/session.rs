//! One widget instance: controller, cursor and threshold composed into a
//! single request cycle.
//!
//! Cycle: `handle` → (fetch → clamp) → render → trigger. Navigation skips the
//! fetch, `Open`/`Ignore` stop after `handle`, and every render is followed
//! by a trigger check against the cached total.

use std::time::Instant;

use serde::Serialize;

use crate::core::errors::Result;
use crate::deck::status::{DeckStatus, Snapshot};
use crate::deck::store::DeckStore;
use crate::widget::controller::{HandleOutcome, RefreshController};
use crate::widget::cursor::CursorTracker;
use crate::widget::request::WidgetRequest;
use crate::widget::trigger::{self, TriggerSignal};
use crate::widget::view::ViewModel;

/// Result of processing one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// The request that produced this report.
    pub request: WidgetRequest,
    /// Frame to render, absent for `Open` and `Ignore`.
    pub view: Option<ViewModel>,
    /// Deck the host should open.
    pub open_deck: Option<DeckStatus>,
    /// Alert to raise or replace.
    pub alert: Option<TriggerSignal>,
    /// Whether the store was queried during this cycle.
    pub fetched: bool,
    /// Whether the cycle ended in the degraded storage-unavailable frame.
    pub storage_unavailable: bool,
    /// Cursor index after the cycle.
    pub cursor: i64,
    /// Wall time spent in the cycle.
    pub duration_ms: u64,
}

/// State carried across requests for one widget.
pub struct WidgetSession<S: DeckStore> {
    controller: RefreshController<S>,
    cursor: CursorTracker,
    threshold: u64,
}

impl<S: DeckStore> WidgetSession<S> {
    /// Fresh session with the cursor at the first deck.
    pub fn new(store: S, threshold: u64) -> Self {
        Self::with_cursor(store, threshold, CursorTracker::new())
    }

    /// Session resuming from a previously saved cursor.
    pub fn with_cursor(store: S, threshold: u64, cursor: CursorTracker) -> Self {
        Self {
            controller: RefreshController::new(store),
            cursor,
            threshold,
        }
    }

    /// Current cursor.
    pub const fn cursor(&self) -> CursorTracker {
        self.cursor
    }

    /// Minimum due total that raises an alert.
    pub const fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Change the alert threshold (e.g. after a config reload).
    pub fn set_threshold(&mut self, threshold: u64) {
        self.threshold = threshold;
    }

    /// Underlying controller.
    pub fn controller(&self) -> &RefreshController<S> {
        &self.controller
    }

    /// Mutable access to the underlying controller.
    pub fn controller_mut(&mut self) -> &mut RefreshController<S> {
        &mut self.controller
    }

    /// Latest snapshot, if any fetch has succeeded.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.controller.snapshot().map(|s| &**s)
    }

    /// Load a snapshot without rendering or alerting, so a fresh process can
    /// answer `Open` for a cursor restored from disk.
    ///
    /// Returns whether a snapshot is now cached.
    pub fn prime(&mut self) -> Result<bool> {
        if self.controller.snapshot().is_none() {
            self.controller
                .handle(&mut self.cursor, WidgetRequest::Refresh)?;
        }
        Ok(self.controller.snapshot().is_some())
    }

    /// Run one full request cycle.
    pub fn process(&mut self, request: WidgetRequest) -> Result<CycleReport> {
        let started = Instant::now();
        let mut report = CycleReport {
            request,
            view: None,
            open_deck: None,
            alert: None,
            fetched: false,
            storage_unavailable: false,
            cursor: 0,
            duration_ms: 0,
        };

        match self.controller.handle(&mut self.cursor, request)? {
            HandleOutcome::Idle => {}
            HandleOutcome::OpenDeck(deck) => report.open_deck = Some(deck),
            HandleOutcome::StorageUnavailable => {
                report.storage_unavailable = true;
                report.view = Some(ViewModel::storage_unavailable());
            }
            HandleOutcome::Render { fetched } => {
                report.fetched = fetched;
                report.view = Some(self.controller.render(&mut self.cursor));
                let total_due = self.snapshot().map_or(0, Snapshot::total_due);
                report.alert = trigger::evaluate(total_due, self.threshold);
            }
        }

        report.cursor = self.cursor.index();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(report)
    }
}
