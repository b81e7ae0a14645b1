//! Property-based tests for cursor and controller invariants.
//!
//! Uses `proptest` to drive arbitrary request sequences against an in-memory
//! store and check that the snapshot total, cursor bounds and fetch policy
//! hold after every step.

use proptest::prelude::*;

use super::controller::RefreshController;
use super::cursor::CursorTracker;
use super::request::WidgetRequest;
use super::session::WidgetSession;
use super::trigger;
use super::view;
use crate::deck::status::{DeckStatus, Snapshot};
use crate::deck::store::MemoryDeckStore;

// ──────────────────── strategies ────────────────────

fn arb_deck() -> impl Strategy<Value = DeckStatus> {
    ("[a-z]{1,8}", 0u32..20, 0u32..50, 0u32..20)
        .prop_map(|(name, failed, due, new)| DeckStatus::new(name, failed, due, new))
}

fn arb_decks() -> impl Strategy<Value = Vec<DeckStatus>> {
    prop::collection::vec(arb_deck(), 0..12)
}

fn arb_request() -> impl Strategy<Value = WidgetRequest> {
    prop_oneof![
        Just(WidgetRequest::InitialLoad),
        Just(WidgetRequest::Refresh),
        Just(WidgetRequest::Next),
        Just(WidgetRequest::Previous),
        Just(WidgetRequest::Ignore),
        Just(WidgetRequest::Open),
    ]
}

fn arb_navigation() -> impl Strategy<Value = WidgetRequest> {
    prop_oneof![
        Just(WidgetRequest::Next),
        Just(WidgetRequest::Previous),
        Just(WidgetRequest::Ignore),
        Just(WidgetRequest::Open),
    ]
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The aggregate always equals the sum over retained decks, and no
    /// retained deck has a zero due count.
    #[test]
    fn snapshot_total_matches_sum(decks in arb_decks()) {
        let snapshot = Snapshot::from_ranked(decks);
        let sum: u64 = snapshot.decks().iter().map(|d| u64::from(d.due_count)).sum();
        prop_assert_eq!(snapshot.total_due(), sum);
        prop_assert!(snapshot.decks().iter().all(DeckStatus::is_due));
    }

    /// Clamping twice is the same as clamping once.
    #[test]
    fn clamp_is_idempotent(index in -50i64..50, size in 0usize..20) {
        let mut once = CursorTracker::with_index(index);
        once.clamp(size);
        let mut twice = once;
        twice.clamp(size);
        prop_assert_eq!(once, twice);
    }

    /// After clamping against a non-empty size the index is in range.
    #[test]
    fn clamp_bounds_index(index in any::<i64>(), size in 1usize..64) {
        let mut cursor = CursorTracker::with_index(index);
        cursor.clamp(size);
        prop_assert!(cursor.index() >= 0);
        prop_assert!(usize::try_from(cursor.index()).unwrap() < size);
    }

    /// advance(+1) then advance(-1) is the identity away from the extremes.
    #[test]
    fn advance_round_trip(index in -1_000_000i64..1_000_000) {
        let mut cursor = CursorTracker::with_index(index);
        cursor.advance(1);
        cursor.advance(-1);
        prop_assert_eq!(cursor.index(), index);
    }

    /// Once a snapshot is cached, navigation never reaches the store.
    #[test]
    fn navigation_never_fetches(
        decks in arb_decks(),
        requests in prop::collection::vec(arb_navigation(), 0..60)
    ) {
        let mut controller = RefreshController::new(MemoryDeckStore::new(decks));
        let mut cursor = CursorTracker::new();
        controller.handle(&mut cursor, WidgetRequest::InitialLoad).unwrap();
        let baseline = controller.store().fetches();

        for request in requests {
            controller.handle(&mut cursor, request).unwrap();
            if request.renders() {
                let _ = controller.render(&mut cursor);
            }
        }
        prop_assert_eq!(controller.store().fetches(), baseline);
    }

    /// Every rendered frame is consistent with the snapshot behind it.
    #[test]
    fn rendered_frames_stay_consistent(
        decks in arb_decks(),
        requests in prop::collection::vec(arb_request(), 1..60)
    ) {
        let mut session = WidgetSession::new(MemoryDeckStore::new(decks), trigger::DEFAULT_MINIMUM_DUE);
        for request in requests {
            let report = session.process(request).unwrap();
            let snapshot = session.snapshot().cloned().unwrap_or_default();

            if let Some(view) = &report.view {
                if snapshot.is_empty() {
                    prop_assert!(!view.content_visible);
                    prop_assert_eq!(view.headline.as_str(), view::NO_CARDS_DUE);
                } else {
                    let index = usize::try_from(report.cursor).unwrap();
                    prop_assert!(index < snapshot.len());
                    prop_assert_eq!(&view.deck_name, &snapshot.decks()[index].name);
                    prop_assert_eq!(view.prev.enabled, index > 0);
                    prop_assert_eq!(view.next.enabled, index + 1 < snapshot.len());
                }
            }

            if report.view.is_some() && !report.storage_unavailable {
                prop_assert_eq!(
                    report.alert.is_some(),
                    snapshot.total_due() >= trigger::DEFAULT_MINIMUM_DUE
                );
            } else {
                prop_assert!(report.alert.is_none());
            }
        }
    }

    /// Open only ever yields the deck under an in-range cursor.
    #[test]
    fn open_targets_deck_under_cursor(
        decks in arb_decks(),
        moves in prop::collection::vec(prop_oneof![Just(1i64), Just(-1i64)], 0..20)
    ) {
        let mut controller = RefreshController::new(MemoryDeckStore::new(decks));
        let mut cursor = CursorTracker::new();
        controller.handle(&mut cursor, WidgetRequest::InitialLoad).unwrap();
        for delta in moves {
            cursor.advance(delta);
        }
        let snapshot = controller.snapshot().unwrap().clone();
        let expected = cursor.current(snapshot.decks()).cloned();
        prop_assert_eq!(controller.open_target(&cursor), expected);
    }
}

// ──────────────────── non-proptest invariant tests ────────────────────

#[test]
fn shrink_scenario_resets_cursor() {
    let decks = |n: usize| -> Vec<DeckStatus> {
        (0..n)
            .map(|i| DeckStatus::new(format!("d{i}"), 0, 1, 0))
            .collect()
    };
    let mut session = WidgetSession::new(MemoryDeckStore::new(decks(3)), 25);
    session.process(WidgetRequest::InitialLoad).unwrap();
    session.process(WidgetRequest::Next).unwrap();
    session.process(WidgetRequest::Next).unwrap();
    assert_eq!(session.cursor().index(), 2);

    session.controller_mut().store_mut().set_decks(decks(1));
    let report = session.process(WidgetRequest::Refresh).unwrap();
    assert_eq!(report.cursor, 0);
}
