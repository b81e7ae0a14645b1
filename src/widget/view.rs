//! View-model builder and the renderer seam.
//!
//! [`build`] is pure: the same snapshot and cursor always yield the same view.
//! Styling is left to renderers; the status line is a list of tagged segments.

#![allow(missing_docs)]

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DdwError, Result};
use crate::deck::status::{DeckStatus, Snapshot};
use crate::widget::cursor::CursorTracker;
use crate::widget::request::WidgetAction;

pub const NO_CARDS_DUE: &str = "No cards due";
pub const STORAGE_UNAVAILABLE: &str = "Storage unavailable";

/// Semantic role of a status segment; renderers map these to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Failed,
    Due,
    New,
}

/// One piece of the deck status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSegment {
    pub text: String,
    pub tag: StatusTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Previous,
    Next,
}

/// A navigation arrow: whether it is live and what it sends when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationAffordance {
    pub direction: Direction,
    pub enabled: bool,
    pub action: WidgetAction,
}

impl NavigationAffordance {
    /// Disabled arrows carry `Ignore` so a stale activation is harmless.
    #[must_use]
    pub const fn new(direction: Direction, enabled: bool) -> Self {
        let action = match (direction, enabled) {
            (_, false) => WidgetAction::Ignore,
            (Direction::Previous, true) => WidgetAction::Previous,
            (Direction::Next, true) => WidgetAction::Next,
        };
        Self {
            direction,
            enabled,
            action,
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub headline: String,
    pub deck_name: String,
    pub deck_status: Vec<StatusSegment>,
    pub prev: NavigationAffordance,
    pub next: NavigationAffordance,
    /// Deck name, status and arrows are shown only when true.
    pub content_visible: bool,
    /// Attached to deck name and status while content is visible.
    pub content_action: Option<WidgetAction>,
    /// Attached to the static logo; always present.
    pub logo_action: WidgetAction,
}

impl ViewModel {
    fn hidden(headline: &str) -> Self {
        Self {
            headline: headline.to_string(),
            deck_name: String::new(),
            deck_status: Vec::new(),
            prev: NavigationAffordance::new(Direction::Previous, false),
            next: NavigationAffordance::new(Direction::Next, false),
            content_visible: false,
            content_action: None,
            logo_action: WidgetAction::OpenMain,
        }
    }

    /// Degraded frame shown when the deck store cannot be reached.
    #[must_use]
    pub fn storage_unavailable() -> Self {
        Self::hidden(STORAGE_UNAVAILABLE)
    }

    /// Status segments joined by single spaces, without styling.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.deck_status
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `"1 card"`, `"3 cards"`.
#[must_use]
pub fn pluralize(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Headline for a non-empty census: `"10 cards due in 1 deck"`.
#[must_use]
pub fn due_headline(total_due: u64, deck_count: usize) -> String {
    let decks = pluralize(u64::try_from(deck_count).unwrap_or(u64::MAX), "deck", "decks");
    format!("{} due in {decks}", pluralize(total_due, "card", "cards"))
}

/// Describe the snapshot as seen through the cursor.
///
/// Expects a clamped cursor; an out-of-range index renders the first deck
/// rather than panicking.
#[must_use]
pub fn build(snapshot: &Snapshot, cursor: &CursorTracker) -> ViewModel {
    if snapshot.total_due() == 0 {
        return ViewModel::hidden(NO_CARDS_DUE);
    }

    let decks = snapshot.decks();
    let Some(deck) = cursor.current(decks).or_else(|| decks.first()) else {
        return ViewModel::hidden(NO_CARDS_DUE);
    };
    let index = if cursor.is_within(decks.len()) {
        cursor.index()
    } else {
        0
    };
    let last = i64::try_from(decks.len()).unwrap_or(i64::MAX) - 1;

    ViewModel {
        headline: due_headline(snapshot.total_due(), decks.len()),
        deck_name: deck.name.clone(),
        deck_status: vec![
            StatusSegment {
                text: deck.failed_count.to_string(),
                tag: StatusTag::Failed,
            },
            StatusSegment {
                text: deck.due_count.to_string(),
                tag: StatusTag::Due,
            },
            StatusSegment {
                text: deck.new_count.to_string(),
                tag: StatusTag::New,
            },
        ],
        prev: NavigationAffordance::new(Direction::Previous, index > 0),
        next: NavigationAffordance::new(Direction::Next, index < last),
        content_visible: true,
        content_action: Some(WidgetAction::Open),
        logo_action: WidgetAction::OpenMain,
    }
}

// ──────────────────── renderers ────────────────────

/// Consumer of the widget's output: one `render` per rendered cycle and one
/// `open_deck` per honored `Open` request.
pub trait Renderer: Send {
    fn render(&mut self, view: &ViewModel) -> Result<()>;

    /// The host should open `deck`.
    fn open_deck(&mut self, deck: &DeckStatus) -> Result<()>;
}

/// Writes each view as one JSON line, for hosts that draw the widget
/// themselves.
pub struct JsonLinesRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> JsonLinesRenderer<W> {
    fn write_line(&mut self, mut line: String) -> Result<()> {
        line.push('\n');
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|source| DdwError::io("<renderer>", source))
    }
}

impl<W: Write + Send> Renderer for JsonLinesRenderer<W> {
    fn render(&mut self, view: &ViewModel) -> Result<()> {
        let line = serde_json::to_string(view)?;
        self.write_line(line)
    }

    fn open_deck(&mut self, deck: &DeckStatus) -> Result<()> {
        let line = serde_json::to_string(&serde_json::json!({ "open_deck": deck }))?;
        self.write_line(line)
    }
}
