//! Terminal rendering of widget frames.
//!
//! Status segments map to colors here and only here: failed red, due in the
//! terminal's default color, new blue. Disabled arrows are dimmed.

use std::io::Write;

use colored::Colorize;

use crate::core::errors::{DdwError, Result};
use crate::deck::status::DeckStatus;
use crate::widget::view::{NavigationAffordance, Renderer, StatusSegment, StatusTag, ViewModel};

/// Draws each frame as a short block of text.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|source| DdwError::io("<stdout>", source))
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render(&mut self, view: &ViewModel) -> Result<()> {
        self.write_text(&format_view(view))
    }

    fn open_deck(&mut self, deck: &DeckStatus) -> Result<()> {
        self.write_text(&format!("open {}\n", deck.name))
    }
}

/// Text block for one frame, newline-terminated.
#[must_use]
pub fn format_view(view: &ViewModel) -> String {
    let mut text = format!("{}\n", view.headline.bold());
    if view.content_visible {
        text.push_str(&format!(
            "  {} {} {}\n",
            arrow(&view.prev, "<"),
            view.deck_name,
            arrow(&view.next, ">")
        ));
        let status: Vec<String> = view.deck_status.iter().map(paint).collect();
        text.push_str(&format!("  {}\n", status.join(" ")));
    }
    text
}

fn arrow(affordance: &NavigationAffordance, glyph: &str) -> String {
    if affordance.enabled {
        glyph.bold().to_string()
    } else {
        glyph.dimmed().to_string()
    }
}

fn paint(segment: &StatusSegment) -> String {
    match segment.tag {
        StatusTag::Failed => segment.text.red().to_string(),
        StatusTag::Due => segment.text.clone(),
        StatusTag::New => segment.text.blue().to_string(),
    }
}
