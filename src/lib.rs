#![forbid(unsafe_code)]

//! Due Deck Widget (ddw): an at-a-glance view of which study decks have
//! cards due, with deck navigation and a due-cards alert.
//!
//! The widget core is host-agnostic:
//! 1. **Deck store**: a ranked snapshot of due decks fetched on demand
//! 2. **Widget session**: cursor, refresh controller, view model and trigger
//! 3. **Update service**: a worker thread that serializes requests
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use due_deck_widget::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use due_deck_widget::core::config::Config;
//! use due_deck_widget::widget::session::{CycleReport, WidgetSession};
//! ```

pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
pub mod core;
pub mod daemon;
pub mod deck;
pub mod logger;
pub mod widget;
