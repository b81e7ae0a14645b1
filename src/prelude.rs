//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use due_deck_widget::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DdwError, Result};

// Deck
pub use crate::deck::status::{DeckStatus, Snapshot};
pub use crate::deck::store::{DeckStore, JsonDeckStore, MemoryDeckStore};

// Widget
pub use crate::widget::controller::RefreshController;
pub use crate::widget::cursor::CursorTracker;
pub use crate::widget::request::{WidgetAction, WidgetRequest};
pub use crate::widget::session::{CycleReport, WidgetSession};
pub use crate::widget::trigger::TriggerSignal;
pub use crate::widget::view::{Renderer, ViewModel};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::loop_main::WidgetService;
pub use crate::daemon::notifications::NotificationManager;
