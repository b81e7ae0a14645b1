//! Widget requests and the action identifiers handed to renderers.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::DdwError;

/// A request dispatched to the widget, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetRequest {
    /// First render after the host registers the widget.
    InitialLoad,
    /// Recompute the due census from the store.
    Refresh,
    /// Show the next due deck.
    Next,
    /// Show the previous due deck.
    Previous,
    /// Placeholder request with no effect.
    Ignore,
    /// Open the deck under the cursor.
    Open,
}

impl WidgetRequest {
    pub const ALL: [Self; 6] = [
        Self::InitialLoad,
        Self::Refresh,
        Self::Next,
        Self::Previous,
        Self::Ignore,
        Self::Open,
    ];

    /// Short lowercase name used on the command line and in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitialLoad => "initial_load",
            Self::Refresh => "refresh",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Ignore => "ignore",
            Self::Open => "open",
        }
    }

    /// Whether the request leads to a render.
    #[must_use]
    pub const fn renders(self) -> bool {
        !matches!(self, Self::Ignore | Self::Open)
    }

    /// Whether the request always pulls a fresh snapshot.
    #[must_use]
    pub const fn forces_fetch(self) -> bool {
        matches!(self, Self::InitialLoad | Self::Refresh)
    }
}

impl fmt::Display for WidgetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WidgetRequest {
    type Err = DdwError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some(action) = WidgetAction::from_id(trimmed) {
            return action.request().ok_or_else(|| DdwError::UnknownRequest {
                raw: trimmed.to_string(),
            });
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "initial_load" | "initial-load" | "init" | "load" => Ok(Self::InitialLoad),
            "refresh" | "update" => Ok(Self::Refresh),
            "next" => Ok(Self::Next),
            "previous" | "prev" => Ok(Self::Previous),
            "ignore" | "noop" | "no-op" => Ok(Self::Ignore),
            "open" => Ok(Self::Open),
            _ => Err(DdwError::UnknownRequest {
                raw: trimmed.to_string(),
            }),
        }
    }
}

/// Identifier a renderer attaches to an interactive element.
///
/// Activating the element re-delivers the matching [`WidgetRequest`], except
/// for [`WidgetAction::OpenMain`], which the host handles by launching the
/// main application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetAction {
    #[serde(rename = "ddw.widget.NEXT")]
    Next,
    #[serde(rename = "ddw.widget.PREV")]
    Previous,
    #[serde(rename = "ddw.widget.IGNORE")]
    Ignore,
    #[serde(rename = "ddw.widget.OPEN")]
    Open,
    #[serde(rename = "ddw.widget.OPEN_MAIN")]
    OpenMain,
}

impl WidgetAction {
    /// Stable identifier string.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Next => "ddw.widget.NEXT",
            Self::Previous => "ddw.widget.PREV",
            Self::Ignore => "ddw.widget.IGNORE",
            Self::Open => "ddw.widget.OPEN",
            Self::OpenMain => "ddw.widget.OPEN_MAIN",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        [
            Self::Next,
            Self::Previous,
            Self::Ignore,
            Self::Open,
            Self::OpenMain,
        ]
        .into_iter()
        .find(|action| action.id() == id)
    }

    /// The request re-delivered when the element is activated.
    #[must_use]
    pub const fn request(self) -> Option<WidgetRequest> {
        match self {
            Self::Next => Some(WidgetRequest::Next),
            Self::Previous => Some(WidgetRequest::Previous),
            Self::Ignore => Some(WidgetRequest::Ignore),
            Self::Open => Some(WidgetRequest::Open),
            Self::OpenMain => None,
        }
    }
}

impl fmt::Display for WidgetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
