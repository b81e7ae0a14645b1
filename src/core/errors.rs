//! DDW-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DdwError>;

/// Top-level error type for the due-deck widget.
#[derive(Debug, Error)]
pub enum DdwError {
    #[error("[DDW-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DDW-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DDW-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DDW-2001] deck store unavailable: {details}")]
    StoreUnavailable { details: String },

    #[error("[DDW-2002] due-deck fetch failed: {details}")]
    Fetch { details: String },

    #[error("[DDW-2003] deck handle {operation} failed for {deck}: {details}")]
    DeckHandle {
        operation: &'static str,
        deck: String,
        details: String,
    },

    #[error("[DDW-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DDW-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[DDW-3001] unknown widget request: {raw:?}")]
    UnknownRequest { raw: String },

    #[error("[DDW-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DDW-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DDW-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DdwError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DDW-1001",
            Self::MissingConfig { .. } => "DDW-1002",
            Self::ConfigParse { .. } => "DDW-1003",
            Self::StoreUnavailable { .. } => "DDW-2001",
            Self::Fetch { .. } => "DDW-2002",
            Self::DeckHandle { .. } => "DDW-2003",
            Self::Serialization { .. } => "DDW-2101",
            Self::Sql { .. } => "DDW-2102",
            Self::UnknownRequest { .. } => "DDW-3001",
            Self::Io { .. } => "DDW-3002",
            Self::ChannelClosed { .. } => "DDW-3003",
            Self::Runtime { .. } => "DDW-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Deck handle failures are never retryable: they mean the store was left
    /// with its open deck in an unknown state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::StoreUnavailable { .. }
                | Self::Fetch { .. }
                | Self::Sql { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for deck handle failures.
    #[must_use]
    pub fn deck_handle(
        operation: &'static str,
        deck: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::DeckHandle {
            operation,
            deck: deck.into(),
            details: details.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DdwError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for DdwError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DdwError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
