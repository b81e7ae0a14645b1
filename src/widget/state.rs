//! Cursor state persisted between one-shot invocations.
//!
//! Only the cursor index survives a process; the snapshot is always fetched
//! fresh.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DdwError, Result};
use crate::widget::cursor::CursorTracker;

/// On-disk widget state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedWidgetState {
    /// Raw cursor index at the end of the last cycle.
    pub cursor_index: i64,
}

impl PersistedWidgetState {
    /// Load state from `path`; a missing file yields the default state.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| DdwError::Serialization {
                context: "widget state",
                details: format!("{}: {err}", path.display()),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(DdwError::io(path, source)),
        }
    }

    /// Write state atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| DdwError::io(parent, source))?;
        }
        let json = serde_json::to_string(self)?;
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(|source| DdwError::io(&tmp, source))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|source| DdwError::io(&tmp, source))?;
        fs::rename(&tmp, path).map_err(|source| DdwError::io(path, source))
    }

    /// Cursor restored from this state.
    #[must_use]
    pub const fn cursor(&self) -> CursorTracker {
        CursorTracker::with_index(self.cursor_index)
    }

    /// State capturing `cursor`.
    #[must_use]
    pub const fn from_cursor(cursor: CursorTracker) -> Self {
        Self {
            cursor_index: cursor.index(),
        }
    }
}
