//! SQLite deck store: reads due-deck counts from a collection database.
//!
//! The collection owns a `deck_status` table maintained by the scheduler; this
//! store only reads it. The open-deck handle is a row in `open_deck` so that
//! separate processes see the same handle state.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::core::errors::{DdwError, Result};
use crate::deck::status::DeckStatus;
use crate::deck::store::DeckStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deck_status (
    name         TEXT PRIMARY KEY NOT NULL,
    failed_count INTEGER NOT NULL DEFAULT 0,
    due_count    INTEGER NOT NULL DEFAULT 0,
    new_count    INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS open_deck (
    slot INTEGER PRIMARY KEY CHECK (slot = 1),
    name TEXT NOT NULL
);
";

/// Deck store over a SQLite collection file.
pub struct SqliteDeckStore {
    path: PathBuf,
}

impl SqliteDeckStore {
    /// Use an existing collection database. Nothing is opened until needed.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create (or upgrade) a collection database with the expected schema.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DdwError::io(parent, source))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace one deck's counts.
    pub fn upsert_deck(&self, deck: &DeckStatus) -> Result<()> {
        let conn = self.open_read_write()?;
        conn.execute(
            "INSERT INTO deck_status (name, failed_count, due_count, new_count)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                failed_count = excluded.failed_count,
                due_count = excluded.due_count,
                new_count = excluded.new_count",
            params![deck.name, deck.failed_count, deck.due_count, deck.new_count],
        )?;
        Ok(())
    }

    fn open_read_write(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(DdwError::StoreUnavailable {
                details: format!("collection {} does not exist", self.path.display()),
            });
        }
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

impl DeckStore for SqliteDeckStore {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn fetch_due_decks(&mut self) -> Result<Vec<DeckStatus>> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut stmt = conn.prepare(
            "SELECT name, failed_count, due_count, new_count
             FROM deck_status
             ORDER BY due_count DESC, rowid ASC",
        )?;
        let decks = stmt
            .query_map([], |row| {
                Ok(DeckStatus {
                    name: row.get(0)?,
                    failed_count: row.get(1)?,
                    due_count: row.get(2)?,
                    new_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decks)
    }

    fn current_deck(&self) -> Option<String> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .ok()?;
        conn.query_row("SELECT name FROM open_deck WHERE slot = 1", [], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .ok()
        .flatten()
    }

    fn close_current_deck(&mut self) -> Result<()> {
        let conn = self.open_read_write()?;
        conn.execute("DELETE FROM open_deck WHERE slot = 1", [])
            .map_err(|err| DdwError::deck_handle("close", "", err.to_string()))?;
        Ok(())
    }

    fn reopen_deck(&mut self, identity: &str) -> Result<()> {
        let conn = self.open_read_write()?;
        conn.execute(
            "INSERT INTO open_deck (slot, name) VALUES (1, ?1)
             ON CONFLICT(slot) DO UPDATE SET name = excluded.name",
            params![identity],
        )
        .map_err(|err| DdwError::deck_handle("reopen", identity, err.to_string()))?;
        Ok(())
    }
}
