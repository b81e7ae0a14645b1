//! Deck store seam: the trait the refresh path fetches through, the scoped
//! deck-handle guard, and a JSON-file backed store.
//!
//! The store owns a single "currently open deck" resource. Fetching must never
//! overlap with an open deck, so every fetch runs inside a [`DeckHandleGuard`]
//! which closes the open deck on acquisition and reopens it when released or
//! dropped.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::errors::{DdwError, Result};
use crate::deck::status::DeckStatus;

/// File inside a collection directory that lists deck statuses.
pub const DECKS_FILE: &str = "decks.json";
/// Marker file naming the deck currently held open by the host.
pub const OPEN_DECK_MARKER: &str = "open_deck";

/// External deck store consumed by the refresh controller.
pub trait DeckStore {
    /// Whether the backing medium can be reached at all.
    fn is_available(&self) -> bool;

    /// Ranked due-deck statuses. The returned order is displayed as-is.
    fn fetch_due_decks(&mut self) -> Result<Vec<DeckStatus>>;

    /// Identity of the deck currently held open, if any.
    fn current_deck(&self) -> Option<String>;

    /// Close the currently open deck.
    fn close_current_deck(&mut self) -> Result<()>;

    /// Reopen a deck previously closed for a fetch.
    fn reopen_deck(&mut self, identity: &str) -> Result<()>;
}

impl<S: DeckStore + ?Sized> DeckStore for Box<S> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn fetch_due_decks(&mut self) -> Result<Vec<DeckStatus>> {
        (**self).fetch_due_decks()
    }

    fn current_deck(&self) -> Option<String> {
        (**self).current_deck()
    }

    fn close_current_deck(&mut self) -> Result<()> {
        (**self).close_current_deck()
    }

    fn reopen_deck(&mut self, identity: &str) -> Result<()> {
        (**self).reopen_deck(identity)
    }
}

// ──────────────────── deck handle guard ────────────────────

/// Exclusive access to a store with its open deck suspended.
///
/// [`release`](Self::release) reopens the suspended deck and reports failure.
/// If the guard is dropped without being released (early return, unwinding),
/// the deck is reopened best-effort and failures go to stderr.
pub struct DeckHandleGuard<'a, S: DeckStore + ?Sized> {
    store: &'a mut S,
    suspended: Option<String>,
}

impl<'a, S: DeckStore + ?Sized> DeckHandleGuard<'a, S> {
    /// Close the store's open deck (if any) and take exclusive access.
    pub fn acquire(store: &'a mut S) -> Result<Self> {
        let suspended = store.current_deck();
        if suspended.is_some() {
            store.close_current_deck()?;
        }
        Ok(Self { store, suspended })
    }

    /// The deck that will be reopened on release.
    #[must_use]
    pub fn suspended_deck(&self) -> Option<&str> {
        self.suspended.as_deref()
    }

    /// The guarded store. No deck is open while this borrow is alive.
    pub fn store(&mut self) -> &mut S {
        &mut *self.store
    }

    /// Reopen the suspended deck, propagating any failure.
    pub fn release(mut self) -> Result<()> {
        match self.suspended.take() {
            Some(deck) => self.store.reopen_deck(&deck),
            None => Ok(()),
        }
    }
}

impl<S: DeckStore + ?Sized> Drop for DeckHandleGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(deck) = self.suspended.take()
            && let Err(err) = self.store.reopen_deck(&deck)
        {
            eprintln!("[DDW-STORE] failed to reopen deck {deck:?} after aborted fetch: {err}");
        }
    }
}

// ──────────────────── in-memory store ────────────────────

/// Store held entirely in memory, for hosts that compute due counts
/// themselves and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeckStore {
    decks: Vec<DeckStatus>,
    unavailable: bool,
    open: Option<String>,
    fetches: u64,
    fail_fetch: bool,
    fail_reopen: bool,
}

impl MemoryDeckStore {
    /// Store returning `decks` in the given order.
    #[must_use]
    pub fn new(decks: Vec<DeckStatus>) -> Self {
        Self {
            decks,
            ..Self::default()
        }
    }

    /// Replace the decks returned by subsequent fetches.
    pub fn set_decks(&mut self, decks: Vec<DeckStatus>) {
        self.decks = decks;
    }

    /// Simulate the backing medium disappearing or coming back.
    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    /// Mark a deck as held open by the host.
    pub fn open_deck(&mut self, identity: impl Into<String>) {
        self.open = Some(identity.into());
    }

    /// Make every fetch fail until reset.
    pub fn set_fail_fetch(&mut self, fail: bool) {
        self.fail_fetch = fail;
    }

    /// Make every reopen fail until reset.
    pub fn set_fail_reopen(&mut self, fail: bool) {
        self.fail_reopen = fail;
    }

    /// Number of fetches served so far.
    #[must_use]
    pub const fn fetches(&self) -> u64 {
        self.fetches
    }
}

impl DeckStore for MemoryDeckStore {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn fetch_due_decks(&mut self) -> Result<Vec<DeckStatus>> {
        if let Some(open) = &self.open {
            return Err(DdwError::deck_handle(
                "fetch",
                open.clone(),
                "deck still open while fetching due decks",
            ));
        }
        self.fetches += 1;
        if self.fail_fetch {
            return Err(DdwError::Fetch {
                details: "injected fetch failure".to_string(),
            });
        }
        Ok(self.decks.clone())
    }

    fn current_deck(&self) -> Option<String> {
        self.open.clone()
    }

    fn close_current_deck(&mut self) -> Result<()> {
        self.open = None;
        Ok(())
    }

    fn reopen_deck(&mut self, identity: &str) -> Result<()> {
        if self.fail_reopen {
            return Err(DdwError::deck_handle("reopen", identity, "injected reopen failure"));
        }
        self.open = Some(identity.to_string());
        Ok(())
    }
}

// ──────────────────── JSON collection store ────────────────────

/// Deck store backed by a collection directory:
///
/// ```text
/// <collection_dir>/decks.json   # [{"name": ..., "failed_count": .., "due_count": .., "new_count": ..}]
/// <collection_dir>/open_deck    # name of the deck the host has open (optional)
/// ```
///
/// A missing directory means the storage medium is unavailable. Decks are
/// ranked by due count, descending, ties keeping file order.
#[derive(Debug, Clone)]
pub struct JsonDeckStore {
    root: PathBuf,
}

impl JsonDeckStore {
    /// Store rooted at a collection directory (which need not exist yet).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Collection directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn decks_path(&self) -> PathBuf {
        self.root.join(DECKS_FILE)
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(OPEN_DECK_MARKER)
    }

    /// Replace the collection's deck list, creating the directory if needed.
    pub fn write_decks(&self, decks: &[DeckStatus]) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| DdwError::io(&self.root, source))?;
        let json = serde_json::to_string_pretty(decks)?;
        let path = self.decks_path();
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(|source| DdwError::io(&tmp, source))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|source| DdwError::io(&tmp, source))?;
        fs::rename(&tmp, &path).map_err(|source| DdwError::io(&path, source))
    }
}

impl DeckStore for JsonDeckStore {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn fetch_due_decks(&mut self) -> Result<Vec<DeckStatus>> {
        if let Some(open) = self.current_deck() {
            return Err(DdwError::deck_handle(
                "fetch",
                open,
                "deck still open while fetching due decks",
            ));
        }

        let path = self.decks_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(DdwError::io(&path, source)),
        };
        let mut decks: Vec<DeckStatus> = serde_json::from_str(&raw).map_err(|err| DdwError::Fetch {
            details: format!("{}: {err}", path.display()),
        })?;
        decks.sort_by(|a, b| b.due_count.cmp(&a.due_count));
        Ok(decks)
    }

    fn current_deck(&self) -> Option<String> {
        fs::read_to_string(self.marker_path())
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn close_current_deck(&mut self) -> Result<()> {
        let marker = self.marker_path();
        match fs::remove_file(&marker) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DdwError::deck_handle(
                "close",
                self.current_deck().unwrap_or_default(),
                err.to_string(),
            )),
        }
    }

    fn reopen_deck(&mut self, identity: &str) -> Result<()> {
        fs::write(self.marker_path(), identity)
            .map_err(|err| DdwError::deck_handle("reopen", identity, err.to_string()))
    }
}
