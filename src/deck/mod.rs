//! Deck-side types: the due-deck snapshot and the deck store seam.

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod status;
pub mod store;

use crate::core::config::{StoreBackend, StoreConfig};
use crate::core::errors::Result;
use crate::deck::store::{DeckStore, JsonDeckStore};

/// Boxed store shared across the CLI and the update service.
pub type BoxedDeckStore = Box<dyn DeckStore + Send>;

/// Open the store selected by `store.backend`.
pub fn open_configured(config: &StoreConfig) -> Result<BoxedDeckStore> {
    match config.backend {
        StoreBackend::Json => Ok(Box::new(JsonDeckStore::new(&config.collection_dir))),
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => Ok(Box::new(sqlite::SqliteDeckStore::new(&config.sqlite_path))),
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => Err(crate::core::errors::DdwError::InvalidConfig {
            details: "store.backend = \"sqlite\" requires the sqlite feature".to_string(),
        }),
    }
}
