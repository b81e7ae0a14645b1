//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DdwError, Result};
use crate::daemon::notifications::NotificationConfig;

/// Full DDW configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub widget: WidgetConfig,
    pub store: StoreConfig,
    pub notifications: NotificationConfig,
    pub paths: PathsConfig,
}

/// Update-service behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WidgetConfig {
    /// Background refresh period in seconds; 0 disables periodic refresh.
    pub refresh_interval_secs: u64,
    /// Pending requests held before submitters block.
    pub queue_capacity: usize,
}

/// Which deck store backs the widget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Json,
    Sqlite,
}

/// Deck store location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Collection directory for the JSON backend.
    pub collection_dir: PathBuf,
    /// Collection database for the SQLite backend.
    pub sqlite_path: PathBuf,
}

/// Filesystem paths used by ddw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Cursor state persisted between one-shot invocations.
    pub state_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30 * 60,
            queue_capacity: 16,
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[DDW-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

pub(crate) fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("ddw")
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            backend: StoreBackend::Json,
            collection_dir: data.join("collection"),
            sqlite_path: data.join("collection.sqlite3"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let cfg = home_dir().join(".config").join("ddw").join("config.toml");
        let data = data_dir();
        Self {
            config_file: cfg,
            state_file: data.join("state.json"),
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DdwError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(DdwError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Minimum due total that raises the alert.
    #[must_use]
    pub const fn minimum_due_for_notification(&self) -> u64 {
        self.notifications.minimum_due_for_notification
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // widget
        if let Some(raw) = lookup("DDW_WIDGET_REFRESH_INTERVAL_SECS") {
            self.widget.refresh_interval_secs =
                parse_env("DDW_WIDGET_REFRESH_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DDW_WIDGET_QUEUE_CAPACITY") {
            self.widget.queue_capacity = parse_env("DDW_WIDGET_QUEUE_CAPACITY", &raw)?;
        }

        // store
        if let Some(raw) = lookup("DDW_STORE_BACKEND") {
            self.store.backend = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => StoreBackend::Json,
                "sqlite" => StoreBackend::Sqlite,
                other => {
                    return Err(DdwError::ConfigParse {
                        context: "env",
                        details: format!("DDW_STORE_BACKEND={other:?}: expected json or sqlite"),
                    });
                }
            };
        }
        if let Some(raw) = lookup("DDW_STORE_COLLECTION_DIR") {
            self.store.collection_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("DDW_STORE_SQLITE_PATH") {
            self.store.sqlite_path = PathBuf::from(raw);
        }

        // notifications
        if let Some(raw) = lookup("DDW_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_env("DDW_NOTIFICATIONS_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("DDW_MINIMUM_DUE_FOR_NOTIFICATION") {
            self.notifications.minimum_due_for_notification =
                parse_env("DDW_MINIMUM_DUE_FOR_NOTIFICATION", &raw)?;
        }
        if let Some(raw) = lookup("DDW_NOTIFY_VIBRATE") {
            self.notifications.vibrate = parse_env("DDW_NOTIFY_VIBRATE", &raw)?;
        }
        if let Some(raw) = lookup("DDW_NOTIFY_BLINK") {
            self.notifications.blink = parse_env("DDW_NOTIFY_BLINK", &raw)?;
        }

        // paths
        if let Some(raw) = lookup("DDW_STATE_FILE") {
            self.paths.state_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("DDW_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Expand a leading `~/` in every configured path.
    fn normalize_paths(&mut self) {
        let home = home_dir();
        for path in [
            &mut self.store.collection_dir,
            &mut self.store.sqlite_path,
            &mut self.paths.state_file,
            &mut self.paths.jsonl_log,
            &mut self.notifications.file.path,
        ] {
            if let Ok(rest) = path.strip_prefix("~") {
                *path = home.join(rest);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.widget.queue_capacity == 0 {
            return Err(DdwError::InvalidConfig {
                details: "widget.queue_capacity must be >= 1".to_string(),
            });
        }

        match self.store.backend {
            StoreBackend::Json if self.store.collection_dir.as_os_str().is_empty() => {
                return Err(DdwError::InvalidConfig {
                    details: "store.collection_dir must be set for the json backend".to_string(),
                });
            }
            StoreBackend::Sqlite if self.store.sqlite_path.as_os_str().is_empty() => {
                return Err(DdwError::InvalidConfig {
                    details: "store.sqlite_path must be set for the sqlite backend".to_string(),
                });
            }
            StoreBackend::Sqlite if cfg!(not(feature = "sqlite")) => {
                return Err(DdwError::InvalidConfig {
                    details: "store.backend = \"sqlite\" requires the sqlite feature".to_string(),
                });
            }
            _ => {}
        }

        for channel in &self.notifications.channels {
            if !crate::daemon::notifications::KNOWN_CHANNELS.contains(&channel.as_str()) {
                return Err(DdwError::InvalidConfig {
                    details: format!("notifications.channels: unknown channel {channel:?}"),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| DdwError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
