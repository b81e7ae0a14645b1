//! Multi-channel notification system: desktop, file, and journal channels.
//!
//! Turns trigger signals into due alerts and dispatches structured events
//! through the configured channels with min-level filtering. Each channel is
//! fire-and-forget; failures are logged but never block the widget loop.
//!
//! Alerts are keyed by slot: a new alert in an occupied slot replaces the old
//! one instead of stacking.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
#[cfg(target_os = "linux")]
use std::process::Command;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::widget::trigger::{DEFAULT_MINIMUM_DUE, TriggerSignal};
use crate::widget::view::pluralize;

/// Channel names accepted in `notifications.channels`.
pub const KNOWN_CHANNELS: [&str; 3] = ["desktop", "file", "journal"];

/// Title shown on every due alert.
pub const ALERT_TITLE: &str = "Cards due";

// ──────────────────── notification level ────────────────────

/// Severity level for notification filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ──────────────────── alerts & events ────────────────────

/// A raised due-cards alert, as the host notifier would display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueAlert {
    pub slot: u32,
    pub due_count: u64,
    pub title: String,
    pub ticker: String,
    pub vibrate: bool,
    pub blink: bool,
}

impl DueAlert {
    #[must_use]
    pub fn from_signal(signal: TriggerSignal, vibrate: bool, blink: bool) -> Self {
        Self {
            slot: signal.slot,
            due_count: signal.due_count,
            title: ALERT_TITLE.to_string(),
            ticker: format!("{} due", pluralize(signal.due_count, "card", "cards")),
            vibrate,
            blink,
        }
    }
}

/// A structured notification event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    DueAlert(DueAlert),
    ServiceStarted {
        version: String,
        refresh_interval_secs: u64,
    },
    ServiceStopped {
        reason: String,
        uptime_secs: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

impl NotificationEvent {
    /// The severity level of this event (for min-level filtering).
    #[must_use]
    pub const fn level(&self) -> NotificationLevel {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => NotificationLevel::Info,
            Self::DueAlert(_) => NotificationLevel::Warning,
            Self::Error { .. } => NotificationLevel::Error,
        }
    }

    /// Short human-readable summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::DueAlert(alert) => format!("{}: {}", alert.title, alert.ticker),
            Self::ServiceStarted {
                version,
                refresh_interval_secs,
            } => {
                if *refresh_interval_secs == 0 {
                    format!("ddw v{version} started, periodic refresh off")
                } else {
                    format!("ddw v{version} started, refreshing every {refresh_interval_secs}s")
                }
            }
            Self::ServiceStopped {
                reason,
                uptime_secs,
            } => {
                let hours = uptime_secs / 3600;
                let minutes = (uptime_secs % 3600) / 60;
                format!("ddw stopped ({reason}) after {hours}h {minutes}m")
            }
            Self::Error { code, message } => format!("[{code}] {message}"),
        }
    }
}

// ──────────────────── configuration ────────────────────

/// Top-level notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Master switch for all notifications.
    pub enabled: bool,
    /// Which channel names to activate.
    pub channels: Vec<String>,
    /// Due total at or above which an alert is raised.
    pub minimum_due_for_notification: u64,
    /// Ask the host to vibrate when alerting.
    pub vibrate: bool,
    /// Ask the host to blink its indicator light when alerting.
    pub blink: bool,
    pub desktop: DesktopConfig,
    pub file: FileConfig,
    pub journal: JournalConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec!["journal".to_string(), "file".to_string()],
            minimum_due_for_notification: DEFAULT_MINIMUM_DUE,
            vibrate: false,
            blink: false,
            desktop: DesktopConfig::default(),
            file: FileConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

/// Desktop notification settings (notify-send on Linux).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DesktopConfig {
    pub enabled: bool,
    pub min_level: NotificationLevel,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_level: NotificationLevel::Warning,
        }
    }
}

/// File notification settings (append-only JSONL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: crate::core::config::data_dir().join("notifications.jsonl"),
        }
    }
}

/// Journal notification settings (systemd journal via stderr).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalConfig {
    pub min_level: NotificationLevel,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            min_level: NotificationLevel::Info,
        }
    }
}

// ──────────────────── JSONL record ────────────────────

/// A single notification record written to the JSONL file.
#[derive(Debug, Serialize)]
struct NotificationRecord<'a> {
    ts: String,
    level: NotificationLevel,
    summary: String,
    #[serde(flatten)]
    event: &'a NotificationEvent,
}

// ──────────────────── notification channels ────────────────────

/// A notification channel that can dispatch events.
trait Channel: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, event: &NotificationEvent);
}

// ──── Desktop (notify-send) ────

struct DesktopChannel {
    min_level: NotificationLevel,
}

impl DesktopChannel {
    const fn new(config: &DesktopConfig) -> Self {
        Self {
            min_level: config.min_level,
        }
    }

    /// notify-send arguments; alerts carry a per-slot synchronous hint so the
    /// notification daemon replaces the previous bubble.
    fn arguments(event: &NotificationEvent) -> Vec<String> {
        let mut args = vec!["--app-name=ddw".to_string()];
        match event {
            NotificationEvent::DueAlert(alert) => {
                let urgency = if alert.blink { "critical" } else { "normal" };
                args.push(format!("--urgency={urgency}"));
                args.push(format!(
                    "--hint=string:x-canonical-private-synchronous:ddw-slot-{}",
                    alert.slot
                ));
                if alert.vibrate {
                    args.push("--hint=string:sound-name:message-new-instant".to_string());
                }
                args.push(alert.title.clone());
                args.push(alert.ticker.clone());
            }
            other => {
                let urgency = if matches!(other, NotificationEvent::Error { .. }) {
                    "critical"
                } else {
                    "low"
                };
                args.push(format!("--urgency={urgency}"));
                args.push("Due Deck Widget".to_string());
                args.push(other.summary());
            }
        }
        args
    }
}

impl Channel for DesktopChannel {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn send(&self, event: &NotificationEvent) {
        if event.level() < self.min_level {
            return;
        }

        let args = Self::arguments(event);

        #[cfg(target_os = "linux")]
        {
            if let Err(error) = Command::new("notify-send").args(&args).spawn() {
                eprintln!("[DDW-NOTIFY] desktop channel unavailable: {error}");
            }
        }

        // On other platforms, desktop notifications are a no-op.
        #[cfg(not(target_os = "linux"))]
        {
            let _ = args;
        }
    }
}

// ──── File (append-only JSONL) ────

struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    fn new(config: &FileConfig) -> Self {
        Self {
            path: config.path.clone(),
        }
    }
}

impl Channel for FileChannel {
    fn name(&self) -> &'static str {
        "file"
    }

    fn send(&self, event: &NotificationEvent) {
        let record = NotificationRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level: event.level(),
            summary: event.summary(),
            event,
        };

        let Ok(json) = serde_json::to_string(&record) else {
            return;
        };

        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let file = {
            let mut opts = OpenOptions::new();
            opts.create(true).append(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o600);
            }
            opts.open(&self.path)
        };

        match file {
            Ok(mut f) => {
                let _ = writeln!(f, "{json}");
            }
            Err(error) => {
                eprintln!(
                    "[DDW-NOTIFY] file channel cannot open {}: {error}",
                    self.path.display()
                );
            }
        }
    }
}

// ──── Journal (systemd structured stderr) ────

struct JournalChannel {
    min_level: NotificationLevel,
}

impl JournalChannel {
    const fn new(config: &JournalConfig) -> Self {
        Self {
            min_level: config.min_level,
        }
    }
}

impl Channel for JournalChannel {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn send(&self, event: &NotificationEvent) {
        if event.level() < self.min_level {
            return;
        }

        let priority = match event.level() {
            NotificationLevel::Error => "ERR",
            NotificationLevel::Warning => "NOTICE",
            NotificationLevel::Info => "INFO",
        };

        eprintln!("[DDW-NOTIFY] [{priority}] {}", event.summary());
    }
}

// ──────────────────── notification manager ────────────────────

/// Coordinates alert slots and dispatches events to all enabled channels.
pub struct NotificationManager {
    channels: Vec<Box<dyn Channel>>,
    enabled: bool,
    vibrate: bool,
    blink: bool,
    active: HashMap<u32, DueAlert>,
    last_send: Option<Instant>,
}

impl NotificationManager {
    /// Build a manager from configuration.
    #[must_use]
    pub fn from_config(config: &NotificationConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut channels: Vec<Box<dyn Channel>> = Vec::new();

        for channel_name in &config.channels {
            match channel_name.as_str() {
                "desktop" if config.desktop.enabled => {
                    channels.push(Box::new(DesktopChannel::new(&config.desktop)));
                }
                "file" => {
                    channels.push(Box::new(FileChannel::new(&config.file)));
                }
                "journal" => {
                    channels.push(Box::new(JournalChannel::new(&config.journal)));
                }
                _ => {}
            }
        }

        Self {
            channels,
            enabled: true,
            vibrate: config.vibrate,
            blink: config.blink,
            active: HashMap::new(),
            last_send: None,
        }
    }

    /// Create a disabled (no-op) manager.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            channels: Vec::new(),
            enabled: false,
            vibrate: false,
            blink: false,
            active: HashMap::new(),
            last_send: None,
        }
    }

    /// Dispatch a notification event to all enabled channels.
    pub fn notify(&mut self, event: &NotificationEvent) {
        if !self.enabled {
            return;
        }

        self.last_send = Some(Instant::now());

        for channel in &self.channels {
            channel.send(event);
        }
    }

    /// Raise the due alert for `signal`, replacing whatever occupied its slot.
    ///
    /// Returns the alert that is now active, or `None` when disabled.
    pub fn notify_due(&mut self, signal: TriggerSignal) -> Option<DueAlert> {
        if !self.enabled {
            return None;
        }

        let alert = DueAlert::from_signal(signal, self.vibrate, self.blink);
        self.active.insert(alert.slot, alert.clone());
        self.notify(&NotificationEvent::DueAlert(alert.clone()));
        Some(alert)
    }

    /// Alert currently shown in `slot`.
    #[must_use]
    pub fn active_alert(&self, slot: u32) -> Option<&DueAlert> {
        self.active.get(&slot)
    }

    /// Number of occupied alert slots.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of active channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Whether the manager is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// List the names of active channels.
    #[must_use]
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// When an event was last dispatched.
    #[must_use]
    pub const fn last_send(&self) -> Option<Instant> {
        self.last_send
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::trigger::{ALERT_SLOT, evaluate};

    fn signal(due_count: u64) -> TriggerSignal {
        TriggerSignal {
            due_count,
            slot: ALERT_SLOT,
        }
    }

    fn file_only(path: PathBuf) -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            channels: vec!["file".to_string()],
            file: FileConfig { path },
            ..Default::default()
        }
    }

    #[test]
    fn notification_level_ordering() {
        assert!(NotificationLevel::Info < NotificationLevel::Warning);
        assert!(NotificationLevel::Warning < NotificationLevel::Error);
    }

    #[test]
    fn due_alert_text_is_pluralized() {
        let alert = DueAlert::from_signal(signal(25), false, false);
        assert_eq!(alert.ticker, "25 cards due");
        assert_eq!(alert.title, ALERT_TITLE);
        assert_eq!(DueAlert::from_signal(signal(1), false, false).ticker, "1 card due");
    }

    #[test]
    fn event_summary_service_started() {
        let event = NotificationEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            refresh_interval_secs: 1800,
        };
        assert_eq!(event.summary(), "ddw v0.1.0 started, refreshing every 1800s");
        assert_eq!(event.level(), NotificationLevel::Info);
    }

    #[test]
    fn event_summary_service_stopped() {
        let event = NotificationEvent::ServiceStopped {
            reason: "signal".to_string(),
            uptime_secs: 3 * 3600 + 120,
        };
        assert_eq!(event.summary(), "ddw stopped (signal) after 3h 2m");
    }

    #[test]
    fn default_config_has_journal_and_file() {
        let config = NotificationConfig::default();
        assert!(config.enabled);
        assert_eq!(config.channels, vec!["journal", "file"]);
        assert_eq!(config.minimum_due_for_notification, 25);
        assert!(!config.desktop.enabled);
    }

    #[test]
    fn manager_from_default_config() {
        let manager = NotificationManager::from_config(&NotificationConfig::default());
        assert!(manager.is_enabled());
        assert_eq!(manager.channel_names(), vec!["journal", "file"]);
    }

    #[test]
    fn manager_skips_disabled_desktop() {
        let config = NotificationConfig {
            channels: vec!["desktop".to_string(), "journal".to_string()],
            ..Default::default()
        };
        let manager = NotificationManager::from_config(&config);
        assert_eq!(manager.channel_names(), vec!["journal"]);
    }

    #[test]
    fn desktop_alert_carries_slot_replace_hint() {
        let alert = DueAlert::from_signal(signal(30), true, true);
        let args = DesktopChannel::arguments(&NotificationEvent::DueAlert(alert));
        assert!(args.iter().any(|a| a.ends_with("ddw-slot-1")));
        assert!(args.iter().any(|a| a.contains("sound-name")));
        assert!(args.iter().any(|a| a == "--urgency=critical"));
        assert_eq!(args.last().map(String::as_str), Some("30 cards due"));
    }

    #[test]
    fn file_channel_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notifications.jsonl");
        let channel = FileChannel { path: path.clone() };

        channel.send(&NotificationEvent::DueAlert(DueAlert::from_signal(
            signal(40),
            false,
            true,
        )));
        channel.send(&NotificationEvent::Error {
            code: "DDW-2002".to_string(),
            message: "boom".to_string(),
        });

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "due_alert");
        assert_eq!(first["due_count"], 40);
        assert_eq!(first["blink"], true);
        assert_eq!(first["level"], "warning");
        assert!(first.get("ts").is_some());
    }

    #[test]
    fn repeated_alerts_replace_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.jsonl");
        let mut manager = NotificationManager::from_config(&file_only(path.clone()));

        manager.notify_due(signal(30));
        manager.notify_due(signal(42));

        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.active_alert(ALERT_SLOT).unwrap().due_count, 42);
        assert!(manager.last_send().is_some());
        // Every raise is still delivered to the channels.
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn alert_flags_follow_config() {
        let config = NotificationConfig {
            channels: Vec::new(),
            vibrate: true,
            ..Default::default()
        };
        let mut manager = NotificationManager::from_config(&config);
        let alert = manager.notify_due(evaluate(25, 25).unwrap()).unwrap();
        assert!(alert.vibrate);
        assert!(!alert.blink);
    }

    #[test]
    fn manager_noop_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.jsonl");
        let config = NotificationConfig {
            enabled: false,
            ..file_only(path.clone())
        };
        let mut manager = NotificationManager::from_config(&config);
        assert!(!manager.is_enabled());
        assert!(manager.notify_due(signal(99)).is_none());
        assert!(manager.active_alert(ALERT_SLOT).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn notification_config_roundtrip_toml() {
        let config = NotificationConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: NotificationConfig = toml::from_str(&raw).unwrap();
        assert_eq!(config, parsed);
    }
}
