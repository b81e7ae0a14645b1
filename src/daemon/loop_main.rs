//! Widget update service: one worker thread owns the widget session and
//! serializes every request through a bounded crossbeam channel.
//!
//! Architecture:
//! - **Submitters** (CLI, signal loop, host integrations) block on `send` when the
//!   queue is full, so requests are queued rather than dropped or interleaved.
//! - **Worker thread** runs each request cycle to completion, including the store
//!   fetch, then renders, raises alerts and appends to the activity log.
//! - **Readers** observe the latest `(view, snapshot)` pair through the
//!   [`ViewBoard`], which is replaced atomically after every rendered cycle.
//!
//! An optional periodic tick injects `Refresh` requests between submissions.
//! Shutdown drops the sender and joins the worker.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, never, select, tick};
use parking_lot::RwLock;
use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::{DdwError, Result};
use crate::daemon::notifications::{NotificationEvent, NotificationManager};
use crate::daemon::signals::SignalHandler;
use crate::deck::status::{DeckStatus, Snapshot};
use crate::deck::store::DeckStore;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::widget::request::WidgetRequest;
use crate::widget::session::{CycleReport, WidgetSession};
use crate::widget::view::{Renderer, ViewModel};

/// How often the signal loop polls its flags.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ──────────────────── view board ────────────────────

/// The most recently rendered frame together with the snapshot it was built from.
#[derive(Debug, Clone)]
pub struct BoardState {
    pub view: ViewModel,
    pub snapshot: Arc<Snapshot>,
    pub cursor: i64,
    /// Number of cycles the worker had completed when this frame was published.
    pub cycle: u64,
}

/// Latest published frame and open request, readable from any thread.
#[derive(Debug, Default)]
pub struct ViewBoard {
    state: RwLock<Option<BoardState>>,
    last_open: RwLock<Option<DeckStatus>>,
}

impl ViewBoard {
    /// Latest frame, `None` until the first render.
    pub fn latest(&self) -> Option<BoardState> {
        self.state.read().clone()
    }

    /// Most recent deck the widget asked the host to open.
    pub fn last_open(&self) -> Option<DeckStatus> {
        self.last_open.read().clone()
    }

    fn publish(&self, state: BoardState) {
        *self.state.write() = Some(state);
    }

    fn record_open(&self, deck: DeckStatus) {
        *self.last_open.write() = Some(deck);
    }
}

// ──────────────────── service ────────────────────

/// Counters returned when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub cycles: u64,
    pub fetches: u64,
    pub renders: u64,
    pub alerts: u64,
    pub opens: u64,
    pub errors: u64,
}

enum ServiceMessage {
    Request(WidgetRequest),
    Reconfigure(Box<Config>),
}

/// Handle to a running widget worker.
pub struct WidgetService {
    sender: Option<Sender<ServiceMessage>>,
    join: Option<thread::JoinHandle<ServiceStats>>,
    board: Arc<ViewBoard>,
}

impl WidgetService {
    /// Spawn the worker thread for `store`.
    pub fn spawn<S>(
        store: S,
        config: &Config,
        renderer: Box<dyn Renderer>,
        activity_log: JsonlWriter,
    ) -> Result<Self>
    where
        S: DeckStore + Send + 'static,
    {
        let (sender, receiver) = bounded::<ServiceMessage>(config.widget.queue_capacity.max(1));
        let board = Arc::new(ViewBoard::default());
        let interval = (config.widget.refresh_interval_secs > 0)
            .then(|| Duration::from_secs(config.widget.refresh_interval_secs));

        let mut worker = Worker {
            session: WidgetSession::new(store, config.minimum_due_for_notification()),
            renderer,
            notifier: NotificationManager::from_config(&config.notifications),
            log: activity_log,
            board: Arc::clone(&board),
            stats: ServiceStats::default(),
            started: Instant::now(),
        };
        worker.announce_start(config);

        let join = thread::Builder::new()
            .name("ddw-worker".to_string())
            .spawn(move || worker.run(&receiver, interval))
            .map_err(|source| DdwError::Runtime {
                details: format!("failed to spawn widget worker thread: {source}"),
            })?;

        Ok(Self {
            sender: Some(sender),
            join: Some(join),
            board,
        })
    }

    /// Queue a request, blocking while the queue is full.
    pub fn submit(&self, request: WidgetRequest) -> Result<()> {
        self.send(ServiceMessage::Request(request))
    }

    /// Apply a reloaded configuration to the running worker.
    pub fn reconfigure(&self, config: Config) -> Result<()> {
        self.send(ServiceMessage::Reconfigure(Box::new(config)))
    }

    /// Shared view board.
    pub fn board(&self) -> Arc<ViewBoard> {
        Arc::clone(&self.board)
    }

    /// Drain queued requests, stop the worker and return its counters.
    pub fn shutdown(mut self) -> Result<ServiceStats> {
        self.stop()
    }

    fn send(&self, message: ServiceMessage) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or(DdwError::ChannelClosed {
                component: "widget-service",
            })?
            .send(message)
            .map_err(|_| DdwError::ChannelClosed {
                component: "widget-service",
            })
    }

    fn stop(&mut self) -> Result<ServiceStats> {
        drop(self.sender.take());
        match self.join.take() {
            Some(join) => join.join().map_err(|_| DdwError::Runtime {
                details: "widget worker thread panicked".to_string(),
            }),
            None => Ok(ServiceStats::default()),
        }
    }
}

impl Drop for WidgetService {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            eprintln!("[DDW-SERVICE] {e}");
        }
    }
}

// ──────────────────── worker ────────────────────

struct Worker<S: DeckStore> {
    session: WidgetSession<S>,
    renderer: Box<dyn Renderer>,
    notifier: NotificationManager,
    log: JsonlWriter,
    board: Arc<ViewBoard>,
    stats: ServiceStats,
    started: Instant,
}

impl<S: DeckStore> Worker<S> {
    fn run(mut self, receiver: &Receiver<ServiceMessage>, interval: Option<Duration>) -> ServiceStats {
        let ticker = interval.map_or_else(never, tick);

        loop {
            select! {
                recv(receiver) -> message => match message {
                    Ok(ServiceMessage::Request(request)) => self.process(request),
                    Ok(ServiceMessage::Reconfigure(config)) => self.reconfigure(&config),
                    Err(_) => break,
                },
                recv(ticker) -> _ => self.process(WidgetRequest::Refresh),
            }
        }

        self.announce_stop();
        self.stats
    }

    fn process(&mut self, request: WidgetRequest) {
        self.stats.cycles += 1;
        match self.session.process(request) {
            Ok(report) => self.complete(&report),
            Err(error) => {
                self.stats.errors += 1;
                eprintln!("[DDW-SERVICE] {request} failed: {error}");
                self.log
                    .write_entry(&LogEntry::from_error(Some(request), &error));
                self.notifier.notify(&NotificationEvent::Error {
                    code: error.code().to_string(),
                    message: error.to_string(),
                });
            }
        }
        self.log.flush();
    }

    fn complete(&mut self, report: &CycleReport) {
        if report.fetched {
            self.stats.fetches += 1;
        }

        let snapshot = self
            .session
            .controller()
            .snapshot()
            .cloned()
            .unwrap_or_else(|| Arc::new(Snapshot::empty()));

        if let Some(view) = &report.view {
            self.stats.renders += 1;
            if let Err(error) = self.renderer.render(view) {
                self.stats.errors += 1;
                eprintln!("[DDW-SERVICE] render failed: {error}");
                self.log
                    .write_entry(&LogEntry::from_error(Some(report.request), &error));
            }
            self.board.publish(BoardState {
                view: view.clone(),
                snapshot: Arc::clone(&snapshot),
                cursor: report.cursor,
                cycle: self.stats.cycles,
            });
        }

        if let Some(deck) = &report.open_deck {
            self.stats.opens += 1;
            if let Err(error) = self.renderer.open_deck(deck) {
                self.stats.errors += 1;
                eprintln!("[DDW-SERVICE] open {} failed: {error}", deck.name);
                self.log
                    .write_entry(&LogEntry::from_error(Some(report.request), &error));
            }
            self.board.record_open(deck.clone());
        }

        self.log.write_entry(&LogEntry::from_cycle(
            report,
            snapshot.total_due(),
            snapshot.len(),
        ));

        if let Some(signal) = report.alert
            && let Some(alert) = self.notifier.notify_due(signal)
        {
            self.stats.alerts += 1;
            let mut entry = LogEntry::new(EventType::AlertRaised, Severity::Warning);
            entry.total_due = Some(alert.due_count);
            entry.details = Some(alert.ticker);
            self.log.write_entry(&entry);
        }
    }

    fn reconfigure(&mut self, config: &Config) {
        self.session
            .set_threshold(config.minimum_due_for_notification());
        self.notifier = NotificationManager::from_config(&config.notifications);

        let mut entry = LogEntry::new(EventType::ConfigReload, Severity::Info);
        entry.details = Some(format!(
            "config hash: {}",
            config.stable_hash().unwrap_or_default()
        ));
        self.log.write_entry(&entry);
        self.log.flush();
        eprintln!("[DDW-SERVICE] configuration applied");
    }

    fn announce_start(&mut self, config: &Config) {
        let mut entry = LogEntry::new(EventType::ServiceStart, Severity::Info);
        entry.details = Some(format!(
            "version {} config hash {}",
            env!("CARGO_PKG_VERSION"),
            config.stable_hash().unwrap_or_default()
        ));
        self.log.write_entry(&entry);
        self.log.flush();
        self.notifier.notify(&NotificationEvent::ServiceStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            refresh_interval_secs: config.widget.refresh_interval_secs,
        });
    }

    fn announce_stop(&mut self) {
        let uptime_secs = self.started.elapsed().as_secs();
        let mut entry = LogEntry::new(EventType::ServiceStop, Severity::Info);
        entry.details = Some(format!("uptime {uptime_secs}s, {} cycles", self.stats.cycles));
        self.log.write_entry(&entry);
        self.log.fsync();
        self.notifier.notify(&NotificationEvent::ServiceStopped {
            reason: "clean shutdown".to_string(),
            uptime_secs,
        });
    }
}

// ──────────────────── signal loop ────────────────────

/// Block until a shutdown signal arrives, forwarding SIGUSR1 as `Refresh` and
/// SIGHUP as a configuration reload.
pub fn run_until_shutdown(
    service: &WidgetService,
    signals: &SignalHandler,
    config: &mut Config,
) -> Result<()> {
    loop {
        if signals.should_shutdown() {
            eprintln!("[DDW-SERVICE] shutdown requested");
            return Ok(());
        }

        if signals.should_reload() {
            eprintln!("[DDW-SERVICE] config reload requested (SIGHUP)");
            match Config::load(Some(&config.paths.config_file)) {
                Ok(new_config) => {
                    let old_hash = config.stable_hash().unwrap_or_default();
                    let new_hash = new_config.stable_hash().unwrap_or_default();
                    if old_hash == new_hash {
                        eprintln!("[DDW-SERVICE] config unchanged, skipping reload");
                    } else {
                        if new_config.store != config.store {
                            eprintln!(
                                "[DDW-SERVICE] store settings changed; restart to switch stores"
                            );
                        }
                        service.reconfigure(new_config.clone())?;
                        *config = new_config;
                    }
                }
                Err(e) => eprintln!("[DDW-SERVICE] config reload failed: {e}"),
            }
        }

        if signals.should_refresh() {
            service.submit(WidgetRequest::Refresh)?;
        }

        thread::sleep(SIGNAL_POLL_INTERVAL);
    }
}
