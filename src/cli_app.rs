//! Top-level CLI definition and dispatch.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::control;
use serde_json::{Value, json};
use thiserror::Error;

use due_deck_widget::cli::render::{TerminalRenderer, format_view};
use due_deck_widget::core::config::Config;
use due_deck_widget::core::errors::DdwError;
use due_deck_widget::daemon::loop_main::{WidgetService, run_until_shutdown};
use due_deck_widget::daemon::notifications::NotificationManager;
use due_deck_widget::daemon::signals::SignalHandler;
use due_deck_widget::deck::open_configured;
use due_deck_widget::deck::status::Snapshot;
use due_deck_widget::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use due_deck_widget::widget::request::WidgetRequest;
use due_deck_widget::widget::session::{CycleReport, WidgetSession};
use due_deck_widget::widget::state::PersistedWidgetState;
use due_deck_widget::widget::view::{JsonLinesRenderer, Renderer};

/// Due Deck Widget: at-a-glance view of which decks have cards due.
#[derive(Debug, Parser)]
#[command(
    name = "ddw",
    author,
    version,
    about = "Due Deck Widget - ranked due decks, navigation and due alerts",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Refresh from the deck store and render the widget once.
    Render,
    /// Apply one widget request (next, prev, open, ignore, refresh, init).
    Handle(HandleArgs),
    /// Run the update service until SIGTERM/SIGINT.
    Serve(ServeArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
}

#[derive(Debug, Clone, Args)]
struct HandleArgs {
    /// Request name or action id (e.g. `next`, `ddw.widget.PREV`).
    request: String,
}

#[derive(Debug, Clone, Args, Default)]
struct ServeArgs {
    /// Read requests from stdin, one per line; exit at end of input.
    #[arg(long)]
    stdin: bool,
    /// Override the periodic refresh interval (0 disables).
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
    /// Write the default configuration to the config path.
    Reset,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<DdwError> for CliError {
    fn from(value: DdwError) -> Self {
        match value {
            DdwError::UnknownRequest { .. }
            | DdwError::InvalidConfig { .. }
            | DdwError::MissingConfig { .. }
            | DdwError::ConfigParse { .. } => Self::User(value.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Render => run_cycle(cli, WidgetRequest::InitialLoad),
        Command::Handle(args) => {
            let request: WidgetRequest = args.request.parse()?;
            run_cycle(cli, request)
        }
        Command::Serve(args) => run_serve(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Command::Version(args) => emit_version(cli, args),
    }
}

// ──────────────────── one-shot cycle ────────────────────

/// Run one request against a fresh session restored from the state file.
fn run_cycle(cli: &Cli, request: WidgetRequest) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let state_path = config.paths.state_file.clone();
    let state = PersistedWidgetState::load(&state_path)?;

    let store = open_configured(&config.store)?;
    let mut session = WidgetSession::with_cursor(
        store,
        config.minimum_due_for_notification(),
        state.cursor(),
    );
    if matches!(request, WidgetRequest::Open) {
        session.prime()?;
    }

    let mut log = JsonlWriter::open(JsonlConfig::at(&config.paths.jsonl_log));
    let report = match session.process(request) {
        Ok(report) => report,
        Err(error) => {
            log.write_entry(&LogEntry::from_error(Some(request), &error));
            log.flush();
            return Err(error.into());
        }
    };

    let snapshot = session.snapshot().cloned().unwrap_or_else(Snapshot::empty);
    log.write_entry(&LogEntry::from_cycle(
        &report,
        snapshot.total_due(),
        snapshot.len(),
    ));

    let mut notifier = NotificationManager::from_config(&config.notifications);
    let alert = report.alert.and_then(|signal| notifier.notify_due(signal));
    if let Some(alert) = &alert {
        let mut entry = LogEntry::new(EventType::AlertRaised, Severity::Warning);
        entry.total_due = Some(alert.due_count);
        entry.details = Some(alert.ticker.clone());
        log.write_entry(&entry);
    }
    log.flush();

    PersistedWidgetState::from_cursor(session.cursor()).save(&state_path)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if !cli.quiet {
                print_report_human(&report);
                if let Some(alert) = &alert {
                    println!("! {}", alert.ticker);
                }
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": request.name(),
                "report": serde_json::to_value(&report)?,
                "alert": serde_json::to_value(&alert)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_report_human(report: &CycleReport) {
    if let Some(view) = &report.view {
        print!("{}", format_view(view));
    }
    if let Some(deck) = &report.open_deck {
        println!("open {}", deck.name);
    }
}

// ──────────────────── serve ────────────────────

fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(interval) = args.interval {
        config.widget.refresh_interval_secs = interval;
    }

    let store = open_configured(&config.store)?;
    let renderer: Box<dyn Renderer> = match output_mode(cli) {
        OutputMode::Human => Box::new(TerminalRenderer::new(io::stdout())),
        OutputMode::Json => Box::new(JsonLinesRenderer::new(io::stdout())),
    };
    let log = JsonlWriter::open(JsonlConfig::at(&config.paths.jsonl_log));

    let service = WidgetService::spawn(store, &config, renderer, log)?;
    service.submit(WidgetRequest::InitialLoad)?;

    if args.stdin {
        for line in io::stdin().lock().lines() {
            let line = line?;
            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<WidgetRequest>() {
                Ok(request) => service.submit(request)?,
                Err(e) => eprintln!("[DDW-SERVICE] skipping input: {e}"),
            }
        }
    } else {
        let signals = SignalHandler::new();
        run_until_shutdown(&service, &signals, &mut config)?;
    }

    let board = service.board();
    let stats = service.shutdown()?;
    if let Some(latest) = board.latest() {
        PersistedWidgetState {
            cursor_index: latest.cursor,
        }
        .save(&config.paths.state_file)?;
    }

    if cli.verbose {
        eprintln!(
            "[DDW-SERVICE] stopped: {} cycles, {} fetches, {} alerts, {} errors",
            stats.cycles, stats.fetches, stats.alerts, stats.errors
        );
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
        Some(ConfigCommand::Reset) => {
            let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CliError::Runtime(format!("create config dir: {e}")))?;
            }
            let toml_str = toml::to_string_pretty(&Config::default())
                .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
            std::fs::write(&config_path, toml_str)
                .map_err(|e| CliError::Runtime(format!("write config: {e}")))?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("Wrote default configuration to {}", config_path.display());
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config reset",
                        "path": config_path.to_string_lossy(),
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        eprintln!(
            "[DDW-CONFIG] loaded {} (hash {})",
            config.paths.config_file.display(),
            config.stable_hash().unwrap_or_default()
        );
    }
    Ok(config)
}

// ──────────────────── version & output ────────────────────

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("ddw {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "ddw",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DDW_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
