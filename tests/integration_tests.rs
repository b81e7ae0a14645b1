//! Integration tests: CLI smoke tests over a sandboxed collection, and
//! library-level scenarios driving the session and update service.

mod common;

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::Value;

use common::{Sandbox, json_lines, run_cli_case, run_cli_case_with};
use due_deck_widget::core::config::Config;
use due_deck_widget::daemon::loop_main::WidgetService;
use due_deck_widget::deck::status::DeckStatus;
use due_deck_widget::deck::store::{DeckStore, JsonDeckStore, MemoryDeckStore};
use due_deck_widget::logger::jsonl::{JsonlConfig, JsonlWriter};
use due_deck_widget::widget::request::WidgetRequest;
use due_deck_widget::widget::session::WidgetSession;
use due_deck_widget::widget::state::PersistedWidgetState;
use due_deck_widget::widget::view::JsonLinesRenderer;

fn sample_decks() -> Vec<DeckStatus> {
    vec![
        DeckStatus::new("Spanish", 2, 10, 3),
        DeckStatus::new("Kanji", 0, 3, 20),
        DeckStatus::new("French", 1, 5, 0),
    ]
}

fn single_json(stdout: &str, log_path: &Path) -> Value {
    let mut lines = json_lines(stdout);
    assert_eq!(lines.len(), 1, "expected one JSON line; log: {}", log_path.display());
    lines.remove(0)
}

// ──────────────────── CLI smoke ────────────────────

#[test]
fn help_command_prints_usage() {
    let result = run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: ddw [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_reports_json_when_piped() {
    let result = run_cli_case("version_command_reports_json_when_piped", &["version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["binary"], "ddw");
    assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn config_validate_accepts_defaults() {
    let sandbox = Sandbox::new();
    let result = run_cli_case_with(
        "config_validate_accepts_defaults",
        &["config", "validate"],
        &sandbox.env(),
        None,
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["hash"].as_str().map(str::len), Some(16));
}

#[test]
fn config_validate_rejects_unknown_channel() {
    let sandbox = Sandbox::new();
    let config_path = sandbox.home.path().join("bad.toml");
    fs::write(&config_path, "[notifications]\nchannels = [\"pager\"]\n").unwrap();
    let config_arg = config_path.to_string_lossy().into_owned();

    let result = run_cli_case_with(
        "config_validate_rejects_unknown_channel",
        &["--config", &config_arg, "config", "validate"],
        &sandbox.env(),
        None,
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["valid"], false);
}

#[test]
fn render_shows_top_ranked_deck() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    let result = run_cli_case_with("render_shows_top_ranked_deck", &["render"], &sandbox.env(), None);
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["command"], "initial_load");
    let view = &payload["report"]["view"];
    assert_eq!(view["headline"], "18 cards due in 3 decks");
    assert_eq!(view["deck_name"], "Spanish");
    assert_eq!(view["prev"]["enabled"], false);
    assert_eq!(view["next"]["enabled"], true);
    assert_eq!(payload["report"]["fetched"], true);
    assert!(payload["alert"].is_null());

    assert!(sandbox.state_file().exists());
    let log = fs::read_to_string(sandbox.activity_log()).unwrap();
    assert!(log.contains("\"event\":\"refresh\""), "activity log: {log}");
}

#[test]
fn render_human_mode_prints_headline() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    let mut env = sandbox.env();
    env.push(("DDW_OUTPUT_FORMAT".to_string(), "human".to_string()));
    let result = run_cli_case_with(
        "render_human_mode_prints_headline",
        &["--no-color", "render"],
        &env,
        None,
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("18 cards due in 3 decks"));
    assert!(result.stdout.contains("Spanish"));
}

#[test]
fn handle_next_persists_cursor_between_runs() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    let env = sandbox.env();

    let steps = [
        ("next", "French"),
        ("next", "Kanji"),
        ("ddw.widget.PREV", "French"),
        ("next", "Kanji"),
        ("next", "Spanish"),
    ];
    for (step, (request, deck)) in steps.iter().enumerate() {
        let result = run_cli_case_with(
            &format!("handle_persists_cursor_{step}"),
            &["handle", *request],
            &env,
            None,
        );
        assert!(result.status.success(), "log: {}", result.log_path.display());
        let payload = single_json(&result.stdout, &result.log_path);
        assert_eq!(payload["report"]["view"]["deck_name"], *deck, "step {step}");
    }

    // Advancing past the last deck resets to the top on the next fetch.
    let state = PersistedWidgetState::load(&sandbox.state_file()).unwrap();
    assert_eq!(state.cursor_index, 0);
}

#[test]
fn handle_open_reports_deck_under_cursor() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    PersistedWidgetState { cursor_index: 1 }
        .save(&sandbox.state_file())
        .unwrap();

    let result = run_cli_case_with(
        "handle_open_reports_deck_under_cursor",
        &["handle", "open"],
        &sandbox.env(),
        None,
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["report"]["open_deck"]["name"], "French");
    assert!(payload["report"]["view"].is_null());
}

#[test]
fn handle_unknown_request_exits_with_user_error() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    for (case, request) in [("sideways", "sideways"), ("open_main", "ddw.widget.OPEN_MAIN")] {
        let result = run_cli_case_with(
            &format!("handle_unknown_request_{case}"),
            &["handle", request],
            &sandbox.env(),
            None,
        );
        assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
        assert!(result.stderr.contains("ddw:"), "log: {}", result.log_path.display());
    }
}

#[test]
fn render_without_collection_shows_storage_unavailable() {
    let sandbox = Sandbox::new();
    let result = run_cli_case_with(
        "render_without_collection_shows_storage_unavailable",
        &["render"],
        &sandbox.env(),
        None,
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["report"]["storage_unavailable"], true);
    assert_eq!(payload["report"]["view"]["headline"], "Storage unavailable");
}

#[test]
fn render_above_threshold_raises_alert() {
    let sandbox = Sandbox::with_decks(&[
        DeckStatus::new("Spanish", 0, 20, 0),
        DeckStatus::new("Kanji", 0, 10, 0),
    ]);
    let result = run_cli_case_with(
        "render_above_threshold_raises_alert",
        &["render"],
        &sandbox.env(),
        None,
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = single_json(&result.stdout, &result.log_path);
    assert_eq!(payload["alert"]["due_count"], 30);
    assert_eq!(payload["alert"]["ticker"], "30 cards due");

    let log = fs::read_to_string(sandbox.activity_log()).unwrap();
    assert!(log.contains("\"event\":\"alert_raised\""), "activity log: {log}");
}

#[test]
fn serve_stdin_renders_each_request_then_exits() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    let result = run_cli_case_with(
        "serve_stdin_renders_each_request_then_exits",
        &["serve", "--stdin"],
        &sandbox.env(),
        Some("next\nbogus\nignore\n\n"),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let frames = json_lines(&result.stdout);
    let names: Vec<&str> = frames
        .iter()
        .filter_map(|frame| frame["deck_name"].as_str())
        .collect();
    assert_eq!(names, ["Spanish", "French"], "log: {}", result.log_path.display());
    assert!(result.stderr.contains("skipping input"));

    let state = PersistedWidgetState::load(&sandbox.state_file()).unwrap();
    assert_eq!(state.cursor_index, 1);
}

#[test]
fn serve_stdin_reports_open_requests() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    let result = run_cli_case_with(
        "serve_stdin_reports_open_requests",
        &["--json", "serve", "--stdin"],
        &sandbox.env(),
        Some("next\nopen\n"),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let lines = json_lines(&result.stdout);
    assert_eq!(lines.len(), 3, "log: {}", result.log_path.display());
    assert_eq!(lines[1]["deck_name"], "French");
    assert_eq!(lines[2]["open_deck"]["name"], "French");
    assert_eq!(lines[2]["open_deck"]["due_count"], 5);
}

#[test]
fn serve_stdin_human_mode_prints_open_line() {
    let sandbox = Sandbox::with_decks(&sample_decks());
    let mut env = sandbox.env();
    env.push(("DDW_OUTPUT_FORMAT".to_string(), "human".to_string()));
    let result = run_cli_case_with(
        "serve_stdin_human_mode_prints_open_line",
        &["--no-color", "serve", "--stdin"],
        &env,
        Some("open\n"),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.lines().any(|line| line == "open Spanish"),
        "log: {}",
        result.log_path.display()
    );
}

#[test]
fn completions_generate_for_bash() {
    let result = run_cli_case("completions_generate_for_bash", &["completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("ddw"));
}

// ──────────────────── library scenarios ────────────────────

#[test]
fn session_over_json_store_walks_ranked_decks() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDeckStore::new(dir.path());
    store.write_decks(&sample_decks()).unwrap();

    let mut session = WidgetSession::new(store, 25);
    let first = session.process(WidgetRequest::InitialLoad).unwrap();
    assert_eq!(first.view.unwrap().deck_name, "Spanish");

    let second = session.process(WidgetRequest::Next).unwrap();
    assert!(!second.fetched);
    assert_eq!(second.view.unwrap().deck_name, "French");

    let open = session.process(WidgetRequest::Open).unwrap();
    assert_eq!(open.open_deck.map(|d| d.name).as_deref(), Some("French"));
}

#[test]
fn open_deck_marker_survives_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDeckStore::new(dir.path());
    store.write_decks(&sample_decks()).unwrap();
    fs::write(dir.path().join("open_deck"), "Kanji").unwrap();

    let mut session = WidgetSession::new(store.clone(), 25);
    let report = session.process(WidgetRequest::Refresh).unwrap();
    assert!(report.fetched);
    assert_eq!(store.current_deck().as_deref(), Some("Kanji"));
}

#[test]
fn service_drains_queue_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.widget.refresh_interval_secs = 0;
    config.notifications.enabled = false;

    let log = JsonlWriter::open(JsonlConfig::at(dir.path().join("activity.jsonl")));
    let renderer = Box::new(JsonLinesRenderer::new(Vec::new()));
    let service = WidgetService::spawn(
        MemoryDeckStore::new(sample_decks()),
        &config,
        renderer,
        log,
    )
    .unwrap();

    let board = service.board();
    for request in [
        WidgetRequest::InitialLoad,
        WidgetRequest::Next,
        WidgetRequest::Next,
        WidgetRequest::Previous,
    ] {
        service.submit(request).unwrap();
    }
    let stats = service.shutdown().unwrap();

    assert_eq!(stats.cycles, 4);
    assert_eq!(stats.fetches, 1);
    let latest = board.latest().unwrap();
    assert_eq!(latest.view.deck_name, "Kanji");
    assert_eq!(latest.cursor, 1);
}

#[test]
fn service_publishes_frame_before_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.widget.refresh_interval_secs = 0;
    config.notifications.enabled = false;

    let log = JsonlWriter::open(JsonlConfig::at(dir.path().join("activity.jsonl")));
    let service = WidgetService::spawn(
        MemoryDeckStore::new(sample_decks()),
        &config,
        Box::new(JsonLinesRenderer::new(Vec::new())),
        log,
    )
    .unwrap();
    service.submit(WidgetRequest::InitialLoad).unwrap();

    let board = service.board();
    let deadline = Instant::now() + Duration::from_secs(5);
    while board.latest().is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let latest = board.latest().expect("frame published");
    assert_eq!(latest.snapshot.total_due(), 18);
    service.shutdown().unwrap();
}
