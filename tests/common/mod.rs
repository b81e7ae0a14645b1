#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use due_deck_widget::deck::status::DeckStatus;
use due_deck_widget::deck::store::JsonDeckStore;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

/// Isolated HOME with a seeded JSON collection.
pub struct Sandbox {
    pub home: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create sandbox home"),
        }
    }

    pub fn with_decks(decks: &[DeckStatus]) -> Self {
        let sandbox = Self::new();
        JsonDeckStore::new(sandbox.collection_dir())
            .write_decks(decks)
            .expect("seed collection");
        sandbox
    }

    pub fn collection_dir(&self) -> PathBuf {
        self.home.path().join("collection")
    }

    pub fn state_file(&self) -> PathBuf {
        self.home.path().join("state.json")
    }

    pub fn activity_log(&self) -> PathBuf {
        self.home.path().join("activity.jsonl")
    }

    pub fn env(&self) -> Vec<(String, String)> {
        let path = |p: &Path| p.to_string_lossy().into_owned();
        vec![
            ("HOME".to_string(), path(self.home.path())),
            ("DDW_STORE_COLLECTION_DIR".to_string(), path(&self.collection_dir())),
            ("DDW_STATE_FILE".to_string(), path(&self.state_file())),
            ("DDW_JSONL_LOG".to_string(), path(&self.activity_log())),
            ("DDW_WIDGET_REFRESH_INTERVAL_SECS".to_string(), "0".to_string()),
        ]
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_ddw") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "ddw.exe" } else { "ddw" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve ddw binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with(case_name, args, &[], None)
}

pub fn run_cli_case_with(
    case_name: &str,
    args: &[&str],
    env: &[(String, String)],
    stdin: Option<&str>,
) -> CmdResult {
    let root = std::env::temp_dir().join("ddw-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env_remove("DDW_OUTPUT_FORMAT")
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command.spawn().expect("execute ddw command");
    if let Some(input) = stdin {
        let mut pipe = child.stdin.take().expect("stdin pipe");
        pipe.write_all(input.as_bytes()).expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait for ddw command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Parse every non-empty stdout line as JSON.
pub fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line is JSON"))
        .collect()
}
