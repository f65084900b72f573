//! Common utilities for integration tests

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to the `tg` binary
///
/// Prefers `CARGO_BIN_EXE_tg` (set by cargo for integration tests, including
/// custom target directories) and falls back to `cargo_bin`.
#[allow(deprecated)]
pub fn tg_binary() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_tg")
        .map(PathBuf::from)
        .unwrap_or_else(|_| assert_cmd::cargo::cargo_bin("tg"))
}

/// `tg` pinned to `project_dir` both via cwd and `TASKGATE_PROJECT_DIR`
pub fn tg_in(project_dir: &Path) -> Command {
    let mut cmd = Command::new(tg_binary());
    cmd.current_dir(project_dir)
        .env("TASKGATE_PROJECT_DIR", project_dir)
        .env_remove("TASKGATE_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Temporary directory with an initialized taskgate project
pub fn setup_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    tg_in(temp_dir.path()).arg("init").assert().success();
    temp_dir
}

/// Run `tg <args> --format json` and parse stdout
#[allow(dead_code)]
pub fn tg_json(project_dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = tg_in(project_dir)
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "tg {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Create a task through the CLI and return its id
#[allow(dead_code)]
pub fn add_task(project_dir: &Path, name: &str, extra: &[&str]) -> i64 {
    let mut args = vec!["task", "add", name];
    args.extend_from_slice(extra);
    tg_json(project_dir, &args)["id"].as_i64().unwrap()
}

/// Parse the `{error, code}` object printed on stderr for a failed command
#[allow(dead_code)]
pub fn error_code(output: &std::process::Output) -> String {
    let body: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    body["code"].as_str().unwrap().to_string()
}
