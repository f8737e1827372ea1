use std::fs;
use std::path::Path;
use std::process::Output;

use tempfile::TempDir;

/// Runs the binary inside `dir` so no stray `dispatch.yml` is picked up.
fn run_dispatch(dir: &Path, args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_dispatch"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run dispatch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// Help fallbacks
// ---------------------------------------------------------------------------

#[test]
fn no_tokens_prints_parser_help() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(dir.path(), &[]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("dispatch 0.1.0"));
    assert!(text.contains("Commands:\nping - A test command\ngather-info - Gather info on a given host\n"));
}

#[test]
fn bare_help_flags_print_parser_help() {
    let dir = TempDir::new().unwrap();

    for flag in ["-h", "--help"] {
        let output = run_dispatch(dir.path(), &[flag]);
        assert!(output.status.success());
        assert!(stdout(&output).starts_with("\ndispatch 0.1.0\n\nCommands:\n"));
    }
}

#[test]
fn unknown_command_prints_parser_help() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(dir.path(), &["launch", "--now"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Commands:"));
}

#[test]
fn command_help_token_prints_command_help() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(dir.path(), &["gather-info", "--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Name: gather-info"));
    assert!(text.contains("Expected args: 2"));
    assert!(text.contains("--host - The hostname to connect to (required)"));
}

#[test]
fn trailing_flag_without_value_prints_command_help() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(dir.path(), &["gather-info", "lab", "1", "--port", "22", "--host"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Name: gather-info"));
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn ping_prints_pong() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(dir.path(), &["ping"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "pong");
}

#[test]
fn gather_info_reports_reachable_listener() {
    let dir = TempDir::new().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();

    let output = run_dispatch(
        dir.path(),
        &["gather-info", "lab", "1", "--host", "127.0.0.1", "--port", port.as_str()],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let records: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(records[0]["reachable"], true);
    assert_eq!(records[0]["label"], "lab");
}

#[test]
fn handler_failure_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(
        dir.path(),
        &["gather-info", "lab", "0", "--host", "127.0.0.1", "--port", "22"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("command gather-info failed"));
    assert!(stderr.contains("attempt count must be a positive whole number"));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn scan_all_uses_config_inventory() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.yml");
    fs::write(&config, "timeout_ms: 2000\ninventory:\n  - 127.0.0.1\n").unwrap();

    let output = run_dispatch(
        dir.path(),
        &["--config", config.to_str().unwrap(), "scan-all"],
    );

    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(reports[0]["host"], "127.0.0.1");
    assert_eq!(reports[0]["addresses"][0], "127.0.0.1");
}

#[test]
fn malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dispatch.yml"), "inventory: 5\n").unwrap();

    let output = run_dispatch(dir.path(), &["ping"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse config"));
}

#[test]
fn describe_prints_schema_json() {
    let dir = TempDir::new().unwrap();
    let output = run_dispatch(dir.path(), &["--describe"]);

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["name"], "dispatch");
    assert_eq!(summary["commands"][1]["name"], "gather-info");
    assert_eq!(summary["commands"][1]["flags"][0]["aliases"][0], "-H");
}
