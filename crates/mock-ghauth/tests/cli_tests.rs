//! Tests for how the `mock-ghauth` binary reads its environment.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

const STARTUP_MESSAGE: &str = "Starting mock GitHub OAuth server";

/// Run the binary with only `env` set and collect stdout up to the generated
/// client line, then stop it.
fn startup_output(env: &[(&str, &str)]) -> Vec<String> {
    let workdir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_mock-ghauth"))
        .args(["--bind", "127.0.0.1:0", "--generate-client"])
        .env_clear()
        .envs(env.iter().copied())
        .current_dir(workdir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .unwrap();

    let stdout = child.stdout.take().unwrap();
    let mut lines = Vec::new();
    for line in BufReader::new(stdout).lines() {
        let line = line.unwrap();
        let done = line.starts_with("client_id=");
        lines.push(line);
        if done {
            break;
        }
    }

    let _ = child.kill();
    child.wait().unwrap();
    lines
}

fn any_line(lines: &[String], needle: &str) -> bool {
    lines.iter().any(|line| line.contains(needle))
}

#[test]
fn test_numeric_env_booleans_are_accepted() {
    let lines = startup_output(&[("DEBUG", "1"), ("LEGACY_SWEEP", "1")]);
    assert!(any_line(&lines, "client_id="), "{lines:#?}");
}

#[test]
fn test_debug_env_overrides_rust_log() {
    let lines = startup_output(&[("DEBUG", "1"), ("RUST_LOG", "warn")]);
    assert!(any_line(&lines, "client_id="), "{lines:#?}");
    assert!(any_line(&lines, STARTUP_MESSAGE), "{lines:#?}");
}

#[test]
fn test_rust_log_applies_without_debug() {
    let lines = startup_output(&[("DEBUG", "0"), ("RUST_LOG", "warn")]);
    assert!(any_line(&lines, "client_id="), "{lines:#?}");
    assert!(!any_line(&lines, STARTUP_MESSAGE), "{lines:#?}");
}
