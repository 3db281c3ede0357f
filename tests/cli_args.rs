//! Integration tests for CLI argument handling
//!
//! Runs the built binary against a temporary cache directory. None of these
//! commands reach the network.

use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_graphsnap"))
        .args(args)
        .env_remove("GRAPHSNAP_BEARER_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute graphsnap")
}

fn run_in(dir: &TempDir, args: &[&str]) -> std::process::Output {
    let cache_dir = dir.path().to_str().expect("utf-8 temp path");
    let mut full = vec!["--cache-dir", cache_dir];
    full.extend_from_slice(args);
    run_cli(&full)
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("graphsnap"), "Help should mention graphsnap");
    assert!(stdout.contains("snapshot"), "Help should mention snapshot command");
    assert!(stdout.contains("diff"), "Help should mention diff command");
}

#[test]
fn test_invalid_category_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["list", "jack", "enemies"]);
    assert!(!output.status.success(), "Expected invalid category to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid category"),
        "Should print error message about invalid category: {}",
        stderr
    );
}

#[test]
fn test_invalid_format_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["list", "jack", "fans", "--format", "xml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid format"), "stderr: {}", stderr);
}

#[test]
fn test_list_without_token_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["list", "jack", "friends"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bearer token"), "stderr: {}", stderr);
}

#[test]
fn test_show_with_empty_cache_reports_no_snapshots() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["show"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No snapshots available"), "stderr: {}", stderr);
}

#[test]
fn test_snapshots_with_empty_cache_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["snapshots"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_purge_rejects_unknown_area() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["purge", "u_sers"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid cache area"), "stderr: {}", stderr);
}

#[test]
fn test_purge_known_area_succeeds() {
    let dir = TempDir::new().unwrap();
    let output = run_in(&dir, &["purge", "users"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("removed 0 entries from users"));
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use graphsnap::cli::{parse_category_arg, parse_format_arg, Action, Cli};
    use graphsnap::{Category, OutputFormat};

    #[test]
    fn test_parse_category_arg_fans() {
        assert_eq!(parse_category_arg("fans").unwrap(), Category::Fans);
    }

    #[test]
    fn test_parse_format_arg_handles() {
        assert_eq!(parse_format_arg("handles").unwrap(), OutputFormat::Handles);
    }

    #[test]
    fn test_list_with_format_ids() {
        let cli = Cli::parse_from(["graphsnap", "list", "jack", "followers", "--format", "ids"]);
        match Action::from_cli(&cli).unwrap() {
            Action::List {
                category, format, ..
            } => {
                assert_eq!(category, Category::Followers);
                assert_eq!(format, OutputFormat::Ids);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_snapshots_command_takes_no_arguments() {
        let cli = Cli::parse_from(["graphsnap", "snapshots"]);
        assert!(matches!(Action::from_cli(&cli).unwrap(), Action::ListSnapshots));
    }
}
