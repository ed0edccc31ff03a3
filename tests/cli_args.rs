//! Tests for the `cflip` binary: argument parsing and exit codes.

use std::process::Command;

use tempfile::TempDir;

fn cflip_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cflip"));
    cmd.arg("--config")
        .arg(home.path().join("config.toml"))
        .arg("--settings")
        .arg(home.path().join("settings.json"))
        .env_remove("CFLIP_LOG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_cflip"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["status", "list", "switch", "model", "backup", "snapshot"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in:\n{stdout}");
    }
}

#[test]
fn test_status_on_fresh_home_shows_default_provider() {
    let home = TempDir::new().unwrap();

    let output = cflip_cmd(&home)
        .arg("status")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("anthropic"), "{stdout}");
    assert!(home.path().join("config.toml").exists());
}

#[test]
fn test_unknown_provider_exits_with_error() {
    let home = TempDir::new().unwrap();

    let output = cflip_cmd(&home)
        .args(["switch", "nonexistent_provider_xyz"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Error: Provider 'nonexistent_provider_xyz' not found"),
        "{stderr}"
    );
}

#[test]
fn test_invalid_category_is_rejected_by_parser() {
    let home = TempDir::new().unwrap();

    let output = cflip_cmd(&home)
        .args(["model", "gigantic", "glm-4.6"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown model category"), "{stderr}");
}

#[test]
fn test_switch_writes_settings_file() {
    let home = TempDir::new().unwrap();

    let output = cflip_cmd(&home)
        .args(["switch", "glm", "--api-key", "glm-test-key"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let settings: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(home.path().join("settings.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        settings["env"]["ANTHROPIC_BASE_URL"],
        "https://api.z.ai/api/anthropic"
    );
}

#[test]
fn test_prune_rejects_bad_duration() {
    let home = TempDir::new().unwrap();

    let output = cflip_cmd(&home)
        .args(["backup", "prune", "--older-than", "soon"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
