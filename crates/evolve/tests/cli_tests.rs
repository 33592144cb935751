//! CLI integration tests.
//!
//! These run the offline subcommands against a temporary site directory.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn evolve(site_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_evolve"))
        .args(args)
        .current_dir(site_dir.parent().unwrap_or(site_dir))
        .env("SITE_DIR", site_dir)
        .env("RUST_LOG", "off")
        .env_remove("PORT")
        .env_remove("GENERATE_COOLDOWN_SECS")
        .output()
        .expect("Failed to execute evolve")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn site() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let site_dir = dir.path().join("site");
    std::fs::create_dir_all(&site_dir).unwrap();
    std::fs::write(site_dir.join("live.html"), "<h1>A</h1>").unwrap();
    (dir, site_dir)
}

#[test]
fn test_help_lists_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_evolve"))
        .arg("--help")
        .output()
        .expect("Failed to execute evolve");

    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["serve", "history", "publish", "rollback", "discard"] {
        assert!(text.contains(command), "missing {command} in:\n{text}");
    }
}

#[test]
fn test_empty_history() {
    let (_dir, site_dir) = site();
    let output = evolve(&site_dir, &["history"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("No snapshots yet."));
}

#[test]
fn test_publish_then_rollback() {
    let (_dir, site_dir) = site();

    let published = evolve(&site_dir, &["publish"]);
    assert!(published.status.success());
    let text = stdout(&published);
    assert!(text.contains("no pending previews"), "{text}");

    let versions: Vec<String> = std::fs::read_dir(site_dir.join(".history"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(versions.len(), 1);

    std::fs::write(site_dir.join("live.html"), "<h1>B</h1>").unwrap();
    let rolled_back = evolve(&site_dir, &["rollback", &versions[0]]);
    assert!(rolled_back.status.success());
    assert_eq!(
        std::fs::read_to_string(site_dir.join("live.html")).unwrap(),
        "<h1>A</h1>"
    );

    let history = evolve(&site_dir, &["history"]);
    assert!(stdout(&history).contains(&versions[0]));
}

#[test]
fn test_rollback_unknown_version_fails() {
    let (_dir, site_dir) = site();
    let output = evolve(&site_dir, &["rollback", "123"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Version not found: 123"));
    assert_eq!(
        std::fs::read_to_string(site_dir.join("live.html")).unwrap(),
        "<h1>A</h1>"
    );
}

#[test]
fn test_discard_promotes_nothing() {
    let (_dir, site_dir) = site();
    std::fs::write(site_dir.join("live.preview.html"), "<h1>draft</h1>").unwrap();

    let output = evolve(&site_dir, &["discard"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Discarded: live.html"));
    assert!(!site_dir.join("live.preview.html").exists());
    assert!(stdout(&evolve(&site_dir, &["discard"])).contains("Nothing to discard."));
}
