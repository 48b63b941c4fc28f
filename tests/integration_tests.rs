//! Integration tests for the rendezvous CLI

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Run the binary against an isolated data directory and config file
fn rendezvous(data_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rendezvous"))
        .arg("--data-dir")
        .arg(data_dir.path().join("data"))
        .arg("--config")
        .arg(data_dir.path().join("missing-config.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute rendezvous")
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_rendezvous"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("halfway"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("history"));
}

#[test]
fn test_search_outputs_json() {
    let data_dir = TempDir::new().unwrap();
    let catalog = fixture("catalog.json");
    let output = rendezvous(
        &data_dir,
        &[
            "search",
            "--from",
            "39.9388,116.4574",
            "--to",
            "Zhongguancun",
            "--category",
            "restaurant",
            "--catalog",
            catalog.to_str().unwrap(),
            "--json",
        ],
    );

    assert!(
        output.status.success(),
        "search failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["from_cache"], false);
    assert_eq!(result["total_results"], 2);
    assert_eq!(result["venues"][0]["provider_id"], "bj-noodle-house");

    let latitude = result["midpoint"]["latitude"].as_f64().unwrap();
    assert!((latitude - 39.9611).abs() < 0.01);
}

#[test]
fn test_search_prints_table() {
    let data_dir = TempDir::new().unwrap();
    let catalog = fixture("catalog.json");
    let output = rendezvous(
        &data_dir,
        &[
            "search",
            "--from",
            "Sanlitun",
            "--to",
            "Zhongguancun",
            "-c",
            "park",
            "-c",
            "cafe",
            "--radius",
            "3000",
            "--catalog",
            catalog.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Xicheng, Beijing"));
    assert!(stdout.contains("Lakeside Cafe"));
    assert!(stdout.contains("Houhai Park"));
    assert!(!stdout.contains("Far Away Bar"));
}

#[test]
fn test_unknown_location_fails() {
    let data_dir = TempDir::new().unwrap();
    let catalog = fixture("catalog.json");
    let output = rendezvous(
        &data_dir,
        &[
            "search",
            "--from",
            "Atlantis",
            "--to",
            "Zhongguancun",
            "--catalog",
            catalog.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Atlantis"));
}

#[test]
fn test_invalid_category_is_rejected() {
    let data_dir = TempDir::new().unwrap();
    let catalog = fixture("catalog.json");
    let output = rendezvous(
        &data_dir,
        &[
            "search",
            "--from",
            "Sanlitun",
            "--to",
            "Zhongguancun",
            "--category",
            "casino",
            "--catalog",
            catalog.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
}

#[test]
fn test_suggest_short_query_is_empty() {
    let data_dir = TempDir::new().unwrap();
    let catalog = fixture("catalog.json");
    let output = rendezvous(
        &data_dir,
        &["suggest", "Sa", "--catalog", catalog.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No suggestions"));
}

#[test]
fn test_suggest_finds_address() {
    let data_dir = TempDir::new().unwrap();
    let catalog = fixture("catalog.json");
    let output = rendezvous(
        &data_dir,
        &["suggest", "sanlitun", "--catalog", catalog.to_str().unwrap()],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sanlitun, Beijing"));
    assert!(stdout.contains("39.9388, 116.4574"));
}

#[test]
fn test_empty_history() {
    let data_dir = TempDir::new().unwrap();
    let output = rendezvous(&data_dir, &["history", "list"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No searches yet"));
}

#[test]
fn test_history_import_reports_counts() {
    let data_dir = TempDir::new().unwrap();
    let export = data_dir.path().join("export.json");
    std::fs::write(
        &export,
        r#"{
            "version": 1,
            "exported_at": "2026-01-01T00:00:00Z",
            "items": [
                {
                    "id": "7f1f7a1e-8a4e-4c55-9d55-5f0c1f9f0a11",
                    "location1": {"address": "A", "latitude": 1.0, "longitude": 2.0},
                    "location2": {"address": "B", "latitude": 3.0, "longitude": 4.0},
                    "venue_categories": ["CAFE"],
                    "timestamp": "2026-01-01T00:00:00Z",
                    "result_count": 4
                },
                {"id": "broken"}
            ]
        }"#,
    )
    .unwrap();

    let output = rendezvous(&data_dir, &["history", "import", export.to_str().unwrap()]);

    assert!(
        output.status.success(),
        "import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Imported 1 searches (1 skipped)"));
}
