use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rods_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rods");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/rods.sqlite"

[chunking]
max_tokens = 700
overlap_tokens = 80

[retrieval]
chunks = 5

[server]
bind = "127.0.0.1:7431"
"#,
        root.display()
    );

    let config_path = config_dir.join("rods.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rods(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rods_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rods binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Two-date document in the persisted `_tables.json` shape: "header" under
/// both dates, "comments_remarks" under one.
fn write_fixture_tables(dir: &Path) -> PathBuf {
    let json = serde_json::json!({
        "2024-03-01": {
            "header": [
                [["Date of RODS", ""], ["2024-03-01", ""]]
            ],
            "comments_remarks": [
                [[null, "row1"]]
            ]
        },
        "unidentified_driver": {
            "header": [
                [["Date of RODS", ""], ["x", ""]]
            ]
        }
    });
    let path = dir.join("report_tables.json");
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
    path
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rods(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("rods.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_rods(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_rods(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_extract_missing_pdf_fails() {
    let (tmp, config_path) = setup_test_env();

    let missing = tmp.path().join("no_such_report.pdf");
    let (_, stderr, success) = run_rods(&config_path, &["extract", missing.to_str().unwrap()]);
    assert!(!success, "extract of a missing PDF should fail");
    assert!(
        stderr.contains("does not exist"),
        "Should report missing input, got: {}",
        stderr
    );
}

#[test]
fn test_lookup_header_across_dates() {
    let (tmp, config_path) = setup_test_env();
    let data_file = write_fixture_tables(tmp.path());

    let (stdout, stderr, success) = run_rods(
        &config_path,
        &["lookup", data_file.to_str().unwrap(), "header", "--json"],
    );
    assert!(success, "lookup failed: {}", stderr);

    let matches: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let arr = matches.as_array().unwrap();
    // "header" exists under both dates.
    assert_eq!(arr.len(), 2);
    // First match is the 2024-03-01 header row group, verbatim.
    assert_eq!(arr[0][0][1][0], "2024-03-01");
}

#[test]
fn test_lookup_single_date_key() {
    let (tmp, config_path) = setup_test_env();
    let data_file = write_fixture_tables(tmp.path());

    let (stdout, _, success) = run_rods(
        &config_path,
        &[
            "lookup",
            data_file.to_str().unwrap(),
            "comments_remarks",
            "--json",
        ],
    );
    assert!(success);
    let matches: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(matches.as_array().unwrap().len(), 1);
}

#[test]
fn test_lookup_absent_key_is_empty() {
    let (tmp, config_path) = setup_test_env();
    let data_file = write_fixture_tables(tmp.path());

    let (stdout, _, success) = run_rods(
        &config_path,
        &["lookup", data_file.to_str().unwrap(), "never_produced"],
    );
    assert!(success, "absent key should not be an error");
    assert!(stdout.contains("No tables found"));
}

#[test]
fn test_lookup_absent_key_json_is_empty_array() {
    let (tmp, config_path) = setup_test_env();
    let data_file = write_fixture_tables(tmp.path());

    let (stdout, _, success) = run_rods(
        &config_path,
        &[
            "lookup",
            data_file.to_str().unwrap(),
            "never_produced",
            "--json",
        ],
    );
    assert!(success);
    let matches: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(matches, serde_json::json!([]));
}

#[test]
fn test_lookup_missing_file_fails() {
    let (tmp, config_path) = setup_test_env();

    let missing = tmp.path().join("nope_tables.json");
    let (_, stderr, success) = run_rods(
        &config_path,
        &["lookup", missing.to_str().unwrap(), "header"],
    );
    assert!(!success, "lookup of a missing file should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_search_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_rods(&config_path, &["init"]);
    let (stdout, _, success) = run_rods(&config_path, &["search", "data diagnostics"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();

    run_rods(&config_path, &["init"]);
    let (stdout, _, success) = run_rods(&config_path, &["search", ""]);
    assert!(success, "Empty query should not panic");
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_mode_semantic_errors_when_disabled() {
    let (_tmp, config_path) = setup_test_env();

    run_rods(&config_path, &["init"]);
    let (_, stderr, success) = run_rods(&config_path, &["search", "test", "--mode", "semantic"]);
    assert!(
        !success,
        "Semantic mode should fail when embeddings disabled"
    );
    assert!(
        stderr.contains("embeddings"),
        "Should mention embeddings, got: {}",
        stderr
    );
}

#[test]
fn test_search_unknown_mode_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_rods(&config_path, &["init"]);
    let (_, stderr, success) = run_rods(&config_path, &["search", "test", "--mode", "invalid"]);
    assert!(!success, "Unknown mode should fail");
    assert!(
        stderr.contains("Unknown search mode"),
        "Should mention unknown mode, got: {}",
        stderr
    );
}

#[test]
fn test_validate_errors_when_llm_disabled() {
    let (_tmp, config_path) = setup_test_env();

    run_rods(&config_path, &["init"]);
    let (_, stderr, success) = run_rods(&config_path, &["validate", "Certification of RODS"]);
    assert!(!success, "validate should fail when llm provider disabled");
    assert!(
        stderr.contains("disabled"),
        "Should mention disabled, got: {}",
        stderr
    );
}

#[test]
fn test_index_missing_pdf_fails() {
    let (tmp, config_path) = setup_test_env();

    run_rods(&config_path, &["init"]);
    let missing = tmp.path().join("no_such_report.pdf");
    let (_, stderr, success) = run_rods(&config_path, &["index", missing.to_str().unwrap()]);
    assert!(!success, "index of a missing PDF should fail");
    assert!(stderr.contains("does not exist"));
}
