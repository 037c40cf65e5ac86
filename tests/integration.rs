use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn churn_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("churn");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("terms.txt"),
        "These terms govern your use of the service.\n\nWe may update them at any time.",
    )
    .unwrap();
    fs::write(
        files_dir.join("privacy.txt"),
        "We collect your email address and nothing else.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/churn.sqlite"

[update]
concurrency = 2
"#,
        root.display()
    );

    let config_path = config_dir.join("churn.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn run_churn(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = churn_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run churn binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Value of the first `  key: value` line in the output.
fn field<'a>(stdout: &'a str, key: &str) -> &'a str {
    let prefix = format!("{}: ", key);
    stdout
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .unwrap_or_else(|| panic!("no '{}' in output: {}", key, stdout))
}

fn add(config_path: &Path, url: &str) -> String {
    let (stdout, stderr, success) = run_churn(config_path, &["add", url]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    field(&stdout, "id").to_string()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_churn(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_churn(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_churn(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_add_records_first_observation() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);

    let url = file_url(&tmp.path().join("files/terms.txt"));
    let (stdout, stderr, success) = run_churn(&config_path, &["add", &url]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(field(&stdout, "id").len(), 128);
    assert_eq!(field(&stdout, "abs words"), "15");
    assert_eq!(field(&stdout, "changed words"), "0");
    assert!(stdout.contains("ok"));
}

#[test]
fn test_add_same_url_twice_keeps_one_document() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);

    let url = file_url(&tmp.path().join("files/terms.txt"));
    let first = add(&config_path, &url);
    let (stdout, _, success) = run_churn(&config_path, &["add", &url]);
    assert!(success);
    assert!(stdout.contains("already tracked"));
    assert_eq!(field(&stdout, "id"), first);

    let (stdout, _, _) = run_churn(&config_path, &["list", "--json"]);
    let docs: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(docs.as_array().unwrap().len(), 1);
}

#[test]
fn test_add_rejects_unsupported_scheme() {
    let (_tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);

    let (_, stderr, success) = run_churn(&config_path, &["add", "ftp://example.com/doc.txt"]);
    assert!(!success);
    assert!(stderr.contains("ftp"), "stderr: {}", stderr);
}

#[test]
fn test_unchanged_update_repeats_word_count() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);
    let id = add(&config_path, &file_url(&tmp.path().join("files/terms.txt")));

    let (stdout, stderr, success) = run_churn(&config_path, &["update", &id]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(field(&stdout, "abs words"), "15");
    assert_eq!(field(&stdout, "changed words"), "0");
}

#[test]
fn test_modified_file_reports_changes() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);
    let path = tmp.path().join("files/privacy.txt");
    let id = add(&config_path, &file_url(&path));

    fs::write(
        &path,
        "We collect your email address, your location and nothing else.",
    )
    .unwrap();
    let (stdout, stderr, success) = run_churn(&config_path, &["update", &id]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(field(&stdout, "abs words"), "10");
    assert_eq!(field(&stdout, "changed words"), "2");
}

#[test]
fn test_update_unknown_document_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);

    let (_, stderr, success) = run_churn(&config_path, &["update", "deadbeef"]);
    assert!(!success);
    assert!(stderr.contains("document not found"), "stderr: {}", stderr);
}

#[test]
fn test_update_all_reports_failures_without_stopping() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);
    let files = tmp.path().join("files");
    add(&config_path, &file_url(&files.join("terms.txt")));
    add(&config_path, &file_url(&files.join("privacy.txt")));

    // Third document disappears after registration.
    let doomed = files.join("doomed.txt");
    fs::write(&doomed, "short lived").unwrap();
    add(&config_path, &file_url(&doomed));
    fs::remove_file(&doomed).unwrap();

    let (stdout, _, success) = run_churn(&config_path, &["update", "--all"]);
    assert!(!success);
    assert!(stdout.contains("updated: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("failed: 1"), "stdout: {}", stdout);
}

#[test]
fn test_history_lists_every_record() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);
    let id = add(&config_path, &file_url(&tmp.path().join("files/terms.txt")));
    run_churn(&config_path, &["update", &id]);
    run_churn(&config_path, &["update", &id]);

    let (stdout, _, success) = run_churn(&config_path, &["history", &id]);
    assert!(success);
    assert!(stdout.contains("records: 3"), "stdout: {}", stdout);

    let (stdout, _, success) = run_churn(&config_path, &["history", &id, "--json"]);
    assert!(success);
    let history: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = history["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    for record in records {
        assert_eq!(record["abs_word_count"], 15);
        assert_eq!(record["changed_word_count"], 0);
    }
}

#[test]
fn test_list_shows_tracked_documents() {
    let (tmp, config_path) = setup_test_env();
    run_churn(&config_path, &["init"]);

    let (stdout, _, success) = run_churn(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No tracked documents"));

    let url = file_url(&tmp.path().join("files/terms.txt"));
    add(&config_path, &url);
    let (stdout, _, success) = run_churn(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains(&url));
    assert!(stdout.contains("abs=15 changed=0"));
}

#[test]
fn test_diff_works_without_config() {
    let tmp = TempDir::new().unwrap();
    let new = tmp.path().join("new.txt");
    let old = tmp.path().join("old.txt");
    fs::write(&new, "abc;dyfinitely ghjoolies  \n jkl3 foo bar").unwrap();
    fs::write(&old, "abc;definitely ghioolies foo bar").unwrap();

    let missing_config = tmp.path().join("absent.toml");
    let (stdout, stderr, success) = run_churn(
        &missing_config,
        &["diff", new.to_str().unwrap(), old.to_str().unwrap()],
    );
    assert!(success, "diff failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(field(&stdout, "kind"), "plain_text");
    assert_eq!(field(&stdout, "abs words"), "6");
    assert_eq!(field(&stdout, "changed words"), "3");
}

#[test]
fn test_diff_rejects_invalid_config() {
    let tmp = TempDir::new().unwrap();
    let new = tmp.path().join("new.txt");
    let old = tmp.path().join("old.txt");
    fs::write(&new, "alpha beta gamma").unwrap();
    fs::write(&old, "alpha beta").unwrap();

    let config_path = tmp.path().join("churn.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"churn.sqlite\"\n\n[diff]\nclose_match_cutoff = 1.5\n",
    )
    .unwrap();

    let (stdout, stderr, success) = run_churn(
        &config_path,
        &["diff", new.to_str().unwrap(), old.to_str().unwrap()],
    );
    assert!(!success, "diff ignored a bad config: stdout={}", stdout);
    assert!(stderr.contains("close_match_cutoff"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_churn(&tmp.path().join("absent.toml"), &["list"]);
    assert!(!success);
    assert!(stderr.contains("config"), "stderr: {}", stderr);
}
