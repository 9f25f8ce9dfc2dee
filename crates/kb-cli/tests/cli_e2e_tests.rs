//! End-to-end tests for the kbsync binary.
//!
//! Commands that reach the API run against an in-process fake server, so the
//! binary is spawned from a blocking task while the server keeps serving on
//! the runtime's worker threads.

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use kb_test_utils::{FAKE_API_KEY, FakeKnowledgeApi, KnowledgeDir};
use predicates::prelude::*;

fn kbsync() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kbsync"));
    for var in [
        "KB_API_URL",
        "KB_API_KEY",
        "HTTP_PROXY",
        "HTTPS_PROXY",
        "ALL_PROXY",
        "http_proxy",
        "https_proxy",
        "all_proxy",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

async fn run_against(base_url: &str, config: &Path, args: &[&str]) -> Output {
    let mut cmd = kbsync();
    cmd.args(args)
        .arg("--config")
        .arg(config)
        .env("KB_API_URL", base_url)
        .env("KB_API_KEY", FAKE_API_KEY);
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn handbook_config(dir: &KnowledgeDir) -> std::path::PathBuf {
    dir.write_config(
        "kb-sync.yaml",
        r#"
settings:
  poll_interval_secs: 1
  indexing_timeout_secs: 30
datasets:
  - path: handbook
    dataset_name: handbook
"#,
    )
}

#[test]
fn help_lists_commands() {
    kbsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn no_command_prints_hint() {
    kbsync()
        .assert()
        .success()
        .stdout(predicate::str::contains("kbsync --help"));
}

#[test]
fn check_config_accepts_valid_file() {
    let dir = KnowledgeDir::new();
    dir.write_doc("handbook", "intro.md", "# Intro");
    let config = handbook_config(&dir);

    kbsync()
        .args(["check-config", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("name handbook"));
}

#[test]
fn check_config_reports_missing_local_path() {
    let dir = KnowledgeDir::new();
    let config = handbook_config(&dir);

    kbsync()
        .args(["check-config", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 local path(s) do not exist"));
}

#[test]
fn check_config_rejects_invalid_file() {
    let dir = KnowledgeDir::new();
    let config = dir.write_config(
        "kb-sync.yaml",
        "datasets:\n  - path: handbook\n    dataset_id: x\n    create_if_missing: true\n",
    );

    kbsync()
        .args(["check-config", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("'create_if_missing' requires 'dataset_name'"));
}

#[test]
fn check_config_fails_for_missing_file() {
    let dir = KnowledgeDir::new();

    kbsync()
        .args(["check-config", "--config"])
        .arg(dir.root().join("nope.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn sync_without_api_key_fails() {
    let dir = KnowledgeDir::new();
    let config = handbook_config(&dir);

    kbsync()
        .args(["sync", "--api-url", "http://127.0.0.1:1", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing API key"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_uploads_new_documents() {
    let (base_url, state) = FakeKnowledgeApi::spawn().await;
    let dataset_id = state.add_dataset("handbook").await;

    let dir = KnowledgeDir::new();
    dir.write_doc("handbook", "intro.md", "# Intro");
    dir.write_doc("handbook", "setup.md", "# Setup");
    let config = handbook_config(&dir);

    let output = run_against(&base_url, &config, &["sync"]).await;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Sync complete: 2 created, 0 updated, 0 unchanged, 0 deleted"));

    let docs = state.documents_of(&dataset_id).await;
    let mut names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["intro.md", "setup.md"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_json_reports_counts() {
    let (base_url, state) = FakeKnowledgeApi::spawn().await;
    let dataset_id = state.add_dataset("handbook").await;
    state
        .add_document(&dataset_id, "stale.md", "old", Some("deadbeef"))
        .await;

    let dir = KnowledgeDir::new();
    dir.write_doc("handbook", "intro.md", "# Intro");
    let config = handbook_config(&dir);

    let output = run_against(&base_url, &config, &["sync", "--json"]).await;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["created"], 1);
    assert_eq!(value["summary"]["deleted"], 1);
    assert_eq!(value["results"][0]["dataset_id"], dataset_id.as_str());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_exits_non_zero_for_unknown_dataset() {
    let (base_url, _state) = FakeKnowledgeApi::spawn().await;

    let dir = KnowledgeDir::new();
    dir.write_doc("handbook", "intro.md", "# Intro");
    let config = handbook_config(&dir);

    let output = run_against(&base_url, &config, &["sync"]).await;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 dataset(s) finished with errors"), "stderr: {stderr}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn diff_previews_without_writing() {
    let (base_url, state) = FakeKnowledgeApi::spawn().await;
    let dataset_id = state.add_dataset("handbook").await;
    state
        .add_document(&dataset_id, "orphan.md", "gone", Some("deadbeef"))
        .await;

    let dir = KnowledgeDir::new();
    dir.write_doc("handbook", "intro.md", "# Intro");
    let config = handbook_config(&dir);

    let output = run_against(&base_url, &config, &["diff", "--json"]).await;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["has_changes"], true);
    let plan = &value["datasets"][0]["plan"];
    assert_eq!(plan["creates"][0]["filename"], "intro.md");
    assert_eq!(plan["deletes"][0]["filename"], "orphan.md");

    assert_eq!(state.count("POST", "create_by_text").await, 0);
    assert_eq!(state.count("DELETE", "").await, 0);
    assert_eq!(state.documents_of(&dataset_id).await.len(), 1);
}
