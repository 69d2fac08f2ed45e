//! Integration tests for the `topo` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling
//! run without any environment; the download tests talk to wiremock.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `topo` binary with env isolation.
///
/// Clears all `TOPO_*` env vars and points the config file at a
/// nonexistent path so tests never touch the user's real configuration.
fn topo_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("topo");
    cmd.env("HOME", "/tmp/topo-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/topo-cli-test-nonexistent")
        .env("TOPO_CONFIG", "/tmp/topo-cli-test-nonexistent/config.toml")
        .env_remove("TOPO_ENVIRONMENT")
        .env_remove("TOPO_URL")
        .env_remove("TOPO_DEFAULT_ENVIRONMENT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn mock_environment(host_entities: usize) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/entityTypes"))
        .and(header("Authorization", "Api-Token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": 2,
            "pageSize": 500,
            "types": [
                {"type": "HOST", "toRelationships": [{"id": "isSiteOf"}]},
                {"type": "SERVICE"}
            ]
        })))
        .mount(&server)
        .await;

    let hosts: Vec<_> = (1..=host_entities)
        .map(|i| json!({"entityId": format!("HOST-{i}"), "displayName": format!("host-{i}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/v2/entities"))
        .and(query_param("entitySelector", "type(\"HOST\")"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": host_entities,
            "pageSize": 500,
            "entities": hosts
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/entities"))
        .and(query_param("entitySelector", "type(\"SERVICE\")"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": 0,
            "pageSize": 500,
            "entities": []
        })))
        .mount(&server)
        .await;

    server
}

async fn run_download(server: &MockServer, out: &Path, extra: &[&str]) -> std::process::Output {
    let mut cmd = topo_cmd();
    cmd.env("TOPO_TEST_TOKEN", "test-token")
        .args(["--url", &server.uri(), "--token-env", "TOPO_TEST_TOKEN"])
        .args(["download", "entities", "--project", "demo", "--output-folder"])
        .arg(out)
        .args(extra);
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = topo_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    topo_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("download")
            .and(predicate::str::contains("types"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_download_entities_help_lists_flags() {
    topo_cmd()
        .args(["download", "entities", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--specific-types")
                .and(predicate::str::contains("--time-from-minutes"))
                .and(predicate::str::contains("--entity-page-size"))
                .and(predicate::str::contains("--concurrent-requests"))
                .and(predicate::str::contains("--force")),
        );
}

#[test]
fn test_version_flag() {
    topo_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("topo"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    topo_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    topo_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = topo_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_download_without_environment() {
    let out = tempfile::tempdir().unwrap();
    let output = topo_cmd()
        .args(["download", "entities", "--output-folder"])
        .arg(out.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("No environment configured"),
        "Expected missing environment error:\n{text}"
    );
}

#[test]
fn test_unknown_named_environment() {
    let output = topo_cmd()
        .args(["--env", "prod", "types"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("prod"));
}

#[test]
fn test_missing_token_env() {
    let output = topo_cmd()
        .env_remove("TOPO_TEST_UNSET_TOKEN")
        .args([
            "--url",
            "https://tenant.example.com",
            "--token-env",
            "TOPO_TEST_UNSET_TOKEN",
            "types",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_existing_project_folder_is_refused() {
    let out = tempfile::tempdir().unwrap();
    std::fs::create_dir(out.path().join("demo")).unwrap();

    let output = topo_cmd()
        .args(["download", "entities", "--project", "demo", "--output-folder"])
        .arg(out.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("--force"));
}

#[test]
fn test_parent_project_is_refused_even_with_force() {
    let out = tempfile::tempdir().unwrap();
    let output_folder = out.path().join("download");
    std::fs::create_dir(&output_folder).unwrap();
    let keep = out.path().join("keep.txt");
    std::fs::write(&keep, "x").unwrap();

    for project in ["..", "."] {
        let output = topo_cmd()
            .args(["--url", "https://tenant.example.com", "--token-env", "TOPO_TEST_TOKEN"])
            .env("TOPO_TEST_TOKEN", "test-token")
            .args(["download", "entities", "--force", "--project", project, "--output-folder"])
            .arg(&output_folder)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    }
    assert!(keep.is_file());
    assert!(output_folder.is_dir());
}

// ── Downloads against a mock environment ────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_download_writes_project() {
    let server = mock_environment(2).await;
    let out = tempfile::tempdir().unwrap();

    let output = run_download(&server, out.path(), &[]).await;
    let text = combined_output(&output);
    assert!(output.status.success(), "download failed:\n{text}");
    assert!(text.contains("Downloaded 1 entity types"), "{text}");

    let project = out.path().join("demo");
    assert!(project.join("HOST").join("config.yaml").is_file());
    assert!(project.join("ENTITY_TYPES_CATALOG").join("config.yaml").is_file());
    assert!(!project.join("SERVICE").exists());

    let json_files: Vec<_> = std::fs::read_dir(project.join("HOST"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .collect();
    assert_eq!(json_files.len(), 1);
    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_files[0].path()).unwrap()).unwrap();
    assert_eq!(content.as_array().map(Vec::len), Some(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_with_nothing_found_writes_nothing() {
    let server = mock_environment(0).await;
    let out = tempfile::tempdir().unwrap();

    let output = run_download(&server, out.path(), &[]).await;
    assert!(output.status.success());
    assert!(combined_output(&output).contains("No entities were found"));
    assert!(!out.path().join("demo").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_unknown_specific_type() {
    let server = mock_environment(1).await;
    let out = tempfile::tempdir().unwrap();

    let output = run_download(&server, out.path(), &["--specific-types", "HOST,GHOST_TYPE"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("GHOST_TYPE"));
    assert!(!out.path().join("demo").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_replaces_existing_project() {
    let server = mock_environment(1).await;
    let out = tempfile::tempdir().unwrap();
    let stale = out.path().join("demo").join("STALE_TYPE");
    std::fs::create_dir_all(&stale).unwrap();

    let output = run_download(&server, out.path(), &["--force"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(!stale.exists());
    assert!(out.path().join("demo").join("HOST").is_dir());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_types_lists_catalog() {
    let server = mock_environment(0).await;
    let mut cmd = topo_cmd();
    cmd.env("TOPO_TEST_TOKEN", "test-token").args([
        "--url",
        &server.uri(),
        "--token-env",
        "TOPO_TEST_TOKEN",
        "types",
        "--output",
        "plain",
    ]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "HOST\nSERVICE\n");
}
