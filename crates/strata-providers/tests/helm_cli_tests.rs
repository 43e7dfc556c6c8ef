//! `HelmCli` against a fake `helm` executable
//!
//! The fake logs its arguments so the tests can check the exact command
//! line, and copies stdin so values delivery can be checked too.

#![cfg(unix)]

mod common;

use common::*;
use strata_core::Error;
use strata_providers::{ChartRelease, HelmCli, HelmClient};
use tempfile::TempDir;

fn release(values: &str) -> ChartRelease {
    ChartRelease {
        name: "stable/redis".to_string(),
        release_name: "cache".to_string(),
        version: "18.1.0".to_string(),
        values: values.to_string(),
        namespace: "data".to_string(),
        revision: 1,
        module_release_id: 1,
    }
}

fn cli(dir: &TempDir, stderr: &str, exit_code: i32) -> HelmCli {
    let helm = create_mock_helm(dir.path(), stderr, exit_code);
    HelmCli::new(Some("staging".to_string())).with_binary(helm.to_string_lossy())
}

#[tokio::test]
async fn test_upgrade_install_command_line() {
    let dir = TempDir::new().unwrap();
    cli(&dir, "", 0)
        .upgrade_install(&release("replicas: 2\n"))
        .await
        .unwrap();

    let calls = helm_invocations(dir.path());
    assert_eq!(
        calls,
        vec![
            "upgrade --install cache stable/redis --namespace data --wait --timeout 5m0s \
             --version 18.1.0 --values - --kube-context staging"
        ]
    );
    let stdin = std::fs::read_to_string(dir.path().join("helm.stdin")).unwrap();
    assert_eq!(stdin, "replicas: 2\n");
}

#[tokio::test]
async fn test_upgrade_install_without_values_skips_stdin() {
    let dir = TempDir::new().unwrap();
    cli(&dir, "", 0).upgrade_install(&release("")).await.unwrap();

    let calls = helm_invocations(dir.path());
    assert!(!calls[0].contains("--values"));
    assert!(!dir.path().join("helm.stdin").exists());
}

#[tokio::test]
async fn test_repo_add() {
    let dir = TempDir::new().unwrap();
    cli(&dir, "", 0)
        .add_or_update_repo("stable", "https://charts.example.com")
        .await
        .unwrap();
    assert_eq!(
        helm_invocations(dir.path()),
        vec!["repo add stable https://charts.example.com --force-update"]
    );
}

#[tokio::test]
async fn test_failed_upgrade_is_provider_error() {
    let dir = TempDir::new().unwrap();
    let err = cli(&dir, "Error: timed out waiting for the condition", 1)
        .upgrade_install(&release(""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_uninstall_missing_release_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = cli(&dir, "Error: uninstall: Release not loaded: cache: release: not found", 1)
        .uninstall("cache", "data")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        helm_invocations(dir.path()),
        vec!["uninstall cache --namespace data --kube-context staging"]
    );
}
