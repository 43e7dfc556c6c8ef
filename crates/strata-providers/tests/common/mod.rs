//! Common test helpers for strata-providers integration tests
//!
//! - Recording [`HelmClient`] / [`StreamBackend`] doubles with failure injection
//! - A fake `helm` executable that logs its arguments and stdin
//! - Module / release fixtures

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use strata_core::types::{Module, ModuleRelease, RecordId, ReleaseRequest};
use strata_core::{Error, Result};
use strata_providers::{ChartRelease, HelmClient, StreamBackend, StreamComponent};

// ─── Recording doubles ───────────────────────────────────────────────────────

/// Records calls as `"<operation> <key>"` strings
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl CallLog {
    pub fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }
}

/// Helm double; operations on keys listed in `fail_on` return a provider error
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingHelm {
    pub log: CallLog,
    pub fail_on: Mutex<Vec<String>>,
    pub missing: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingHelm {
    pub fn failing(keys: &[&str]) -> Self {
        let helm = Self::default();
        *helm.fail_on.lock().unwrap() = keys.iter().map(|k| k.to_string()).collect();
        helm
    }

    pub fn mark_missing(&self, key: &str) {
        self.missing.lock().unwrap().push(key.to_string());
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.fail_on.lock().unwrap().iter().any(|k| k == key) {
            return Err(Error::provider("chart", format!("helm failed for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl HelmClient for RecordingHelm {
    async fn add_or_update_repo(&self, name: &str, _url: &str) -> Result<()> {
        self.log.record(format!("repo {}", name));
        Ok(())
    }

    async fn upgrade_install(&self, release: &ChartRelease) -> Result<()> {
        self.log.record(format!("upgrade {}", release.release_name));
        self.check(&release.release_name)
    }

    async fn uninstall(&self, release_name: &str, _namespace: &str) -> Result<()> {
        self.log.record(format!("uninstall {}", release_name));
        if self.missing.lock().unwrap().iter().any(|k| k == release_name) {
            return Err(Error::not_found("helm release", release_name));
        }
        self.check(release_name)
    }
}

#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingStreams {
    pub log: CallLog,
}

#[async_trait]
impl StreamBackend for RecordingStreams {
    async fn create_stream(&self, stream: &StreamComponent) -> Result<()> {
        self.log.record(format!("create {}", stream.name));
        Ok(())
    }

    async fn update_shard_count(&self, stream: &StreamComponent) -> Result<()> {
        self.log
            .record(format!("reshard {} {}", stream.name, stream.shards));
        Ok(())
    }

    async fn delete_stream(&self, stream: &StreamComponent) -> Result<()> {
        self.log.record(format!("delete {}", stream.name));
        Ok(())
    }
}

// ─── Fake executables ────────────────────────────────────────────────────────

/// Writes a fake `helm` into `dir` and returns its path
///
/// The script appends its arguments to `helm.log`, copies stdin to
/// `helm.stdin` when `--values -` is passed, prints `stderr` to stderr and
/// exits with `exit_code`.
#[allow(dead_code)]
pub fn create_mock_helm(dir: &Path, stderr: &str, exit_code: i32) -> PathBuf {
    let script_path = dir.join("helm");
    let script = format!(
        r#"#!/bin/sh
echo "$*" >> "{log}"
case "$*" in
  *"--values -"*) cat > "{stdin}" ;;
esac
printf '%s' '{stderr}' >&2
exit {exit_code}
"#,
        log = dir.join("helm.log").display(),
        stdin = dir.join("helm.stdin").display(),
        stderr = stderr,
        exit_code = exit_code,
    );
    std::fs::write(&script_path, script).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    script_path
}

/// Lines logged by the fake `helm`
#[allow(dead_code)]
pub fn helm_invocations(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("helm.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[allow(dead_code)]
pub fn module() -> Module {
    Module {
        id: 1,
        name: "analytics".to_string(),
        version: "1.0.0".to_string(),
        spec: String::new(),
        created_at: chrono::Utc::now(),
    }
}

#[allow(dead_code)]
pub fn release(id: RecordId, revision: u32) -> ModuleRelease {
    let mut release =
        ModuleRelease::draft(&ReleaseRequest::new("analytics-prod", ""), &module(), revision);
    release.id = id;
    release
}
