//! End-to-end runs of the `strata` binary against a temporary state store
//!
//! Modules here render to an empty manifest, so no backing system is needed.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state.json");
        std::fs::write(
            dir.path().join("strata.yaml"),
            format!(
                "store:\n  path: {}\nfile_secrets:\n  base_dir: {}\n",
                state.display(),
                dir.path().display()
            ),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn strata(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_strata"))
            .arg("--quiet")
            .arg("--config")
            .arg(self.path("strata.yaml"))
            .args(args)
            .output()
            .unwrap()
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_module_add_and_list() {
    let ws = Workspace::new();
    let spec = ws.write("empty.tera", "{# renders nothing #}\n");

    let out = ws.strata(&["module", "add", "base", "1.0.0", "--spec", path_arg(&spec)]);
    assert!(out.status.success());

    let modules = stdout_json(&ws.strata(&["module", "list", "--json"]));
    assert_eq!(modules.as_array().unwrap().len(), 1);
    assert_eq!(modules[0]["name"], "base");
    assert_eq!(modules[0]["version"], "1.0.0");
}

#[test]
fn test_release_lifecycle_with_empty_manifest() {
    let ws = Workspace::new();
    let spec = ws.write("empty.tera", "{# renders nothing #}\n");
    let values = ws.write("values.yaml", "replicas: 2\n");
    ws.strata(&["module", "add", "base", "1.0.0", "--spec", path_arg(&spec)]);

    let installed = stdout_json(&ws.strata(&[
        "release",
        "install",
        "r1",
        "--module",
        "base",
        "-f",
        path_arg(&values),
        "--json",
    ]));
    assert_eq!(installed["revision"], 1);
    assert_eq!(installed["values"], "replicas: 2\n");

    let updated = stdout_json(&ws.strata(&[
        "release", "update", "r1", "--module", "base", "--version", "1.0.0", "--json",
    ]));
    assert_eq!(updated["revision"], 2);

    let names = stdout_json(&ws.strata(&["release", "list", "--json"]));
    assert_eq!(names, serde_json::json!(["r1"]));

    let detail = stdout_json(&ws.strata(&["release", "get", "r1", "--json"]));
    assert_eq!(detail["name"], "r1");
    assert_eq!(detail["revision"], 2);
    assert_eq!(detail["components"], serde_json::json!([]));

    let out = ws.strata(&["release", "delete", "r1", "--yes"]);
    assert!(out.status.success());
    let names = stdout_json(&ws.strata(&["release", "list", "--json"]));
    assert_eq!(names, serde_json::json!([]));
}

#[test]
fn test_unknown_module_fails() {
    let ws = Workspace::new();
    let out = ws.strata(&["release", "install", "r1", "--module", "missing"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not found"));
}

#[test]
fn test_invalid_failure_policy_is_rejected() {
    let ws = Workspace::new();
    let out = ws.strata(&[
        "release",
        "install",
        "r1",
        "--module",
        "base",
        "--on-failure",
        "retry",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--on-failure"));
}
