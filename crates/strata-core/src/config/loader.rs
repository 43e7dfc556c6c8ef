//! Configuration file loading and environment overrides

use super::{
    ChartRepoConfig, FileSecretsConfig, KubernetesConfig, OrchestratorConfig, StoreConfig,
    StreamConfig, VaultSettings,
};
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::debug;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["strata.yaml", "strata.yml"];

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub kubernetes: KubernetesConfig,
    pub chart_repo: ChartRepoConfig,
    pub vault: VaultSettings,
    pub file_secrets: FileSecretsConfig,
    pub stream: StreamConfig,
    pub orchestrator: OrchestratorConfig,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<Utf8PathBuf>,
}

impl AppConfig {
    /// Load from `path`, or search for a config file; fall back to defaults
    ///
    /// An explicit path that does not exist is an error. Environment
    /// overrides are applied in every case.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::find_config()? {
                Some(p) => Self::from_file(&p)?,
                None => {
                    debug!("No strata.yaml found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without applying environment overrides
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        let mut config: AppConfig = serde_yaml_ng::from_str(&content)?;
        config.source = Some(path.to_owned());
        debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Search the current directory and its parents
    fn find_config() -> Result<Option<Utf8PathBuf>> {
        let cwd = std::env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))?;

        let mut current = Some(cwd.as_path());
        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Ok(Some(candidate));
                }
            }
            current = dir.parent();
        }
        Ok(None)
    }

    /// Overlay values from the environment
    ///
    /// Takes a lookup function so tests can supply their own environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("STRATA_STORE_PATH") {
            self.store.path = Utf8PathBuf::from(path);
        }
        if let Some(ns) = non_empty("KUBERNETES_DEFAULT_NAMESPACE") {
            self.kubernetes.default_namespace = ns;
        }
        if let Some(list) = non_empty("KUBERNETES_AVAILABLE_NAMESPACE") {
            self.kubernetes.available_namespaces = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(name) = non_empty("CHART_REPO_NAME") {
            self.chart_repo.name = name;
        }
        if let Some(url) = non_empty("CHART_REPO_URL") {
            self.chart_repo.url = url;
        }
        if let Some(addr) = non_empty("VAULT_ADDR") {
            self.vault.address = addr;
        }
        if let Some(token) = non_empty("VAULT_TOKEN") {
            self.vault.token = token;
        }
        if let Some(ns) = non_empty("VAULT_NAMESPACE") {
            self.vault.namespace = Some(ns);
        }
        if let Some(region) = non_empty("AWS_REGION") {
            self.stream.region = Some(region);
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.kubernetes.default_namespace.is_empty() {
            return Err(Error::invalid_config(
                "kubernetes.default_namespace must not be empty",
            ));
        }
        if !self
            .kubernetes
            .available_namespaces
            .contains(&self.kubernetes.default_namespace)
        {
            return Err(Error::invalid_config(format!(
                "kubernetes.default_namespace '{}' is not listed in available_namespaces",
                self.kubernetes.default_namespace
            )));
        }
        if self.orchestrator.dispatch_timeout_secs == 0 {
            return Err(Error::invalid_config(
                "orchestrator.dispatch_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestrator.dispatch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("strata.yaml")).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kubernetes.default_namespace, "default");
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(600));
        assert!(!config.vault.is_configured());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
kubernetes:
  default_namespace: data
  available_namespaces: [data, default]
chart_repo:
  name: internal
  url: https://charts.example.com
orchestrator:
  dispatch_timeout_secs: 120
"#,
        );
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.kubernetes.default_namespace, "data");
        assert!(config.chart_repo.is_configured());
        assert_eq!(config.orchestrator.dispatch_timeout_secs, 120);
        assert_eq!(config.vault.timeout_secs, 30);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = AppConfig::from_file(Utf8Path::new("/nonexistent/strata.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("KUBERNETES_AVAILABLE_NAMESPACE", "a, b ,c"),
            ("KUBERNETES_DEFAULT_NAMESPACE", "b"),
            ("VAULT_ADDR", "https://vault.example.com"),
            ("VAULT_TOKEN", "t0ken"),
            ("CHART_REPO_URL", ""),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.kubernetes.available_namespaces, vec!["a", "b", "c"]);
        assert_eq!(config.kubernetes.default_namespace, "b");
        assert!(config.vault.is_configured());
        assert!(config.chart_repo.url.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unlisted_default_namespace() {
        let mut config = AppConfig::default();
        config.kubernetes.default_namespace = "other".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("available_namespaces"));
    }

    #[test]
    #[serial]
    fn test_load_explicit_path_applies_process_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "store:\n  path: /tmp/from-file.json\n");

        std::env::set_var("STRATA_STORE_PATH", "/tmp/from-env.json");
        let config = AppConfig::load(Some(&path));
        std::env::remove_var("STRATA_STORE_PATH");

        assert_eq!(config.unwrap().store.path, Utf8PathBuf::from("/tmp/from-env.json"));
    }
}
