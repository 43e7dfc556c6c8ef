//! Application configuration
//!
//! Loaded from `strata.yaml` (searched upward from the working directory) or
//! an explicit path, then overlaid with environment variables. Every section
//! has defaults so the CLI runs with no file at all.

mod loader;

pub use loader::{AppConfig, CONFIG_FILE_NAMES};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Local state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file holding modules, releases and component records
    pub path: Utf8PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::home_dir()
            .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
            .map(|home| home.join(".strata").join("state.json"))
            .unwrap_or_else(|| Utf8PathBuf::from(".strata/state.json"));
        Self { path }
    }
}

/// Kubernetes access for the chart provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub default_namespace: String,
    /// Namespaces charts may be installed into
    pub available_namespaces: Vec<String>,
    /// kubectl context passed to helm, if not the current one
    pub kube_context: Option<String>,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            default_namespace: "default".to_string(),
            available_namespaces: vec!["default".to_string()],
            kube_context: None,
        }
    }
}

/// Helm chart repository the chart provider installs from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartRepoConfig {
    pub name: String,
    pub url: String,
}

impl ChartRepoConfig {
    pub fn is_configured(&self) -> bool {
        !self.name.is_empty() && !self.url.is_empty()
    }
}

/// HashiCorp Vault secret provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    pub address: String,
    pub token: String,
    pub namespace: Option<String>,
    pub timeout_secs: u64,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            token: String::new(),
            namespace: None,
            timeout_secs: 30,
        }
    }
}

impl VaultSettings {
    pub fn is_configured(&self) -> bool {
        !self.address.is_empty() && !self.token.is_empty()
    }
}

/// File-backed secret provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSecretsConfig {
    pub base_dir: Utf8PathBuf,
}

impl Default for FileSecretsConfig {
    fn default() -> Self {
        Self {
            base_dir: Utf8PathBuf::from("."),
        }
    }
}

/// Managed data stream provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub enabled: bool,
    pub region: Option<String>,
}

/// Release orchestration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Deadline for each call into a backing system
    pub dispatch_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: 600,
        }
    }
}
