//! Helm chart provider
//!
//! Components are helm releases. Rendered specs look like:
//!
//! ```yaml
//! chart:
//!   - name: bitnami/redis
//!     release_name: cache
//!     version: 18.1.0
//!     namespace: data
//!     values:
//!       replica:
//!         replicaCount: 2
//! ```
//!
//! `values` is stored as YAML text and handed to helm on stdin. A missing
//! `namespace` falls back to the configured default, and every namespace must
//! be one of the configured available namespaces.

use crate::traits::{next_revision, Component, ComponentProvider};
use crate::utils::{command_exists, failure_message, run_command_async};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strata_core::config::{ChartRepoConfig, KubernetesConfig};
use strata_core::types::{Module, ModuleRelease, RawComponent, RecordId};
use strata_core::{Error, Result};
use strata_store::{ComponentRecords, ComponentTable};
use tracing::{debug, info};

pub const PROVIDER_NAME: &str = "chart";

/// Helm waits this long for resources to become ready
pub const HELM_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRelease {
    /// Chart reference, e.g. `bitnami/redis`
    pub name: String,
    pub release_name: String,
    #[serde(default)]
    pub version: String,
    /// Values as YAML text
    #[serde(default)]
    pub values: String,
    pub namespace: String,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub module_release_id: RecordId,
}

impl Component for ChartRelease {
    fn key(&self) -> &str {
        &self.release_name
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn module_release_id(&self) -> RecordId {
        self.module_release_id
    }
}

/// Shape of a rendered chart spec
#[derive(Debug, Deserialize)]
struct ChartSpec {
    name: String,
    release_name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    values: serde_yaml_ng::Value,
    #[serde(default)]
    namespace: String,
}

/// The helm operations the chart provider needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HelmClient: Send + Sync {
    async fn add_or_update_repo(&self, name: &str, url: &str) -> Result<()>;

    /// `helm upgrade --install`, waiting for readiness
    async fn upgrade_install(&self, release: &ChartRelease) -> Result<()>;

    /// Fails with `NotFound` when the release does not exist
    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<()>;
}

/// [`HelmClient`] backed by the `helm` binary
pub struct HelmCli {
    binary: String,
    kube_context: Option<String>,
    timeout: Duration,
}

impl HelmCli {
    pub fn new(kube_context: Option<String>) -> Self {
        Self {
            binary: "helm".to_string(),
            kube_context,
            timeout: HELM_TIMEOUT,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn context_args(&self, args: &mut Vec<String>) {
        if let Some(ctx) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(ctx.clone());
        }
    }

    async fn run(&self, args: Vec<String>, stdin: Option<&str>) -> Result<std::process::Output> {
        run_command_async(PROVIDER_NAME, &self.binary, &args, stdin).await
    }
}

fn helm_duration(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    format!("{}m{}s", secs / 60, secs % 60)
}

#[async_trait]
impl HelmClient for HelmCli {
    async fn add_or_update_repo(&self, name: &str, url: &str) -> Result<()> {
        let args = vec![
            "repo".to_string(),
            "add".to_string(),
            name.to_string(),
            url.to_string(),
            "--force-update".to_string(),
        ];
        let output = self.run(args, None).await?;
        if !output.status.success() {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("helm repo add {} failed: {}", name, failure_message(&output)),
            ));
        }
        Ok(())
    }

    async fn upgrade_install(&self, release: &ChartRelease) -> Result<()> {
        let mut args = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            release.release_name.clone(),
            release.name.clone(),
            "--namespace".to_string(),
            release.namespace.clone(),
            "--wait".to_string(),
            "--timeout".to_string(),
            helm_duration(self.timeout),
        ];
        if !release.version.is_empty() {
            args.push("--version".to_string());
            args.push(release.version.clone());
        }
        let values = (!release.values.trim().is_empty()).then_some(release.values.as_str());
        if values.is_some() {
            args.push("--values".to_string());
            args.push("-".to_string());
        }
        self.context_args(&mut args);

        let output = self.run(args, values).await?;
        if !output.status.success() {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!(
                    "helm upgrade --install {} failed: {}",
                    release.release_name,
                    failure_message(&output)
                ),
            ));
        }
        Ok(())
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<()> {
        let mut args = vec![
            "uninstall".to_string(),
            release_name.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        self.context_args(&mut args);

        let output = self.run(args, None).await?;
        if output.status.success() {
            return Ok(());
        }
        let message = failure_message(&output);
        if message.contains("not found") {
            return Err(Error::not_found("helm release", release_name));
        }
        Err(Error::provider(
            PROVIDER_NAME,
            format!("helm uninstall {} failed: {}", release_name, message),
        ))
    }
}

pub struct ChartProvider {
    helm: Arc<dyn HelmClient>,
    table: ComponentTable<ChartRelease>,
    default_namespace: String,
    available_namespaces: Vec<String>,
    repo: Option<ChartRepoConfig>,
}

impl ChartProvider {
    pub fn new(
        helm: Arc<dyn HelmClient>,
        records: Arc<dyn ComponentRecords>,
        kubernetes: &KubernetesConfig,
        repo: &ChartRepoConfig,
    ) -> Self {
        Self {
            helm,
            table: ComponentTable::new(records, PROVIDER_NAME),
            default_namespace: kubernetes.default_namespace.clone(),
            available_namespaces: kubernetes.available_namespaces.clone(),
            repo: repo.is_configured().then(|| repo.clone()),
        }
    }

    fn check_namespace(&self, namespace: &str) -> Result<()> {
        if self.available_namespaces.iter().any(|ns| ns == namespace) {
            Ok(())
        } else {
            Err(Error::provider(
                PROVIDER_NAME,
                format!("unknown namespace '{}'", namespace),
            ))
        }
    }

    async fn deploy(&self, release: &ChartRelease) -> Result<()> {
        self.check_namespace(&release.namespace)?;
        if let Some(repo) = &self.repo {
            self.helm.add_or_update_repo(&repo.name, &repo.url).await?;
        }
        self.helm.upgrade_install(release).await?;
        info!(
            "Helm release {} deployed to {} (revision {})",
            release.release_name, release.namespace, release.revision
        );
        Ok(())
    }
}

#[async_trait]
impl ComponentProvider for ChartProvider {
    type Component = ChartRelease;

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn convert(&self, raw: &RawComponent) -> Result<ChartRelease> {
        let spec: ChartSpec = serde_yaml_ng::from_value(raw.clone())
            .map_err(|e| Error::conversion(PROVIDER_NAME, e))?;

        if spec.name.trim().is_empty() {
            return Err(Error::conversion(PROVIDER_NAME, "chart name is empty"));
        }
        if spec.release_name.trim().is_empty() {
            return Err(Error::conversion(PROVIDER_NAME, "release_name is empty"));
        }

        let values = match &spec.values {
            serde_yaml_ng::Value::Null => String::new(),
            other => {
                serde_yaml_ng::to_string(other).map_err(|e| Error::conversion(PROVIDER_NAME, e))?
            }
        };
        let namespace = if spec.namespace.is_empty() {
            self.default_namespace.clone()
        } else {
            spec.namespace
        };

        Ok(ChartRelease {
            name: spec.name,
            release_name: spec.release_name,
            version: spec.version,
            values,
            namespace,
            revision: 0,
            module_release_id: 0,
        })
    }

    fn pre_process(
        &self,
        component: ChartRelease,
        previous: Option<&ChartRelease>,
        _module: &Module,
        release: &ModuleRelease,
    ) -> Result<ChartRelease> {
        Ok(ChartRelease {
            module_release_id: release.id,
            revision: next_revision(previous),
            ..component
        })
    }

    async fn install_component(&self, component: &ChartRelease) -> Result<()> {
        self.deploy(component).await
    }

    async fn update_component(&self, component: &ChartRelease) -> Result<()> {
        self.deploy(component).await
    }

    /// No namespace check: a release deployed before its namespace left the
    /// allow-list must still be removable.
    async fn uninstall_component(&self, component: &ChartRelease) -> Result<()> {
        match self
            .helm
            .uninstall(&component.release_name, &component.namespace)
            .await
        {
            Ok(()) => {
                info!("Helm release {} uninstalled", component.release_name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Helm release {} already gone", component.release_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_detail(&self, key: &str) -> Result<ChartRelease> {
        self.table.get(key).await
    }

    async fn get_from_module_release_id(&self, id: RecordId) -> Result<Vec<ChartRelease>> {
        self.table.by_release(id).await
    }

    async fn get_all_name(&self) -> Result<Vec<String>> {
        self.table.names().await
    }

    async fn add(&self, component: &ChartRelease) -> Result<()> {
        self.table
            .add(&component.release_name, component.module_release_id, component)
            .await
    }

    async fn update(&self, component: &ChartRelease) -> Result<()> {
        self.table
            .update(&component.release_name, component.module_release_id, component)
            .await
    }

    async fn remove(&self, component: &ChartRelease) -> Result<()> {
        self.table.remove(&component.release_name).await
    }
}
