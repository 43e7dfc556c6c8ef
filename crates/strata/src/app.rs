//! Wiring from configuration to a ready orchestrator

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::sync::Arc;
use strata_core::config::AppConfig;
use strata_providers::{ChartProvider, HelmCli, KinesisBackend, ProviderRegistry, StreamProvider};
use strata_release::{Orchestrator, ReleaseContext};
use strata_secrets::{FileSecretProvider, SecretRegistry, VaultConfig, VaultSecretProvider};
use strata_store::{ComponentRecords, StateStore};
use tracing::{debug, warn};

/// Load configuration and build the orchestrator on top of the state store
pub fn orchestrator(config_path: Option<&Utf8Path>) -> Result<Orchestrator> {
    let config = AppConfig::load(config_path).context("Failed to load configuration")?;
    let store = Arc::new(
        StateStore::open(config.store.path.clone())
            .with_context(|| format!("Failed to open state store {}", config.store.path))?,
    );

    let providers = component_providers(&config, store.clone())?;
    let secrets = secret_providers(&config);
    debug!(
        "Providers: [{}], secret providers: [{}]",
        providers.names().join(", "),
        secrets.names().join(", ")
    );

    let ctx = ReleaseContext::new(store, providers, secrets)
        .with_dispatch_timeout(config.dispatch_timeout());
    Ok(Orchestrator::new(ctx))
}

/// Chart is always registered; stream only when enabled
pub fn component_providers(
    config: &AppConfig,
    records: Arc<dyn ComponentRecords>,
) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    let helm = HelmCli::new(config.kubernetes.kube_context.clone());
    if !helm.is_available() {
        warn!("helm not found on PATH; chart components cannot be dispatched");
    }
    registry.register(ChartProvider::new(
        Arc::new(helm),
        records.clone(),
        &config.kubernetes,
        &config.chart_repo,
    ))?;

    if config.stream.enabled {
        let region = config.stream.region.clone().unwrap_or_default();
        registry.register(StreamProvider::new(
            Arc::new(KinesisBackend::new()),
            records,
            region,
        ))?;
    }

    Ok(registry)
}

/// File secrets are always available; Vault only with an address and token
pub fn secret_providers(config: &AppConfig) -> SecretRegistry {
    let mut registry = SecretRegistry::new();
    registry.register(Arc::new(FileSecretProvider::new(
        config.file_secrets.base_dir.clone(),
    )));
    if config.vault.is_configured() {
        registry.register(Arc::new(VaultSecretProvider::new(VaultConfig::from(
            &config.vault,
        ))));
    }
    registry
}
