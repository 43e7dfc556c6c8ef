//! HashiCorp Vault secret provider (KV v2)
//!
//! References take the form `<mount>/<path>:<field>`. A `data/` segment right
//! after the mount is accepted and stripped, so raw KV v2 API paths such as
//! `secret/data/app:password` work too.

use crate::sources::SecretProvider;
use crate::types::{SecretReference, SecretValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strata_core::config::VaultSettings;
use strata_core::{Error, Result};
use tracing::{debug, warn};
use vaultrs::client::{Client, VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

pub struct VaultSecretProvider {
    config: Arc<VaultConfig>,
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub address: String,
    pub token: String,
    pub namespace: Option<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl From<&VaultSettings> for VaultConfig {
    fn from(settings: &VaultSettings) -> Self {
        Self {
            address: settings.address.clone(),
            token: settings.token.clone(),
            namespace: settings.namespace.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            retry: RetryConfig::default(),
        }
    }
}

/// Mount and KV path split out of a reference path
#[derive(Debug, PartialEq, Eq)]
struct KvLocation<'a> {
    mount: &'a str,
    path: &'a str,
}

fn split_location<'a>(reference: &'a SecretReference) -> Result<KvLocation<'a>> {
    let (mount, rest) = reference
        .path()
        .trim_matches('/')
        .split_once('/')
        .ok_or_else(|| {
            Error::invalid_reference(reference.to_string(), "expected '<mount>/<path>:<field>'")
        })?;
    let path = rest.strip_prefix("data/").unwrap_or(rest);
    if mount.is_empty() || path.is_empty() {
        return Err(Error::invalid_reference(
            reference.to_string(),
            "expected '<mount>/<path>:<field>'",
        ));
    }
    Ok(KvLocation { mount, path })
}

impl VaultSecretProvider {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.address.is_empty() && !self.config.token.is_empty()
    }

    fn create_client(&self) -> Result<VaultClient> {
        let mut settings = VaultClientSettingsBuilder::default();
        settings.address(&self.config.address);
        settings.timeout(Some(self.config.timeout));

        if let Some(ns) = &self.config.namespace {
            settings.namespace(Some(ns.clone()));
        }

        let settings = settings
            .build()
            .map_err(|e| Error::provider("vault", format!("invalid client settings: {}", e)))?;
        let mut client =
            VaultClient::new(settings).map_err(|e| Error::provider("vault", e))?;
        client.set_token(&self.config.token);
        Ok(client)
    }

    async fn read_field_with_retry(&self, location: &KvLocation<'_>, field: &str) -> Result<String> {
        let mut attempt = 0;
        let mut delay = self.config.retry.base_delay;

        loop {
            let client = self.create_client()?;

            match kv2::read::<HashMap<String, serde_json::Value>>(
                &client,
                location.mount,
                location.path,
            )
            .await
            {
                Ok(data) => {
                    let value = data.get(field).ok_or_else(|| {
                        Error::not_found(
                            "vault secret field",
                            format!("{}/{}:{}", location.mount, location.path, field),
                        )
                    })?;
                    let value = value.as_str().ok_or_else(|| {
                        Error::provider("vault", format!("field '{}' is not a string", field))
                    })?;
                    debug!(
                        "Read secret from Vault: {}/{}",
                        location.mount, location.path
                    );
                    return Ok(value.to_string());
                }
                Err(ClientError::APIError { code: 404, .. }) => {
                    return Err(Error::not_found(
                        "vault secret",
                        format!("{}/{}", location.mount, location.path),
                    ));
                }
                Err(e) if attempt + 1 < self.config.retry.max_attempts => {
                    warn!(
                        "Vault request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.retry.max_attempts,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.retry.max_delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::provider(
                        "vault",
                        format!(
                            "read failed after {} attempts: {}",
                            self.config.retry.max_attempts, e
                        ),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl SecretProvider for VaultSecretProvider {
    fn name(&self) -> &'static str {
        "vault"
    }

    async fn get_secret(&self, reference: &SecretReference) -> Result<SecretValue> {
        let location = split_location(reference)?;
        if !self.is_configured() {
            return Err(Error::provider(
                "vault",
                "not configured (VAULT_ADDR and VAULT_TOKEN required)",
            ));
        }
        let value = self
            .read_field_with_retry(&location, reference.field())
            .await?;
        Ok(SecretValue::new(value))
    }
}
