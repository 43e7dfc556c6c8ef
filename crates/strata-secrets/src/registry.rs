//! Secret provider registry and release-value substitution
//!
//! Release values may carry a reserved `secret` key:
//!
//! ```yaml
//! replicas: 2
//! secret:
//!   vault:
//!     password: secret/app/db:password
//!   file:
//!     api_key: keys.yaml:api
//! ```
//!
//! [`resolve_values`] replaces every reference under `secret.<provider>` with
//! its plaintext. Every reference is parsed and every provider name checked
//! before the first lookup, so a bad reference never leaves a half-resolved
//! document behind.

use crate::sources::SecretProvider;
use crate::types::SecretReference;
use serde_yaml_ng::{Mapping, Value};
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{Error, Result};
use tracing::debug;

/// Reserved key in release values holding secret references
pub const SECRET_KEY: &str = "secret";

/// Name to secret provider mapping, fixed at startup
#[derive(Default, Clone)]
pub struct SecretRegistry {
    providers: HashMap<String, Arc<dyn SecretProvider>>,
}

impl SecretRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name
    pub fn register(&mut self, provider: Arc<dyn SecretProvider>) {
        let name = provider.name().to_string();
        self.register_as(name, provider);
    }

    /// Register a provider under an explicit name
    pub fn register_as(&mut self, name: impl Into<String>, provider: Arc<dyn SecretProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SecretProvider>> {
        self.providers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

struct PendingSecret {
    provider: String,
    field: Value,
    reference: SecretReference,
}

/// Parse raw release values into a mapping
///
/// Empty or null input yields an empty mapping.
pub fn parse_values(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    let value: Value = serde_yaml_ng::from_str(raw)
        .map_err(|e| Error::invalid_request(format!("release values are not valid YAML: {}", e)))?;
    match value {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        Value::Mapping(_) => Ok(value),
        _ => Err(Error::invalid_request("release values must be a mapping")),
    }
}

/// Resolve `values.secret` in place
///
/// Returns the number of references resolved.
pub async fn resolve_values(values: &mut Value, registry: &SecretRegistry) -> Result<usize> {
    let pending = collect_references(values, registry)?;
    if pending.is_empty() {
        return Ok(0);
    }

    let mut resolved = Vec::with_capacity(pending.len());
    for item in &pending {
        let provider = registry
            .get(&item.provider)
            .ok_or_else(|| Error::unknown_secret_provider(&item.provider))?;
        let secret = provider.get_secret(&item.reference).await?;
        debug!(
            "Resolved secret {}.{} via {}",
            item.provider,
            field_label(&item.field),
            provider.name()
        );
        resolved.push(Value::String(secret.expose().to_string()));
    }

    let secrets = values
        .get_mut(SECRET_KEY)
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| Error::invalid_request("secret section disappeared during resolution"))?;
    let count = pending.len();
    for (item, plaintext) in pending.into_iter().zip(resolved) {
        if let Some(fields) = secrets
            .get_mut(item.provider.as_str())
            .and_then(Value::as_mapping_mut)
        {
            fields.insert(item.field, plaintext);
        }
    }

    Ok(count)
}

fn collect_references(values: &Value, registry: &SecretRegistry) -> Result<Vec<PendingSecret>> {
    let map = values
        .as_mapping()
        .ok_or_else(|| Error::invalid_request("release values must be a mapping"))?;

    let section = match map.get(SECRET_KEY) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(section)) => section,
        Some(_) => {
            return Err(Error::invalid_request(
                "'secret' must map provider names to field references",
            ))
        }
    };

    let mut pending = Vec::new();
    for (provider, fields) in section {
        let provider = provider.as_str().ok_or_else(|| {
            Error::invalid_request("secret provider names must be strings")
        })?;
        if !registry.contains(provider) {
            return Err(Error::unknown_secret_provider(provider));
        }

        let fields = match fields {
            Value::Mapping(fields) => fields,
            Value::Null => continue,
            _ => {
                return Err(Error::invalid_request(format!(
                    "secret.{} must map fields to references",
                    provider
                )))
            }
        };

        for (field, reference) in fields {
            let reference = reference.as_str().ok_or_else(|| {
                Error::invalid_reference(
                    format!("secret.{}.{}", provider, field_label(field)),
                    "reference must be a string",
                )
            })?;
            pending.push(PendingSecret {
                provider: provider.to_string(),
                field: field.clone(),
                reference: SecretReference::parse(reference)?,
            });
        }
    }
    Ok(pending)
}

fn field_label(field: &Value) -> String {
    match field {
        Value::String(s) => s.clone(),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
