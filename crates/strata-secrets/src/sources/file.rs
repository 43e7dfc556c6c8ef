//! File-backed secret provider
//!
//! References take the form `<relative/file.yaml>:<field>`. The file is a
//! YAML (or JSON) mapping read from under a fixed base directory; paths that
//! are absolute or climb out of the base directory are rejected.

use crate::sources::SecretProvider;
use crate::types::{SecretReference, SecretValue};
use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde_yaml_ng::Value;
use strata_core::{Error, Result};
use tracing::debug;

pub struct FileSecretProvider {
    base_dir: Utf8PathBuf,
}

impl FileSecretProvider {
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve_path(&self, reference: &SecretReference) -> Result<Utf8PathBuf> {
        let relative = Utf8Path::new(reference.path());
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_)
            )
        });
        if escapes {
            return Err(Error::invalid_reference(
                reference.to_string(),
                "path must stay inside the secrets directory",
            ));
        }
        Ok(self.base_dir.join(relative))
    }
}

#[async_trait]
impl SecretProvider for FileSecretProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get_secret(&self, reference: &SecretReference) -> Result<SecretValue> {
        let path = self.resolve_path(reference)?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found("secret file", path.as_str())
            } else {
                Error::provider("file", format!("cannot read {}: {}", path, e))
            }
        })?;

        let document: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::provider("file", format!("cannot parse {}: {}", path, e)))?;

        let value = document
            .get(reference.field())
            .ok_or_else(|| Error::not_found("secret field", reference.to_string()))?;

        let plaintext = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(Error::provider(
                    "file",
                    format!("field '{}' is not a scalar", reference.field()),
                ))
            }
        };

        debug!("Resolved secret from file: {}", path);
        Ok(SecretValue::new(plaintext))
    }
}
