//! Secret provider trait and implementations

pub mod file;
pub mod vault;

use crate::types::{SecretReference, SecretValue};
use async_trait::async_trait;
use strata_core::Result;

/// A backend that resolves `path:field` references to plaintext
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Provider name for log and error messages
    fn name(&self) -> &'static str;

    /// Resolve one reference
    ///
    /// Returns `Error::NotFound` when the path or field does not exist.
    async fn get_secret(&self, reference: &SecretReference) -> Result<SecretValue>;
}

pub use file::FileSecretProvider;
pub use vault::{RetryConfig, VaultConfig, VaultSecretProvider};
