//! Secret resolution for Strata release values
//!
//! - **types**: `path:field` references and zeroizing plaintext values
//! - **sources**: the [`SecretProvider`] contract with Vault and file backends
//! - **registry**: name to provider mapping and `values.secret` substitution

pub mod registry;
pub mod sources;
pub mod types;

pub use registry::{parse_values, resolve_values, SecretRegistry, SECRET_KEY};
pub use sources::{
    FileSecretProvider, RetryConfig, SecretProvider, VaultConfig, VaultSecretProvider,
};
pub use types::{SecretReference, SecretValue};
