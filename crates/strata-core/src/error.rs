//! Error types for strata-core

use thiserror::Error;

/// Result type alias using strata-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every Strata crate
#[derive(Error, Debug)]
pub enum Error {
    /// A module, release or component does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// A raw component specification does not match the provider schema
    #[error("Cannot convert {provider} component: {message}")]
    Conversion { provider: String, message: String },

    /// The rendered manifest references a provider that is not registered
    #[error("Component handler not implemented: {name}")]
    UnknownProviderHandler { name: String },

    /// Release values reference a secret provider that is not registered
    #[error("Secret provider not implemented: {name}")]
    UnknownSecretProvider { name: String },

    /// A secret reference is not of the form `path:field`
    #[error("Invalid secret reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// A backing-system call made by a provider failed
    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    /// A local persistence call failed
    #[error("Store error: {0}")]
    Store(String),

    /// The rendered template is not a provider -> [component] mapping
    #[error("Rendered manifest is invalid: {0}")]
    RenderOutputInvalid(String),

    /// Template parsing or execution failed
    #[error("Template error: {0}")]
    Template(String),

    /// A request is missing required fields
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Identity collision or stale write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Another operation on the same release is still in flight
    #[error("Release '{name}' has an operation in flight")]
    ReleaseBusy { name: String },

    /// A dispatch to a backing system exceeded its deadline
    #[error("{provider} call timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn conversion(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Conversion {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn unknown_provider_handler(name: impl Into<String>) -> Self {
        Self::UnknownProviderHandler { name: name.into() }
    }

    pub fn unknown_secret_provider(name: impl Into<String>) -> Self {
        Self::UnknownSecretProvider { name: name.into() }
    }

    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn store(message: impl ToString) -> Self {
        Self::Store(message.to_string())
    }

    pub fn render_output_invalid(message: impl Into<String>) -> Self {
        Self::RenderOutputInvalid(message.into())
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Validation errors are raised before any side effect on a backing system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Conversion { .. }
                | Self::UnknownProviderHandler { .. }
                | Self::UnknownSecretProvider { .. }
                | Self::InvalidReference { .. }
                | Self::RenderOutputInvalid(_)
                | Self::Template(_)
        )
    }
}
