//! Secret references and resolved values

use std::fmt;
use strata_core::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A provider-agnostic `path:field` secret key
///
/// The split happens at the first `:`, so fields may themselves contain
/// colons but paths may not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretReference {
    path: String,
    field: String,
}

impl SecretReference {
    pub fn parse(reference: &str) -> Result<Self> {
        let (path, field) = reference
            .split_once(':')
            .ok_or_else(|| Error::invalid_reference(reference, "expected 'path:field'"))?;
        let path = path.trim();
        let field = field.trim();
        if path.is_empty() {
            return Err(Error::invalid_reference(reference, "path is empty"));
        }
        if field.is_empty() {
            return Err(Error::invalid_reference(reference, "field is empty"));
        }
        Ok(Self {
            path: path.to_string(),
            field: field.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.field)
    }
}

/// Plaintext secret, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get the plaintext (use with caution)
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue([REDACTED {} bytes])", self.len())
    }
}
