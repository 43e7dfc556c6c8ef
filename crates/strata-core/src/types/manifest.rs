//! Rendered provider -> components manifest

use crate::error::{Error, Result};
use serde_yaml_ng::Value;

/// One opaque, provider-defined component specification
pub type RawComponent = Value;

/// Components addressed to a single provider, in manifest order
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub provider: String,
    pub components: Vec<RawComponent>,
}

/// Parsed output of a module template
///
/// Entry order follows the rendered document and is significant: components
/// are converted and applied in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse rendered template text
    ///
    /// An empty document is an empty manifest. Anything other than a mapping
    /// of provider name to a sequence (or null) is rejected.
    pub fn parse(rendered: &str) -> Result<Self> {
        let document: Value = serde_yaml_ng::from_str(rendered)
            .map_err(|e| Error::render_output_invalid(e.to_string()))?;

        let mapping = match document {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(Error::render_output_invalid(format!(
                    "expected a mapping of provider name to components, got {}",
                    value_kind(&other)
                )))
            }
        };

        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let provider = match key {
                Value::String(s) => s,
                other => {
                    return Err(Error::render_output_invalid(format!(
                        "provider names must be strings, got {}",
                        value_kind(&other)
                    )))
                }
            };
            let components = match value {
                Value::Null => Vec::new(),
                Value::Sequence(seq) => seq,
                other => {
                    return Err(Error::render_output_invalid(format!(
                        "components for '{}' must be a sequence, got {}",
                        provider,
                        value_kind(&other)
                    )))
                }
            };
            entries.push(ManifestEntry {
                provider,
                components,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    /// Provider names in manifest order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.provider.as_str())
    }

    pub fn component_count(&self) -> usize {
        self.entries.iter().map(|e| e.components.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.component_count() == 0
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
