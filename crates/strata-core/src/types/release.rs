//! Module and module release records

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the store when a row is inserted
pub type RecordId = u64;

/// An immutable, versioned module template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: RecordId,
    pub name: String,
    pub version: String,
    /// Template text producing a provider -> [components] manifest
    pub spec: String,
    pub created_at: DateTime<Utc>,
}

/// Registration request for a module version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewModule {
    pub name: String,
    pub version: String,
    pub spec: String,
}

impl NewModule {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        spec: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            spec: spec.into(),
        }
    }

    /// Reject registrations with an empty identity or template
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_request("module name is required"));
        }
        if self.version.trim().is_empty() {
            return Err(Error::invalid_request("module version is required"));
        }
        if self.spec.trim().is_empty() {
            return Err(Error::invalid_request("module spec is required"));
        }
        Ok(())
    }
}

/// Selects a module by exact version, or the most recently registered one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSelector {
    pub name: String,
    pub version: Option<String>,
}

impl ModuleSelector {
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn exact(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Build from a name and a possibly empty version string
    pub fn from_parts(name: impl Into<String>, version: &str) -> Self {
        let version = version.trim();
        Self {
            name: name.into(),
            version: (!version.is_empty()).then(|| version.to_string()),
        }
    }
}

impl fmt::Display for ModuleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}@latest", self.name),
        }
    }
}

/// A named, live instantiation of one module version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRelease {
    pub id: RecordId,
    pub name: String,
    pub module_id: RecordId,
    pub module_name: String,
    pub module_version: String,
    /// Raw release-scoped parameters (YAML), secret references unresolved
    pub values: String,
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

impl ModuleRelease {
    /// An unsaved release row; the store assigns `id` and `created_at`
    pub fn draft(request: &ReleaseRequest, module: &Module, revision: u32) -> Self {
        Self {
            id: 0,
            name: request.name.clone(),
            module_id: module.id,
            module_name: module.name.clone(),
            module_version: module.version.clone(),
            values: request.values.clone(),
            revision,
            created_at: Utc::now(),
        }
    }
}

/// Caller-supplied release identity and values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub name: String,
    #[serde(default)]
    pub values: String,
}

impl ReleaseRequest {
    pub fn new(name: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_request("release name is required"));
        }
        Ok(())
    }
}

/// What to do with partially applied components when install/update fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Run the compensating teardown
    Delete,
    /// Leave the release and any applied components in place
    Keep,
}

impl FailurePolicy {
    /// New releases are torn down on failure unless told otherwise
    pub fn default_for_install() -> Self {
        FailurePolicy::Delete
    }

    /// Updates keep the existing state on failure unless told otherwise
    pub fn default_for_update() -> Self {
        FailurePolicy::Keep
    }

    pub fn delete_on_fail(self) -> bool {
        self == FailurePolicy::Delete
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "delete" => Ok(FailurePolicy::Delete),
            "keep" => Ok(FailurePolicy::Keep),
            other => Err(Error::invalid_request(format!(
                "unknown failure policy '{}' (expected 'delete' or 'keep')",
                other
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Delete => write!(f, "delete"),
            FailurePolicy::Keep => write!(f, "keep"),
        }
    }
}

/// Lifecycle of a release name as seen by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Absent,
    Installing,
    Installed,
    Upgrading,
    Deleting,
    Failed,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReleaseState::Absent => "absent",
            ReleaseState::Installing => "installing",
            ReleaseState::Installed => "installed",
            ReleaseState::Upgrading => "upgrading",
            ReleaseState::Deleting => "deleting",
            ReleaseState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
