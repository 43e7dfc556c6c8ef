//! Type-erased provider handles
//!
//! The orchestrator works over many provider kinds at once, so it sees each
//! provider through [`ProviderHandle`], each converted spec through
//! [`ConvertedComponent`] and each pre-processed component through
//! [`StagedComponent`]. The wrappers keep the concrete component type inside,
//! so a component only ever reaches the provider that produced it.

use crate::traits::{Component, ComponentProvider};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use strata_core::types::{Module, ModuleRelease, RawComponent, RecordId};
use strata_core::{Error, Result};
use tracing::debug;

/// Which dispatch a component is prepared for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Install,
    Update,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Install => write!(f, "install"),
            ApplyMode::Update => write!(f, "update"),
        }
    }
}

/// A registered provider seen without its component type
#[async_trait]
pub trait ProviderHandle: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decode one raw spec; touches neither the store nor the backing system
    fn convert(&self, raw: &RawComponent) -> Result<Box<dyn ConvertedComponent>>;

    /// Local records owned by a release, ready for teardown
    async fn owned_by(&self, release_id: RecordId) -> Result<Vec<Box<dyn StagedComponent>>>;

    async fn names(&self) -> Result<Vec<String>>;

    /// Stored record for `key` as JSON
    async fn describe(&self, key: &str) -> Result<serde_json::Value>;
}

/// A converted component waiting for its owning release
#[async_trait]
pub trait ConvertedComponent: Send + Sync {
    fn provider(&self) -> &'static str;

    fn key(&self) -> &str;

    /// Look up the existing record for this key and pre-process
    ///
    /// Fails with `Conflict` before anything is dispatched when the key is
    /// already recorded in [`ApplyMode::Install`], or recorded by one of
    /// `foreign` (the ids of other live releases) in [`ApplyMode::Update`].
    /// Otherwise an update treats the record as the prior one; a missing
    /// record is not an error, the component is then installed.
    async fn prepare(
        &self,
        mode: ApplyMode,
        module: &Module,
        release: &ModuleRelease,
        foreign: &HashSet<RecordId>,
    ) -> Result<Box<dyn StagedComponent>>;
}

/// A pre-processed component bound to its provider
#[async_trait]
pub trait StagedComponent: Send + Sync {
    fn provider(&self) -> &'static str;

    fn key(&self) -> &str;

    fn revision(&self) -> u32;

    /// Revision of the record this component replaces, if any
    fn prior_revision(&self) -> Option<u32>;

    /// Create or update the backing resource
    ///
    /// A component with a prior record is updated; anything else is installed.
    async fn apply(&self) -> Result<()>;

    /// Persist the local record after a successful [`apply`](Self::apply)
    async fn record(&self) -> Result<()>;

    /// Delete the backing resource
    async fn uninstall(&self) -> Result<()>;

    /// Delete the local record
    async fn forget(&self) -> Result<()>;
}

pub(crate) struct TypedHandle<P: ComponentProvider> {
    provider: Arc<P>,
}

impl<P: ComponentProvider> TypedHandle<P> {
    pub(crate) fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

struct Converted<P: ComponentProvider> {
    provider: Arc<P>,
    component: P::Component,
}

struct Staged<P: ComponentProvider> {
    provider: Arc<P>,
    component: P::Component,
    prior: Option<u32>,
}

#[async_trait]
impl<P: ComponentProvider> ProviderHandle for TypedHandle<P> {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn convert(&self, raw: &RawComponent) -> Result<Box<dyn ConvertedComponent>> {
        let component = self.provider.convert(raw)?;
        Ok(Box::new(Converted {
            provider: Arc::clone(&self.provider),
            component,
        }))
    }

    async fn owned_by(&self, release_id: RecordId) -> Result<Vec<Box<dyn StagedComponent>>> {
        let components = self.provider.get_from_module_release_id(release_id).await?;
        Ok(components
            .into_iter()
            .map(|component| {
                let prior = Some(component.revision());
                Box::new(Staged {
                    provider: Arc::clone(&self.provider),
                    component,
                    prior,
                }) as Box<dyn StagedComponent>
            })
            .collect())
    }

    async fn names(&self) -> Result<Vec<String>> {
        self.provider.get_all_name().await
    }

    async fn describe(&self, key: &str) -> Result<serde_json::Value> {
        let component = self.provider.get_detail(key).await?;
        serde_json::to_value(&component).map_err(Error::from)
    }
}

#[async_trait]
impl<P: ComponentProvider> ConvertedComponent for Converted<P> {
    fn provider(&self) -> &'static str {
        self.provider.name()
    }

    fn key(&self) -> &str {
        self.component.key()
    }

    async fn prepare(
        &self,
        mode: ApplyMode,
        module: &Module,
        release: &ModuleRelease,
        foreign: &HashSet<RecordId>,
    ) -> Result<Box<dyn StagedComponent>> {
        let previous = match self.provider.get_detail_from_component(&self.component).await {
            Ok(previous) => Some(previous),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        if let Some(existing) = &previous {
            let owner = existing.module_release_id();
            if mode == ApplyMode::Install || foreign.contains(&owner) {
                return Err(Error::conflict(format!(
                    "{} '{}' is owned by release id {}",
                    self.provider.name(),
                    existing.key(),
                    owner
                )));
            }
            debug!(
                "Prior {} '{}' owned by release id {}",
                self.provider.name(),
                existing.key(),
                owner
            );
        }

        let component = self.provider.pre_process(
            self.component.clone(),
            previous.as_ref(),
            module,
            release,
        )?;
        debug!(
            "Prepared {} '{}' for {} at revision {}",
            self.provider.name(),
            component.key(),
            mode,
            component.revision()
        );

        Ok(Box::new(Staged {
            provider: Arc::clone(&self.provider),
            component,
            prior: previous.as_ref().map(Component::revision),
        }))
    }
}

#[async_trait]
impl<P: ComponentProvider> StagedComponent for Staged<P> {
    fn provider(&self) -> &'static str {
        self.provider.name()
    }

    fn key(&self) -> &str {
        self.component.key()
    }

    fn revision(&self) -> u32 {
        self.component.revision()
    }

    fn prior_revision(&self) -> Option<u32> {
        self.prior
    }

    async fn apply(&self) -> Result<()> {
        if self.prior.is_some() {
            self.provider.update_component(&self.component).await
        } else {
            self.provider.install_component(&self.component).await
        }
    }

    async fn record(&self) -> Result<()> {
        if self.prior.is_some() {
            self.provider.update(&self.component).await
        } else {
            self.provider.add(&self.component).await
        }
    }

    async fn uninstall(&self) -> Result<()> {
        self.provider.uninstall_component(&self.component).await
    }

    async fn forget(&self) -> Result<()> {
        self.provider.remove(&self.component).await
    }
}
