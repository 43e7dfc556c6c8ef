//! Component provider contract

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_core::types::{Module, ModuleRelease, RawComponent, RecordId};
use strata_core::Result;

/// A typed component record owned by one module release
pub trait Component:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Natural identity within the provider kind (e.g. the helm release name)
    fn key(&self) -> &str;

    fn revision(&self) -> u32;

    fn module_release_id(&self) -> RecordId;
}

/// Lifecycle handler for one component kind
///
/// Backing-system calls (`*_component`) never retry internally; the
/// orchestrator decides whether and how to retry or compensate. Record
/// methods (`add`, `update`, `remove`) touch only local state.
#[async_trait]
pub trait ComponentProvider: Send + Sync + 'static {
    type Component: Component;

    /// Manifest key this provider handles
    fn name(&self) -> &'static str;

    /// Decode a rendered raw spec, applying provider defaults
    ///
    /// Fails with `Error::Conversion` when the spec does not match the
    /// component schema.
    fn convert(&self, raw: &RawComponent) -> Result<Self::Component>;

    /// Stamp ownership and revision onto a converted component
    ///
    /// Must not call out to the backing system.
    fn pre_process(
        &self,
        component: Self::Component,
        previous: Option<&Self::Component>,
        module: &Module,
        release: &ModuleRelease,
    ) -> Result<Self::Component>;

    async fn install_component(&self, component: &Self::Component) -> Result<()>;

    async fn update_component(&self, component: &Self::Component) -> Result<()>;

    /// Delete the backing resource; an already missing resource is success
    async fn uninstall_component(&self, component: &Self::Component) -> Result<()>;

    async fn get_detail(&self, key: &str) -> Result<Self::Component>;

    async fn get_detail_from_component(
        &self,
        component: &Self::Component,
    ) -> Result<Self::Component> {
        self.get_detail(component.key()).await
    }

    async fn get_from_module_release_id(&self, id: RecordId) -> Result<Vec<Self::Component>>;

    async fn get_all_name(&self) -> Result<Vec<String>>;

    async fn add(&self, component: &Self::Component) -> Result<()>;

    async fn update(&self, component: &Self::Component) -> Result<()>;

    async fn remove(&self, component: &Self::Component) -> Result<()>;
}

/// Revision for a component whose previous record may not exist
pub fn next_revision<C: Component>(previous: Option<&C>) -> u32 {
    previous.map(Component::revision).unwrap_or(0) + 1
}
