//! Persistence contracts consumed by the orchestrator and the providers

use async_trait::async_trait;
use serde_json::Value;
use strata_core::types::{Module, ModuleRelease, ModuleSelector, NewModule, RecordId};
use strata_core::Result;

/// Module and module release rows
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Register a module version
    ///
    /// Fails with `Conflict` when `(name, version)` already exists.
    async fn insert_module(&self, module: NewModule) -> Result<Module>;

    /// Resolve a module by exact version, or the most recently created one
    async fn get_module(&self, selector: &ModuleSelector) -> Result<Module>;

    /// All registered module versions, oldest first
    async fn list_modules(&self) -> Result<Vec<Module>>;

    /// Insert a release row, assigning `id` and `created_at`
    ///
    /// Fails with `Conflict` when a live row already exists for the name.
    async fn insert_module_release(&self, release: ModuleRelease) -> Result<ModuleRelease>;

    async fn get_module_release(&self, name: &str) -> Result<ModuleRelease>;

    /// Names of all live releases
    async fn get_all_module_release(&self) -> Result<Vec<String>>;

    /// All live release rows
    async fn list_module_releases(&self) -> Result<Vec<ModuleRelease>>;

    async fn delete_module_release(&self, release: &ModuleRelease) -> Result<()>;

    /// Replace `previous` with `next` in one step
    ///
    /// Fails with `Conflict` when `previous` is no longer the live row for
    /// its name (another update won the race), leaving the store unchanged.
    async fn supersede_module_release(
        &self,
        previous: &ModuleRelease,
        next: ModuleRelease,
    ) -> Result<ModuleRelease>;

    /// Undo a [`supersede_module_release`](Self::supersede_module_release)
    ///
    /// Puts `previous` back verbatim, keeping its id, in place of `current`.
    /// Fails with `Conflict` when `current` is no longer the live row.
    async fn restore_module_release(
        &self,
        current: &ModuleRelease,
        previous: ModuleRelease,
    ) -> Result<()>;
}

/// Untyped component records, partitioned by provider kind
///
/// Providers use [`ComponentTable`](crate::ComponentTable) rather than this
/// trait directly.
#[async_trait]
pub trait ComponentRecords: Send + Sync {
    /// Fails with `Conflict` when `key` already exists for `kind`
    async fn insert_component(
        &self,
        kind: &str,
        key: &str,
        release_id: RecordId,
        body: Value,
    ) -> Result<()>;

    /// Fails with `NotFound` when `key` does not exist for `kind`
    async fn update_component(
        &self,
        kind: &str,
        key: &str,
        release_id: RecordId,
        body: Value,
    ) -> Result<()>;

    async fn delete_component(&self, kind: &str, key: &str) -> Result<()>;

    async fn get_component(&self, kind: &str, key: &str) -> Result<Value>;

    /// Records owned by a release, in insertion order
    async fn components_by_release(&self, kind: &str, release_id: RecordId) -> Result<Vec<Value>>;

    /// All keys for `kind`, in insertion order
    async fn component_keys(&self, kind: &str) -> Result<Vec<String>>;
}
