//! Release orchestrator
//!
//! Drives a release through its lifecycle:
//!
//! ```text
//! Absent -> Installing -> Installed -> Upgrading -> Installed -> Deleting -> Absent
//!               |                          |
//!               +--------> Failed <--------+
//! ```
//!
//! Install and update render and convert everything before the first write,
//! then dispatch components one at a time in manifest order. The first
//! dispatch failure stops the run; the [`FailurePolicy`] decides whether a
//! compensating teardown follows.

use crate::context::ReleaseContext;
use crate::locks::ReleaseLocks;
use crate::render::{convert_manifest, render_manifest};
use crate::teardown::{force_delete, TeardownReport};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use strata_core::types::{
    FailurePolicy, Module, ModuleRelease, ModuleSelector, NewModule, RecordId, ReleaseRequest,
    ReleaseState,
};
use strata_core::{Error, Result};
use strata_providers::{ApplyMode, ConvertedComponent, StagedComponent};
use tracing::{debug, info, warn};

/// One local component record owned by a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub provider: &'static str,
    pub key: String,
    pub revision: u32,
}

/// A dispatch run stopped at `index`
struct DispatchFailure {
    index: usize,
    /// The backing call succeeded and only the local record failed
    applied: bool,
    error: Error,
}

pub struct Orchestrator {
    ctx: Arc<ReleaseContext>,
    locks: ReleaseLocks,
}

impl Orchestrator {
    pub fn new(ctx: ReleaseContext) -> Self {
        Self::from_shared(Arc::new(ctx))
    }

    pub fn from_shared(ctx: Arc<ReleaseContext>) -> Self {
        Self {
            ctx,
            locks: ReleaseLocks::new(),
        }
    }

    pub fn context(&self) -> &ReleaseContext {
        &self.ctx
    }

    pub fn locks(&self) -> &ReleaseLocks {
        &self.locks
    }

    // ─── Modules ─────────────────────────────────────────────────────────────

    /// Register a module version
    pub async fn install_module(&self, module: NewModule) -> Result<Module> {
        module.validate()?;
        let module = self.ctx.repository.insert_module(module).await?;
        info!("Registered module {}@{}", module.name, module.version);
        Ok(module)
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>> {
        self.ctx.repository.list_modules().await
    }

    // ─── Releases ────────────────────────────────────────────────────────────

    /// Install a new release at revision 1
    pub async fn release_module(
        &self,
        selector: &ModuleSelector,
        request: ReleaseRequest,
        policy: FailurePolicy,
    ) -> Result<ModuleRelease> {
        request.validate()?;
        let _guard = self.locks.try_acquire(&request.name)?;
        let repo = &self.ctx.repository;

        match repo.get_module_release(&request.name).await {
            Ok(existing) => {
                return Err(Error::conflict(format!(
                    "release '{}' already exists at revision {}",
                    existing.name, existing.revision
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let module = repo.get_module(selector).await?;
        let draft = ModuleRelease::draft(&request, &module, 1);
        transition(&draft.name, ReleaseState::Absent, ReleaseState::Installing);

        let converted = match self.plan(&module, &draft).await {
            Ok(converted) => converted,
            Err(e) => {
                transition(&draft.name, ReleaseState::Installing, ReleaseState::Absent);
                return Err(e);
            }
        };

        let release = repo.insert_module_release(draft).await?;
        debug!(
            "Inserted release {} (id {}) for module {}@{}",
            release.name, release.id, module.name, module.version
        );

        let staged = match self
            .prepare_all(&converted, ApplyMode::Install, &module, &release)
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                // Nothing has been dispatched yet.
                if let Err(undo) = repo.delete_module_release(&release).await {
                    warn!("Cannot discard release row {}: {}", release.name, undo);
                }
                transition(&release.name, ReleaseState::Installing, ReleaseState::Absent);
                return Err(e);
            }
        };

        if let Err(failure) = self.dispatch_all(&staged).await {
            transition(&release.name, ReleaseState::Installing, ReleaseState::Failed);
            if policy.delete_on_fail() {
                // A failed backing call may have left a partial resource behind.
                let failed = &staged[failure.index];
                if failure.applied {
                    warn!(
                        "{} '{}' was applied but not recorded; leaving it in place",
                        failed.provider(),
                        failed.key()
                    );
                } else if let Err(e) = self.ctx.dispatch(failed.provider(), failed.uninstall()).await {
                    warn!(
                        "Cannot uninstall failed {} '{}': {}",
                        failed.provider(),
                        failed.key(),
                        e
                    );
                }
                self.compensate(&release.name).await;
            } else {
                warn!(
                    "Release {} left in place after failed install ({} policy)",
                    release.name, policy
                );
            }
            return Err(failure.error);
        }

        transition(&release.name, ReleaseState::Installing, ReleaseState::Installed);
        Ok(release)
    }

    /// Move an installed release to a new module version or new values
    ///
    /// The new row carries the previous revision plus one. Components the new
    /// manifest no longer mentions are uninstalled once every dispatch has
    /// succeeded.
    pub async fn update_module_release(
        &self,
        selector: &ModuleSelector,
        request: ReleaseRequest,
        policy: FailurePolicy,
    ) -> Result<ModuleRelease> {
        request.validate()?;
        let _guard = self.locks.try_acquire(&request.name)?;
        let repo = &self.ctx.repository;

        let previous = repo.get_module_release(&request.name).await?;
        let module = repo.get_module(selector).await?;
        let draft = ModuleRelease::draft(&request, &module, previous.revision + 1);
        transition(&draft.name, ReleaseState::Installed, ReleaseState::Upgrading);

        let converted = match self.plan(&module, &draft).await {
            Ok(converted) => converted,
            Err(e) => {
                transition(&draft.name, ReleaseState::Upgrading, ReleaseState::Installed);
                return Err(e);
            }
        };

        let release = repo.supersede_module_release(&previous, draft).await?;
        debug!(
            "Release {} superseded: id {} revision {} -> id {} revision {}",
            release.name, previous.id, previous.revision, release.id, release.revision
        );

        let staged = match self
            .prepare_all(&converted, ApplyMode::Update, &module, &release)
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(undo) = repo.restore_module_release(&release, previous.clone()).await {
                    warn!(
                        "Cannot restore release {} to revision {}: {}",
                        release.name, previous.revision, undo
                    );
                }
                transition(&release.name, ReleaseState::Upgrading, ReleaseState::Installed);
                return Err(e);
            }
        };

        if let Err(failure) = self.dispatch_all(&staged).await {
            transition(&release.name, ReleaseState::Upgrading, ReleaseState::Failed);
            if policy.delete_on_fail() {
                self.compensate(&release.name).await;
                warn!(
                    "Components still owned by superseded release id {} were not touched",
                    previous.id
                );
            } else {
                warn!(
                    "Release {} left at revision {} after failed update ({} policy)",
                    release.name, release.revision, policy
                );
            }
            return Err(failure.error);
        }

        self.prune_orphans(&release.name, previous.id).await;
        transition(&release.name, ReleaseState::Upgrading, ReleaseState::Installed);
        Ok(release)
    }

    /// Uninstall and remove every component, then delete the release row
    ///
    /// Stops at the first error, leaving whatever was not yet reached in place.
    pub async fn delete_module_release(&self, name: &str) -> Result<()> {
        let _guard = self.locks.try_acquire(name)?;
        let release = self.ctx.repository.get_module_release(name).await?;
        transition(name, ReleaseState::Installed, ReleaseState::Deleting);

        if let Err(e) = self.delete_all(&release).await {
            transition(name, ReleaseState::Deleting, ReleaseState::Failed);
            return Err(e);
        }

        transition(name, ReleaseState::Deleting, ReleaseState::Absent);
        Ok(())
    }

    pub async fn get_all_release_name(&self) -> Result<Vec<String>> {
        self.ctx.repository.get_all_module_release().await
    }

    pub async fn get_release_detail(&self, name: &str) -> Result<ModuleRelease> {
        self.ctx.repository.get_module_release(name).await
    }

    /// Local component records owned by a release, provider by provider
    pub async fn release_components(
        &self,
        release: &ModuleRelease,
    ) -> Result<Vec<ComponentSummary>> {
        let mut summaries = Vec::new();
        for handle in self.ctx.providers.iter() {
            for component in handle.owned_by(release.id).await? {
                summaries.push(ComponentSummary {
                    provider: component.provider(),
                    key: component.key().to_string(),
                    revision: component.revision(),
                });
            }
        }
        Ok(summaries)
    }

    // ─── Components ──────────────────────────────────────────────────────────

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.ctx.providers.names()
    }

    pub async fn component_names(&self, provider: &str) -> Result<Vec<String>> {
        self.ctx.providers.require(provider)?.names().await
    }

    pub async fn component_detail(&self, provider: &str, key: &str) -> Result<serde_json::Value> {
        self.ctx.providers.require(provider)?.describe(key).await
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    /// Pre-process every converted component against the new release row
    ///
    /// Components whose records belong to another live release are refused
    /// here, before anything is dispatched.
    async fn prepare_all(
        &self,
        converted: &[Box<dyn ConvertedComponent>],
        mode: ApplyMode,
        module: &Module,
        release: &ModuleRelease,
    ) -> Result<Vec<Box<dyn StagedComponent>>> {
        let foreign: HashSet<RecordId> = self
            .ctx
            .repository
            .list_module_releases()
            .await?
            .into_iter()
            .filter(|r| r.name != release.name)
            .map(|r| r.id)
            .collect();

        let mut staged = Vec::with_capacity(converted.len());
        for component in converted {
            staged.push(component.prepare(mode, module, release, &foreign).await?);
        }
        Ok(staged)
    }

    async fn plan(
        &self,
        module: &Module,
        release: &ModuleRelease,
    ) -> Result<Vec<Box<dyn ConvertedComponent>>> {
        let manifest = render_manifest(&self.ctx, module, release).await?;
        convert_manifest(&manifest, &self.ctx.providers)
    }

    async fn dispatch_all(
        &self,
        staged: &[Box<dyn StagedComponent>],
    ) -> std::result::Result<(), DispatchFailure> {
        for (index, component) in staged.iter().enumerate() {
            let result = match self
                .ctx
                .dispatch(component.provider(), component.apply())
                .await
            {
                Ok(()) => component.record().await.map_err(|e| (true, e)),
                Err(e) => Err((false, e)),
            };
            if let Err((applied, error)) = result {
                warn!(
                    "Dispatch of {} '{}' failed: {}",
                    component.provider(),
                    component.key(),
                    error
                );
                return Err(DispatchFailure {
                    index,
                    applied,
                    error,
                });
            }
            debug!(
                "Applied {} '{}' at revision {}",
                component.provider(),
                component.key(),
                component.revision()
            );
        }
        Ok(())
    }

    async fn delete_all(&self, release: &ModuleRelease) -> Result<()> {
        for handle in self.ctx.providers.iter() {
            for component in handle.owned_by(release.id).await? {
                self.ctx
                    .dispatch(component.provider(), component.uninstall())
                    .await?;
                component.forget().await?;
                debug!("Deleted {} '{}'", component.provider(), component.key());
            }
        }
        self.ctx.repository.delete_module_release(release).await
    }

    async fn compensate(&self, name: &str) -> TeardownReport {
        let report = force_delete(&self.ctx, name).await;
        if report.release_deleted {
            transition(name, ReleaseState::Failed, ReleaseState::Absent);
        }
        report
    }

    /// Drop components left behind by the superseded release id
    async fn prune_orphans(&self, name: &str, stale_id: RecordId) -> usize {
        let mut pruned = 0;
        for handle in self.ctx.providers.iter() {
            let orphans = match handle.owned_by(stale_id).await {
                Ok(orphans) => orphans,
                Err(e) => {
                    warn!("Cannot list stale {} components of {}: {}", handle.name(), name, e);
                    continue;
                }
            };
            for component in orphans {
                let result = match self
                    .ctx
                    .dispatch(component.provider(), component.uninstall())
                    .await
                {
                    Ok(()) => component.forget().await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => {
                        info!(
                            "Pruned {} '{}' no longer part of release {}",
                            component.provider(),
                            component.key(),
                            name
                        );
                        pruned += 1;
                    }
                    Err(e) => warn!(
                        "Cannot prune {} '{}' from release {}: {}",
                        component.provider(),
                        component.key(),
                        name,
                        e
                    ),
                }
            }
        }
        pruned
    }
}

fn transition(release: &str, from: ReleaseState, to: ReleaseState) {
    info!("Release {}: {} -> {}", release, from, to);
}
