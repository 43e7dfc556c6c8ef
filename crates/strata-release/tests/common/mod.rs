//! Common test helpers for strata-release integration tests
//!
//! - [`FakeProvider`]: a recording component provider with per-key fault
//!   injection, backed by a real in-memory [`StateStore`]
//! - [`Harness`]: an orchestrator wired to two fake providers
//! - Module spec fixtures

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata_core::types::{Module, ModuleRelease, RawComponent, RecordId};
use strata_core::{Error, Result};
use strata_providers::{next_revision, Component, ComponentProvider, ProviderRegistry};
use strata_release::{Orchestrator, ReleaseContext};
use strata_secrets::SecretRegistry;
use strata_store::{ComponentTable, StateStore};

// ─── Call log ────────────────────────────────────────────────────────────────

/// Records calls as `"<provider> <operation> <key>"` across all providers
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl CallLog {
    pub fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose operation is one of `operations`
    pub fn only(&self, operations: &[&str]) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.split(' ')
                    .nth(1)
                    .is_some_and(|op| operations.contains(&op))
            })
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.only(&[operation]).len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

// ─── Fake provider ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub name: String,
    pub size: u32,
    pub label: String,
    pub revision: u32,
    pub module_release_id: RecordId,
}

impl Component for Widget {
    fn key(&self) -> &str {
        &self.name
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn module_release_id(&self) -> RecordId {
        self.module_release_id
    }
}

#[derive(Debug, Deserialize)]
struct WidgetSpec {
    name: String,
    #[serde(default = "default_size")]
    size: u32,
    #[serde(default)]
    label: String,
}

fn default_size() -> u32 {
    1
}

#[derive(Debug, Default)]
struct Faults {
    install: HashSet<String>,
    update: HashSet<String>,
    uninstall: HashSet<String>,
    record: HashSet<String>,
    hang: HashSet<String>,
}

pub struct FakeProvider {
    name: &'static str,
    table: ComponentTable<Widget>,
    log: CallLog,
    faults: Mutex<Faults>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(name: &'static str, store: Arc<StateStore>, log: CallLog) -> Self {
        Self {
            name,
            table: ComponentTable::new(store, name),
            log,
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn fail_install(&self, key: &str) {
        self.faults.lock().unwrap().install.insert(key.to_string());
    }

    pub fn fail_update(&self, key: &str) {
        self.faults.lock().unwrap().update.insert(key.to_string());
    }

    pub fn fail_uninstall(&self, key: &str) {
        self.faults.lock().unwrap().uninstall.insert(key.to_string());
    }

    /// Make `add` and `update` of the local record fail for `key`
    pub fn fail_record(&self, key: &str) {
        self.faults.lock().unwrap().record.insert(key.to_string());
    }

    pub fn hang_on(&self, key: &str) {
        self.faults.lock().unwrap().hang.insert(key.to_string());
    }

    pub fn heal(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }

    pub async fn record(&self, key: &str) -> Option<Widget> {
        self.table.find(key).await.unwrap()
    }

    pub async fn owned_by(&self, release_id: RecordId) -> Vec<Widget> {
        self.table.by_release(release_id).await.unwrap()
    }

    fn check_record(&self, key: &str) -> Result<()> {
        if self.faults.lock().unwrap().record.contains(key) {
            return Err(Error::store(format!("record of {} rejected", key)));
        }
        Ok(())
    }

    async fn backing_call(&self, operation: &str, key: &str) -> Result<()> {
        self.log.record(format!("{} {} {}", self.name, operation, key));
        let (fails, hangs) = {
            let faults = self.faults.lock().unwrap();
            let set = match operation {
                "install" => &faults.install,
                "update" => &faults.update,
                _ => &faults.uninstall,
            };
            (set.contains(key), faults.hang.contains(key))
        };
        if hangs {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if fails {
            return Err(Error::provider(
                self.name,
                format!("{} of {} rejected", operation, key),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ComponentProvider for FakeProvider {
    type Component = Widget;

    fn name(&self) -> &'static str {
        self.name
    }

    fn convert(&self, raw: &RawComponent) -> Result<Widget> {
        let spec: WidgetSpec =
            serde_yaml_ng::from_value(raw.clone()).map_err(|e| Error::conversion(self.name, e))?;
        self.log
            .record(format!("{} convert {}", self.name, spec.name));
        Ok(Widget {
            name: spec.name,
            size: spec.size,
            label: spec.label,
            revision: 0,
            module_release_id: 0,
        })
    }

    fn pre_process(
        &self,
        mut component: Widget,
        previous: Option<&Widget>,
        _module: &Module,
        release: &ModuleRelease,
    ) -> Result<Widget> {
        if component.label == "invalid" {
            return Err(Error::conversion(self.name, "label 'invalid' is reserved"));
        }
        component.revision = next_revision(previous);
        component.module_release_id = release.id;
        Ok(component)
    }

    async fn install_component(&self, component: &Widget) -> Result<()> {
        self.backing_call("install", &component.name).await
    }

    async fn update_component(&self, component: &Widget) -> Result<()> {
        self.backing_call("update", &component.name).await
    }

    async fn uninstall_component(&self, component: &Widget) -> Result<()> {
        self.backing_call("uninstall", &component.name).await
    }

    async fn get_detail(&self, key: &str) -> Result<Widget> {
        self.table.get(key).await
    }

    async fn get_from_module_release_id(&self, id: RecordId) -> Result<Vec<Widget>> {
        self.table.by_release(id).await
    }

    async fn get_all_name(&self) -> Result<Vec<String>> {
        self.table.names().await
    }

    async fn add(&self, component: &Widget) -> Result<()> {
        self.log.record(format!("{} add {}", self.name, component.name));
        self.check_record(&component.name)?;
        self.table
            .add(&component.name, component.module_release_id, component)
            .await
    }

    async fn update(&self, component: &Widget) -> Result<()> {
        self.log.record(format!("{} save {}", self.name, component.name));
        self.check_record(&component.name)?;
        self.table
            .update(&component.name, component.module_release_id, component)
            .await
    }

    async fn remove(&self, component: &Widget) -> Result<()> {
        self.log
            .record(format!("{} remove {}", self.name, component.name));
        self.table.remove(&component.name).await
    }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

#[allow(dead_code)]
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<StateStore>,
    pub log: CallLog,
    pub alpha: Arc<FakeProvider>,
    pub beta: Arc<FakeProvider>,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(SecretRegistry::new(), Duration::from_secs(30))
}

/// Providers are registered as `alpha` then `beta`
pub fn harness_with(secrets: SecretRegistry, dispatch_timeout: Duration) -> Harness {
    let store = Arc::new(StateStore::in_memory());
    let log = CallLog::default();
    let alpha = Arc::new(FakeProvider::new("alpha", store.clone(), log.clone()));
    let beta = Arc::new(FakeProvider::new("beta", store.clone(), log.clone()));

    let mut providers = ProviderRegistry::new();
    providers.register_arc(alpha.clone()).unwrap();
    providers.register_arc(beta.clone()).unwrap();

    let ctx = ReleaseContext::new(store.clone(), providers, secrets)
        .with_dispatch_timeout(dispatch_timeout);

    Harness {
        orchestrator: Orchestrator::new(ctx),
        store,
        log,
        alpha,
        beta,
    }
}

// ─── Module specs ────────────────────────────────────────────────────────────

/// `beta` first, then `alpha`, with sizes driven by release values
#[allow(dead_code)]
pub const TWO_PROVIDER_SPEC: &str = r#"
beta:
  - name: {{ release }}-queue
    size: {{ values.queue_size | default(value=1) }}
alpha:
  - name: {{ release }}-web
    label: {{ module }}-{{ version }}
  - name: {{ release }}-worker
"#;

#[allow(dead_code)]
pub const SINGLE_SPEC: &str = r#"
alpha:
  - name: c1
"#;
