//! JSON snapshot state store
//!
//! All rows live in memory behind one `RwLock`. A file-backed store reloads
//! the snapshot from disk before every read (under a shared lock on a sibling
//! `.lock` file) and before every mutation (under an exclusive one), so
//! several processes can share one snapshot file. A mutation is applied to a
//! copy, written to a temp file that is renamed over the snapshot, and only
//! then swapped in. The exclusive lock is held from the reload until the
//! rename, and a failed write leaves both the file and memory unchanged.

use crate::repository::{ComponentRecords, ModuleRepository};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use strata_core::types::{Module, ModuleRelease, ModuleSelector, NewModule, RecordId};
use strata_core::{Error, Result};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredComponent {
    seq: u64,
    module_release_id: RecordId,
    body: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    next_id: RecordId,
    next_seq: u64,
    modules: Vec<Module>,
    releases: Vec<ModuleRelease>,
    components: BTreeMap<String, BTreeMap<String, StoredComponent>>,
}

impl Snapshot {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn allocate_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn live_release(&self, name: &str) -> Option<&ModuleRelease> {
        self.releases.iter().find(|r| r.name == name)
    }

    fn table(&self, kind: &str) -> Option<&BTreeMap<String, StoredComponent>> {
        self.components.get(kind)
    }

    fn ordered(&self, kind: &str) -> Vec<(&String, &StoredComponent)> {
        let mut rows: Vec<_> = self
            .table(kind)
            .map(|t| t.iter().collect())
            .unwrap_or_default();
        rows.sort_by_key(|(_, c)| c.seq);
        rows
    }
}

/// In-memory state with optional JSON file persistence
pub struct StateStore {
    state: RwLock<Snapshot>,
    path: Option<Utf8PathBuf>,
}

impl StateStore {
    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            path: None,
        }
    }

    /// Open (or start) a snapshot file
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent(&path)?;
        let snapshot = {
            let _lock = lock_file(&path, false)?;
            load(&path)?
        };

        debug!(
            "Opened state store {} ({} modules, {} releases)",
            path,
            snapshot.modules.len(),
            snapshot.releases.len()
        );

        Ok(Self {
            state: RwLock::new(snapshot),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// The current state, reloaded from disk when file-backed
    async fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>> {
        let mut guard = self.state.write().await;
        if let Some(path) = &self.path {
            let _lock = lock_file(path, false)?;
            *guard = load(path)?;
        }
        Ok(guard.downgrade())
    }

    /// Apply `change` to a fresh copy of the state and commit it
    async fn mutate<T>(&self, change: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write().await;
        let _lock = match &self.path {
            Some(path) => {
                let lock = lock_file(path, true)?;
                *guard = load(path)?;
                Some(lock)
            }
            None => None,
        };

        let mut next = guard.clone();
        let out = change(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *guard = next;
        Ok(out)
    }
}

fn ensure_parent(path: &Utf8Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::store(format!("cannot create {}: {}", parent, e)))?;
        }
    }
    Ok(())
}

/// Read the snapshot file; a missing or empty file is an empty state
fn load(path: &Utf8Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::default());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Snapshot::default());
    }
    serde_json::from_str(&content)
        .map_err(|e| Error::store(format!("corrupt state file {}: {}", path, e)))
}

fn lock_file(path: &Utf8Path, exclusive: bool) -> Result<fs::File> {
    let lock_path = Utf8PathBuf::from(format!("{}.lock", path));
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| Error::store(format!("cannot open {}: {}", lock_path, e)))?;
    let locked = if exclusive {
        file.lock_exclusive()
    } else {
        file.lock_shared()
    };
    locked.map_err(|e| Error::store(format!("cannot lock {}: {}", lock_path, e)))?;
    Ok(file)
}

/// Caller holds the exclusive lock
fn persist(path: &Utf8Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let temp_path = Utf8PathBuf::from(format!("{}.tmp", path));
    {
        let mut temp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::store(format!("cannot write {}: {}", temp_path, e)))?;
        temp.write_all(json.as_bytes())
            .and_then(|_| temp.sync_all())
            .map_err(|e| Error::store(format!("cannot write {}: {}", temp_path, e)))?;
    }
    fs::rename(&temp_path, path)
        .map_err(|e| Error::store(format!("cannot replace {}: {}", path, e)))?;
    Ok(())
}

#[async_trait]
impl ModuleRepository for StateStore {
    async fn insert_module(&self, module: NewModule) -> Result<Module> {
        module.validate()?;
        self.mutate(|state| {
            let exists = state
                .modules
                .iter()
                .any(|m| m.name == module.name && m.version == module.version);
            if exists {
                return Err(Error::conflict(format!(
                    "module {}@{} already exists",
                    module.name, module.version
                )));
            }
            let row = Module {
                id: state.allocate_id(),
                name: module.name,
                version: module.version,
                spec: module.spec,
                created_at: Utc::now(),
            };
            state.modules.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn get_module(&self, selector: &ModuleSelector) -> Result<Module> {
        let state = self.read().await?;
        let mut candidates = state.modules.iter().filter(|m| m.name == selector.name);
        let found = match &selector.version {
            Some(version) => candidates.find(|m| &m.version == version),
            None => candidates.max_by_key(|m| (m.created_at, m.id)),
        };
        found
            .cloned()
            .ok_or_else(|| Error::not_found("module", selector.to_string()))
    }

    async fn list_modules(&self) -> Result<Vec<Module>> {
        Ok(self.read().await?.modules.clone())
    }

    async fn insert_module_release(&self, release: ModuleRelease) -> Result<ModuleRelease> {
        self.mutate(|state| {
            if state.live_release(&release.name).is_some() {
                return Err(Error::conflict(format!(
                    "release '{}' already exists",
                    release.name
                )));
            }
            let row = ModuleRelease {
                id: state.allocate_id(),
                created_at: Utc::now(),
                ..release
            };
            state.releases.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn get_module_release(&self, name: &str) -> Result<ModuleRelease> {
        self.read()
            .await?
            .live_release(name)
            .cloned()
            .ok_or_else(|| Error::not_found("module release", name))
    }

    async fn get_all_module_release(&self) -> Result<Vec<String>> {
        let state = self.read().await?;
        Ok(state.releases.iter().map(|r| r.name.clone()).collect())
    }

    async fn list_module_releases(&self) -> Result<Vec<ModuleRelease>> {
        Ok(self.read().await?.releases.clone())
    }

    async fn delete_module_release(&self, release: &ModuleRelease) -> Result<()> {
        self.mutate(|state| {
            let before = state.releases.len();
            state.releases.retain(|r| r.id != release.id);
            if state.releases.len() == before {
                return Err(Error::not_found("module release", release.name.clone()));
            }
            Ok(())
        })
        .await
    }

    async fn supersede_module_release(
        &self,
        previous: &ModuleRelease,
        next: ModuleRelease,
    ) -> Result<ModuleRelease> {
        if next.name != previous.name {
            return Err(Error::invalid_request(format!(
                "cannot supersede release '{}' with '{}'",
                previous.name, next.name
            )));
        }
        self.mutate(|state| {
            let live = state
                .live_release(&previous.name)
                .ok_or_else(|| Error::not_found("module release", previous.name.clone()))?;
            if live.id != previous.id || live.revision != previous.revision {
                return Err(Error::conflict(format!(
                    "release '{}' changed concurrently (expected revision {}, found {})",
                    previous.name, previous.revision, live.revision
                )));
            }
            let row = ModuleRelease {
                id: state.allocate_id(),
                created_at: Utc::now(),
                ..next
            };
            state.releases.retain(|r| r.id != previous.id);
            state.releases.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn restore_module_release(
        &self,
        current: &ModuleRelease,
        previous: ModuleRelease,
    ) -> Result<()> {
        if current.name != previous.name {
            return Err(Error::invalid_request(format!(
                "cannot restore release '{}' over '{}'",
                previous.name, current.name
            )));
        }
        self.mutate(|state| {
            let live = state
                .live_release(&current.name)
                .ok_or_else(|| Error::not_found("module release", current.name.clone()))?;
            if live.id != current.id {
                return Err(Error::conflict(format!(
                    "release '{}' changed concurrently",
                    current.name
                )));
            }
            state.releases.retain(|r| r.id != current.id);
            state.releases.push(previous);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ComponentRecords for StateStore {
    async fn insert_component(
        &self,
        kind: &str,
        key: &str,
        release_id: RecordId,
        body: Value,
    ) -> Result<()> {
        self.mutate(|state| {
            if state.table(kind).is_some_and(|t| t.contains_key(key)) {
                return Err(Error::conflict(format!("{} '{}' already exists", kind, key)));
            }
            let seq = state.allocate_seq();
            state.components.entry(kind.to_string()).or_default().insert(
                key.to_string(),
                StoredComponent {
                    seq,
                    module_release_id: release_id,
                    body,
                },
            );
            Ok(())
        })
        .await
    }

    async fn update_component(
        &self,
        kind: &str,
        key: &str,
        release_id: RecordId,
        body: Value,
    ) -> Result<()> {
        self.mutate(|state| {
            let row = state
                .components
                .get_mut(kind)
                .and_then(|t| t.get_mut(key))
                .ok_or_else(|| Error::not_found("component", format!("{}/{}", kind, key)))?;
            row.module_release_id = release_id;
            row.body = body;
            Ok(())
        })
        .await
    }

    async fn delete_component(&self, kind: &str, key: &str) -> Result<()> {
        self.mutate(|state| {
            state
                .components
                .get_mut(kind)
                .and_then(|t| t.remove(key))
                .map(|_| ())
                .ok_or_else(|| Error::not_found("component", format!("{}/{}", kind, key)))
        })
        .await
    }

    async fn get_component(&self, kind: &str, key: &str) -> Result<Value> {
        let state = self.read().await?;
        state
            .table(kind)
            .and_then(|t| t.get(key))
            .map(|c| c.body.clone())
            .ok_or_else(|| Error::not_found("component", format!("{}/{}", kind, key)))
    }

    async fn components_by_release(&self, kind: &str, release_id: RecordId) -> Result<Vec<Value>> {
        let state = self.read().await?;
        Ok(state
            .ordered(kind)
            .into_iter()
            .filter(|(_, c)| c.module_release_id == release_id)
            .map(|(_, c)| c.body.clone())
            .collect())
    }

    async fn component_keys(&self, kind: &str) -> Result<Vec<String>> {
        let state = self.read().await?;
        Ok(state
            .ordered(kind)
            .into_iter()
            .map(|(key, _)| key.clone())
            .collect())
    }
}
