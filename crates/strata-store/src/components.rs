//! Typed view over one provider kind's component records

use crate::repository::ComponentRecords;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_core::types::RecordId;
use strata_core::{Error, Result};

/// Component records of one kind, stored as JSON and decoded as `C`
pub struct ComponentTable<C> {
    records: Arc<dyn ComponentRecords>,
    kind: &'static str,
    _component: PhantomData<fn() -> C>,
}

impl<C> Clone for ComponentTable<C> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            kind: self.kind,
            _component: PhantomData,
        }
    }
}

impl<C> ComponentTable<C>
where
    C: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(records: Arc<dyn ComponentRecords>, kind: &'static str) -> Self {
        Self {
            records,
            kind,
            _component: PhantomData,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub async fn add(&self, key: &str, release_id: RecordId, component: &C) -> Result<()> {
        let body = self.encode(component)?;
        self.records
            .insert_component(self.kind, key, release_id, body)
            .await
    }

    pub async fn update(&self, key: &str, release_id: RecordId, component: &C) -> Result<()> {
        let body = self.encode(component)?;
        self.records
            .update_component(self.kind, key, release_id, body)
            .await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.records.delete_component(self.kind, key).await
    }

    pub async fn get(&self, key: &str) -> Result<C> {
        let body = self.records.get_component(self.kind, key).await?;
        self.decode(body)
    }

    /// Like [`get`](Self::get), mapping `NotFound` to `None`
    pub async fn find(&self, key: &str) -> Result<Option<C>> {
        match self.get(key).await {
            Ok(component) => Ok(Some(component)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn by_release(&self, release_id: RecordId) -> Result<Vec<C>> {
        self.records
            .components_by_release(self.kind, release_id)
            .await?
            .into_iter()
            .map(|body| self.decode(body))
            .collect()
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        self.records.component_keys(self.kind).await
    }

    fn encode(&self, component: &C) -> Result<serde_json::Value> {
        serde_json::to_value(component)
            .map_err(|e| Error::store(format!("cannot encode {} record: {}", self.kind, e)))
    }

    fn decode(&self, body: serde_json::Value) -> Result<C> {
        serde_json::from_value(body)
            .map_err(|e| Error::store(format!("cannot decode {} record: {}", self.kind, e)))
    }
}
