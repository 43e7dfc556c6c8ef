//! Kinesis data stream provider
//!
//! ```yaml
//! stream:
//!   - name: clickstream
//!     shards: 2
//!     region: ap-southeast-1
//!     tags:
//!       team: data
//! ```
//!
//! Install creates the stream, update reshards it with uniform scaling, and
//! uninstall deletes it. Region falls back to the provider default.

use crate::traits::{next_revision, Component, ComponentProvider};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kinesis::config::Region;
use aws_sdk_kinesis::types::ScalingType;
use aws_sdk_kinesis::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strata_core::types::{Module, ModuleRelease, RawComponent, RecordId};
use strata_core::{Error, Result};
use strata_store::{ComponentRecords, ComponentTable};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const PROVIDER_NAME: &str = "stream";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamComponent {
    pub name: String,
    pub region: String,
    pub shards: i32,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub module_release_id: RecordId,
}

impl Component for StreamComponent {
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
struct StreamSpec {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default = "default_shards")]
    shards: i32,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

fn default_shards() -> i32 {
    1
}

/// The stream service operations the provider needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamBackend: Send + Sync {
    async fn create_stream(&self, stream: &StreamComponent) -> Result<()>;

    async fn update_shard_count(&self, stream: &StreamComponent) -> Result<()>;

    /// Fails with `NotFound` when the stream does not exist
    async fn delete_stream(&self, stream: &StreamComponent) -> Result<()>;
}

/// [`StreamBackend`] for AWS Kinesis
///
/// Clients are created per region on first use and cached.
pub struct KinesisBackend {
    clients: Mutex<HashMap<String, Client>>,
}

impl Default for KinesisBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KinesisBackend {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, region: &str) -> Client {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = Client::new(&sdk_config);
        clients.insert(region.to_string(), client.clone());
        debug!("Created Kinesis client for {}", region);
        client
    }
}

#[async_trait]
impl StreamBackend for KinesisBackend {
    async fn create_stream(&self, stream: &StreamComponent) -> Result<()> {
        let client = self.client(&stream.region).await;
        let tags: HashMap<String, String> = stream
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        client
            .create_stream()
            .stream_name(&stream.name)
            .shard_count(stream.shards)
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await
            .map_err(|e| {
                Error::provider(
                    PROVIDER_NAME,
                    format!(
                        "CreateStream {} failed: {}",
                        stream.name,
                        e.into_service_error()
                    ),
                )
            })?;
        Ok(())
    }

    async fn update_shard_count(&self, stream: &StreamComponent) -> Result<()> {
        let client = self.client(&stream.region).await;
        client
            .update_shard_count()
            .stream_name(&stream.name)
            .target_shard_count(stream.shards)
            .scaling_type(ScalingType::UniformScaling)
            .send()
            .await
            .map_err(|e| {
                Error::provider(
                    PROVIDER_NAME,
                    format!(
                        "UpdateShardCount {} failed: {}",
                        stream.name,
                        e.into_service_error()
                    ),
                )
            })?;
        Ok(())
    }

    async fn delete_stream(&self, stream: &StreamComponent) -> Result<()> {
        let client = self.client(&stream.region).await;
        match client
            .delete_stream()
            .stream_name(&stream.name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Err(Error::not_found("stream", stream.name.clone()))
                } else {
                    Err(Error::provider(
                        PROVIDER_NAME,
                        format!("DeleteStream {} failed: {}", stream.name, service_error),
                    ))
                }
            }
        }
    }
}

pub struct StreamProvider {
    backend: Arc<dyn StreamBackend>,
    table: ComponentTable<StreamComponent>,
    default_region: String,
}

impl StreamProvider {
    pub fn new(
        backend: Arc<dyn StreamBackend>,
        records: Arc<dyn ComponentRecords>,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            table: ComponentTable::new(records, PROVIDER_NAME),
            default_region: default_region.into(),
        }
    }
}

#[async_trait]
impl ComponentProvider for StreamProvider {
    type Component = StreamComponent;

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn convert(&self, raw: &RawComponent) -> Result<StreamComponent> {
        let spec: StreamSpec = serde_yaml_ng::from_value(raw.clone())
            .map_err(|e| Error::conversion(PROVIDER_NAME, e))?;

        if spec.name.trim().is_empty() {
            return Err(Error::conversion(PROVIDER_NAME, "stream name is empty"));
        }
        if spec.shards < 1 {
            return Err(Error::conversion(
                PROVIDER_NAME,
                format!("shards must be at least 1, got {}", spec.shards),
            ));
        }
        let region = if spec.region.is_empty() {
            self.default_region.clone()
        } else {
            spec.region
        };
        if region.is_empty() {
            return Err(Error::conversion(
                PROVIDER_NAME,
                format!("no region for stream '{}'", spec.name),
            ));
        }

        Ok(StreamComponent {
            name: spec.name,
            region,
            shards: spec.shards,
            tags: spec.tags,
            revision: 0,
            module_release_id: 0,
        })
    }

    fn pre_process(
        &self,
        component: StreamComponent,
        previous: Option<&StreamComponent>,
        _module: &Module,
        release: &ModuleRelease,
    ) -> Result<StreamComponent> {
        if let Some(previous) = previous {
            if previous.region != component.region {
                return Err(Error::conversion(
                    PROVIDER_NAME,
                    format!(
                        "stream '{}' cannot move from {} to {}",
                        component.name, previous.region, component.region
                    ),
                ));
            }
        }
        Ok(StreamComponent {
            module_release_id: release.id,
            revision: next_revision(previous),
            ..component
        })
    }

    async fn install_component(&self, component: &StreamComponent) -> Result<()> {
        self.backend.create_stream(component).await?;
        info!(
            "Created stream {} in {} with {} shards",
            component.name, component.region, component.shards
        );
        Ok(())
    }

    async fn update_component(&self, component: &StreamComponent) -> Result<()> {
        let current = self.table.find(&component.name).await?;
        if current.as_ref().map(|c| c.shards) == Some(component.shards) {
            debug!("Stream {} already has {} shards", component.name, component.shards);
            return Ok(());
        }
        self.backend.update_shard_count(component).await?;
        info!(
            "Resharded stream {} to {} shards",
            component.name, component.shards
        );
        Ok(())
    }

    async fn uninstall_component(&self, component: &StreamComponent) -> Result<()> {
        match self.backend.delete_stream(component).await {
            Ok(()) => {
                info!("Deleted stream {}", component.name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Stream {} already gone", component.name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_detail(&self, key: &str) -> Result<StreamComponent> {
        self.table.get(key).await
    }

    async fn get_from_module_release_id(&self, id: RecordId) -> Result<Vec<StreamComponent>> {
        self.table.by_release(id).await
    }

    async fn get_all_name(&self) -> Result<Vec<String>> {
        self.table.names().await
    }

    async fn add(&self, component: &StreamComponent) -> Result<()> {
        self.table
            .add(&component.name, component.module_release_id, component)
            .await
    }

    async fn update(&self, component: &StreamComponent) -> Result<()> {
        self.table
            .update(&component.name, component.module_release_id, component)
            .await
    }

    async fn remove(&self, component: &StreamComponent) -> Result<()> {
        self.table.remove(&component.name).await
    }
}
