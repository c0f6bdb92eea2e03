//! ==============================================================================
//! publish.rs - forwarding validated readings to an ingestion service
//! ==============================================================================
//!
//! purpose:
//! ```text
//! every decoded frame produces one Batch of readings that passed the
//! validation gate. a Publisher sends that batch somewhere else.
//! ```
//!
//! backends (picked once at startup by `publisher.backend` in host.toml):
//! ```text
//! - "emoncms": GET /input/post.json on an emoncms server
//! - "hub":     POST {node_id, timestamp_ms, readings} as json upstream
//! - "log":     just log it (bench setups with no network)
//! ```
//!
//! the ingest loop never waits on the network: batches go through a
//! bounded channel to a single worker task, which keeps them in frame
//! order and logs failures. when the channel is full the newest batch is
//! dropped with a warning; the store has already been updated either way.
//!
//! relationships:
//! ```text
//! - used by: main.rs (from_config + spawn_worker)
//! - fed by: ingest.rs (PublishQueue)
//! ```
//!
//! ==============================================================================

use crate::config::{EmoncmsConfig, HubConfig, PublisherConfig};
use crate::domain::{Batch, NodeId, Reading};
use crate::error::{ConfigError, PublishError};
use crate::registry::{SensorTypeRegistry, TEST};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// batches the worker can fall behind by before new ones are dropped
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// backend name, as used in configuration
    fn name(&self) -> &'static str;

    /// send one frame's validated readings; an empty batch is a no-op
    async fn publish(&self, batch: &Batch) -> Result<(), PublishError>;
}

// ==============================================================================
// backend registry
// ==============================================================================

type Factory = fn(&PublisherConfig, &SensorTypeRegistry) -> Result<Arc<dyn Publisher>, ConfigError>;

const BACKENDS: &[(&str, Factory)] = &[
    ("emoncms", build_emoncms),
    ("hub", build_hub),
    ("log", build_log),
];

fn build_emoncms(
    cfg: &PublisherConfig,
    registry: &SensorTypeRegistry,
) -> Result<Arc<dyn Publisher>, ConfigError> {
    Ok(Arc::new(EmoncmsPublisher::new(&cfg.emoncms, registry.clone())?))
}

fn build_hub(
    cfg: &PublisherConfig,
    _: &SensorTypeRegistry,
) -> Result<Arc<dyn Publisher>, ConfigError> {
    Ok(Arc::new(HubPublisher::new(&cfg.hub)?))
}

fn build_log(
    _: &PublisherConfig,
    _: &SensorTypeRegistry,
) -> Result<Arc<dyn Publisher>, ConfigError> {
    Ok(Arc::new(LogPublisher))
}

/// names accepted by `publisher.backend`
pub fn backend_names() -> Vec<&'static str> {
    BACKENDS.iter().map(|(name, _)| *name).collect()
}

/// build the configured publisher
pub fn from_config(
    cfg: &PublisherConfig,
    registry: &SensorTypeRegistry,
) -> Result<Arc<dyn Publisher>, ConfigError> {
    let (_, factory) = BACKENDS
        .iter()
        .find(|(name, _)| *name == cfg.backend)
        .ok_or_else(|| ConfigError::UnknownPublisher {
            name: cfg.backend.clone(),
            known: backend_names().join(", "),
        })?;
    factory(cfg, registry)
}

// ==============================================================================
// worker
// ==============================================================================

/// Sending side of the publisher worker.
#[derive(Clone)]
pub struct PublishQueue {
    tx: mpsc::Sender<Batch>,
}

impl PublishQueue {
    /// hand a batch to the worker without waiting
    ///
    /// returns false when the batch was dropped.
    pub fn enqueue(&self, batch: Batch) -> bool {
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(TrySendError::Full(batch)) => {
                tracing::warn!(node = %batch.node_id, "publish queue full, dropping batch");
                false
            }
            Err(TrySendError::Closed(batch)) => {
                tracing::warn!(node = %batch.node_id, "publisher worker stopped, dropping batch");
                false
            }
        }
    }
}

/// start the worker; it exits once every PublishQueue clone is dropped
///
/// `depth` is clamped to at least one slot.
pub fn spawn_worker(
    publisher: Arc<dyn Publisher>,
    depth: usize,
) -> (PublishQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Batch>(depth.max(1));

    let handle = tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            if let Err(e) = publisher.publish(&batch).await {
                tracing::warn!(
                    backend = publisher.name(),
                    node = %batch.node_id,
                    error = %e,
                    "publish failed"
                );
            }
        }
        tracing::debug!(backend = publisher.name(), "publisher worker stopped");
    });

    (PublishQueue { tx }, handle)
}

// ==============================================================================
// emoncms
// ==============================================================================

pub struct EmoncmsPublisher {
    client: reqwest::Client,
    endpoint: String,
    apikey: String,
    nodeid_offset: i64,
    registry: SensorTypeRegistry,
}

impl EmoncmsPublisher {
    pub fn new(cfg: &EmoncmsConfig, registry: SensorTypeRegistry) -> Result<Self, ConfigError> {
        if cfg.apikey.is_empty() {
            tracing::warn!(server = %cfg.server, "emoncms apikey is empty, posts will be refused");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("http://{}/input/post.json", cfg.server),
            apikey: cfg.apikey.clone(),
            nodeid_offset: cfg.nodeid_offset,
            registry,
        })
    }
}

/// emoncms node number for a radio node
///
/// numeric ids are shifted by the offset so they don't clash with other
/// inputs on the same account; anything else is sent unchanged.
pub fn emoncms_node(node: &NodeId, offset: i64) -> String {
    match node.as_str().parse::<i64>() {
        Ok(n) => match n.checked_add(offset) {
            Some(shifted) => shifted.to_string(),
            None => {
                tracing::warn!(node = %node, offset, "node id overflows with offset");
                node.to_string()
            }
        },
        Err(_) => node.to_string(),
    }
}

/// `{type name}{sensor id}` -> value, e.g. `{"temperature1": 23.0}`
///
/// test readings (type 0) are never sent.
pub fn emoncms_inputs(batch: &Batch, registry: &SensorTypeRegistry) -> Map<String, Value> {
    let mut inputs = Map::new();
    for reading in &batch.readings {
        if reading.type_code == TEST {
            continue;
        }
        let Some(descriptor) = registry.describe(reading.type_code) else {
            continue;
        };
        inputs.insert(
            format!("{}{}", descriptor.name, reading.sensor_id),
            Value::from(reading.value),
        );
    }
    inputs
}

#[async_trait]
impl Publisher for EmoncmsPublisher {
    fn name(&self) -> &'static str {
        "emoncms"
    }

    async fn publish(&self, batch: &Batch) -> Result<(), PublishError> {
        let inputs = emoncms_inputs(batch, &self.registry);
        if inputs.is_empty() {
            return Ok(());
        }

        let node = emoncms_node(&batch.node_id, self.nodeid_offset);
        let json = serde_json::to_string(&inputs)?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("node", node.as_str()),
                ("json", json.as_str()),
                ("apikey", self.apikey.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(node = %node, inputs = inputs.len(), "posted to emoncms");
        Ok(())
    }
}

// ==============================================================================
// upstream hub
// ==============================================================================

/// body posted to the upstream hub
#[derive(Debug, Serialize)]
pub struct HubPayload<'a> {
    pub node_id: &'a NodeId,
    /// receive time, unix milliseconds
    pub timestamp_ms: i64,
    pub readings: &'a [Reading],
}

impl<'a> From<&'a Batch> for HubPayload<'a> {
    fn from(batch: &'a Batch) -> Self {
        Self {
            node_id: &batch.node_id,
            timestamp_ms: batch.received_at.timestamp_millis(),
            readings: &batch.readings,
        }
    }
}

pub struct HubPublisher {
    client: reqwest::Client,
    url: String,
}

impl HubPublisher {
    pub fn new(cfg: &HubConfig) -> Result<Self, ConfigError> {
        if cfg.hub_url.is_empty() {
            return Err(ConfigError::Invalid(
                "publisher.hub.hub_url is required for the hub backend".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: cfg.hub_url.clone(),
        })
    }
}

#[async_trait]
impl Publisher for HubPublisher {
    fn name(&self) -> &'static str {
        "hub"
    }

    async fn publish(&self, batch: &Batch) -> Result<(), PublishError> {
        if batch.readings.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&HubPayload::from(batch))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// ==============================================================================
// log only
// ==============================================================================

pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, batch: &Batch) -> Result<(), PublishError> {
        if batch.readings.is_empty() {
            return Ok(());
        }
        tracing::info!(node = %batch.node_id, readings = ?batch.readings, "batch");
        Ok(())
    }
}
