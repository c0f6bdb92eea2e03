//! ==============================================================================
//! store.rs - in-memory node/sensor history store
//! ==============================================================================
//!
//! purpose:
//! ```text
//! owns every node and sensor the hub has heard from, each sensor with a
//! fixed-depth HistoryBuffer. state lives for the process lifetime; a
//! restart starts from empty.
//! ```
//!
//! locking:
//! ```text
//! - node map:          RwLock (write only when a new node appears)
//! - per-node sensors:  RwLock (write only when a new sensor appears)
//! - per-sensor buffer: RwLock around the (cursor, slots) pair
//!
//! there is one writer (the ingest task) and many readers (http handlers).
//! a reader always copies a sensor's buffer under its lock, so it never
//! sees a cursor that disagrees with the slots.
//! ```
//!
//! relationships:
//! ```text
//! - used by: ingest.rs (ensure_node / ensure_sensor / write)
//! - used by: snapshot.rs (read side)
//! ```
//!
//! ==============================================================================

use crate::domain::{NodeId, SensorId, TypeCode};
use crate::error::ConfigError;
use crate::history::{self, HistoryBuffer};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// default number of readings kept per sensor
pub const DEFAULT_DEPTH: usize = 20;

pub struct HistoryStore {
    capacity: NonZeroUsize,
    nodes: RwLock<BTreeMap<NodeId, NodeHandle>>,
}

/// Shared handle to a node. Cheap to clone.
#[derive(Clone)]
pub struct NodeHandle(Arc<NodeEntry>);

struct NodeEntry {
    id: NodeId,
    last_reading: Arc<Mutex<Option<DateTime<Utc>>>>,
    sensors: RwLock<BTreeMap<SensorId, SensorHandle>>,
}

/// Shared handle to a sensor. Cheap to clone.
#[derive(Clone)]
pub struct SensorHandle(Arc<SensorEntry>);

struct SensorEntry {
    id: SensorId,
    type_code: TypeCode,
    buffer: RwLock<HistoryBuffer>,
    /// the owning node's last-reading time
    node_last_reading: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl HistoryStore {
    pub fn new(depth: usize) -> Result<Self, ConfigError> {
        let capacity = NonZeroUsize::new(depth)
            .ok_or_else(|| ConfigError::Invalid("history depth must be at least 1".into()))?;
        Ok(Self {
            capacity,
            nodes: RwLock::new(BTreeMap::new()),
        })
    }

    /// readings retained per sensor
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// get or create a node
    pub fn ensure_node(&self, id: &NodeId) -> NodeHandle {
        if let Some(node) = self.nodes.read().get(id) {
            return node.clone();
        }

        self.nodes
            .write()
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(node = %id, "new node");
                NodeHandle(Arc::new(NodeEntry {
                    id: id.clone(),
                    last_reading: Arc::new(Mutex::new(None)),
                    sensors: RwLock::new(BTreeMap::new()),
                }))
            })
            .clone()
    }

    /// get or create a sensor on a node
    ///
    /// an existing sensor keeps the type code it was first seen with, even if
    /// a later frame reports a different one.
    pub fn ensure_sensor(
        &self,
        node: &NodeHandle,
        id: &SensorId,
        type_code: TypeCode,
    ) -> SensorHandle {
        if let Some(sensor) = node.0.sensors.read().get(id) {
            if sensor.0.type_code != type_code {
                tracing::debug!(
                    node = %node.0.id,
                    sensor = %id,
                    stored = %sensor.0.type_code,
                    reported = %type_code,
                    "sensor type changed, keeping first-seen type"
                );
            }
            return sensor.clone();
        }

        let capacity = self.capacity;
        node.0
            .sensors
            .write()
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(
                    node = %node.0.id,
                    sensor = %id,
                    type_code = %type_code,
                    "new sensor"
                );
                SensorHandle(Arc::new(SensorEntry {
                    id: id.clone(),
                    type_code,
                    buffer: RwLock::new(HistoryBuffer::new(capacity)),
                    node_last_reading: Arc::clone(&node.0.last_reading),
                }))
            })
            .clone()
    }

    /// record a validated reading
    pub fn write(&self, sensor: &SensorHandle, value: f64, at: DateTime<Utc>) {
        sensor.0.buffer.write().push(value);
        *sensor.0.node_last_reading.lock() = Some(at);
    }

    /// latest value, `None` before the first write
    pub fn current(&self, sensor: &SensorHandle) -> Option<f64> {
        sensor.0.buffer.read().current()
    }

    /// readings oldest -> newest, taken from a copy of the buffer
    pub fn history(&self, sensor: &SensorHandle) -> history::IntoIter {
        sensor.buffer().into_iter()
    }

    pub fn node(&self, id: &NodeId) -> Option<NodeHandle> {
        self.nodes.read().get(id).cloned()
    }

    /// all nodes, ordered by id
    pub fn nodes(&self) -> Vec<NodeHandle> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.read().keys().cloned().collect()
    }
}

impl NodeHandle {
    pub fn id(&self) -> &NodeId {
        &self.0.id
    }

    pub fn last_reading(&self) -> Option<DateTime<Utc>> {
        *self.0.last_reading.lock()
    }

    pub fn sensor(&self, id: &SensorId) -> Option<SensorHandle> {
        self.0.sensors.read().get(id).cloned()
    }

    /// all sensors on this node, ordered by id
    pub fn sensors(&self) -> Vec<SensorHandle> {
        self.0.sensors.read().values().cloned().collect()
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodeHandle").field(&self.0.id).finish()
    }
}

impl SensorHandle {
    pub fn id(&self) -> &SensorId {
        &self.0.id
    }

    pub fn type_code(&self) -> TypeCode {
        self.0.type_code
    }

    /// consistent copy of the (cursor, slots) pair
    pub fn buffer(&self) -> HistoryBuffer {
        self.0.buffer.read().clone()
    }
}

impl PartialEq for SensorHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorHandle")
            .field("id", &self.0.id)
            .field("type_code", &self.0.type_code)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        assert!(matches!(HistoryStore::new(0), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_ensure_node_is_idempotent() {
        let store = HistoryStore::new(DEFAULT_DEPTH).unwrap();
        let a = store.ensure_node(&NodeId::from("A"));
        let b = store.ensure_node(&NodeId::from("A"));
        assert_eq!(a, b);
        assert_eq!(store.node_ids(), vec![NodeId::from("A")]);
    }

    #[test]
    fn test_ensure_sensor_keeps_history_and_first_type() {
        let store = HistoryStore::new(DEFAULT_DEPTH).unwrap();
        let node = store.ensure_node(&NodeId::from("A"));
        let s1 = store.ensure_sensor(&node, &SensorId::from("S1"), TypeCode(1));
        store.write(&s1, 20.0, at(10));

        let again = store.ensure_sensor(&node, &SensorId::from("S1"), TypeCode(2));
        assert_eq!(s1, again);
        assert_eq!(again.type_code(), TypeCode(1));
        assert_eq!(store.history(&again).collect::<Vec<_>>(), vec![20.0]);
    }

    #[test]
    fn test_ids_are_not_coerced() {
        let store = HistoryStore::new(DEFAULT_DEPTH).unwrap();
        let a = store.ensure_node(&NodeId::from("1"));
        let b = store.ensure_node(&NodeId::from("01"));
        assert_ne!(a, b);
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn test_write_updates_current_and_node_time() {
        let store = HistoryStore::new(3).unwrap();
        let node = store.ensure_node(&NodeId::from("A"));
        let sensor = store.ensure_sensor(&node, &SensorId::from("S1"), TypeCode(1));
        assert_eq!(store.current(&sensor), None);
        assert_eq!(node.last_reading(), None);

        for (i, v) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            store.write(&sensor, v, at(i as i64));
        }

        assert_eq!(store.current(&sensor), Some(4.0));
        assert_eq!(store.history(&sensor).collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(node.last_reading(), Some(at(3)));
    }

    #[test]
    fn test_sensors_are_isolated() {
        let store = HistoryStore::new(5).unwrap();
        let node = store.ensure_node(&NodeId::from("A"));
        let s1 = store.ensure_sensor(&node, &SensorId::from("S1"), TypeCode(1));
        let s2 = store.ensure_sensor(&node, &SensorId::from("S2"), TypeCode(2));
        store.write(&s1, 21.0, at(1));

        assert_eq!(store.current(&s2), None);
        assert_eq!(node.sensors().len(), 2);
        assert_eq!(node.sensor(&SensorId::from("S1")), Some(s1));
    }
}
