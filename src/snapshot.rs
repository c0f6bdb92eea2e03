//! Point-in-time view of the store for the `/data` endpoint.
//!
//! Each sensor's buffer is copied under its own lock; the view as a whole is
//! not linearizable across sensors, which is fine for a dashboard refresh.
//!
//! Keys are camelCase so the bundled front-end can read the view directly:
//! it indexes `readings[lastReading]` for the current value and compares
//! `lastReadingTime` against `currentTime` for node age.

use crate::domain::TypeCode;
use crate::store::HistoryStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    /// "now" the ages were computed against (unix ms)
    pub current_time: i64,
    /// history depth per sensor
    pub max_readings: usize,
    /// nodes keyed by id
    pub nodes: BTreeMap<String, NodeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    /// unix ms of the last stored reading
    pub last_reading_time: Option<i64>,
    /// milliseconds between the last reading and `current_time`
    pub age_ms: Option<i64>,
    pub sensors: BTreeMap<String, SensorView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorView {
    pub id: String,
    #[serde(rename = "type")]
    pub type_code: TypeCode,
    pub current: Option<f64>,
    /// oldest -> newest
    pub history: Vec<f64>,
    /// raw ring slots, only the ones written so far
    pub readings: Vec<f64>,
    /// slot in `readings` holding the latest value, -1 before the first write
    pub last_reading: i64,
}

/// build a snapshot of every node and sensor in the store
pub fn snapshot(store: &HistoryStore, now: DateTime<Utc>) -> SnapshotView {
    let current_time = now.timestamp_millis();

    let nodes = store
        .nodes()
        .into_iter()
        .map(|node| {
            let last = node.last_reading();
            let sensors = node
                .sensors()
                .into_iter()
                .map(|sensor| {
                    let buffer = sensor.buffer();
                    let view = SensorView {
                        id: sensor.id().to_string(),
                        type_code: sensor.type_code(),
                        current: buffer.current(),
                        history: buffer.iter().collect(),
                        readings: buffer.slots().to_vec(),
                        last_reading: buffer
                            .cursor()
                            .and_then(|c| i64::try_from(c).ok())
                            .unwrap_or(-1),
                    };
                    (view.id.clone(), view)
                })
                .collect();

            let view = NodeView {
                id: node.id().to_string(),
                last_reading_time: last.map(|t| t.timestamp_millis()),
                age_ms: last.map(|t| (now - t).num_milliseconds()),
                sensors,
            };
            (view.id.clone(), view)
        })
        .collect();

    SnapshotView {
        current_time,
        max_readings: store.capacity(),
        nodes,
    }
}
