//! ==============================================================================
//! domain.rs - typed identifiers and readings
//! ==============================================================================
//!
//! frames arrive as text, so every id looks like a string or a number.
//! the codec parses each token once into one of these wrappers and nothing
//! downstream touches the raw text again.
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// radio node identifier (e.g., "12"), compared byte-for-byte
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// sensor identifier, unique within its node only
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// numeric sensor type code, looked up in the type registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeCode(pub i32);

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// one (sensor id, type code, value) triplet from a frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub type_code: TypeCode,
    pub value: f64,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, type_code: i32, value: f64) -> Self {
        Self {
            sensor_id: SensorId::new(sensor_id),
            type_code: TypeCode(type_code),
            value,
        }
    }
}

/// the validated readings of one frame, as handed to a publisher
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Batch {
    pub node_id: NodeId,
    pub readings: Vec<Reading>,
    /// when the hub received the frame
    pub received_at: DateTime<Utc>,
}
