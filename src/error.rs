//! Error taxonomy for the hub.
//!
//! Nothing here is fatal to the ingest loop except [`TransportError`]:
//! decode and validation failures drop a frame or a single reading and are
//! only logged, publish failures are logged by the publisher worker.

use crate::domain::TypeCode;
use std::path::PathBuf;
use thiserror::Error;

/// Why a line could not be turned into a frame (or a triplet into a reading).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The line does not start with the frame marker. Discard silently.
    #[error("line is not a heathack frame")]
    NotAFrame,

    /// Marker present but no node id follows it.
    #[error("frame marker without a node id")]
    MissingNode,

    /// One triplet could not be parsed; the rest of the frame is still used.
    #[error("malformed triplet for sensor '{sensor_id}': {reason}")]
    MalformedTriplet { sensor_id: String, reason: String },
}

/// Why the validation gate refused a reading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown sensor type {0}")]
    UnknownType(TypeCode),

    #[error("{name} reading {value} outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Failures of the line source. These end the ingest loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("transport read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Failures delivering a batch to the ingestion service.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ingestion endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unknown publisher backend '{name}' (known: {known})")]
    UnknownPublisher { name: String, known: String },

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
