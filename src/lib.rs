//! ==============================================================================
//! heathack-hub - receiver hub for the HeatHack sensor network
//! ==============================================================================
//!
//! the hub sits next to a radio bridge on a serial port. every line the bridge
//! prints is a candidate frame:
//!
//! ```text
//! serial line ──> codec ──> validation ──> store ──> snapshot (/data)
//!                                           │
//!                                           └──> publisher (emoncms, ...)
//! ```
//!
//! modules:
//! ```text
//! - codec:      text line -> Frame
//! - registry:   sensor type table (names, units, valid ranges)
//! - validation: range gate in front of the store and publisher
//! - history:    fixed-capacity ring buffer per sensor
//! - store:      nodes -> sensors -> history, shared with readers
//! - snapshot:   serializable point-in-time view
//! - ingest:     the pipeline that ties the above together
//! - publish:    Publisher trait, backends, worker task
//! - transport:  serial port line reader
//! - server:     axum routes
//! ```
//!
//! ==============================================================================

pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod history;
pub mod ingest;
pub mod publish;
pub mod registry;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod telemetry;
pub mod transport;
pub mod validation;
