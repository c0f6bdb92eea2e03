//! ==============================================================================
//! ingest.rs - frame -> validation gate -> store -> publisher
//! ==============================================================================
//!
//! purpose:
//! ```text
//! the single writer of the history store. each received line is decoded,
//! every reading goes through the validation gate, accepted readings are
//! written to their sensor's buffer, and the accepted batch is queued for
//! the publisher.
//! ```
//!
//! failure containment:
//! ```text
//! nothing here returns an error to the transport. a bad line, a bad
//! triplet or an out-of-range value is logged and skipped; the next line
//! is processed normally.
//! ```
//!
//! relationships:
//! ```text
//! - called by: transport.rs (once per line, in arrival order)
//! - uses: codec.rs, validation.rs, store.rs, publish.rs
//! ```
//!
//! ==============================================================================

use crate::codec;
use crate::domain::{Batch, Reading};
use crate::error::DecodeError;
use crate::publish::PublishQueue;
use crate::store::HistoryStore;
use crate::validation::ValidationGate;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct Ingest {
    store: Arc<HistoryStore>,
    gate: ValidationGate,
    queue: PublishQueue,
    show_frames: bool,
}

/// what happened to one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
}

impl Ingest {
    pub fn new(store: Arc<HistoryStore>, gate: ValidationGate, queue: PublishQueue) -> Self {
        Self {
            store,
            gate,
            queue,
            show_frames: false,
        }
    }

    /// log every decoded frame at info level
    pub fn show_frames(mut self, show: bool) -> Self {
        self.show_frames = show;
        self
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// process a line received now
    pub fn handle_line(&self, line: &str) -> Option<FrameOutcome> {
        self.handle_line_at(line, Utc::now())
    }

    /// process a line received at `now`
    ///
    /// returns `None` for lines that are not frames. the store is not touched
    /// in that case.
    pub fn handle_line_at(&self, line: &str, now: DateTime<Utc>) -> Option<FrameOutcome> {
        let frame = match codec::decode(line) {
            Ok(frame) => frame,
            Err(DecodeError::NotAFrame) => {
                tracing::trace!(line, "ignoring non-frame line");
                return None;
            }
            Err(e) => {
                tracing::debug!(line, error = %e, "dropping line");
                return None;
            }
        };

        let node = self.store.ensure_node(&frame.node_id);
        let mut accepted: Vec<Reading> = Vec::with_capacity(frame.readings.len());
        let mut outcome = FrameOutcome {
            malformed: frame.rejected.len(),
            ..FrameOutcome::default()
        };

        for reading in frame.readings {
            if let Err(e) = self.gate.check(reading.type_code, reading.value) {
                tracing::debug!(
                    node = %frame.node_id,
                    sensor = %reading.sensor_id,
                    error = %e,
                    "reading rejected"
                );
                outcome.rejected += 1;
                continue;
            }

            let sensor = self.store.ensure_sensor(&node, &reading.sensor_id, reading.type_code);
            self.store.write(&sensor, reading.value, now);
            accepted.push(reading);
        }
        outcome.accepted = accepted.len();

        if self.show_frames {
            tracing::info!(node = %frame.node_id, readings = ?accepted, "frame");
        }

        self.queue.enqueue(Batch {
            node_id: frame.node_id,
            readings: accepted,
            received_at: now,
        });

        Some(outcome)
    }
}
