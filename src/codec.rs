//! ==============================================================================
//! codec.rs - heathack frame decoder
//! ==============================================================================
//!
//! purpose:
//! ```text
//! turns one untrusted text line from the radio bridge into a node id and
//! an ordered list of readings.
//! ```
//!
//! wire format:
//!
//! ```text
//! heathack <node> <sensor> <type> <value> [<sensor> <type> <value> ...]
//!
//! tokens are whitespace separated. anything not starting with the marker
//! is noise from the bridge (boot banners, rf12 config echoes) and is
//! reported as NotAFrame so the caller can drop it without logging.
//! ```
//!
//! relationships:
//! ```text
//! - used by: ingest.rs (once per received line)
//! - produces: domain::Reading (typed once here, never re-parsed)
//! ```
//!
//! ==============================================================================

use crate::domain::{NodeId, Reading, SensorId, TypeCode};
use crate::error::DecodeError;

/// first token of every telemetry line
pub const FRAME_MARKER: &str = "heathack";

/// index of the first sensor id token
const FIRST_TRIPLET: usize = 2;

/// a decoded line: the node plus the triplets that parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub node_id: NodeId,
    /// readings in arrival order
    pub readings: Vec<Reading>,
    /// triplets dropped because a token did not parse
    pub rejected: Vec<DecodeError>,
}

/// decode one line into a frame
///
/// triplets are read from token 2 in steps of three while `i < len - 2`,
/// so a trailing group of one or two tokens is ignored. field devices have
/// always been read with this boundary and it is kept as-is.
pub fn decode(line: &str) -> Result<Frame, DecodeError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&marker) if marker == FRAME_MARKER => {}
        _ => return Err(DecodeError::NotAFrame),
    }

    let node_id = tokens
        .get(1)
        .map(|id| NodeId::new(*id))
        .ok_or(DecodeError::MissingNode)?;

    let mut readings = Vec::new();
    let mut rejected = Vec::new();

    let mut i = FIRST_TRIPLET;
    while i + 2 < tokens.len() {
        match decode_triplet(tokens[i], tokens[i + 1], tokens[i + 2]) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                tracing::debug!(node = %node_id, error = %e, "dropping triplet");
                rejected.push(e);
            }
        }
        i += 3;
    }

    Ok(Frame {
        node_id,
        readings,
        rejected,
    })
}

fn decode_triplet(sensor: &str, type_code: &str, value: &str) -> Result<Reading, DecodeError> {
    let malformed = |reason: String| DecodeError::MalformedTriplet {
        sensor_id: sensor.to_string(),
        reason,
    };

    let type_code: i32 = type_code
        .parse()
        .map_err(|_| malformed(format!("type code '{}' is not an integer", type_code)))?;

    let value: f64 = value
        .parse()
        .map_err(|_| malformed(format!("value '{}' is not a number", value)))?;

    if !value.is_finite() {
        return Err(malformed(format!("value '{}' is not finite", value)));
    }

    Ok(Reading {
        sensor_id: SensorId::new(sensor),
        type_code: TypeCode(type_code),
        value,
    })
}
