//! Sensor type table.
//!
//! Type codes are assigned by the node firmware in numerical order from
//! zero. Each entry carries the name used when publishing, a short display
//! label, the unit and the range the validation gate enforces.

use crate::domain::TypeCode;
use serde::{Deserialize, Serialize};

pub const TEST: TypeCode = TypeCode(0);
pub const TEMPERATURE: TypeCode = TypeCode(1);
pub const HUMIDITY: TypeCode = TypeCode(2);
pub const LIGHT: TypeCode = TypeCode(3);
pub const MOVEMENT: TypeCode = TypeCode(4);
pub const PRESSURE: TypeCode = TypeCode(5);
pub const SOUND: TypeCode = TypeCode(6);
pub const LOW_BATTERY: TypeCode = TypeCode(7);

/// Accepted values for a sensor type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Range {
    /// No validation, every finite value is accepted.
    Unbounded,
    /// `min <= value <= max`.
    Inclusive { min: f64, max: f64 },
}

impl Range {
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Range::Unbounded => true,
            Range::Inclusive { min, max } => min <= value && value <= max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub code: TypeCode,
    /// publish name, e.g. "temperature" -> emoncms input "temperature1"
    pub name: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub range: Range,
}

/// Which temperature limits the deployment validates against.
///
/// Indoor nodes were originally capped at 50C; later boards with an
/// external sensor report up to 84C.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureRange {
    #[default]
    Standard,
    Extended,
}

impl TemperatureRange {
    fn range(self) -> Range {
        match self {
            TemperatureRange::Standard => Range::Inclusive { min: -20.0, max: 50.0 },
            TemperatureRange::Extended => Range::Inclusive { min: -20.0, max: 84.0 },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SensorTypeRegistry {
    types: Vec<TypeDescriptor>,
}

impl SensorTypeRegistry {
    pub fn new(temperature: TemperatureRange) -> Self {
        let entry = |code: TypeCode,
                     name: &'static str,
                     label: &'static str,
                     unit: &'static str,
                     range: Range| TypeDescriptor {
            code,
            name,
            label,
            unit,
            range,
        };

        // index == type code
        let types = vec![
            entry(TEST, "test", "Unknown", "", Range::Unbounded),
            entry(TEMPERATURE, "temperature", "Temp", "C", temperature.range()),
            entry(HUMIDITY, "humidity", "Hum", "%", Range::Inclusive { min: 0.0, max: 100.0 }),
            entry(LIGHT, "light", "Light", "", Range::Inclusive { min: 0.0, max: 255.0 }),
            entry(MOVEMENT, "movement", "Motion", "", Range::Unbounded),
            entry(PRESSURE, "pressure", "Pres", "mb", Range::Unbounded),
            entry(SOUND, "sound", "Sound", "dB", Range::Unbounded),
            entry(LOW_BATTERY, "lowbatt", "Low Battery", "", Range::Unbounded),
        ];

        Self { types }
    }

    /// look up a type code; `None` for anything outside the table
    pub fn describe(&self, code: TypeCode) -> Option<&TypeDescriptor> {
        usize::try_from(code.0).ok().and_then(|i| self.types.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }
}

impl Default for SensorTypeRegistry {
    fn default() -> Self {
        Self::new(TemperatureRange::Standard)
    }
}
