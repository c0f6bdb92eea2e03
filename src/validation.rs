//! Validation gate: decides which readings are stored and forwarded.

use crate::domain::TypeCode;
use crate::error::ValidationError;
use crate::registry::{Range, SensorTypeRegistry};

#[derive(Debug, Clone, Default)]
pub struct ValidationGate {
    registry: SensorTypeRegistry,
}

impl ValidationGate {
    pub fn new(registry: SensorTypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SensorTypeRegistry {
        &self.registry
    }

    /// check a reading against its type's range
    pub fn check(&self, code: TypeCode, value: f64) -> Result<(), ValidationError> {
        let descriptor = self
            .registry
            .describe(code)
            .ok_or(ValidationError::UnknownType(code))?;

        match descriptor.range {
            Range::Unbounded => Ok(()),
            range @ Range::Inclusive { min, max } => {
                if range.contains(value) {
                    Ok(())
                } else {
                    Err(ValidationError::OutOfRange {
                        name: descriptor.name,
                        value,
                        min,
                        max,
                    })
                }
            }
        }
    }

    /// `check` for callers that only need a yes/no; rejections are logged
    pub fn accept(&self, code: TypeCode, value: f64) -> bool {
        match self.check(code, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "reading rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HUMIDITY, LIGHT, LOW_BATTERY, SOUND, TEMPERATURE, TEST};

    #[test]
    fn test_bounds_are_inclusive() {
        let gate = ValidationGate::default();
        assert!(gate.accept(TEMPERATURE, -20.0));
        assert!(gate.accept(TEMPERATURE, 50.0));
        assert!(gate.accept(HUMIDITY, 0.0));
        assert!(gate.accept(HUMIDITY, 100.0));
        assert!(gate.accept(LIGHT, 255.0));
    }

    #[test]
    fn test_just_outside_bounds_is_rejected() {
        let gate = ValidationGate::default();
        let eps = 1e-9;
        assert!(!gate.accept(TEMPERATURE, -20.0 - eps));
        assert!(!gate.accept(TEMPERATURE, 50.0 + eps));
        assert!(!gate.accept(HUMIDITY, -eps));
        assert!(!gate.accept(LIGHT, 255.0 + eps));

        assert_eq!(
            gate.check(HUMIDITY, 101.0),
            Err(ValidationError::OutOfRange {
                name: "humidity",
                value: 101.0,
                min: 0.0,
                max: 100.0
            })
        );
    }

    #[test]
    fn test_unbounded_types_accept_anything_finite() {
        let gate = ValidationGate::default();
        for value in [-1e12, -1.0, 0.0, 3.5, 1e12] {
            assert!(gate.accept(TEST, value));
            assert!(gate.accept(SOUND, value));
            assert!(gate.accept(LOW_BATTERY, value));
        }
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        let gate = ValidationGate::default();
        assert_eq!(
            gate.check(TypeCode(8), 1.0),
            Err(ValidationError::UnknownType(TypeCode(8)))
        );
        assert!(!gate.accept(TypeCode(-3), 0.0));
        assert!(!gate.accept(TypeCode(1000), 0.0));
    }
}
