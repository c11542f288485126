use crate::errors::{Error, Result};
use crate::model::MeasurementReading;

/// Checks that a posted reading conforms to the stored record's types.
///
/// Measurement values are not range-checked.
pub fn validate(reading: &MeasurementReading) -> Result<()> {
    if reading.device_id <= 0 {
        return Err(Error::Validation(format!(
            "Device ID must be positive, got {}",
            reading.device_id
        )));
    }

    if !reading.timestamp.is_finite() {
        return Err(Error::Validation(format!(
            "Timestamp {} is not a finite epoch time",
            reading.timestamp
        )));
    }

    Ok(())
}
