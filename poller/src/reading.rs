use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Modbus unit id of a meter behind the gateway.
pub type DeviceId = u8;

/// The quantities read from every meter, in polling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measurement {
    Voltage,
    Current,
    Power,
    Frequency,
    Energy,
}

impl Measurement {
    pub const ALL: [Measurement; 5] = [
        Measurement::Voltage,
        Measurement::Current,
        Measurement::Power,
        Measurement::Frequency,
        Measurement::Energy,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Measurement::Voltage => "Voltage",
            Measurement::Current => "Current",
            Measurement::Power => "Power",
            Measurement::Frequency => "Frequency",
            Measurement::Energy => "Energy",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Measurement::Voltage => "V",
            Measurement::Current => "A",
            Measurement::Power => "W",
            Measurement::Frequency => "Hz",
            Measurement::Energy => "kWh",
        }
    }

    fn precision(self) -> usize {
        match self {
            Measurement::Current | Measurement::Energy => 3,
            _ => 2,
        }
    }
}

/// Values collected for one device during a cycle. `None` marks a failed read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurements {
    values: [Option<f32>; 5],
}

impl Measurements {
    pub fn set(&mut self, measurement: Measurement, value: Option<f32>) {
        self.values[measurement.index()] = value;
    }

    pub fn get(&self, measurement: Measurement) -> Option<f32> {
        self.values[measurement.index()]
    }
}

/// One snapshot from one meter, as posted to the ingestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReading {
    pub timestamp: f64,
    pub device_id: DeviceId,
    pub voltage: Option<f32>,
    pub current: Option<f32>,
    pub power: Option<f32>,
    pub frequency: Option<f32>,
    pub energy: Option<f32>,
}

impl MeasurementReading {
    pub fn new(device_id: DeviceId, timestamp: f64, measurements: Measurements) -> Self {
        Self {
            timestamp,
            device_id,
            voltage: measurements.get(Measurement::Voltage),
            current: measurements.get(Measurement::Current),
            power: measurements.get(Measurement::Power),
            frequency: measurements.get(Measurement::Frequency),
            energy: measurements.get(Measurement::Energy),
        }
    }

    pub fn get(&self, measurement: Measurement) -> Option<f32> {
        match measurement {
            Measurement::Voltage => self.voltage,
            Measurement::Current => self.current,
            Measurement::Power => self.power,
            Measurement::Frequency => self.frequency,
            Measurement::Energy => self.energy,
        }
    }

    pub fn present_count(&self) -> usize {
        Measurement::ALL
            .iter()
            .filter(|m| self.get(**m).is_some())
            .count()
    }

    /// Human-readable line for the poll log, e.g. `Voltage 230.10 V, Current failed, ...`.
    pub fn summary(&self) -> String {
        Measurement::ALL
            .iter()
            .map(|&m| match self.get(m) {
                Some(v) => format!("{} {:.*} {}", m.label(), m.precision(), v, m.unit()),
                None => format!("{} failed", m.label()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn epoch_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_measurements_follow_polling_order() {
        let labels: Vec<_> = Measurement::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(labels, ["Voltage", "Current", "Power", "Frequency", "Energy"]);
        for (i, m) in Measurement::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
        }
    }

    #[test]
    fn test_reading_serializes_absent_as_null() {
        let mut measurements = Measurements::default();
        measurements.set(Measurement::Voltage, Some(230.5));
        measurements.set(Measurement::Frequency, Some(50.0));

        let reading = MeasurementReading::new(2, 1_700_000_000.25, measurements);
        assert_eq!(reading.present_count(), 2);

        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": 1_700_000_000.25,
                "device_id": 2,
                "voltage": 230.5,
                "current": null,
                "power": null,
                "frequency": 50.0,
                "energy": null
            })
        );
    }

    #[test]
    fn test_summary_marks_failed_fields() {
        let mut measurements = Measurements::default();
        measurements.set(Measurement::Voltage, Some(230.0));
        measurements.set(Measurement::Current, Some(1.5));
        let reading = MeasurementReading::new(1, 0.0, measurements);

        assert_eq!(
            reading.summary(),
            "Voltage 230.00 V, Current 1.500 A, Power failed, Frequency failed, Energy failed"
        );
    }

    #[test]
    fn test_epoch_seconds_is_recent() {
        let now = epoch_seconds();
        assert!(now > 1_600_000_000.0);
        assert!(now < 10_000_000_000.0);
    }
}
