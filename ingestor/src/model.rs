use serde::{Deserialize, Serialize};

/// One snapshot of a meter, as posted by a poller and as served back to queriers.
///
/// A missing measurement means the poller could not read that register group
/// during the cycle; it is stored and returned as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeasurementReading {
    /// Seconds since the Unix epoch, assigned by the producer.
    pub timestamp: f64,
    #[serde(alias = "meter_id")]
    pub device_id: i64,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
}

/// Body returned for an accepted reading
#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub status: &'static str,
}

impl AppendResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
