use crate::errors::DeliveryError;
use crate::reading::MeasurementReading;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, error};

/// Acknowledgement from the ingestor for one accepted reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub status: StatusCode,
}

/// Destination for assembled readings. A single attempt per reading; failures
/// are reported to the caller and the reading is not retried.
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn deliver(&self, reading: &MeasurementReading) -> Result<Ack, DeliveryError>;
}

/// Posts readings to the ingestor's `/api/readings` endpoint.
#[derive(Debug, Clone)]
pub struct IngestionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IngestionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/readings", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, reading: &MeasurementReading) -> Result<Ack, DeliveryError> {
        let response = self.http.post(&self.endpoint).json(reading).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status));
        }
        Ok(Ack { status })
    }
}

#[async_trait]
impl ReadingSink for IngestionClient {
    async fn deliver(&self, reading: &MeasurementReading) -> Result<Ack, DeliveryError> {
        match self.post(reading).await {
            Ok(ack) => {
                debug!(
                    "Delivered reading for meter {} ({})",
                    reading.device_id, ack.status
                );
                Ok(ack)
            }
            Err(e) => {
                error!("Failed to post data for meter {}: {}", reading.device_id, e);
                Err(e)
            }
        }
    }
}
