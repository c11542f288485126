//! In-memory stand-ins for the gateway and the ingestor, used by unit tests.

use crate::client::{Ack, ReadingSink};
use crate::errors::{DeliveryError, Error, Result};
use crate::reading::{DeviceId, MeasurementReading};
use crate::transport::RegisterTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Words(Vec<u16>),
    Exception,
    IoError,
}

/// Answers register reads from a table keyed by `(unit, address)`.
/// Unknown registers answer with an exception.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: HashMap<(DeviceId, u16), FakeResponse>,
    requests: Vec<(DeviceId, u16, u16)>,
    connected: bool,
    refuse_connects: usize,
    connect_attempts: usize,
    closed: bool,
}

impl FakeTransport {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Not connected, and refuses every connection attempt.
    pub fn unreachable() -> Self {
        Self {
            refuse_connects: usize::MAX,
            ..Self::default()
        }
    }

    /// Not connected yet; refuses the first `n` connection attempts.
    pub fn refusing(n: usize) -> Self {
        Self {
            refuse_connects: n,
            ..Self::default()
        }
    }

    pub fn with_value(self, unit: DeviceId, address: u16, value: f32) -> Self {
        let bits = value.to_bits();
        let words = vec![(bits >> 16) as u16, bits as u16];
        self.with_response(unit, address, FakeResponse::Words(words))
    }

    pub fn with_response(mut self, unit: DeviceId, address: u16, response: FakeResponse) -> Self {
        self.responses.insert((unit, address), response);
        self
    }

    pub fn requests(&self) -> &[(DeviceId, u16, u16)] {
        &self.requests
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Simulates the gateway dropping the link.
    pub fn drop_link(&mut self) {
        self.connected = false;
    }
}

#[async_trait]
impl RegisterTransport for FakeTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_attempts += 1;
        if self.refuse_connects > 0 {
            self.refuse_connects = self.refuse_connects.saturating_sub(1);
            return Err(Error::Connection("connection refused".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    async fn read_input_registers(
        &mut self,
        unit: DeviceId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.requests.push((unit, address, count));

        match self.responses.get(&(unit, address)) {
            Some(FakeResponse::Words(words)) => Ok(words.clone()),
            Some(FakeResponse::IoError) => {
                self.connected = false;
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )))
            }
            Some(FakeResponse::Exception) | None => {
                Err(Error::Exception("IllegalDataAddress".to_string()))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.closed = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Collects delivered readings; optionally rejects every delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<MeasurementReading>>>,
    attempts: Arc<Mutex<usize>>,
    reject: bool,
}

impl RecordingSink {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<MeasurementReading> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl ReadingSink for RecordingSink {
    async fn deliver(
        &self,
        reading: &MeasurementReading,
    ) -> std::result::Result<Ack, DeliveryError> {
        *self.attempts.lock().unwrap() += 1;
        if self.reject {
            return Err(DeliveryError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        self.delivered.lock().unwrap().push(reading.clone());
        Ok(Ack {
            status: reqwest::StatusCode::OK,
        })
    }
}
