use crate::poller::PollTiming;
use crate::reading::DeviceId;
use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// Highest unit id a Modbus device may use; 0 is broadcast.
const MAX_UNIT_ID: DeviceId = 247;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one meter id is required")]
    NoDevices,

    #[error("meter id {0} is outside 1..=247")]
    DeviceOutOfRange(DeviceId),

    #[error("backend url {0:?} must start with http:// or https://")]
    BackendUrl(String),
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "poller",
    about = "Polls Modbus energy meters through a gateway and forwards readings to the ingestor"
)]
pub struct Config {
    /// Modbus TCP gateway host
    #[arg(long, env = "ZLAN_IP")]
    pub gateway_host: String,

    /// Modbus TCP gateway port
    #[arg(long, env = "ZLAN_PORT", default_value_t = 502)]
    pub gateway_port: u16,

    /// Comma-separated Modbus unit ids of the meters behind the gateway
    #[arg(
        long,
        env = "METER_IDS",
        value_delimiter = ',',
        default_value = "1,2",
        value_parser = clap::value_parser!(u8).range(1..=(MAX_UNIT_ID as i64))
    )]
    pub devices: Vec<DeviceId>,

    /// Base URL of the ingestor, e.g. http://localhost:8000
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: String,

    /// Seconds to sleep between poll cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 60)]
    pub interval_secs: u64,

    /// Milliseconds to pause after each register read
    #[arg(long, env = "READ_PAUSE_MS", default_value_t = 200)]
    pub read_pause_ms: u64,

    /// Connect and per-request timeout for the gateway, in milliseconds
    #[arg(long, env = "MODBUS_TIMEOUT_MS", default_value_t = 3000)]
    pub modbus_timeout_ms: u64,

    /// Timeout for one delivery to the ingestor, in seconds
    #[arg(long, env = "DELIVERY_TIMEOUT_SECS", default_value_t = 10)]
    pub delivery_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        if let Some(id) = self
            .devices
            .iter()
            .find(|id| **id == 0 || **id > MAX_UNIT_ID)
        {
            return Err(ConfigError::DeviceOutOfRange(*id));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(ConfigError::BackendUrl(self.backend_url.clone()));
        }
        Ok(())
    }

    pub fn timing(&self) -> PollTiming {
        PollTiming {
            interval: Duration::from_secs(self.interval_secs),
            read_pause: Duration::from_millis(self.read_pause_ms),
        }
    }

    pub fn modbus_timeout(&self) -> Duration {
        Duration::from_millis(self.modbus_timeout_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}
