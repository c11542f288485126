use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected to gateway")]
    NotConnected,

    #[error("Modbus exception: {0}")]
    Exception(String),

    #[error("Modbus protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Expected {expected} registers, got {actual}")]
    ShortPayload { expected: u16, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A reading that did not reach the ingestor. The reading is dropped.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Ingestor responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
