use crate::errors::{Error, Result};
use crate::reading::DeviceId;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, info, warn};

/// Request/response access to the input registers of devices behind one gateway.
///
/// Implementations own the connection and enforce request timeouts; callers
/// never retry.
#[async_trait]
pub trait RegisterTransport: Send {
    async fn connect(&mut self) -> Result<()>;

    async fn read_input_registers(
        &mut self,
        unit: DeviceId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    async fn close(&mut self) -> Result<()>;

    /// False before `connect` and after a request broke the link or timed out.
    fn is_connected(&self) -> bool;
}

/// Modbus TCP connection to a gateway, shared by every unit id behind it.
pub struct ModbusTcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusTcpTransport {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            ctx: None,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Forgets the connection once the request/response stream can no longer
    /// be trusted; the poller reconnects on its next cycle.
    fn drop_link(&mut self, reason: &str) {
        warn!("Modbus link to {} dropped: {}", self.endpoint(), reason);
        self.ctx = None;
    }
}

#[async_trait]
impl RegisterTransport for ModbusTcpTransport {
    async fn connect(&mut self) -> Result<()> {
        let endpoint = self.endpoint();
        info!("Connecting to Modbus gateway at {}", endpoint);

        let addr = tokio::net::lookup_host(&endpoint)
            .await
            .map_err(|e| Error::Connection(format!("cannot resolve {}: {}", endpoint, e)))?
            .next()
            .ok_or_else(|| Error::Connection(format!("no address found for {}", endpoint)))?;

        let ctx = match timeout(self.timeout, tcp::connect(addr)).await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(e)) => {
                return Err(Error::Connection(format!("{}: {}", endpoint, e)));
            }
            Err(_) => {
                return Err(Error::Connection(format!(
                    "{}: timed out after {:?}",
                    endpoint, self.timeout
                )));
            }
        };

        self.ctx = Some(ctx);
        info!("Connected to Modbus gateway at {}", endpoint);
        Ok(())
    }

    async fn read_input_registers(
        &mut self,
        unit: DeviceId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let ctx = self.ctx.as_mut().ok_or(Error::NotConnected)?;
        ctx.set_slave(Slave(unit));

        debug!(
            "Reading {} input registers from unit {} at address {}",
            count, unit, address
        );

        let outcome = timeout(self.timeout, ctx.read_input_registers(address, count)).await;
        let response = match outcome {
            Ok(response) => response,
            Err(_) => {
                // A late reply would be matched against the next request.
                self.drop_link("request timed out");
                return Err(Error::Timeout(self.timeout));
            }
        };

        match response {
            Ok(Ok(words)) => Ok(words),
            Ok(Err(exception)) => Err(Error::Exception(format!("{:?}", exception))),
            Err(tokio_modbus::Error::Transport(e)) => {
                self.drop_link(&e.to_string());
                Err(Error::Io(e))
            }
            Err(e) => {
                self.drop_link(&e.to_string());
                Err(Error::Protocol(e.to_string()))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.disconnect().await?;
            info!("Disconnected from Modbus gateway at {}", self.endpoint());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }
}
