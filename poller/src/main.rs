mod client;
mod config;
mod decoder;
mod errors;
#[cfg(test)]
mod fakes;
mod poller;
mod reader;
mod reading;
mod registers;
mod transport;

use clap::Parser;
use client::IngestionClient;
use config::Config;
use poller::Poller;
use tracing::{error, info};
use transport::ModbusTcpTransport;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(2);
    }

    info!("Starting meter poller");
    info!(
        "Gateway: {}:{}, Meters: {:?}, Backend: {}",
        config.gateway_host, config.gateway_port, config.devices, config.backend_url
    );
    info!(
        "Interval: {}s, read pause: {}ms",
        config.interval_secs, config.read_pause_ms
    );

    let client = match IngestionClient::new(&config.backend_url, config.delivery_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    info!("Delivering readings to {}", client.endpoint());

    let transport = ModbusTcpTransport::new(
        config.gateway_host.clone(),
        config.gateway_port,
        config.modbus_timeout(),
    );

    let mut poller = Poller::new(
        transport,
        client,
        registers::SDM630,
        config.devices.clone(),
        config.timing(),
    );

    if let Err(e) = poller.start().await {
        error!("Could not connect to gateway: {}", e);
        std::process::exit(1);
    }

    tokio::select! {
        result = poller.run() => {
            if let Err(e) = result {
                error!("Poller terminated: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Logging stopped by user");
        }
    }

    info!("Stopping in state {:?}", poller.state());
    poller.shutdown().await;
}
