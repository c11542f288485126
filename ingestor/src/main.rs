mod db;
mod errors;
mod metrics;
mod model;
mod rest;
mod validate;

use axum::{routing::get, Router};
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://readings.db".to_string());
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let max_connections: u32 = env::var("DB_MAX_CONNECTIONS")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting meter reading ingestor");
    info!("HTTP server: {}", http_addr);
    info!("Database: {}", database_url);

    metrics::init_metrics();

    let pool = match db::make_pool(&database_url, max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(pool.clone()));

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    pool.close().await;
    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
