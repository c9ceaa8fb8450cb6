//! # Order Warehouse Demo
//!
//! Runs one warehouse with the configuration from `WAREHOUSE_*` environment
//! variables (see [`WarehouseConfig`]) and logs the accept/fulfill trace.
//! Ctrl-C requests a broadcast stop.

use order_warehouse::lifecycle::{setup_tracing, Coordinator, WarehouseConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = WarehouseConfig::from_env().map_err(|e| e.to_string())?;
    info!(?config, "Starting order warehouse");

    let coordinator = Coordinator::new(config).map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e.to_string()
    })?;

    let shutdown = coordinator.shutdown_handle();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received");
            ctrl_c.shutdown();
        }
    });

    let report = coordinator.run().await.map_err(|e| e.to_string())?;
    if shutdown.is_shutdown() {
        warn!("Run ended early by shutdown request");
    }

    for producer in &report.producers {
        info!(task = %producer.name, accepted = producer.accepted.len(), outcome = ?producer.outcome, "Producer report");
    }
    for consumer in &report.consumers {
        info!(task = %consumer.name, fulfilled = consumer.fulfilled.len(), outcome = ?consumer.outcome, "Consumer report");
    }
    if !report.fulfillments.is_empty() {
        let interrupted = report.fulfillments.iter().filter(|f| f.interrupted).count();
        info!(fulfilled = report.fulfillments.len(), interrupted, "Fulfillment report");
    }

    info!(remaining = report.remaining, "Application completed successfully");
    Ok(())
}
