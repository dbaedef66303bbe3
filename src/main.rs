//! Geofence engine - vehicle zone transition service
//!
//! Ingests GPS reports over HTTP, matches them against rectangular zones,
//! and tracks ENTER / EXIT / CHANGE transitions per vehicle.
//!
//! Module structure:
//! - `domain/` - Core types (Zone, Transition, VehicleState, LocationEvent)
//! - `io/` - HTTP API and Prometheus exposition
//! - `services/` - Sanitizer, zone registry, matcher, classifier, vehicle store
//! - `infra/` - Config, metrics, logging

use clap::Parser;
use geofence_engine::infra::logging::init_logging;
use geofence_engine::infra::{Config, LogFormat, Metrics};
use geofence_engine::io::{start_http_server, AppState};
use geofence_engine::services::{load_or_builtin, VehicleStateStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Geofence engine - vehicle zone transition service
#[derive(Parser, Debug)]
#[command(name = "geofence-engine", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Zone definition file (overrides [zones] file)
    #[arg(short, long)]
    zones: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging(args.log_format);
    info!("geofence-engine starting");

    let mut config = Config::load_from_path(&args.config);
    if let Some(zones) = args.zones {
        config = config.with_zones_file(zones);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    info!(
        config_file = %config.config_file(),
        service = %config.service_name(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        zones_file = %config.zones_file(),
        history_limit = %config.history_limit(),
        "config_loaded"
    );

    let registry = match load_or_builtin(config.zones_file(), config.zones_fallback_to_builtin()) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!(error = %e, path = %config.zones_file(), "zone_config_invalid");
            std::process::exit(1);
        }
    };

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, bind_address = %config.bind_address(), "bind_address_invalid");
            std::process::exit(1);
        }
    };

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create shared components
    let metrics = Arc::new(Metrics::new());
    let store = Arc::new(
        VehicleStateStore::with_metrics(registry, metrics.clone())
            .with_history_limit(config.history_limit()),
    );
    let state = Arc::new(AppState::from_config(&config, store.clone(), metrics.clone()));

    // Start metrics reporter (if interval > 0)
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let reporter_metrics = metrics.clone();
        let reporter_store = store.clone();
        let mut reporter_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        reporter_metrics.report(reporter_store.vehicle_count()).log();
                    }
                    _ = reporter_shutdown.changed() => break,
                }
            }
        });
    }

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Run HTTP server until shutdown
    start_http_server(addr, state, shutdown_rx).await?;

    info!(tracked_vehicles = store.vehicle_count(), "geofence-engine shutdown complete");
    Ok(())
}
