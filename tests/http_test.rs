//! End-to-end tests over a real TCP socket

use geofence_engine::infra::Metrics;
use geofence_engine::io::{serve, AppState};
use geofence_engine::services::{VehicleStateStore, ZoneRegistry};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

async fn start_server() -> (SocketAddr, watch::Sender<bool>, tokio::task::JoinHandle<()>) {
    let metrics = Arc::new(Metrics::new());
    let store = Arc::new(VehicleStateStore::with_metrics(
        Arc::new(ZoneRegistry::builtin()),
        metrics.clone(),
    ));
    let state = Arc::new(AppState::new(store, metrics, "geofence_e2e", 64 * 1024));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        serve(listener, state, shutdown_rx).await.unwrap();
    });
    (addr, shutdown_tx, handle)
}

/// Send one request with `Connection: close` and return (status, body)
async fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = response.split_once("\r\n\r\n").map(|(_, b)| b.to_string()).unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn test_event_flow_over_tcp() {
    let (addr, shutdown_tx, handle) = start_server().await;

    let (status, body) = request(
        addr,
        "POST",
        "/events/location",
        r#"{"vehicle_id":"bus-9","latitude":"37.78","longitude":"-122.41"}"#,
    )
    .await;
    assert_eq!(status, 200);
    let event: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(event["transition"], "ENTER");
    assert_eq!(event["current_zone"], "zone_1");

    let (status, body) = request(addr, "GET", "/vehicles/bus-9/status", "").await;
    assert_eq!(status, 200);
    let vehicle: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(vehicle["current_zone"], "zone_1");
    assert_eq!(vehicle["transition_history"].as_array().unwrap().len(), 1);

    let (status, body) = request(addr, "GET", "/zones", "").await;
    assert_eq!(status, 200);
    let zones: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(zones[0]["vehicle_count"], 1);

    let (status, _) = request(addr, "GET", "/vehicles/ghost/status", "").await;
    assert_eq!(status, 404);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let (addr, shutdown_tx, handle) = start_server().await;

    let (status, _) = request(addr, "GET", "/health", "").await;
    assert_eq!(status, 200);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
