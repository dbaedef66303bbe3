//! HTTP API for the geofence engine
//!
//! Routes:
//! - `GET /` - service info
//! - `POST /events/location` - apply a GPS report
//! - `GET /vehicles/{id}/status` - vehicle state and transition history
//! - `GET /zones` - zone definitions with live vehicle counts
//! - `GET /health` - liveness
//! - `GET /metrics` - Prometheus text format
//!
//! Uses hyper for the HTTP server. Handlers call into the synchronous core
//! directly; the store never blocks on I/O.

use crate::domain::event::LocationEvent;
use crate::domain::types::VehicleId;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::payloads::{
    ErrorResponse, EventResponse, HealthResponse, ServiceInfo, VehicleStatus, ZoneInfo,
};
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::vehicle_store::VehicleStateStore;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared state for request handlers
pub struct AppState {
    store: Arc<VehicleStateStore>,
    metrics: Arc<Metrics>,
    service_name: String,
    max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        store: Arc<VehicleStateStore>,
        metrics: Arc<Metrics>,
        service_name: impl Into<String>,
        max_body_bytes: usize,
    ) -> Self {
        Self { store, metrics, service_name: service_name.into(), max_body_bytes }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<VehicleStateStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::new(store, metrics, config.service_name(), config.max_body_bytes())
    }

    pub fn store(&self) -> &VehicleStateStore {
        &self.store
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(bytes)))
            .expect("static response should not fail"),
        Err(e) => {
            error!(error = %e, "response_serialize_error");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(r#"{"detail":"Internal server error"}"#)))
                .expect("static response should not fail")
        }
    }
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response<Full<Bytes>> {
    json_response(status, &ErrorResponse::new(detail))
}

/// Decode `%XX` escapes in a path segment. Invalid escapes are kept verbatim.
/// None if the decoded bytes are not UTF-8.
fn percent_decode(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Extract `{id}` from `/vehicles/{id}/status`
fn vehicle_status_id(path: &str) -> Option<String> {
    let id = path.strip_prefix("/vehicles/")?.strip_suffix("/status")?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    percent_decode(id)
}

async fn post_location_event<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let body = match Limited::new(req.into_body(), state.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            state.metrics.record_request_rejected();
            warn!(limit = state.max_body_bytes, "request_body_too_large");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        Err(e) => {
            state.metrics.record_request_rejected();
            warn!(error = %e, "request_body_read_error");
            return error_response(StatusCode::BAD_REQUEST, "Could not read request body");
        }
    };

    let event: LocationEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            state.metrics.record_request_rejected();
            debug!(error = %e, "location_event_invalid");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid event: {e}"));
        }
    };

    if event.vehicle_id.trim().is_empty() {
        state.metrics.record_request_rejected();
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "vehicle_id must not be empty");
    }

    let applied = state.store.process(&event, Utc::now());
    json_response(StatusCode::OK, &EventResponse::from(&applied))
}

fn get_vehicle_status(vehicle_id: String, state: &AppState) -> Response<Full<Bytes>> {
    let id = VehicleId(vehicle_id);
    match state.store.status(&id) {
        Some(vehicle) => json_response(StatusCode::OK, &VehicleStatus::from(&vehicle)),
        None => {
            state.metrics.record_unknown_vehicle_query();
            debug!(vehicle_id = %id, "vehicle_not_found");
            error_response(StatusCode::NOT_FOUND, format!("Vehicle {id} not found"))
        }
    }
}

fn get_zones(state: &AppState) -> Response<Full<Bytes>> {
    let registry = state.store.registry();
    let zones: Vec<ZoneInfo> = registry
        .all()
        .iter()
        .zip(state.store.zone_counts())
        .map(|(zone, (_, count))| ZoneInfo::new(zone, count))
        .collect();
    json_response(StatusCode::OK, &zones)
}

/// Handle HTTP requests
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => json_response(
            StatusCode::OK,
            &ServiceInfo {
                service: state.service_name.clone(),
                status: "running",
                version: env!("CARGO_PKG_VERSION"),
                commit: env!("GIT_HASH"),
                health: "/health",
                metrics: "/metrics",
            },
        ),
        (&Method::POST, "/events/location") => post_location_event(req, &state).await,
        (&Method::GET, "/zones") => get_zones(&state),
        (&Method::GET, "/health") => json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "healthy",
                service: state.service_name.clone(),
                timestamp: Utc::now(),
            },
        ),
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&state.metrics, &state.store, &state.service_name);
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail")
        }
        (&Method::GET, p) => match vehicle_status_id(p) {
            Some(id) => get_vehicle_status(id, &state),
            None => error_response(StatusCode::NOT_FOUND, "Not Found"),
        },
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}

/// Serve HTTP on an already-bound listener until shutdown is signalled
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, service = %state.service_name, "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind and start the HTTP server
pub async fn start_http_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown).await
}
