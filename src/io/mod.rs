//! IO modules - external system interfaces
//!
//! This module contains the HTTP surface of the engine:
//! - `http` - Request routing and the hyper server loop
//! - `payloads` - JSON response bodies
//! - `prometheus` - Prometheus text exposition for /metrics

pub mod http;
pub mod payloads;
pub mod prometheus;

// Re-export commonly used types
pub use http::{handle_request, serve, start_http_server, AppState};
