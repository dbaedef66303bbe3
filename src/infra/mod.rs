//! Infrastructure - configuration, metrics, and logging
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free metrics collection
//! - `logging` - tracing subscriber setup

pub mod config;
pub mod logging;
pub mod metrics;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogFormat;
pub use metrics::Metrics;
