//! Services - geofence logic and state management
//!
//! This module contains the core geofence engine:
//! - `sanitizer` - Raw coordinate normalization
//! - `zone_registry` - Load-once, validated zone set
//! - `zone_matcher` - First-match point-in-zone lookup
//! - `classifier` - ENTER / EXIT / CHANGE classification
//! - `vehicle_store` - Per-vehicle state and zone occupancy

pub mod classifier;
pub mod sanitizer;
pub mod vehicle_store;
pub mod zone_matcher;
pub mod zone_registry;

// Re-export commonly used types
pub use classifier::classify;
pub use sanitizer::{sanitize, sanitize_checked, Axis, Rejection, Sanitized};
pub use vehicle_store::{AppliedEvent, VehicleStateStore, DEFAULT_HISTORY_LIMIT};
pub use zone_matcher::{find_zone, find_zone_index};
pub use zone_registry::{load_or_builtin, ZoneConfigError, ZoneRegistry};
