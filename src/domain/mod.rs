//! Domain models - core geofence types and inbound events
//!
//! This module contains the canonical data types used throughout the system:
//! - `Zone` / `Bounds` - rectangular geofences
//! - `Transition` / `TransitionRecord` - classified zone changes
//! - `VehicleState` - per-vehicle position, zone, and history
//! - `LocationEvent` / `RawCoordinate` - unsanitized GPS reports

pub mod event;
pub mod types;

pub use event::{LocationEvent, RawCoordinate};
pub use types::{
    Bounds, Transition, TransitionKind, TransitionRecord, VehicleId, VehicleState, Zone, ZoneId,
};
