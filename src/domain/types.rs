//! Shared types for the geofence engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Newtype wrapper for vehicle IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype wrapper for zone IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Axis-aligned bounding box, inclusive on every edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self { min_lat, max_lat, min_lng, max_lng }
    }

    #[inline]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lng <= lng && lng <= self.max_lng
    }

    /// True if the two boxes share at least one point (touching edges count)
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lng <= other.max_lng
            && other.min_lng <= self.max_lng
    }
}

/// Named rectangular geofence
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub zone_id: ZoneId,
    pub name: String,
    pub bounds: Bounds,
}

impl Zone {
    pub fn new(zone_id: impl Into<String>, name: impl Into<String>, bounds: Bounds) -> Self {
        Self { zone_id: ZoneId(zone_id.into()), name: name.into(), bounds }
    }

    #[inline]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        self.bounds.contains(lat, lng)
    }
}

/// Classification of a zone occupancy change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransitionKind {
    Enter,
    Exit,
    Change,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Enter => "ENTER",
            TransitionKind::Exit => "EXIT",
            TransitionKind::Change => "CHANGE",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A real zone transition. Each variant carries exactly the zones it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Enter { to: ZoneId },
    Exit { from: ZoneId },
    Change { from: ZoneId, to: ZoneId },
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Transition::Enter { .. } => TransitionKind::Enter,
            Transition::Exit { .. } => TransitionKind::Exit,
            Transition::Change { .. } => TransitionKind::Change,
        }
    }

    pub fn from_zone(&self) -> Option<&ZoneId> {
        match self {
            Transition::Enter { .. } => None,
            Transition::Exit { from } | Transition::Change { from, .. } => Some(from),
        }
    }

    pub fn to_zone(&self) -> Option<&ZoneId> {
        match self {
            Transition::Exit { .. } => None,
            Transition::Enter { to } | Transition::Change { to, .. } => Some(to),
        }
    }
}

/// A transition with the timestamp of the event that caused it
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub transition: Transition,
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    #[inline]
    pub fn kind(&self) -> TransitionKind {
        self.transition.kind()
    }
}

/// Tracked vehicle state
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub vehicle_id: VehicleId,
    pub last_lat: f64,
    pub last_lng: f64,
    /// Timestamp of the last applied event (None until the first one)
    pub last_update: Option<DateTime<Utc>>,
    /// None means outside all zones
    pub current_zone: Option<ZoneId>,
    /// Oldest first
    pub transition_history: VecDeque<TransitionRecord>,
}

impl VehicleState {
    #[inline]
    pub fn new(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            last_lat: 0.0,
            last_lng: 0.0,
            last_update: None,
            current_zone: None,
            transition_history: VecDeque::new(),
        }
    }
}
