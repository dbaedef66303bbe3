//! JSON response bodies for the HTTP API
//!
//! Plain serializable views over core results. Nothing here mutates state.

use crate::domain::types::{Bounds, TransitionKind, TransitionRecord, VehicleState, Zone, ZoneId};
use crate::services::vehicle_store::AppliedEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response to POST /events/location
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub vehicle_id: String,
    pub current_zone: Option<ZoneId>,
    pub transition: Option<TransitionKind>,
    pub timestamp: DateTime<Utc>,
}

impl From<&AppliedEvent> for EventResponse {
    fn from(applied: &AppliedEvent) -> Self {
        Self {
            vehicle_id: applied.state.vehicle_id.to_string(),
            current_zone: applied.state.current_zone.clone(),
            transition: applied.transition.as_ref().map(TransitionRecord::kind),
            timestamp: applied.timestamp,
        }
    }
}

/// One entry of a vehicle's transition history
#[derive(Debug, Clone, Serialize)]
pub struct TransitionEntry {
    pub transition: TransitionKind,
    pub from_zone: Option<ZoneId>,
    pub to_zone: Option<ZoneId>,
    pub timestamp: DateTime<Utc>,
}

impl From<&TransitionRecord> for TransitionEntry {
    fn from(record: &TransitionRecord) -> Self {
        Self {
            transition: record.kind(),
            from_zone: record.transition.from_zone().cloned(),
            to_zone: record.transition.to_zone().cloned(),
            timestamp: record.timestamp,
        }
    }
}

/// Response to GET /vehicles/{id}/status
#[derive(Debug, Clone, Serialize)]
pub struct VehicleStatus {
    pub vehicle_id: String,
    pub current_zone: Option<ZoneId>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub transition_history: Vec<TransitionEntry>,
}

impl From<&VehicleState> for VehicleStatus {
    fn from(state: &VehicleState) -> Self {
        Self {
            vehicle_id: state.vehicle_id.to_string(),
            current_zone: state.current_zone.clone(),
            last_update: state.last_update,
            last_latitude: state.last_lat,
            last_longitude: state.last_lng,
            transition_history: state.transition_history.iter().map(TransitionEntry::from).collect(),
        }
    }
}

/// Entry of GET /zones
#[derive(Debug, Clone, Serialize)]
pub struct ZoneInfo {
    pub zone_id: ZoneId,
    pub name: String,
    pub bounds: Bounds,
    pub vehicle_count: u64,
}

impl ZoneInfo {
    pub fn new(zone: &Zone, vehicle_count: u64) -> Self {
        Self {
            zone_id: zone.zone_id.clone(),
            name: zone.name.clone(),
            bounds: zone.bounds,
            vehicle_count,
        }
    }
}

/// Response to GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Response to GET /
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub status: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub health: &'static str,
    pub metrics: &'static str,
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Transition, VehicleId};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_vehicle_status_json_shape() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut state = VehicleState::new(VehicleId::from("v1"));
        state.last_lat = 1.5;
        state.last_lng = -2.5;
        state.last_update = Some(ts);
        state.current_zone = Some(ZoneId::from("a"));
        state.transition_history.push_back(TransitionRecord {
            transition: Transition::Enter { to: ZoneId::from("a") },
            timestamp: ts,
        });

        let value = serde_json::to_value(VehicleStatus::from(&state)).unwrap();

        assert_eq!(
            value,
            json!({
                "vehicle_id": "v1",
                "current_zone": "a",
                "last_update": "2023-11-14T22:13:20Z",
                "last_latitude": 1.5,
                "last_longitude": -2.5,
                "transition_history": [{
                    "transition": "ENTER",
                    "from_zone": null,
                    "to_zone": "a",
                    "timestamp": "2023-11-14T22:13:20Z"
                }]
            })
        );
    }

    #[test]
    fn test_zone_info_json_shape() {
        let zone = Zone::new("a", "Alpha", Bounds::new(1.0, 2.0, 3.0, 4.0));
        let value = serde_json::to_value(ZoneInfo::new(&zone, 3)).unwrap();

        assert_eq!(
            value,
            json!({
                "zone_id": "a",
                "name": "Alpha",
                "bounds": {"min_lat": 1.0, "max_lat": 2.0, "min_lng": 3.0, "max_lng": 4.0},
                "vehicle_count": 3
            })
        );
    }
}
