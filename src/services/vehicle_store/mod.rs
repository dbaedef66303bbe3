//! Vehicle state and zone occupancy
//!
//! The VehicleStateStore is the single owner of mutable geofence state:
//! - Per-vehicle last position, current zone, and transition history
//! - Per-zone live occupancy counters
//!
//! Each event is applied as one unit under the vehicle's own mutex:
//! match zone, classify, update position, append history, adjust counters.
//! Two racing events for the same vehicle serialize on that mutex, so a
//! transition is never computed against a stale previous zone. Events for
//! different vehicles proceed in parallel; the vehicle table lock is only
//! taken for write when a new vehicle is first seen.


use crate::domain::event::{LocationEvent, RawCoordinate};
use crate::domain::types::{Transition, TransitionRecord, VehicleId, VehicleState, ZoneId};
use crate::infra::metrics::Metrics;
use crate::services::classifier::classify;
use crate::services::sanitizer::{sanitize_checked, Axis, Rejection, Sanitized};
use crate::services::zone_matcher::find_zone_index;
use crate::services::zone_registry::ZoneRegistry;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Transitions kept per vehicle unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Result of applying one event
#[derive(Debug, Clone)]
pub struct AppliedEvent {
    /// Vehicle state after the event
    pub state: VehicleState,
    /// The transition the event caused, if any
    pub transition: Option<TransitionRecord>,
    /// Timestamp the event was applied with
    pub timestamp: DateTime<Utc>,
}

/// Concurrency-safe store of vehicle state and zone occupancy
pub struct VehicleStateStore {
    registry: Arc<ZoneRegistry>,
    vehicles: RwLock<FxHashMap<VehicleId, Arc<Mutex<VehicleState>>>>,
    /// One counter per zone, indexed by registry position
    occupancy: Box<[AtomicU64]>,
    /// Max transitions retained per vehicle (0 = unbounded)
    history_limit: usize,
    metrics: Arc<Metrics>,
}

impl VehicleStateStore {
    pub fn new(registry: Arc<ZoneRegistry>) -> Self {
        Self::with_metrics(registry, Arc::new(Metrics::new()))
    }

    /// Create a store that records into shared metrics
    pub fn with_metrics(registry: Arc<ZoneRegistry>, metrics: Arc<Metrics>) -> Self {
        let occupancy = (0..registry.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            registry,
            vehicles: RwLock::new(FxHashMap::default()),
            occupancy,
            history_limit: DEFAULT_HISTORY_LIMIT,
            metrics,
        }
    }

    /// Set the per-vehicle history limit (0 = unbounded)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[inline]
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    #[inline]
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Sanitize a raw event and apply it. A missing timestamp becomes `now`.
    pub fn process(&self, event: &LocationEvent, now: DateTime<Utc>) -> AppliedEvent {
        let lat = self.sanitize_logged(&event.vehicle_id, event.latitude.as_ref(), Axis::Latitude);
        let lng = self.sanitize_logged(&event.vehicle_id, event.longitude.as_ref(), Axis::Longitude);
        let timestamp = event.timestamp.unwrap_or(now);
        self.apply_event(&VehicleId(event.vehicle_id.clone()), lat, lng, timestamp)
    }

    /// Apply a sanitized position for one vehicle, atomically per vehicle
    pub fn apply_event(
        &self,
        vehicle_id: &VehicleId,
        lat: f64,
        lng: f64,
        timestamp: DateTime<Utc>,
    ) -> AppliedEvent {
        let apply_start = Instant::now();
        let slot = self.slot(vehicle_id);
        let mut state = slot.lock();

        let new_zone =
            find_zone_index(&self.registry, lat, lng).map(|i| self.registry.all()[i].zone_id.clone());
        let transition = classify(state.current_zone.as_ref(), new_zone.as_ref());

        // Position refreshes even when the zone does not change
        state.last_lat = lat;
        state.last_lng = lng;
        state.last_update = Some(timestamp);
        state.current_zone = new_zone;

        let record = match transition {
            Some(transition) => {
                self.adjust_occupancy(&transition);
                self.metrics.record_transition(transition.kind());
                info!(
                    vehicle_id = %state.vehicle_id,
                    transition = %transition.kind(),
                    from = ?transition.from_zone().map(ZoneId::as_str),
                    to = ?transition.to_zone().map(ZoneId::as_str),
                    "zone_transition"
                );

                let record = TransitionRecord { transition, timestamp };
                state.transition_history.push_back(record.clone());
                if self.history_limit > 0 {
                    while state.transition_history.len() > self.history_limit {
                        state.transition_history.pop_front();
                    }
                }
                Some(record)
            }
            None => None,
        };

        let snapshot = state.clone();
        drop(state);

        let latency_us = apply_start.elapsed().as_micros() as u64;
        self.metrics.record_event_processed(latency_us);

        AppliedEvent { state: snapshot, transition: record, timestamp }
    }

    /// Snapshot of a vehicle's state. Never creates state.
    pub fn status(&self, vehicle_id: &VehicleId) -> Option<VehicleState> {
        let slot = self.vehicles.read().get(vehicle_id).cloned()?;
        let state = slot.lock().clone();
        Some(state)
    }

    /// Live vehicle count per zone, in registry order
    pub fn zone_counts(&self) -> Vec<(ZoneId, u64)> {
        self.registry
            .all()
            .iter()
            .zip(self.occupancy.iter())
            .map(|(zone, count)| (zone.zone_id.clone(), count.load(Ordering::Relaxed)))
            .collect()
    }

    /// Live vehicle count for one zone, None if the zone is unknown
    pub fn zone_count(&self, zone_id: &ZoneId) -> Option<u64> {
        self.registry.index_of(zone_id).map(|i| self.occupancy[i].load(Ordering::Relaxed))
    }

    /// Number of vehicles with state
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.read().len()
    }

    /// Fetch or lazily create the vehicle's slot
    fn slot(&self, vehicle_id: &VehicleId) -> Arc<Mutex<VehicleState>> {
        {
            let vehicles = self.vehicles.read();
            if let Some(slot) = vehicles.get(vehicle_id) {
                return Arc::clone(slot);
            }
        }

        let mut vehicles = self.vehicles.write();
        let slot = vehicles.entry(vehicle_id.clone()).or_insert_with(|| {
            debug!(vehicle_id = %vehicle_id, "vehicle_created");
            Arc::new(Mutex::new(VehicleState::new(vehicle_id.clone())))
        });
        Arc::clone(slot)
    }

    /// Must be called with the transitioning vehicle's mutex held
    fn adjust_occupancy(&self, transition: &Transition) {
        if let Some(from) = transition.from_zone() {
            let counter = &self.occupancy[self.zone_index(from)];
            let decremented =
                counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| c.checked_sub(1));
            if decremented.is_err() {
                invariant_violation(&format!("occupancy underflow for zone {from}"));
            }
        }
        if let Some(to) = transition.to_zone() {
            self.occupancy[self.zone_index(to)].fetch_add(1, Ordering::Relaxed);
        }
    }

    fn zone_index(&self, zone_id: &ZoneId) -> usize {
        match self.registry.index_of(zone_id) {
            Some(i) => i,
            None => invariant_violation(&format!("transition references unknown zone {zone_id}")),
        }
    }

    fn sanitize_logged(&self, vehicle_id: &str, raw: Option<&RawCoordinate>, axis: Axis) -> f64 {
        let result = sanitize_checked(raw, axis);
        if let Sanitized::Normalized(reason) = result {
            self.metrics.record_coordinate_normalized();
            let raw = raw.map(ToString::to_string).unwrap_or_default();
            match reason {
                Rejection::Missing | Rejection::Sentinel => debug!(
                    vehicle_id = %vehicle_id,
                    axis = axis.as_str(),
                    raw = %raw,
                    reason = reason.as_str(),
                    "coordinate_normalized"
                ),
                _ => warn!(
                    vehicle_id = %vehicle_id,
                    axis = axis.as_str(),
                    raw = %raw,
                    reason = reason.as_str(),
                    "coordinate_normalized"
                ),
            }
        }
        result.value()
    }
}

#[cold]
fn invariant_violation(detail: &str) -> ! {
    error!(detail = %detail, "vehicle_store_invariant_violation");
    panic!("vehicle store invariant violated: {detail}");
}
