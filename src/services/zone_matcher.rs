//! Point-in-zone lookup
//!
//! Linear scan in registry order; the first zone containing the point wins.
//! Zone counts are expected to be small. If that stops being true, a spatial
//! index belongs here, and it must preserve first-registered-wins.

use crate::domain::types::Zone;
use crate::services::zone_registry::ZoneRegistry;

/// Registry position of the first zone containing the point
#[inline]
pub fn find_zone_index(registry: &ZoneRegistry, lat: f64, lng: f64) -> Option<usize> {
    registry.all().iter().position(|zone| zone.contains(lat, lng))
}

/// First zone (in registry order) containing the point
#[inline]
pub fn find_zone(registry: &ZoneRegistry, lat: f64, lng: f64) -> Option<&Zone> {
    find_zone_index(registry, lat, lng).map(|i| &registry.all()[i])
}
