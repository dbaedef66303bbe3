//! Zone registry - immutable, load-once set of rectangular zones
//!
//! Definition order is significant: when zones overlap, the first one in
//! the registry wins (see `zone_matcher`).

use crate::domain::types::{Bounds, Zone, ZoneId};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors building a zone registry
#[derive(Debug, Error)]
pub enum ZoneConfigError {
    #[error("zone file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read zone file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid zone document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("zone at position {0} has an empty zone_id")]
    EmptyZoneId(usize),

    #[error("duplicate zone_id {0}")]
    DuplicateZoneId(ZoneId),

    #[error("zone {0} has inverted bounds (min greater than max)")]
    InvertedBounds(ZoneId),
}

/// One zone as written in the zone file
#[derive(Debug, Clone, Deserialize)]
struct ZoneDef {
    zone_id: String,
    name: String,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

/// Accepted zone file layouts: a bare array or `{ "zones": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZoneDocument {
    List(Vec<ZoneDef>),
    Wrapped { zones: Vec<ZoneDef> },
}

impl ZoneDocument {
    fn into_defs(self) -> Vec<ZoneDef> {
        match self {
            ZoneDocument::List(defs) | ZoneDocument::Wrapped { zones: defs } => defs,
        }
    }
}

/// Ordered, validated, read-only zone collection
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    index: FxHashMap<ZoneId, usize>,
}

impl ZoneRegistry {
    /// Build a registry from zones in definition order
    pub fn from_zones(zones: Vec<Zone>) -> Result<Self, ZoneConfigError> {
        let mut index = FxHashMap::default();
        for (pos, zone) in zones.iter().enumerate() {
            if zone.zone_id.as_str().trim().is_empty() {
                return Err(ZoneConfigError::EmptyZoneId(pos));
            }
            let b = &zone.bounds;
            if b.min_lat > b.max_lat || b.min_lng > b.max_lng {
                return Err(ZoneConfigError::InvertedBounds(zone.zone_id.clone()));
            }
            if index.insert(zone.zone_id.clone(), pos).is_some() {
                return Err(ZoneConfigError::DuplicateZoneId(zone.zone_id.clone()));
            }
        }
        Ok(Self { zones, index })
    }

    /// Parse a JSON zone document
    pub fn from_json_str(text: &str) -> Result<Self, ZoneConfigError> {
        let document: ZoneDocument = serde_json::from_str(text)?;
        let zones = document
            .into_defs()
            .into_iter()
            .map(|d| Zone::new(d.zone_id, d.name, Bounds::new(d.min_lat, d.max_lat, d.min_lng, d.max_lng)))
            .collect();
        Self::from_zones(zones)
    }

    /// Load a JSON zone file. A missing file is `ZoneConfigError::NotFound`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ZoneConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ZoneConfigError::NotFound(path.to_path_buf())
            } else {
                ZoneConfigError::Io { path: path.to_path_buf(), source }
            }
        })?;
        Self::from_json_str(&text)
    }

    /// Hardcoded zone set used when no zone file is present
    pub fn builtin() -> Self {
        let zones = vec![
            Zone::new("zone_1", "Downtown", Bounds::new(37.7749, 37.7849, -122.4194, -122.4094)),
            Zone::new("zone_2", "Airport", Bounds::new(37.6213, 37.6313, -122.3789, -122.3689)),
        ];
        let index = zones.iter().enumerate().map(|(i, z)| (z.zone_id.clone(), i)).collect();
        Self { zones, index }
    }

    /// All zones in definition order
    #[inline]
    pub fn all(&self) -> &[Zone] {
        &self.zones
    }

    pub fn by_id(&self, id: &ZoneId) -> Option<&Zone> {
        self.index_of(id).map(|i| &self.zones[i])
    }

    /// Position of a zone in definition order
    #[inline]
    pub fn index_of(&self, id: &ZoneId) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Pairs of zones whose boxes intersect, earlier zone first
    pub fn overlapping_pairs(&self) -> Vec<(&ZoneId, &ZoneId)> {
        let mut pairs = Vec::new();
        for (i, a) in self.zones.iter().enumerate() {
            for b in &self.zones[i + 1..] {
                if a.bounds.intersects(&b.bounds) {
                    pairs.push((&a.zone_id, &b.zone_id));
                }
            }
        }
        pairs
    }
}

/// Startup policy: a missing zone file falls back to `ZoneRegistry::builtin`
/// (when allowed), a present but invalid one is an error.
pub fn load_or_builtin<P: AsRef<Path>>(
    path: P,
    allow_fallback: bool,
) -> Result<ZoneRegistry, ZoneConfigError> {
    let path = path.as_ref();
    let registry = match ZoneRegistry::load(path) {
        Ok(registry) => {
            info!(path = %path.display(), zones = registry.len(), "zones_loaded");
            registry
        }
        Err(ZoneConfigError::NotFound(_)) if allow_fallback => {
            let registry = ZoneRegistry::builtin();
            warn!(path = %path.display(), zones = registry.len(), "zone_file_missing_using_builtin");
            registry
        }
        Err(e) => return Err(e),
    };

    for (first, second) in registry.overlapping_pairs() {
        warn!(first = %first, second = %second, "zones_overlap_first_match_wins");
    }

    Ok(registry)
}
