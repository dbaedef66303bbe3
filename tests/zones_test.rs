//! Integration tests for zone file loading and startup policy

use geofence_engine::domain::types::ZoneId;
use geofence_engine::services::{find_zone, load_or_builtin, ZoneConfigError, ZoneRegistry};
use std::io::Write;
use tempfile::NamedTempFile;

fn zone_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_wrapped_zone_file() {
    let file = zone_file(
        r#"{"zones": [
            {"zone_id": "depot", "name": "Depot", "min_lat": 10.0, "max_lat": 11.0, "min_lng": 20.0, "max_lng": 21.0},
            {"zone_id": "yard", "name": "Yard", "min_lat": -1.0, "max_lat": 0.0, "min_lng": -1.0, "max_lng": 0.0}
        ]}"#,
    );

    let registry = ZoneRegistry::load(file.path()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.all()[0].zone_id, ZoneId::from("depot"));
    assert_eq!(find_zone(&registry, 10.5, 20.5).map(|z| z.name.as_str()), Some("Depot"));
    assert_eq!(find_zone(&registry, 0.0, 0.0).map(|z| z.name.as_str()), Some("Yard"));
    assert!(find_zone(&registry, 5.0, 5.0).is_none());
}

#[test]
fn test_load_or_builtin_missing_file() {
    let registry = load_or_builtin("/nonexistent/zones.json", true).unwrap();
    assert_eq!(registry.len(), ZoneRegistry::builtin().len());
    assert!(registry.by_id(&ZoneId::from("zone_1")).is_some());

    let err = load_or_builtin("/nonexistent/zones.json", false).unwrap_err();
    assert!(matches!(err, ZoneConfigError::NotFound(_)));
}

#[test]
fn test_invalid_zone_file_is_fatal_even_with_fallback() {
    let malformed = zone_file("{ not json");
    assert!(matches!(load_or_builtin(malformed.path(), true), Err(ZoneConfigError::Parse(_))));

    let duplicate = zone_file(
        r#"[
            {"zone_id": "a", "name": "A", "min_lat": 0, "max_lat": 1, "min_lng": 0, "max_lng": 1},
            {"zone_id": "a", "name": "A2", "min_lat": 2, "max_lat": 3, "min_lng": 2, "max_lng": 3}
        ]"#,
    );
    assert!(matches!(
        load_or_builtin(duplicate.path(), true),
        Err(ZoneConfigError::DuplicateZoneId(id)) if id == ZoneId::from("a")
    ));

    let inverted = zone_file(
        r#"[{"zone_id": "b", "name": "B", "min_lat": 1, "max_lat": 0, "min_lng": 0, "max_lng": 1}]"#,
    );
    assert!(matches!(
        load_or_builtin(inverted.path(), true),
        Err(ZoneConfigError::InvertedBounds(_))
    ));
}

#[test]
fn test_overlapping_zones_load_in_order() {
    let file = zone_file(
        r#"[
            {"zone_id": "outer", "name": "Outer", "min_lat": 0, "max_lat": 10, "min_lng": 0, "max_lng": 10},
            {"zone_id": "inner", "name": "Inner", "min_lat": 4, "max_lat": 6, "min_lng": 4, "max_lng": 6}
        ]"#,
    );

    let registry = load_or_builtin(file.path(), false).unwrap();

    assert_eq!(registry.overlapping_pairs().len(), 1);
    assert_eq!(find_zone(&registry, 5.0, 5.0).map(|z| z.zone_id.as_str()), Some("outer"));
}
