//! Prometheus text exposition for GET /metrics
//!
//! Counters come from `Metrics`; zone occupancy gauges are read live from
//! the vehicle store. Rendering never resets anything.

use crate::domain::types::TransitionKind;
use crate::infra::metrics::Metrics;
use crate::services::vehicle_store::VehicleStateStore;
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Escape a label value per the exposition format
fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Write a simple metric (counter or gauge) with service label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    service: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{service=\"{service}\"}} {val}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(
    metrics: &Metrics,
    store: &VehicleStateStore,
    service_name: &str,
) -> String {
    let service = escape_label(service_name);
    let mut output = String::with_capacity(2048);

    write_event_metrics(&mut output, &service, metrics);
    write_transition_metrics(&mut output, &service, metrics);
    write_vehicle_metrics(&mut output, &service, store);
    write_zone_occupancy(&mut output, &service, store);

    output
}

fn write_event_metrics(output: &mut String, service: &str, metrics: &Metrics) {
    write_metric(
        output,
        "geofence_events_total",
        "Total location events applied",
        MetricType::Counter,
        service,
        metrics.events_total(),
    );
    write_metric(
        output,
        "geofence_coordinates_normalized_total",
        "Coordinates replaced with 0.0 during sanitization",
        MetricType::Counter,
        service,
        metrics.coordinates_normalized_total(),
    );
    write_metric(
        output,
        "geofence_unknown_vehicle_queries_total",
        "Status queries for vehicles with no state",
        MetricType::Counter,
        service,
        metrics.unknown_vehicle_queries_total(),
    );
    write_metric(
        output,
        "geofence_requests_rejected_total",
        "Requests rejected before reaching the engine",
        MetricType::Counter,
        service,
        metrics.requests_rejected_total(),
    );
}

fn write_transition_metrics(output: &mut String, service: &str, metrics: &Metrics) {
    let _ = writeln!(output, "# HELP geofence_transitions_total Zone transitions by kind");
    let _ = writeln!(output, "# TYPE geofence_transitions_total counter");
    for kind in [TransitionKind::Enter, TransitionKind::Exit, TransitionKind::Change] {
        let _ = writeln!(
            output,
            "geofence_transitions_total{{service=\"{service}\",kind=\"{kind}\"}} {}",
            metrics.transitions_total(kind)
        );
    }
}

fn write_vehicle_metrics(output: &mut String, service: &str, store: &VehicleStateStore) {
    write_metric(
        output,
        "geofence_tracked_vehicles",
        "Vehicles with state in memory",
        MetricType::Gauge,
        service,
        store.vehicle_count() as u64,
    );
}

fn write_zone_occupancy(output: &mut String, service: &str, store: &VehicleStateStore) {
    let _ = writeln!(output, "# HELP geofence_zone_occupancy Number of vehicles in each zone");
    let _ = writeln!(output, "# TYPE geofence_zone_occupancy gauge");
    for (zone_id, count) in store.zone_counts() {
        let zone_id = escape_label(zone_id.as_str());
        let _ = writeln!(
            output,
            "geofence_zone_occupancy{{service=\"{service}\",zone_id=\"{zone_id}\"}} {count}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::VehicleId;
    use crate::services::zone_registry::ZoneRegistry;
    use chrono::Utc;
    use std::sync::Arc;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Arc::new(Metrics::new());
        let store =
            VehicleStateStore::with_metrics(Arc::new(ZoneRegistry::builtin()), metrics.clone());

        store.apply_event(&VehicleId::from("v1"), 37.78, -122.41, Utc::now());
        store.apply_event(&VehicleId::from("v2"), 37.625, -122.375, Utc::now());
        store.apply_event(&VehicleId::from("v2"), 37.78, -122.41, Utc::now());

        let output = format_prometheus_metrics(&metrics, &store, "geo");

        assert!(output.contains("geofence_events_total{service=\"geo\"} 3"));
        assert!(output.contains("geofence_transitions_total{service=\"geo\",kind=\"ENTER\"} 2"));
        assert!(output.contains("geofence_transitions_total{service=\"geo\",kind=\"CHANGE\"} 1"));
        assert!(output.contains("geofence_tracked_vehicles{service=\"geo\"} 2"));
        assert!(output.contains("geofence_zone_occupancy{service=\"geo\",zone_id=\"zone_1\"} 2"));
        assert!(output.contains("geofence_zone_occupancy{service=\"geo\",zone_id=\"zone_2\"} 0"));
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_label("x\ny"), "x\\ny");
    }
}
