//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that resets anything (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only. Zone occupancy is NOT tracked here; the vehicle store owns it.

use crate::domain::types::TransitionKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total location events applied (monotonic)
    events_total: AtomicU64,
    /// Events since last report (reset on report)
    events_since_report: AtomicU64,
    /// Sum of latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Event apply latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    enter_total: AtomicU64,
    exit_total: AtomicU64,
    change_total: AtomicU64,
    /// Coordinates replaced with 0.0 by the sanitizer (monotonic)
    coordinates_normalized_total: AtomicU64,
    /// Status queries for vehicles never seen (monotonic)
    unknown_vehicle_queries_total: AtomicU64,
    /// Requests rejected before reaching the store (bad JSON, too large)
    requests_rejected_total: AtomicU64,
    /// Last report time (only accessed from reporter, not atomic)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_total: AtomicU64::new(0),
            events_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            enter_total: AtomicU64::new(0),
            exit_total: AtomicU64::new(0),
            change_total: AtomicU64::new(0),
            coordinates_normalized_total: AtomicU64::new(0),
            unknown_vehicle_queries_total: AtomicU64::new(0),
            requests_rejected_total: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record an event was applied with given latency (lock-free)
    #[inline]
    pub fn record_event_processed(&self, latency_us: u64) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
        self.events_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_transition(&self, kind: TransitionKind) {
        let counter = match kind {
            TransitionKind::Enter => &self.enter_total,
            TransitionKind::Exit => &self.exit_total,
            TransitionKind::Change => &self.change_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_coordinate_normalized(&self) {
        self.coordinates_normalized_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unknown_vehicle_query(&self) {
        self.unknown_vehicle_queries_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_request_rejected(&self) {
        self.requests_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    pub fn transitions_total(&self, kind: TransitionKind) -> u64 {
        match kind {
            TransitionKind::Enter => self.enter_total.load(Ordering::Relaxed),
            TransitionKind::Exit => self.exit_total.load(Ordering::Relaxed),
            TransitionKind::Change => self.change_total.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn coordinates_normalized_total(&self) -> u64 {
        self.coordinates_normalized_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn unknown_vehicle_queries_total(&self) -> u64 {
        self.unknown_vehicle_queries_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn requests_rejected_total(&self) -> u64 {
        self.requests_rejected_total.load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    ///
    /// This is the only method that resets counters. It uses atomic swap
    /// to get a consistent snapshot while allowing concurrent updates.
    pub fn report(&self, tracked_vehicles: usize) -> MetricsSummary {
        let events_count = self.events_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let events_per_sec = if elapsed.as_secs_f64() > 0.0 {
            events_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let avg_latency = if events_count > 0 { latency_sum / events_count } else { 0 };

        MetricsSummary {
            events_total: self.events_total(),
            events_per_sec,
            avg_apply_latency_us: avg_latency,
            max_apply_latency_us: max_latency,
            lat_buckets,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            tracked_vehicles,
            enter_total: self.transitions_total(TransitionKind::Enter),
            exit_total: self.transitions_total(TransitionKind::Exit),
            change_total: self.transitions_total(TransitionKind::Change),
            coordinates_normalized_total: self.coordinates_normalized_total(),
            unknown_vehicle_queries_total: self.unknown_vehicle_queries_total(),
            requests_rejected_total: self.requests_rejected_total(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub events_total: u64,
    pub events_per_sec: f64,
    pub avg_apply_latency_us: u64,
    pub max_apply_latency_us: u64,
    /// Event apply latency histogram buckets
    /// Bounds: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    /// Vehicles with state in the store (snapshot)
    pub tracked_vehicles: usize,
    pub enter_total: u64,
    pub exit_total: u64,
    pub change_total: u64,
    pub coordinates_normalized_total: u64,
    pub unknown_vehicle_queries_total: u64,
    pub requests_rejected_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            events_total = %self.events_total,
            events_per_sec = format!("{:.1}", self.events_per_sec),
            avg_latency_us = %self.avg_apply_latency_us,
            max_latency_us = %self.max_apply_latency_us,
            p50_us = %self.lat_p50_us,
            p95_us = %self.lat_p95_us,
            p99_us = %self.lat_p99_us,
            tracked_vehicles = %self.tracked_vehicles,
            enter = %self.enter_total,
            exit = %self.exit_total,
            change = %self.change_total,
            normalized = %self.coordinates_normalized_total,
            unknown_vehicle_queries = %self.unknown_vehicle_queries_total,
            requests_rejected = %self.requests_rejected_total,
            "metrics"
        );
    }
}
