//! Performance Stats Container: an append-only sink of per-Worker
//! throughput/latency snapshots, aggregated on demand for
//! `GetBenchmarkResults`. Shape mirrors the Failure Container — both are
//! Coordinator-side collectors fed by asynchronous Worker reports, here one
//! `PerfReport` frame per Worker per `GetBenchmarkResults` round trip.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use simbench_core::address::SimulatorAddress;
pub use simbench_core::domain::PerfSnapshot;

/// The combination of every snapshot recorded for one test: summed
/// operation counts, and the observed min/max across each Worker's
/// percentile readings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedPerfStats {
    pub total_operation_count: u64,
    pub min_latency_p50_millis: Option<f64>,
    pub max_latency_p50_millis: Option<f64>,
    pub min_latency_p99_millis: Option<f64>,
    pub max_latency_p99_millis: Option<f64>,
}

/// Append-only collector of `PerfSnapshot`s, keyed by test then by
/// reporting Worker. A missing snapshot for a given Worker is not an
/// error — it may not have reported yet, or may be a `client`-type Worker
/// that performs no measured operations in this test.
pub struct PerformanceStatsContainer {
    snapshots: Mutex<HashMap<u32, HashMap<SimulatorAddress, PerfSnapshot>>>,
}

impl PerformanceStatsContainer {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, test_id: u32, worker: SimulatorAddress, snapshot: PerfSnapshot) {
        self.snapshots.lock().entry(test_id).or_default().insert(worker, snapshot);
    }

    /// Combines every snapshot recorded for `test_id` so far.
    pub fn snapshot(&self, test_id: u32) -> AggregatedPerfStats {
        let snapshots = self.snapshots.lock();
        let Some(per_worker) = snapshots.get(&test_id) else {
            return AggregatedPerfStats::default();
        };

        let mut aggregated = AggregatedPerfStats::default();
        for snapshot in per_worker.values() {
            aggregated.total_operation_count += snapshot.operation_count;
            aggregated.min_latency_p50_millis = Some(
                aggregated
                    .min_latency_p50_millis
                    .map_or(snapshot.latency_p50_millis, |min: f64| min.min(snapshot.latency_p50_millis)),
            );
            aggregated.max_latency_p50_millis = Some(
                aggregated
                    .max_latency_p50_millis
                    .map_or(snapshot.latency_p50_millis, |max: f64| max.max(snapshot.latency_p50_millis)),
            );
            aggregated.min_latency_p99_millis = Some(
                aggregated
                    .min_latency_p99_millis
                    .map_or(snapshot.latency_p99_millis, |min: f64| min.min(snapshot.latency_p99_millis)),
            );
            aggregated.max_latency_p99_millis = Some(
                aggregated
                    .max_latency_p99_millis
                    .map_or(snapshot.latency_p99_millis, |max: f64| max.max(snapshot.latency_p99_millis)),
            );
        }
        aggregated
    }
}

impl Default for PerformanceStatsContainer {
    fn default() -> Self {
        Self::new()
    }
}
