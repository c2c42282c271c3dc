//! The Worker endpoint's plug-in workload contract.
//!
//! A real Worker dynamically loads a workload class named by a test case's
//! `class` property. Rather than runtime class loading, this module keeps a
//! registry of workload constructors keyed by string name, populated once at
//! Worker build time; `InitTest` looks a name up in the registry and fails
//! with [`WorkloadError::UnknownWorkload`] if it isn't there.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;
use simbench_core::domain::{PerfSnapshot, TestCase, TestPhase};
use tokio::sync::Notify;

// Layer 3: Internal module imports
use crate::error::WorkloadError;

/// The lifecycle contract a Worker runs a constructed workload against.
///
/// One instance is constructed per `InitTest` and driven through
/// `run_phase` once per `RunPhase` command, in phase order.
#[async_trait]
pub trait TestLifecycle: Send + Sync {
    /// Execute the work associated with `phase`. Returning `Err` is
    /// reported upstream as a `WORKER_EXCEPTION` failure, not propagated as
    /// a transport error.
    async fn run_phase(&mut self, phase: TestPhase) -> Result<(), WorkloadError>;

    /// A handle a caller can use to interrupt a long-running `run_phase`
    /// call (in practice, `Run`) before it returns on its own. Workloads
    /// with nothing to interrupt (instantaneous phases) return `None`.
    fn cancellation_handle(&self) -> Option<Arc<Notify>> {
        None
    }

    /// This workload's latest throughput/latency measurement, if it tracks
    /// any. Polled by the connector when handling `GetBenchmarkResults`;
    /// `None` means the workload models no measured operations (the
    /// default for anything that isn't exercising the data grid itself).
    fn perf_snapshot(&self) -> Option<PerfSnapshot> {
        None
    }
}

/// A workload constructor: builds a fresh [`TestLifecycle`] from a
/// `TestCase`'s properties.
pub type WorkloadFactory = fn(&TestCase) -> Box<dyn TestLifecycle>;

/// Registry mapping a workload's `class` name to its constructor.
///
/// Populated once, typically at Worker binary startup (`main`), per the
/// "single injection point" re-architecture of the source's global mutable
/// state (spec's Design Notes).
#[derive(Default)]
pub struct WorkloadRegistry {
    factories: HashMap<String, WorkloadFactory>,
}

impl WorkloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workload under `name`, overwriting any prior entry.
    pub fn register(&mut self, name: impl Into<String>, factory: WorkloadFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Registers the two reference workloads (`SleepWorkload`,
    /// `FailingWorkload`) this expansion ships for exercising the Worker
    /// lifecycle in tests.
    pub fn with_reference_workloads(mut self) -> Self {
        self.register("SleepWorkload", |case| {
            Box::new(SleepWorkload::from_test_case(case))
        });
        self.register("FailingWorkload", |case| {
            Box::new(FailingWorkload::from_test_case(case))
        });
        self
    }

    /// Constructs the workload named by `test_case.workload_class()`.
    pub fn build(&self, test_case: &TestCase) -> Result<Box<dyn TestLifecycle>, WorkloadError> {
        let class = test_case
            .workload_class()
            .ok_or_else(|| WorkloadError::UnknownWorkload("<missing class property>".to_string()))?;
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| WorkloadError::UnknownWorkload(class.to_string()))?;
        Ok(factory(test_case))
    }
}

/// Reference workload: sleeps for a configurable duration during `Run`,
/// succeeds on every other phase. Used to drive the scenario 1 seed test
/// (phase sequencing under a timed `RUN`). Its `Run` phase races the sleep
/// against `stopped` so a `StopRun` can cut it short instead of blocking
/// the Agent until the full duration elapses.
pub struct SleepWorkload {
    run_duration: Duration,
    stopped: Arc<Notify>,
    last_snapshot: Mutex<Option<PerfSnapshot>>,
}

impl SleepWorkload {
    pub fn new(run_duration: Duration) -> Self {
        Self { run_duration, stopped: Arc::new(Notify::new()), last_snapshot: Mutex::new(None) }
    }

    fn from_test_case(case: &TestCase) -> Self {
        let seconds = case
            .properties
            .get("sleepSeconds")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        Self::new(Duration::from_secs(seconds))
    }
}

#[async_trait]
impl TestLifecycle for SleepWorkload {
    async fn run_phase(&mut self, phase: TestPhase) -> Result<(), WorkloadError> {
        if phase == TestPhase::Run {
            let started = tokio::time::Instant::now();
            tokio::select! {
                _ = tokio::time::sleep(self.run_duration) => {}
                _ = self.stopped.notified() => {}
            }
            // Stands in for a real grid workload's throughput counter: one
            // simulated operation per 10ms spent in `Run`, at a fixed
            // latency profile. Good enough to exercise the aggregation
            // path; a real Worker would report its actual measurements.
            let operation_count = (started.elapsed().as_millis() / 10) as u64;
            *self.last_snapshot.lock() = Some(PerfSnapshot {
                operation_count,
                latency_p50_millis: 5.0,
                latency_p99_millis: 20.0,
            });
        }
        Ok(())
    }

    fn cancellation_handle(&self) -> Option<Arc<Notify>> {
        Some(self.stopped.clone())
    }

    fn perf_snapshot(&self) -> Option<PerfSnapshot> {
        *self.last_snapshot.lock()
    }
}

/// Reference workload: raises on a configured phase, every other phase
/// succeeds. Used to drive the scenario 2 seed test (an exception artifact
/// reaching the Failure Container within one scan interval).
pub struct FailingWorkload {
    fail_on: TestPhase,
}

impl FailingWorkload {
    pub fn new(fail_on: TestPhase) -> Self {
        Self { fail_on }
    }

    fn from_test_case(case: &TestCase) -> Self {
        let fail_on = case
            .properties
            .get("failOnPhase")
            .and_then(|value| parse_phase(value))
            .unwrap_or(TestPhase::Run);
        Self::new(fail_on)
    }
}

fn parse_phase(value: &str) -> Option<TestPhase> {
    TestPhase::ALL
        .into_iter()
        .find(|phase| format!("{phase:?}").eq_ignore_ascii_case(value))
}

#[async_trait]
impl TestLifecycle for FailingWorkload {
    async fn run_phase(&mut self, phase: TestPhase) -> Result<(), WorkloadError> {
        if phase == self.fail_on {
            return Err(WorkloadError::PhaseFailed {
                name: "FailingWorkload".to_string(),
                phase,
                reason: "configured to fail on this phase".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_workload_completes_other_phases_instantly() {
        let mut workload = SleepWorkload::new(Duration::from_millis(0));
        workload.run_phase(TestPhase::Setup).await.expect("setup succeeds");
        workload.run_phase(TestPhase::Run).await.expect("run succeeds");
    }

    #[tokio::test]
    async fn sleep_workload_reports_a_snapshot_only_after_run() {
        let mut workload = SleepWorkload::new(Duration::from_millis(0));
        assert!(workload.perf_snapshot().is_none());
        workload.run_phase(TestPhase::Run).await.expect("run succeeds");
        assert!(workload.perf_snapshot().is_some());
    }

    #[tokio::test]
    async fn failing_workload_fails_only_on_configured_phase() {
        let mut workload = FailingWorkload::new(TestPhase::Run);
        workload.run_phase(TestPhase::Setup).await.expect("setup succeeds");
        let err = workload.run_phase(TestPhase::Run).await.expect_err("run fails");
        assert!(matches!(err, WorkloadError::PhaseFailed { phase: TestPhase::Run, .. }));
    }

    #[test]
    fn registry_builds_registered_workload() {
        let registry = WorkloadRegistry::new().with_reference_workloads();
        let case = TestCase::new("t1").with_property("class", "SleepWorkload");
        assert!(registry.build(&case).is_ok());
    }

    #[test]
    fn registry_rejects_unknown_workload() {
        let registry = WorkloadRegistry::new().with_reference_workloads();
        let case = TestCase::new("t1").with_property("class", "NoSuchWorkload");
        let err = registry.build(&case).expect_err("unknown workload");
        assert!(matches!(err, WorkloadError::UnknownWorkload(name) if name == "NoSuchWorkload"));
    }
}
