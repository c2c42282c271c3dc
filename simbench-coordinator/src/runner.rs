//! `TestCaseRunner`: per-test state machine driving one `TestCase` through
//! all eight phases, per §4.1's steps 1-8.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::{watch, Barrier};
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::failure_container::FailureContainer;
use crate::phase_listeners::PhaseReportListener;
use crate::remote_client::RemoteClient;
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{FailureOperation, Operation, ResponseType, TestCase, TestPhase, TestSuite};

/// Shared per-suite barrier set: one cyclic barrier per phase at or below
/// `lastTestPhaseToSync` when running in parallel with more than one test;
/// `None` elsewhere, meaning that phase does not wait (§4.1).
pub struct PhaseBarriers {
    barriers: HashMap<TestPhase, Arc<Barrier>>,
}

impl PhaseBarriers {
    /// Builds the barrier set for a suite run with `active_tests`
    /// concurrently scheduled tests. Sequential mode and single-test
    /// suites pass `active_tests <= 1`, which installs no barriers at all.
    pub fn for_suite(suite: &TestSuite, active_tests: usize) -> Self {
        let mut barriers = HashMap::new();
        if active_tests > 1 {
            for phase in TestPhase::ALL {
                if phase.ordinal() <= suite.last_test_phase_to_sync.ordinal() {
                    barriers.insert(phase, Arc::new(Barrier::new(active_tests)));
                }
            }
        }
        Self { barriers }
    }

    /// Waits on the barrier for `phase`, if one was installed. Every
    /// runner in the suite — including one that has already failed —
    /// must still call this once per syncable phase to keep the shared
    /// barrier's party count correct.
    pub async fn await_phase(&self, phase: TestPhase) {
        if let Some(barrier) = self.barriers.get(&phase) {
            barrier.wait().await;
        }
    }
}

/// The outcome of running one `TestCase` through the suite engine.
#[derive(Debug, Clone)]
pub struct TestRunOutcome {
    pub test_id: u32,
    pub failed: bool,
    pub observed_phases: Vec<TestPhase>,
}

/// Drives one `TestCase` through `Setup` .. `LocalTeardown`.
pub struct TestCaseRunner {
    test_id: u32,
    test_case: TestCase,
    suite: Arc<TestSuite>,
    targets: Vec<SimulatorAddress>,
    first_worker: SimulatorAddress,
    remote: Arc<RemoteClient>,
    failures: Arc<FailureContainer>,
    barriers: Arc<PhaseBarriers>,
    cancelled: watch::Receiver<bool>,
    phase_timeout: Duration,
}

impl TestCaseRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        test_id: u32,
        test_case: TestCase,
        suite: Arc<TestSuite>,
        targets: Vec<SimulatorAddress>,
        remote: Arc<RemoteClient>,
        failures: Arc<FailureContainer>,
        barriers: Arc<PhaseBarriers>,
        cancelled: watch::Receiver<bool>,
        phase_timeout: Duration,
    ) -> Self {
        let first_worker = targets
            .iter()
            .copied()
            .min_by_key(|address| (address.agent_index().index(), address.worker_index().index()))
            .unwrap_or(SimulatorAddress::worker(0, 0));
        Self {
            test_id,
            test_case,
            suite,
            targets,
            first_worker,
            remote,
            failures,
            barriers,
            cancelled,
            phase_timeout,
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Scoped to this runner's own `test_id`: the Failure Container is
    /// shared across every test in the suite, and an unscoped check here
    /// would leave a test permanently "failed" by a prior test's critical
    /// failure even after that test has finished.
    fn has_critical_failure(&self) -> bool {
        self.failures.has_critical_failure_for_test(self.test_id, &self.suite.tolerable_failures)
    }

    /// Runs `phase` on every target, waiting first on that phase's shared
    /// barrier. The barrier wait happens unconditionally — even when
    /// `perform` is `false` because this runner already failed — so a
    /// failed runner still contributes its party to a sibling's barrier
    /// (see `PhaseBarriers::await_phase`). Returns whether every target
    /// succeeded (or was absent-is-success per §4.1's tie-break); always
    /// `false` when `perform` is `false`.
    async fn run_local_phase(&self, phase: TestPhase, observed: &mut Vec<TestPhase>, perform: bool) -> bool {
        self.barriers.await_phase(phase).await;
        if !perform || self.is_cancelled() {
            return false;
        }
        let response = self
            .remote
            .broadcast(Operation::RunPhase { test_id: self.test_id, phase }, &self.targets)
            .await;
        observed.push(phase);
        if !response.all_success() {
            if let Some((target, status)) = response.first_failure() {
                warn!(test_id = self.test_id, ?phase, %target, ?status, "phase did not succeed on all targets");
            }
            return false;
        }
        true
    }

    /// Runs `phase` on the first worker only. Same unconditional-barrier
    /// contract as `run_local_phase`.
    async fn run_global_phase(&self, phase: TestPhase, observed: &mut Vec<TestPhase>, perform: bool) -> bool {
        self.barriers.await_phase(phase).await;
        if !perform || self.is_cancelled() {
            return false;
        }
        let status = self
            .remote
            .send_to_first_worker(self.first_worker, Operation::RunPhase { test_id: self.test_id, phase })
            .await;
        observed.push(phase);
        if status != ResponseType::Success {
            warn!(test_id = self.test_id, ?phase, ?status, "global phase did not succeed on first worker");
            return false;
        }
        true
    }

    /// Runs the full eight-phase sequence for this test and returns the
    /// outcome. Never propagates an error: transport/remote failures mark
    /// this test failed and the runner proceeds straight to teardown
    /// (§7's "that test is marked failed and proceeds to teardown").
    pub async fn run(&self) -> TestRunOutcome {
        let mut observed = Vec::new();
        let mut failed = false;

        if !self.run_local_phase(TestPhase::Setup, &mut observed, true).await {
            failed = true;
        }
        if !failed && self.has_critical_failure() {
            failed = true;
        }

        let local_warmup_ok = self.run_local_phase(TestPhase::LocalWarmup, &mut observed, !failed).await;
        if !failed && !local_warmup_ok {
            failed = true;
        }
        let global_warmup_ok = self.run_global_phase(TestPhase::GlobalWarmup, &mut observed, !failed).await;
        if !failed && !global_warmup_ok {
            failed = true;
        }
        if !failed && self.has_critical_failure() {
            failed = true;
        }

        if !failed {
            let init_status = self
                .remote
                .broadcast(Operation::InitTest(self.test_case.clone()), &self.targets)
                .await;
            if !init_status.all_success() {
                failed = true;
            }
        }

        // Barrier wait is unconditional: a runner that failed before
        // reaching `Run`, or that was cancelled, still owes its party to
        // any sibling still running normally.
        self.barriers.await_phase(TestPhase::Run).await;
        let mut entered_run = false;
        if !failed && !self.is_cancelled() {
            let run_status = self
                .remote
                .broadcast(Operation::RunPhase { test_id: self.test_id, phase: TestPhase::Run }, &self.targets)
                .await;
            observed.push(TestPhase::Run);
            if !run_status.all_success() {
                failed = true;
            } else {
                entered_run = true;
                self.wait_for_run_completion().await;
            }
        }

        if !failed && self.has_critical_failure() {
            failed = true;
        }

        // `duration == 0` with no `waitForTestCase`: the test never
        // entered Run in any meaningful sense, so the Stop step is
        // skipped (§4.1 edge case).
        if entered_run && (self.suite.duration_seconds > 0 || self.suite.wait_for_test_case) {
            let stop_response = self.remote.broadcast(Operation::StopRun { test_id: self.test_id }, &self.targets).await;
            if !stop_response.all_success() {
                failed = true;
            }
        }

        // Best-effort: a non-success here never marks the test failed (the
        // benchmark numbers are secondary to pass/fail), but it is worth
        // surfacing rather than silently dropping.
        let results_response = self.remote.broadcast(Operation::GetBenchmarkResults { test_id: self.test_id }, &self.targets).await;
        if !results_response.all_success() {
            if let Some((target, status)) = results_response.first_failure() {
                warn!(test_id = self.test_id, %target, ?status, "GetBenchmarkResults did not succeed on all targets");
            }
        }

        // `verify_enabled` is uniform across every runner in the suite, so
        // skipping these calls entirely when it's off never starves a
        // sibling's barrier party; only the per-runner `failed`/cancelled
        // state is threaded through `perform` instead of the call itself.
        if self.suite.verify_enabled {
            let verify_perform = !failed && !self.is_cancelled();
            let global_verify_ok = self.run_global_phase(TestPhase::GlobalVerify, &mut observed, verify_perform).await;
            if verify_perform && !global_verify_ok {
                failed = true;
            }
            let local_verify_perform = !failed && !self.is_cancelled();
            let local_verify_ok = self.run_local_phase(TestPhase::LocalVerify, &mut observed, local_verify_perform).await;
            if local_verify_perform && !local_verify_ok {
                failed = true;
            }
        }

        if !failed && self.has_critical_failure() {
            failed = true;
        }

        // Teardown always runs, whether or not the test already failed —
        // phases beyond `lastTestPhaseToSync` use a zero-count barrier, so
        // a failed runner calling `await_phase` here is always a no-op.
        let _ = self.run_global_phase(TestPhase::GlobalTeardown, &mut observed, true).await;
        let _ = self.run_local_phase(TestPhase::LocalTeardown, &mut observed, true).await;

        if self.has_critical_failure() {
            failed = true;
        }

        info!(test_id = self.test_id, failed, phases = observed.len(), "test case finished");
        TestRunOutcome { test_id: self.test_id, failed, observed_phases: observed }
    }

    /// Sleeps `durationSeconds`, or (if `waitForTestCase`) polls the
    /// Failure Container for a `WorkerFinishedNormal` self-report from
    /// every target, up to `durationSeconds` as a maximum.
    async fn wait_for_run_completion(&self) {
        let max_duration = self.suite.duration();
        if !self.suite.wait_for_test_case {
            tokio::time::sleep(max_duration).await;
            return;
        }

        let deadline = tokio::time::Instant::now() + max_duration.max(Duration::from_secs(1));
        loop {
            if self.is_cancelled() || self.has_critical_failure() {
                return;
            }
            let finished = self.failures.finished_workers();
            if self.targets.iter().all(|target| finished.contains(target)) {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Wires a `TestCaseRunner`'s reaction to asynchronous failure reports
/// into the `TestPhaseListeners` registry, purely for observability: a
/// dead target's effect on the run is already handled elsewhere —
/// `RemoteClient`/`TcpAgentLink` resolve that target's in-flight pending
/// request with `ResponseType::UnblockedByFailure` as soon as the `Failure`
/// frame arrives, and `has_critical_failure` is re-checked at every step
/// rather than this listener being the thing that unblocks it. This
/// listener only exists to log what the runner is seeing.
pub struct RunnerFailureListener {
    pub test_id: u32,
}

impl PhaseReportListener for RunnerFailureListener {
    fn on_worker_failure(&self, failure: &FailureOperation) {
        info!(test_id = self.test_id, kind = ?failure.kind, worker = %failure.worker_address, "failure observed for this test");
    }
}
