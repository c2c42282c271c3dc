//! Coordinator: the top-level suite engine. Checks prerequisites, then
//! drives every `TestCase` sequentially or in parallel per §4.1, and
//! performs best-effort Worker termination at suite end.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::watch;
use tracing::info;

// Layer 3: Internal module imports
use crate::error::CoordinatorError;
use crate::failure_container::FailureContainer;
use crate::perf_stats::PerformanceStatsContainer;
use crate::phase_listeners::TestPhaseListeners;
use crate::registry::ComponentRegistry;
use crate::remote_client::{member_worker_count, AgentLink, RemoteClient};
use crate::runner::{PhaseBarriers, RunnerFailureListener, TestCaseRunner, TestRunOutcome};
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{FailureOperation, Operation, TestSuite};

/// Timeouts governing one Coordinator instance's suite runs.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Timeout for an individual phase broadcast.
    pub phase_timeout: Duration,
    /// Timeout `waitForWorkerShutdownTimeoutSeconds`: how long
    /// `terminate_workers(wait=true)` waits for shutdown acks.
    pub worker_shutdown_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_secs(30),
            worker_shutdown_timeout: Duration::from_secs(15),
        }
    }
}

/// The result of one `runTestSuite()` call.
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub test_outcomes: Vec<TestRunOutcome>,
    pub failure_count: usize,
    /// 0 if no critical failure was recorded, nonzero otherwise (§6).
    pub exit_code: i32,
}

/// The single central controller of a test-suite run.
pub struct Coordinator {
    registry: Arc<ComponentRegistry>,
    remote: Arc<RemoteClient>,
    failures: Arc<FailureContainer>,
    perf_stats: Arc<PerformanceStatsContainer>,
    listeners: Arc<TestPhaseListeners>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(registry: Arc<ComponentRegistry>, link: Arc<dyn AgentLink>, config: CoordinatorConfig) -> Self {
        let remote = Arc::new(RemoteClient::new(link, registry.clone(), config.phase_timeout));
        let failures = Arc::new(FailureContainer::new());
        let perf_stats = Arc::new(PerformanceStatsContainer::new());
        let listeners = Arc::new(TestPhaseListeners::new());

        let dispatch_listeners = listeners.clone();
        failures.add_listener(Arc::new(move |failure: &FailureOperation| {
            dispatch_listeners.notify(failure);
        }));

        Self { registry, remote, failures, perf_stats, listeners, config }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn failures(&self) -> &Arc<FailureContainer> {
        &self.failures
    }

    pub fn perf_stats(&self) -> &Arc<PerformanceStatsContainer> {
        &self.perf_stats
    }

    fn check_prerequisites(&self) -> Result<(), CoordinatorError> {
        if self.registry.agent_count() == 0 {
            return Err(CoordinatorError::NoAgents);
        }
        if member_worker_count(&self.registry) == 0 {
            return Err(CoordinatorError::PrerequisitesUnmet(
                "no member-role workers are registered".to_string(),
            ));
        }
        Ok(())
    }

    /// Drives `suite` through every test, sequentially or in parallel per
    /// `suite.is_parallel_eligible()`, then best-effort terminates every
    /// known Worker. Fails fast, before launching anything, if
    /// prerequisites are unmet (§8 scenario 6).
    pub async fn run_test_suite(&self, suite: TestSuite) -> Result<SuiteOutcome, CoordinatorError> {
        self.check_prerequisites()?;
        let suite = Arc::new(suite);
        self.remote.init_test_suite(&suite).await;

        let targets: Vec<SimulatorAddress> = self.registry.all_workers().iter().map(|worker| worker.address()).collect();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let outcomes = if suite.is_parallel_eligible() {
            self.run_parallel(&suite, &targets, cancel_tx, cancel_rx).await
        } else {
            self.run_sequential(&suite, &targets, cancel_tx, cancel_rx).await
        };

        self.remote.terminate_workers(true, &self.failures, self.config.worker_shutdown_timeout).await;

        let failure_count = self.failures.count();
        // Remote-execution errors (§7) mark a test failed without ever
        // reaching the Failure Container (they are not a `FailureKind`);
        // either source of failure makes the suite exit nonzero.
        let any_test_failed = outcomes.iter().any(|outcome| outcome.failed);
        info!(failure_count, any_test_failed, test_count = outcomes.len(), "test suite run finished");

        Ok(SuiteOutcome {
            test_outcomes: outcomes,
            failure_count,
            exit_code: if failure_count > 0 || any_test_failed { 1 } else { 0 },
        })
    }

    async fn run_sequential(
        &self,
        suite: &Arc<TestSuite>,
        targets: &[SimulatorAddress],
        cancel_tx: watch::Sender<bool>,
        cancel_rx: watch::Receiver<bool>,
    ) -> Vec<TestRunOutcome> {
        let barriers = Arc::new(PhaseBarriers::for_suite(suite, 1));
        let mut outcomes = Vec::with_capacity(suite.test_cases.len());

        for (index, test_case) in suite.test_cases.iter().enumerate() {
            let test_id = index as u32;
            self.listeners.register(test_id, Arc::new(RunnerFailureListener { test_id }));

            let runner = TestCaseRunner::new(
                test_id,
                test_case.clone(),
                suite.clone(),
                targets.to_vec(),
                self.remote.clone(),
                self.failures.clone(),
                barriers.clone(),
                cancel_rx.clone(),
                self.config.phase_timeout,
            );
            let outcome = runner.run().await;
            self.listeners.unregister(test_id);

            let critical = self.failures.has_critical_failure(&suite.tolerable_failures);
            let is_last = index + 1 == suite.test_cases.len();
            let needs_restart = !is_last && (critical || suite.refresh_jvm);
            outcomes.push(outcome);

            if critical && suite.fail_fast {
                let _ = cancel_tx.send(true);
                break;
            }
            if needs_restart {
                // Best-effort: ask every Worker to stop so a relaunch
                // (owned by the Agent/CLI layer, not the Coordinator) can
                // bring up fresh processes before the next test.
                self.remote.broadcast(Operation::TerminateWorkers, targets).await;
            }
        }
        outcomes
    }

    async fn run_parallel(
        &self,
        suite: &Arc<TestSuite>,
        targets: &[SimulatorAddress],
        cancel_tx: watch::Sender<bool>,
        cancel_rx: watch::Receiver<bool>,
    ) -> Vec<TestRunOutcome> {
        let barriers = Arc::new(PhaseBarriers::for_suite(suite, suite.test_cases.len()));
        let mut handles = Vec::with_capacity(suite.test_cases.len());

        for (index, test_case) in suite.test_cases.iter().enumerate() {
            let test_id = index as u32;
            self.listeners.register(test_id, Arc::new(RunnerFailureListener { test_id }));

            let runner = TestCaseRunner::new(
                test_id,
                test_case.clone(),
                suite.clone(),
                targets.to_vec(),
                self.remote.clone(),
                self.failures.clone(),
                barriers.clone(),
                cancel_rx.clone(),
                self.config.phase_timeout,
            );
            let fail_fast = suite.fail_fast;
            let tolerable = suite.tolerable_failures.clone();
            let failures = self.failures.clone();
            let cancel_tx = cancel_tx.clone();

            handles.push(tokio::spawn(async move {
                let outcome = runner.run().await;
                if fail_fast && failures.has_critical_failure(&tolerable) {
                    let _ = cancel_tx.send(true);
                }
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(outcome) = handle.await {
                outcomes.push(outcome);
            }
        }
        for index in 0..suite.test_cases.len() {
            self.listeners.unregister(index as u32);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_client::InMemoryAgentLink;
    use simbench_core::domain::{AgentData, ResponseType, TestCase, WorkerData, WorkerType};

    fn registry_with_one_worker() -> Arc<ComponentRegistry> {
        let registry = Arc::new(ComponentRegistry::new());
        registry.add_agent(AgentData { address_index: 0, public_address: "10.0.0.1".to_string(), private_address: None });
        registry.add_worker(WorkerData::new(0, 0, WorkerType::Member, "1.0")).unwrap();
        registry
    }

    #[tokio::test]
    async fn missing_agents_fails_prerequisites() {
        let registry = Arc::new(ComponentRegistry::new());
        let link = Arc::new(InMemoryAgentLink::new(|_target, _operation| ResponseType::Success));
        let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

        let suite = TestSuite::new(vec![TestCase::new("a")]);
        let result = coordinator.run_test_suite(suite).await;
        assert!(matches!(result, Err(CoordinatorError::NoAgents)));
    }

    #[tokio::test]
    async fn single_test_sequential_run_succeeds() {
        let registry = registry_with_one_worker();
        let link = Arc::new(InMemoryAgentLink::new(|_target, _operation| ResponseType::Success));
        let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

        let mut suite = TestSuite::new(vec![TestCase::new("a")]);
        suite.duration_seconds = 0;
        let outcome = coordinator.run_test_suite(suite).await.expect("suite run");

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.failure_count, 0);
        assert_eq!(outcome.test_outcomes.len(), 1);
        assert!(!outcome.test_outcomes[0].failed);
    }

    #[tokio::test]
    async fn two_test_parallel_run_both_succeed() {
        let registry = registry_with_one_worker();
        let link = Arc::new(InMemoryAgentLink::new(|_target, _operation| ResponseType::Success));
        let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

        let mut suite = TestSuite::new(vec![TestCase::new("a"), TestCase::new("b")]);
        suite.duration_seconds = 0;
        suite.last_test_phase_to_sync = simbench_core::domain::TestPhase::GlobalWarmup;
        let outcome = coordinator.run_test_suite(suite).await.expect("suite run");

        assert_eq!(outcome.test_outcomes.len(), 2);
        assert!(outcome.test_outcomes.iter().all(|o| !o.failed));
    }

    #[tokio::test]
    async fn exception_during_setup_yields_nonzero_exit() {
        let registry = registry_with_one_worker();
        let link = Arc::new(InMemoryAgentLink::new(|_target, operation| match operation {
            Operation::RunPhase { phase: simbench_core::domain::TestPhase::Setup, .. } => {
                ResponseType::ExceptionDuringOperationExecution
            }
            _ => ResponseType::Success,
        }));
        let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

        let mut suite = TestSuite::new(vec![TestCase::new("a")]);
        suite.duration_seconds = 0;
        let outcome = coordinator.run_test_suite(suite).await.expect("suite run");

        assert!(outcome.test_outcomes[0].failed);
        assert_eq!(outcome.exit_code, 1);
    }
}
