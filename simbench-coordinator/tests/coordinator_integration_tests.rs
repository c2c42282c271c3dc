//! Integration tests exercising the Coordinator engine end-to-end against
//! an in-process stub `AgentLink`, covering the suite-level scenarios from
//! §8 that don't require a real Agent process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use simbench_coordinator::{Coordinator, CoordinatorConfig, CoordinatorError, InMemoryAgentLink};
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{
    AgentData, FailureKind, FailureOperation, Operation, ResponseType, TestCase, TestPhase, TestSuite, WorkerData,
    WorkerType,
};

fn one_member_worker() -> (Arc<simbench_coordinator::ComponentRegistry>, SimulatorAddress) {
    let registry = Arc::new(simbench_coordinator::ComponentRegistry::new());
    registry.add_agent(AgentData { address_index: 0, public_address: "10.0.0.1".to_string(), private_address: None });
    registry.add_worker(WorkerData::new(0, 0, WorkerType::Member, "1.0")).unwrap();
    let address = SimulatorAddress::worker(0, 0);
    (registry, address)
}

/// Scenario 1: one sequential test, `verifyEnabled=true`, succeeds with
/// exit code 0 and zero failures.
#[tokio::test]
async fn sequential_single_test_exits_clean() {
    let (registry, _worker) = one_member_worker();
    let link = Arc::new(InMemoryAgentLink::new(|_target, _operation| ResponseType::Success));
    let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

    let mut suite = TestSuite::new(vec![TestCase::new("sleep-test")]);
    suite.duration_seconds = 0;
    suite.verify_enabled = true;

    let outcome = coordinator.run_test_suite(suite).await.expect("suite run");
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.failure_count, 0);
}

/// Scenario 2 flavor: a `WORKER_EXCEPTION` reported through the Failure
/// Container (as the Agent's Failure Monitor would deliver it) makes the
/// suite exit nonzero even though every phase broadcast itself succeeded.
#[tokio::test]
async fn reported_exception_makes_the_suite_exit_nonzero() {
    let (registry, worker) = one_member_worker();
    let link = Arc::new(InMemoryAgentLink::new(|_target, _operation| ResponseType::Success));
    let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

    coordinator.failures().add(FailureOperation {
        message: "raised in RUN".to_string(),
        kind: FailureKind::WorkerException,
        worker_address: worker,
        agent_public_address: "10.0.0.1".to_string(),
        hazelcast_address: None,
        worker_id: "w0".to_string(),
        test_id: Some(0),
        test_suite_ref: "suite0".to_string(),
        cause: Some("boom".to_string()),
    });

    let mut suite = TestSuite::new(vec![TestCase::new("throwing-test")]);
    suite.duration_seconds = 0;
    let outcome = coordinator.run_test_suite(suite).await.expect("suite run");

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.failure_count, 1);
}

/// Scenario 3: two tests in parallel with `lastTestPhaseToSync =
/// GlobalWarmup` both observe `GlobalWarmup`, and both finish normally.
#[tokio::test]
async fn parallel_suite_synchronizes_up_to_configured_phase() {
    let (registry, _worker) = one_member_worker();
    let link = Arc::new(InMemoryAgentLink::new(|_target, _operation| ResponseType::Success));
    let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

    let mut suite = TestSuite::new(vec![TestCase::new("a"), TestCase::new("b")]);
    suite.last_test_phase_to_sync = TestPhase::GlobalWarmup;
    suite.duration_seconds = 0;

    let outcome = coordinator.run_test_suite(suite).await.expect("suite run");
    assert_eq!(outcome.test_outcomes.len(), 2);
    for test_outcome in &outcome.test_outcomes {
        assert!(test_outcome.observed_phases.contains(&TestPhase::GlobalWarmup));
        assert!(!test_outcome.failed);
    }
}

/// Scenario 5: a timed-out `GetBenchmarkResults` is swallowed — the test
/// still completes verify and teardown, and no critical failure is
/// recorded purely from that timeout.
#[tokio::test]
async fn benchmark_results_timeout_is_non_fatal() {
    let (registry, _worker) = one_member_worker();
    let link = Arc::new(InMemoryAgentLink::new(|_target, operation| match operation {
        Operation::GetBenchmarkResults { .. } => ResponseType::FailureTimeout,
        _ => ResponseType::Success,
    }));
    let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

    let mut suite = TestSuite::new(vec![TestCase::new("a")]);
    suite.duration_seconds = 0;
    let outcome = coordinator.run_test_suite(suite).await.expect("suite run");

    assert!(!outcome.test_outcomes[0].failed);
    assert!(outcome.test_outcomes[0].observed_phases.contains(&TestPhase::GlobalTeardown));
    assert!(outcome.test_outcomes[0].observed_phases.contains(&TestPhase::LocalTeardown));
}

/// Scenario 6: no Agents configured at all aborts before any broadcast is
/// attempted.
#[tokio::test]
async fn no_agents_aborts_before_any_test_runs() {
    let registry = Arc::new(simbench_coordinator::ComponentRegistry::new());
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    let link = Arc::new(InMemoryAgentLink::new(move |_target, _operation| {
        attempts_clone.fetch_add(1, Ordering::SeqCst);
        ResponseType::Success
    }));
    let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

    let suite = TestSuite::new(vec![TestCase::new("a")]);
    let result = coordinator.run_test_suite(suite).await;

    assert!(matches!(result, Err(CoordinatorError::NoAgents)));
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}

/// Fail-fast in parallel mode cancels the remaining forward phases of
/// every other in-flight test once a critical failure is recorded.
#[tokio::test]
async fn fail_fast_parallel_run_still_tears_down_every_test() {
    let (registry, worker) = one_member_worker();
    let link = Arc::new(InMemoryAgentLink::new(move |target, operation| {
        if target == worker && matches!(operation, Operation::RunPhase { phase: TestPhase::Setup, .. }) {
            ResponseType::ExceptionDuringOperationExecution
        } else {
            ResponseType::Success
        }
    }));
    let coordinator = Coordinator::new(registry, link, CoordinatorConfig::default());

    let mut suite = TestSuite::new(vec![TestCase::new("a"), TestCase::new("b")]);
    suite.fail_fast = true;
    suite.duration_seconds = 0;
    suite.last_test_phase_to_sync = TestPhase::GlobalWarmup;

    let outcome = coordinator.run_test_suite(suite).await.expect("suite run");
    assert_eq!(outcome.test_outcomes.len(), 2);
    assert!(outcome.test_outcomes.iter().all(|t| t.observed_phases.contains(&TestPhase::LocalTeardown)));
}
