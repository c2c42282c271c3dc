//! Domain-neutral wire vocabulary shared by the Coordinator, Agent, and
//! Worker: test phases, failure classification, registry entries, and the
//! `Operation`/`Response`/`FailureOperation` messages that travel the wire.
//!
//! Nothing in this module knows how messages are transported (see
//! `simbench-osl`'s `transport` module and `simbench-coordinator`'s
//! `RemoteClient` for that); it only defines what gets sent.

// Layer 1: Standard library imports
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::address::SimulatorAddress;
use crate::message::{Message, MessagePriority};

/// The eight ordered lifecycle stages applied to every test.
///
/// `Global*` phases run on exactly one designated Worker (the "first
/// worker" for the test); `Local*`, `Setup`, and `Run` run on every Worker
/// hosting the test. The declaration order below *is* the phase order used
/// to step a [`TestPhase`] state machine forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TestPhase {
    Setup,
    LocalWarmup,
    GlobalWarmup,
    Run,
    GlobalVerify,
    LocalVerify,
    GlobalTeardown,
    LocalTeardown,
}

impl TestPhase {
    /// All phases in declaration (execution) order.
    pub const ALL: [TestPhase; 8] = [
        TestPhase::Setup,
        TestPhase::LocalWarmup,
        TestPhase::GlobalWarmup,
        TestPhase::Run,
        TestPhase::GlobalVerify,
        TestPhase::LocalVerify,
        TestPhase::GlobalTeardown,
        TestPhase::LocalTeardown,
    ];

    /// True for phases executed on exactly one designated Worker per test.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            TestPhase::GlobalWarmup | TestPhase::GlobalVerify | TestPhase::GlobalTeardown
        )
    }

    /// True for phases executed on every Worker hosting the test.
    pub fn is_local(&self) -> bool {
        !self.is_global()
    }

    /// The phase that follows this one, or `None` after `LocalTeardown`.
    pub fn next(&self) -> Option<TestPhase> {
        let idx = Self::ALL.iter().position(|p| p == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// Zero-based position in the total order, for barrier bookkeeping.
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).expect("TestPhase::ALL is exhaustive")
    }
}

/// Classification of a reported Worker failure.
///
/// `WorkerFinishedNormal` is informational, not a failure; the rest
/// represent an actual problem. [`FailureKind::is_dead`] tells the
/// registry whether this occurrence means the Worker process itself is
/// gone and should be removed (invariant (b) of the Component Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// A `.exception` artifact was found in the Worker's home directory.
    WorkerException,
    /// `worker.oome` or a `*.hprof` file was found.
    WorkerOom,
    /// The Worker has not refreshed `lastSeen` within the configured window.
    WorkerTimeout,
    /// The child process exited with a nonzero code.
    WorkerExit,
    /// The child process exited with code 0.
    WorkerFinished,
    /// Informational: the Worker self-reported normal completion.
    WorkerFinishedNormal,
}

impl FailureKind {
    /// Whether this occurrence implies the Worker process is no longer
    /// running and should be dropped from the registry.
    pub fn is_dead(&self) -> bool {
        matches!(
            self,
            FailureKind::WorkerOom
                | FailureKind::WorkerExit
                | FailureKind::WorkerFinished
                | FailureKind::WorkerFinishedNormal
        )
    }

    /// Whether this kind is informational rather than an actual failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, FailureKind::WorkerFinishedNormal)
    }
}

/// A single named test case: a unique id plus string-to-string properties.
///
/// At minimum, `properties` carries a `class` key naming the workload to
/// construct (see the Worker's workload registry). Key order is
/// irrelevant; keys are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub properties: HashMap<String, String>,
}

impl TestCase {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The workload class named by the `class` property, if present.
    pub fn workload_class(&self) -> Option<&str> {
        self.properties.get("class").map(String::as_str)
    }
}

/// An ordered suite of test cases plus the scheduling policy to run them
/// under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    /// Generated short unique token identifying this suite run.
    pub id: String,
    pub test_cases: Vec<TestCase>,
    pub duration_seconds: u64,
    pub wait_for_test_case: bool,
    pub fail_fast: bool,
    pub tolerable_failures: HashSet<FailureKind>,
    /// Phases up to and including this one are barrier-synchronized across
    /// tests in parallel mode; phases after it use a zero-count barrier.
    pub last_test_phase_to_sync: TestPhase,
    /// If set, all Workers are restarted between tests in sequential mode.
    pub refresh_jvm: bool,
    pub verify_enabled: bool,
}

impl TestSuite {
    pub fn new(test_cases: Vec<TestCase>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
            test_cases,
            duration_seconds: 0,
            wait_for_test_case: false,
            fail_fast: false,
            tolerable_failures: HashSet::new(),
            last_test_phase_to_sync: TestPhase::GlobalWarmup,
            refresh_jvm: false,
            verify_enabled: true,
        }
    }

    /// Whether more than one test is declared, the precondition for
    /// parallel scheduling.
    pub fn is_parallel_eligible(&self) -> bool {
        self.test_cases.len() > 1
    }

    /// Whether `kind` counts as critical (not in the tolerable set).
    pub fn is_critical(&self, kind: FailureKind) -> bool {
        !self.tolerable_failures.contains(&kind)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }
}

/// The role a Worker plays in the data-grid cluster under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerType {
    /// A full cluster member.
    Member,
    /// A client-only node that issues operations but holds no data.
    Client,
}

/// Component Registry entry for one Agent host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentData {
    pub address_index: u32,
    pub public_address: String,
    pub private_address: Option<String>,
}

/// Component Registry entry for one Worker process.
#[derive(Debug, Clone)]
pub struct WorkerData {
    pub agent_index: u32,
    pub worker_index: u32,
    pub worker_type: WorkerType,
    pub version_spec: String,
    pub start_time: DateTime<Utc>,
    /// Monotonic "last activity" marker, refreshed whenever the Worker
    /// processes an incoming operation. Never sent over the wire.
    pub last_seen: Instant,
    pub is_finished: bool,
    pub is_oome_detected: bool,
    /// Opaque cluster-membership address reported by the data grid.
    pub hazelcast_address: Option<String>,
}

impl WorkerData {
    pub fn new(agent_index: u32, worker_index: u32, worker_type: WorkerType, version_spec: impl Into<String>) -> Self {
        Self {
            agent_index,
            worker_index,
            worker_type,
            version_spec: version_spec.into(),
            start_time: Utc::now(),
            last_seen: Instant::now(),
            is_finished: false,
            is_oome_detected: false,
            hazelcast_address: None,
        }
    }

    /// `(agentIndex, workerIndex)` lexicographic key used to determine the
    /// "first worker" for a test.
    pub fn ordering_key(&self) -> (u32, u32) {
        (self.agent_index, self.worker_index)
    }

    pub fn address(&self) -> SimulatorAddress {
        SimulatorAddress::worker(self.agent_index, self.worker_index)
    }

    pub fn refresh_last_seen(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn seconds_since_last_seen(&self) -> u64 {
        self.last_seen.elapsed().as_secs()
    }
}

/// Component Registry entry binding a test index to its `TestCase` and
/// owning `TestSuite`.
#[derive(Debug, Clone)]
pub struct TestData {
    pub test_index: u32,
    pub test_case: TestCase,
    pub test_suite_id: String,
}

/// A structured record of a Worker failure, reported Agent → Coordinator.
///
/// Exact-once delivery is not required; the Agent avoids duplicate reports
/// by deleting or renaming the originating artifact file after a
/// successful send (see the Worker Process Failure Monitor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureOperation {
    pub message: String,
    pub kind: FailureKind,
    pub worker_address: SimulatorAddress,
    pub agent_public_address: String,
    pub hazelcast_address: Option<String>,
    pub worker_id: String,
    pub test_id: Option<u32>,
    pub test_suite_ref: String,
    pub cause: Option<String>,
}

impl Message for FailureOperation {
    const MESSAGE_TYPE: &'static str = "failure_operation";

    fn priority(&self) -> MessagePriority {
        if self.kind.is_dead() {
            MessagePriority::High
        } else {
            MessagePriority::Normal
        }
    }
}

/// One Worker's performance measurement for a single test, reported
/// alongside `GetBenchmarkResults` (§4.2). Shared between the Agent and
/// Coordinator crates as a wire field type the same way `FailureOperation`
/// is — each crate still defines its own message envelope independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerfSnapshot {
    pub operation_count: u64,
    pub latency_p50_millis: f64,
    pub latency_p99_millis: f64,
}

/// Commands routed between Coordinator, Agent, and Worker. Each carries its
/// own routing address via the enclosing `MessageEnvelope` and expects a
/// [`Response`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    InitTestSuite(TestSuite),
    InitTest(TestCase),
    RunPhase { test_id: u32, phase: TestPhase },
    StopRun { test_id: u32 },
    GetBenchmarkResults { test_id: u32 },
    TerminateWorkers,
    Log(String),
    Failure(FailureOperation),
}

impl Message for Operation {
    const MESSAGE_TYPE: &'static str = "operation";

    fn priority(&self) -> MessagePriority {
        match self {
            Operation::Failure(op) => op.priority(),
            Operation::TerminateWorkers => MessagePriority::High,
            _ => MessagePriority::Normal,
        }
    }
}

/// Per-target outcome of an `Operation` sent to one or more destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Success,
    FailureCoordinatorNotFound,
    FailureAgentNotFound,
    FailureWorkerNotFound,
    FailureTimeout,
    ExceptionDuringOperationExecution,
    UnblockedByFailure,
}

impl ResponseType {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseType::Success)
    }
}

/// The aggregate result of a broadcast: one `ResponseType` per target
/// address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub per_target_status: HashMap<SimulatorAddress, ResponseType>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: SimulatorAddress, status: ResponseType) {
        self.per_target_status.insert(target, status);
    }

    /// All targets reported `Success`.
    pub fn all_success(&self) -> bool {
        self.per_target_status.values().all(ResponseType::is_success)
    }

    /// The first non-`Success` entry, the canonical error for this
    /// response, per a stable iteration over targets.
    pub fn first_failure(&self) -> Option<(&SimulatorAddress, &ResponseType)> {
        let mut entries: Vec<_> = self.per_target_status.iter().collect();
        entries.sort_by_key(|(addr, _)| addr.to_string());
        entries.into_iter().find(|(_, status)| !status.is_success())
    }
}

impl Message for Response {
    const MESSAGE_TYPE: &'static str = "response";

    fn priority(&self) -> MessagePriority {
        MessagePriority::Normal
    }
}
