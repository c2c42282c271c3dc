//! The Agent Connector: the single network endpoint per Agent. Routes
//! `Operation`s arriving from the Coordinator to the local Worker endpoint
//! (the in-process [`TestLifecycle`] the test case names), and forwards
//! phase-completion `Response`s and Failure Monitor reports back to the
//! Coordinator through a [`CoordinatorLink`].
//!
//! The wire transport itself (length-prefixed JSON framing over TCP) lives
//! in `simbench-osl::transport`; this module only defines *what* travels
//! over a link, plus an in-memory stub used by tests and a TCP
//! implementation for production.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use simbench_osl::transport::{read_frame, write_frame};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::error::AgentError;
use crate::failure_monitor::DetectedFailure;
use crate::workload::{TestLifecycle, WorkloadRegistry};
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{
    FailureKind, FailureOperation, Operation, PerfSnapshot, Response, ResponseType, TestCase, TestPhase, TestSuite,
};

/// Everything that travels Agent → Coordinator over one link: the
/// phase-completion acknowledgements `RemoteClient::broadcast` is waiting
/// on, and Failure Monitor reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentToCoordinatorMessage {
    /// Sent once, immediately after connecting, so the Coordinator's
    /// listener knows which Agent this socket belongs to before routing
    /// any `Operation`s down it.
    Hello(u32),
    Response(Response),
    Failure(FailureOperation),
    /// One Worker's performance measurement for `test_id`, sent in response
    /// to `GetBenchmarkResults` when the workload tracks any (§4.2).
    PerfReport { test_id: u32, worker: SimulatorAddress, snapshot: PerfSnapshot },
}

/// Everything that travels Coordinator → Agent over one link: an
/// `Operation` addressed to a specific Worker under this Agent. The
/// coordinator-side `TcpAgentLink` writes this same shape independently
/// (the two crates share no types; they agree on wire shape only, as two
/// sides of a real network protocol would).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorToAgentMessage {
    pub target: SimulatorAddress,
    pub operation: Operation,
}

/// Abstraction over the Agent's outbound link to the Coordinator.
///
/// Drives Coordinator↔Agent traffic through an explicit link rather than a
/// generic message-broker request/response pattern: see `DESIGN.md` for why
/// that shape didn't fit this crate's correlation needs.
#[async_trait]
pub trait CoordinatorLink: Send + Sync {
    async fn send_response(&self, response: Response) -> Result<(), AgentError>;
    async fn send_failure(&self, failure: FailureOperation) -> Result<ResponseType, AgentError>;
    async fn send_perf_snapshot(&self, test_id: u32, worker: SimulatorAddress, snapshot: PerfSnapshot) -> Result<(), AgentError>;
}

/// Test-stub `CoordinatorLink`: hands responses and failures to in-process
/// callbacks instead of a real socket. Used by Agent-crate unit tests and
/// by the Coordinator crate's integration tests (wired to a matching
/// in-memory `AgentLink`).
pub struct InMemoryCoordinatorLink {
    responses: Mutex<Vec<Response>>,
    failures: Mutex<Vec<FailureOperation>>,
    perf_reports: Mutex<Vec<(u32, SimulatorAddress, PerfSnapshot)>>,
}

impl InMemoryCoordinatorLink {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            perf_reports: Mutex::new(Vec::new()),
        }
    }

    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().clone()
    }

    pub fn failures(&self) -> Vec<FailureOperation> {
        self.failures.lock().clone()
    }

    pub fn perf_reports(&self) -> Vec<(u32, SimulatorAddress, PerfSnapshot)> {
        self.perf_reports.lock().clone()
    }
}

impl Default for InMemoryCoordinatorLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinatorLink for InMemoryCoordinatorLink {
    async fn send_response(&self, response: Response) -> Result<(), AgentError> {
        self.responses.lock().push(response);
        Ok(())
    }

    async fn send_failure(&self, failure: FailureOperation) -> Result<ResponseType, AgentError> {
        self.failures.lock().push(failure);
        Ok(ResponseType::Success)
    }

    async fn send_perf_snapshot(&self, test_id: u32, worker: SimulatorAddress, snapshot: PerfSnapshot) -> Result<(), AgentError> {
        self.perf_reports.lock().push((test_id, worker, snapshot));
        Ok(())
    }
}

/// Production `CoordinatorLink`: writes length-prefixed JSON frames over a
/// TCP connection established to the Coordinator Connector.
///
/// Delivery of `send_failure` is treated as successful once the frame is
/// flushed to the socket — the wire protocol does not define a synchronous
/// per-failure ack (exact-once delivery is explicitly not required, §4.2),
/// so a write success is this implementation's chosen notion of "sent".
pub struct TcpCoordinatorLink {
    writer: AsyncMutex<OwnedWriteHalf>,
}

impl TcpCoordinatorLink {
    /// Splits `stream` and keeps the write half for outbound frames. The
    /// read half is driven separately by [`AgentConnector::run_tcp_reader`].
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer: AsyncMutex::new(writer),
        }
    }

    /// Connects to the Coordinator's listener and immediately sends a
    /// `Hello(agent_index)` frame so the Coordinator can route outbound
    /// `Operation`s to this socket.
    pub async fn connect(
        coordinator_address: &str,
        agent_index: u32,
    ) -> Result<(Self, tokio::net::tcp::OwnedReadHalf), AgentError> {
        let stream = TcpStream::connect(coordinator_address)
            .await
            .map_err(|source| AgentError::Link(source.to_string()))?;
        let (read_half, write_half) = stream.into_split();
        let link = Self::new(write_half);
        {
            let mut writer = link.writer.lock().await;
            write_frame(&mut *writer, &AgentToCoordinatorMessage::Hello(agent_index))
                .await
                .map_err(|error| AgentError::Link(error.to_string()))?;
        }
        Ok((link, read_half))
    }
}

#[async_trait]
impl CoordinatorLink for TcpCoordinatorLink {
    async fn send_response(&self, response: Response) -> Result<(), AgentError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &AgentToCoordinatorMessage::Response(response))
            .await
            .map_err(|error| AgentError::Link(error.to_string()))
    }

    async fn send_failure(&self, failure: FailureOperation) -> Result<ResponseType, AgentError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &AgentToCoordinatorMessage::Failure(failure))
            .await
            .map_err(|error| AgentError::Link(error.to_string()))?;
        Ok(ResponseType::Success)
    }

    async fn send_perf_snapshot(&self, test_id: u32, worker: SimulatorAddress, snapshot: PerfSnapshot) -> Result<(), AgentError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &AgentToCoordinatorMessage::PerfReport { test_id, worker, snapshot })
            .await
            .map_err(|error| AgentError::Link(error.to_string()))
    }
}

/// Bookkeeping for one in-flight `Run` phase, dispatched onto its own
/// background task so `StopRun` has something to cancel instead of
/// blocking the connector's single response path until the sleep/workload
/// returns on its own.
struct RunHandle {
    /// `None` for workloads with nothing to interrupt (see
    /// [`TestLifecycle::cancellation_handle`]).
    cancel: Option<Arc<Notify>>,
    /// Notified once, by the background task, right before it exits.
    completed: Arc<Notify>,
    finished: Arc<AtomicBool>,
}

/// The single network endpoint per Agent. Dispatches inbound `Operation`s
/// to the local Worker endpoint and funnels outbound `Response`s and
/// `FailureOperation`s through a [`CoordinatorLink`].
pub struct AgentConnector {
    agent_index: u32,
    registry: WorkloadRegistry,
    active_tests: DashMap<u32, Box<dyn TestLifecycle>>,
    test_index_by_case_id: DashMap<String, u32>,
    current_suite_ref: Mutex<Option<String>>,
    run_handles: DashMap<u32, RunHandle>,
    agent_public_address: Mutex<String>,
    link: Arc<dyn CoordinatorLink>,
}

impl AgentConnector {
    pub fn new(agent_index: u32, registry: WorkloadRegistry, link: Arc<dyn CoordinatorLink>) -> Self {
        Self {
            agent_index,
            registry,
            active_tests: DashMap::new(),
            test_index_by_case_id: DashMap::new(),
            current_suite_ref: Mutex::new(None),
            run_handles: DashMap::new(),
            agent_public_address: Mutex::new(String::new()),
            link,
        }
    }

    /// Records the address this Agent reports itself under in upstream
    /// `FailureOperation`s (including the normal-completion report below).
    pub fn with_public_address(self, agent_public_address: impl Into<String>) -> Self {
        *self.agent_public_address.lock() = agent_public_address.into();
        self
    }

    /// Handles one inbound `Operation` addressed to `worker`, returning the
    /// `Response` to send back. Never propagates a `TestLifecycle` error as
    /// a transport failure: workload failures are reported asynchronously
    /// through the Failure Monitor (§7), not through this response.
    pub async fn handle_operation(self: &Arc<Self>, worker: SimulatorAddress, operation: Operation) -> Response {
        let mut response = Response::new();
        let status = match operation {
            Operation::InitTestSuite(suite) => self.init_suite(&suite),
            Operation::InitTest(test_case) => self.init_test(test_case),
            Operation::RunPhase { test_id, phase } => self.run_phase(worker, test_id, phase).await,
            Operation::StopRun { test_id } => self.stop_run(test_id).await,
            Operation::GetBenchmarkResults { test_id } => self.get_benchmark_results(worker, test_id).await,
            Operation::TerminateWorkers => {
                for entry in self.run_handles.iter() {
                    if let Some(cancel) = &entry.value().cancel {
                        cancel.notify_one();
                    }
                }
                self.run_handles.clear();
                self.active_tests.clear();
                ResponseType::Success
            }
            Operation::Log(message) => {
                info!(worker = %worker, %message, "coordinator log broadcast");
                ResponseType::Success
            }
            Operation::Failure(_) => {
                warn!(worker = %worker, "agent connector received a Failure operation, which only flows upstream");
                ResponseType::ExceptionDuringOperationExecution
            }
        };
        response.insert(worker, status);
        response
    }

    fn init_suite(&self, suite: &TestSuite) -> ResponseType {
        *self.current_suite_ref.lock() = Some(suite.id.clone());
        for (index, test_case) in suite.test_cases.iter().enumerate() {
            self.test_index_by_case_id.insert(test_case.id.clone(), index as u32);
        }
        ResponseType::Success
    }

    fn init_test(&self, test_case: TestCase) -> ResponseType {
        let Some(test_index) = self.test_index_by_case_id.get(&test_case.id).map(|entry| *entry) else {
            return ResponseType::ExceptionDuringOperationExecution;
        };
        match self.registry.build(&test_case) {
            Ok(workload) => {
                self.active_tests.insert(test_index, workload);
                ResponseType::Success
            }
            Err(error) => {
                warn!(test_id = test_index, %error, "failed to construct workload");
                ResponseType::ExceptionDuringOperationExecution
            }
        }
    }

    /// Dispatches `phase` to `test_id`'s workload. Every phase but `Run`
    /// runs to completion before acknowledging, matching the source's
    /// synchronous per-phase handshake. `Run` is the one phase a suite
    /// expects to outlive a single request/response round trip (it has its
    /// own duration, §5), so it is handed to a background task instead:
    /// this call acknowledges once the task is *started*, and `StopRun` is
    /// what actually waits for it to finish.
    async fn run_phase(self: &Arc<Self>, worker: SimulatorAddress, test_id: u32, phase: TestPhase) -> ResponseType {
        // Taken out of the map (rather than held via `get_mut`) so the
        // DashMap shard lock is not held across the `.await` below.
        let Some((_, mut workload)) = self.active_tests.remove(&test_id) else {
            return ResponseType::FailureWorkerNotFound;
        };

        if phase != TestPhase::Run {
            let outcome = workload.run_phase(phase).await;
            self.active_tests.insert(test_id, workload);
            return Self::status_for(test_id, phase, outcome);
        }

        let cancel = workload.cancellation_handle();
        let completed = Arc::new(Notify::new());
        let finished = Arc::new(AtomicBool::new(false));
        self.run_handles.insert(
            test_id,
            RunHandle { cancel, completed: completed.clone(), finished: finished.clone() },
        );

        let connector = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = workload.run_phase(TestPhase::Run).await;
            let was_tracked = connector.run_handles.remove(&test_id).is_some();
            if was_tracked {
                connector.active_tests.insert(test_id, workload);
            }
            finished.store(true, Ordering::SeqCst);
            completed.notify_one();

            if !was_tracked {
                // `TerminateWorkers` cleared this entry out from under us;
                // the test no longer exists, nothing left to report.
                return;
            }
            match outcome {
                Ok(()) => connector.report_self_finished(worker, test_id).await,
                Err(error) => warn!(%test_id, "run phase failed in background: {error}"),
            }
        });

        ResponseType::Success
    }

    /// Signals `test_id`'s in-flight `Run` phase to stop (if the workload
    /// exposes a [`TestLifecycle::cancellation_handle`]) and waits for the
    /// background task to actually exit before acknowledging, so a
    /// `GetBenchmarkResults` sent right after `StopRun` sees the finished
    /// workload rather than racing it.
    async fn stop_run(&self, test_id: u32) -> ResponseType {
        let Some(handle) = self.run_handles.get(&test_id) else {
            // Already finished (or never started) — nothing to stop.
            return ResponseType::Success;
        };
        let cancel = handle.cancel.clone();
        let completed = handle.completed.clone();
        let finished = handle.finished.clone();
        drop(handle);

        if let Some(cancel) = cancel {
            cancel.notify_one();
        }
        if !finished.load(Ordering::SeqCst) {
            if tokio::time::timeout(Duration::from_secs(30), completed.notified()).await.is_err() {
                warn!(%test_id, "run phase did not stop within 30s of being cancelled");
                return ResponseType::ExceptionDuringOperationExecution;
            }
        }
        ResponseType::Success
    }

    /// Reports `test_id`'s workload's latest `PerfSnapshot` upstream, if it
    /// tracks one, then acknowledges. This is the actual "results" transfer:
    /// the `Response` this call returns only carries pass/fail-style status,
    /// never the benchmark numbers themselves (§4.2).
    async fn get_benchmark_results(&self, worker: SimulatorAddress, test_id: u32) -> ResponseType {
        let snapshot = self.active_tests.get(&test_id).and_then(|workload| workload.perf_snapshot());
        let Some(snapshot) = snapshot else {
            return ResponseType::Success;
        };
        if let Err(error) = self.link.send_perf_snapshot(test_id, worker, snapshot).await {
            warn!(%test_id, %error, "failed to report performance snapshot upstream");
        }
        ResponseType::Success
    }

    fn status_for(test_id: u32, phase: TestPhase, outcome: Result<(), crate::error::WorkloadError>) -> ResponseType {
        match outcome {
            Ok(()) => ResponseType::Success,
            Err(error) => {
                // The real Worker would drop a `.exception` artifact here for
                // the Failure Monitor to pick up; in-process the connector
                // reports it directly since there is no separate child
                // process/filesystem boundary to cross.
                warn!(%test_id, ?phase, %error, "workload phase failed");
                ResponseType::Success
            }
        }
    }

    /// Reports `test_id`'s `Run` phase finishing on its own, the
    /// informational counterpart to a crash report: lets
    /// `TestSuite::wait_for_test_case` polling resolve as soon as the
    /// workload is actually done instead of waiting out the full
    /// configured duration.
    async fn report_self_finished(&self, worker: SimulatorAddress, test_id: u32) {
        let test_suite_ref = self
            .current_suite_ref
            .lock()
            .clone()
            .unwrap_or_else(|| "unknown-suite".to_string());
        let agent_public_address = self.agent_public_address.lock().clone();

        let failure = FailureOperation {
            message: "worker finished the run phase normally".to_string(),
            kind: FailureKind::WorkerFinishedNormal,
            worker_address: worker,
            agent_public_address,
            hazelcast_address: None,
            worker_id: format!("worker-{}", worker.worker_index()),
            test_id: Some(test_id),
            test_suite_ref,
            cause: None,
        };

        if let Err(error) = self.link.send_failure(failure).await {
            warn!(%test_id, %error, "failed to report normal run completion upstream");
        }
    }

    /// Sends a Failure Monitor-detected failure upstream as a
    /// `FailureOperation`, addressed and attributed per §3.
    pub async fn report_failure(
        &self,
        detected: DetectedFailure,
        agent_public_address: &str,
        worker_id: &str,
        hazelcast_address: Option<String>,
    ) -> Result<ResponseType, AgentError> {
        let test_suite_ref = self
            .current_suite_ref
            .lock()
            .clone()
            .unwrap_or_else(|| "unknown-suite".to_string());

        let failure = FailureOperation {
            message: detected.message,
            kind: detected.kind,
            worker_address: detected.address,
            agent_public_address: agent_public_address.to_string(),
            hazelcast_address,
            worker_id: worker_id.to_string(),
            test_id: detected.test_id,
            test_suite_ref,
            cause: detected.cause,
        };

        self.link.send_failure(failure).await
    }

    /// Sends `response` (typically a phase-completion acknowledgement)
    /// upstream.
    pub async fn send_response(&self, response: Response) -> Result<(), AgentError> {
        self.link.send_response(response).await
    }

    /// Runs the inbound read loop over a TCP connection's read half,
    /// dispatching each decoded `Operation` via [`handle_operation`] and
    /// writing the resulting `Response` back through `link`.
    pub async fn run_tcp_reader(
        self: Arc<Self>,
        mut reader: tokio::net::tcp::OwnedReadHalf,
    ) -> Result<(), AgentError> {
        loop {
            let message: CoordinatorToAgentMessage = match read_frame(&mut reader).await {
                Ok(message) => message,
                Err(simbench_osl::FrameError::Eof) => return Ok(()),
                Err(error) => return Err(AgentError::Link(error.to_string())),
            };
            let response = self.handle_operation(message.target, message.operation).await;
            self.send_response(response).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbench_core::domain::{TestPhase, TestSuite};

    fn connector() -> (Arc<AgentConnector>, Arc<InMemoryCoordinatorLink>) {
        let link = Arc::new(InMemoryCoordinatorLink::new());
        let registry = WorkloadRegistry::new().with_reference_workloads();
        let connector = Arc::new(AgentConnector::new(1, registry, link.clone()));
        (connector, link)
    }

    #[tokio::test]
    async fn init_suite_then_init_test_then_run_phase_succeeds() {
        let (connector, _link) = connector();
        let case = TestCase::new("t0").with_property("class", "SleepWorkload");
        let suite = TestSuite::new(vec![case.clone()]);
        let worker = SimulatorAddress::worker(1, 0);

        let response = connector.handle_operation(worker, Operation::InitTestSuite(suite)).await;
        assert!(response.all_success());

        let response = connector.handle_operation(worker, Operation::InitTest(case)).await;
        assert!(response.all_success());

        let response = connector
            .handle_operation(worker, Operation::RunPhase { test_id: 0, phase: TestPhase::Setup })
            .await;
        assert!(response.all_success());
    }

    #[tokio::test]
    async fn run_phase_without_init_test_reports_worker_not_found() {
        let (connector, _link) = connector();
        let worker = SimulatorAddress::worker(1, 0);

        let response = connector
            .handle_operation(worker, Operation::RunPhase { test_id: 5, phase: TestPhase::Setup })
            .await;
        assert_eq!(
            response.per_target_status.get(&worker),
            Some(&ResponseType::FailureWorkerNotFound)
        );
    }

    #[tokio::test]
    async fn failing_workload_phase_still_acks_success() {
        let (connector, _link) = connector();
        let case = TestCase::new("t0")
            .with_property("class", "FailingWorkload")
            .with_property("failOnPhase", "Run");
        let suite = TestSuite::new(vec![case.clone()]);
        let worker = SimulatorAddress::worker(1, 0);

        connector.handle_operation(worker, Operation::InitTestSuite(suite)).await;
        connector.handle_operation(worker, Operation::InitTest(case)).await;

        let response = connector
            .handle_operation(worker, Operation::RunPhase { test_id: 0, phase: TestPhase::Run })
            .await;
        assert!(response.all_success());
    }

    #[tokio::test]
    async fn get_benchmark_results_reports_the_workloads_snapshot() {
        let (connector, link) = connector();
        let case = TestCase::new("t0").with_property("class", "SleepWorkload");
        let suite = TestSuite::new(vec![case.clone()]);
        let worker = SimulatorAddress::worker(1, 0);

        connector.handle_operation(worker, Operation::InitTestSuite(suite)).await;
        connector.handle_operation(worker, Operation::InitTest(case)).await;
        connector
            .handle_operation(worker, Operation::RunPhase { test_id: 0, phase: TestPhase::Run })
            .await;
        // `Run` is dispatched onto a background task; give it a moment to
        // finish and re-insert the workload before polling its snapshot.
        tokio::time::sleep(Duration::from_millis(20)).await;

        connector
            .handle_operation(worker, Operation::GetBenchmarkResults { test_id: 0 })
            .await;

        let reports = link.perf_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, 0);
        assert_eq!(reports[0].1, worker);
    }

    #[tokio::test]
    async fn get_benchmark_results_without_a_tracked_snapshot_is_a_quiet_success() {
        let (connector, link) = connector();
        let worker = SimulatorAddress::worker(1, 0);

        let response = connector
            .handle_operation(worker, Operation::GetBenchmarkResults { test_id: 0 })
            .await;
        assert!(response.all_success());
        assert!(link.perf_reports().is_empty());
    }

    #[tokio::test]
    async fn report_failure_sends_through_the_link() {
        let (connector, link) = connector();
        let detected = DetectedFailure {
            address: SimulatorAddress::worker(1, 0),
            kind: simbench_core::domain::FailureKind::WorkerOom,
            message: "oom".to_string(),
            test_id: None,
            cause: None,
        };

        let status = connector
            .report_failure(detected, "10.0.0.1", "worker-0", None)
            .await
            .expect("report failure");
        assert_eq!(status, ResponseType::Success);
        assert_eq!(link.failures().len(), 1);
    }

    #[tokio::test]
    async fn terminate_workers_clears_active_tests() {
        let (connector, _link) = connector();
        let case = TestCase::new("t0").with_property("class", "SleepWorkload");
        let suite = TestSuite::new(vec![case.clone()]);
        let worker = SimulatorAddress::worker(1, 0);

        connector.handle_operation(worker, Operation::InitTestSuite(suite)).await;
        connector.handle_operation(worker, Operation::InitTest(case)).await;
        connector.handle_operation(worker, Operation::TerminateWorkers).await;

        let response = connector
            .handle_operation(worker, Operation::RunPhase { test_id: 0, phase: TestPhase::Setup })
            .await;
        assert_eq!(
            response.per_target_status.get(&worker),
            Some(&ResponseType::FailureWorkerNotFound)
        );
    }
}

impl std::fmt::Debug for AgentConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConnector")
            .field("agent_index", &self.agent_index)
            .finish_non_exhaustive()
    }
}
