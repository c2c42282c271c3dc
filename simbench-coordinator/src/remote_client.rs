//! Remote Client: the Coordinator-side "send to a set of endpoints" facade
//! over the Coordinator Connector, per §4.4. Built on an [`AgentLink`]
//! abstraction with no in-process message-broker layer underneath it: every
//! implementor either answers directly (`InMemoryAgentLink`, for tests) or
//! reads/writes length-prefixed frames straight off a `TcpStream`
//! (`TcpAgentLink`) — see `DESIGN.md` for why a generic broker abstraction
//! didn't fit here.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use simbench_osl::transport::{read_frame, write_frame};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::registry::ComponentRegistry;
use simbench_core::address::{AddressLevel, SimulatorAddress};
use simbench_core::domain::{FailureOperation, Operation, PerfSnapshot, Response, ResponseType, TestSuite, WorkerType};

/// Wire shape of a Coordinator → Agent frame: an `Operation` addressed to
/// one Worker under that Agent. Defined independently of
/// `simbench-agent`'s identical-looking type — the two crates model
/// separate processes and agree on wire shape, not on a shared Rust type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CoordinatorToAgentMessage {
    target: SimulatorAddress,
    operation: Operation,
}

/// Wire shape of an Agent → Coordinator frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum AgentToCoordinatorMessage {
    Hello(u32),
    Response(Response),
    Failure(FailureOperation),
    PerfReport { test_id: u32, worker: SimulatorAddress, snapshot: PerfSnapshot },
}

/// Abstraction over the Coordinator's outbound link to one Agent.
#[async_trait]
pub trait AgentLink: Send + Sync {
    /// Sends `operation` addressed to `target` and waits up to `timeout`
    /// for that target's `ResponseType`.
    async fn send(&self, target: SimulatorAddress, operation: Operation, timeout: Duration) -> ResponseType;
}

/// Test-stub `AgentLink`: routes every call through a synchronous handler,
/// bypassing the network entirely. Tests wire the handler to an in-process
/// Worker endpoint stub.
pub struct InMemoryAgentLink {
    handler: Box<dyn Fn(SimulatorAddress, Operation) -> ResponseType + Send + Sync>,
}

impl InMemoryAgentLink {
    pub fn new(handler: impl Fn(SimulatorAddress, Operation) -> ResponseType + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler) }
    }
}

#[async_trait]
impl AgentLink for InMemoryAgentLink {
    async fn send(&self, target: SimulatorAddress, operation: Operation, _timeout: Duration) -> ResponseType {
        (self.handler)(target, operation)
    }
}

/// One registered Agent connection: the write half, plus a FIFO queue of
/// pending reply channels.
///
/// Correlation design: `Operation`/`Response` carry no request id on the
/// wire. Ordering guarantee (i) (§5) promises per-destination FIFO
/// delivery, and the Agent Connector's read loop fully processes one
/// `Operation` (awaiting its workload, then writing one `Response`) before
/// reading the next — so the Nth `Response` read back on this connection
/// always answers the Nth `Operation` written to it. Holding `writer` and
/// `pending` behind the same mutex makes "write the frame" and "enqueue
/// the reply channel" atomic, so two concurrent `send` calls cannot
/// interleave them out of order. Each pending entry also records the
/// target it was sent to, so a `Failure` frame reporting that target dead
/// can resolve it immediately with `UnblockedByFailure` (ordering
/// guarantee iii, §5) instead of leaving the caller to wait out the full
/// broadcast timeout.
struct AgentConnection {
    writer: OwnedWriteHalf,
    pending: VecDeque<(SimulatorAddress, oneshot::Sender<ResponseType>)>,
}

/// Production `AgentLink`: one TCP connection per Agent, demultiplexed by
/// a background reader task per connection.
#[derive(Default)]
pub struct TcpAgentLink {
    connections: DashMap<u32, Arc<AsyncMutex<AgentConnection>>>,
}

impl TcpAgentLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts one Agent's connection: reads its `Hello(agentIndex)`
    /// handshake frame, registers the connection, and spawns the reader
    /// task that demultiplexes the rest of its response stream. Every
    /// `Failure` frame observed is forwarded to `on_failure`, every
    /// `PerfReport` frame to `on_perf_report`.
    pub async fn accept_and_register(
        &self,
        stream: TcpStream,
        on_failure: Arc<dyn Fn(FailureOperation) + Send + Sync>,
        on_perf_report: Arc<dyn Fn(u32, SimulatorAddress, PerfSnapshot) + Send + Sync>,
    ) -> Result<u32, crate::error::CoordinatorError> {
        let (mut read_half, write_half) = stream.into_split();
        let first: AgentToCoordinatorMessage = read_frame(&mut read_half)
            .await
            .map_err(|error| crate::error::CoordinatorError::Transport { agent_index: u32::MAX, message: error.to_string() })?;
        let AgentToCoordinatorMessage::Hello(agent_index) = first else {
            return Err(crate::error::CoordinatorError::Transport {
                agent_index: u32::MAX,
                message: "expected Hello handshake frame".to_string(),
            });
        };

        let connection = Arc::new(AsyncMutex::new(AgentConnection { writer: write_half, pending: VecDeque::new() }));
        self.connections.insert(agent_index, connection.clone());
        tokio::spawn(Self::run_reader(agent_index, read_half, connection, on_failure, on_perf_report));
        Ok(agent_index)
    }

    async fn run_reader(
        agent_index: u32,
        mut reader: OwnedReadHalf,
        connection: Arc<AsyncMutex<AgentConnection>>,
        on_failure: Arc<dyn Fn(FailureOperation) + Send + Sync>,
        on_perf_report: Arc<dyn Fn(u32, SimulatorAddress, PerfSnapshot) + Send + Sync>,
    ) {
        loop {
            let message: AgentToCoordinatorMessage = match read_frame(&mut reader).await {
                Ok(message) => message,
                Err(error) => {
                    warn!(agent_index, %error, "agent connection closed");
                    Self::unblock_all_pending(&connection).await;
                    return;
                }
            };
            match message {
                AgentToCoordinatorMessage::Hello(_) => {
                    warn!(agent_index, "unexpected second Hello frame, ignoring");
                }
                AgentToCoordinatorMessage::Response(response) => {
                    let sender = {
                        let mut guard = connection.lock().await;
                        guard.pending.pop_front()
                    };
                    if let Some((_, sender)) = sender {
                        if let Some((_, status)) = response.per_target_status.into_iter().next() {
                            let _ = sender.send(status);
                        }
                    }
                }
                AgentToCoordinatorMessage::Failure(failure) => {
                    if failure.kind.is_dead() {
                        Self::unblock_pending_for_target(&connection, failure.worker_address).await;
                    }
                    on_failure(failure);
                }
                AgentToCoordinatorMessage::PerfReport { test_id, worker, snapshot } => {
                    on_perf_report(test_id, worker, snapshot);
                }
            }
        }
    }

    /// Resolves every pending request addressed to `target` with
    /// `UnblockedByFailure` instead of leaving it to time out now that the
    /// Agent has reported that Worker dead.
    async fn unblock_pending_for_target(connection: &Arc<AsyncMutex<AgentConnection>>, target: SimulatorAddress) {
        let mut guard = connection.lock().await;
        let remaining: VecDeque<_> = std::mem::take(&mut guard.pending)
            .into_iter()
            .filter_map(|(pending_target, sender)| {
                if pending_target == target {
                    let _ = sender.send(ResponseType::UnblockedByFailure);
                    None
                } else {
                    Some((pending_target, sender))
                }
            })
            .collect();
        guard.pending = remaining;
    }

    /// Resolves every still-pending request on `connection` with
    /// `UnblockedByFailure` once the connection itself is gone.
    async fn unblock_all_pending(connection: &Arc<AsyncMutex<AgentConnection>>) {
        let mut guard = connection.lock().await;
        for (_, sender) in guard.pending.drain(..) {
            let _ = sender.send(ResponseType::UnblockedByFailure);
        }
    }
}

#[async_trait]
impl AgentLink for TcpAgentLink {
    async fn send(&self, target: SimulatorAddress, operation: Operation, timeout: Duration) -> ResponseType {
        let Some(agent_index) = target.agent_index().index() else {
            return ResponseType::FailureAgentNotFound;
        };
        let Some(connection) = self.connections.get(&agent_index).map(|entry| entry.clone()) else {
            return ResponseType::FailureAgentNotFound;
        };

        let (tx, rx) = oneshot::channel();
        {
            let mut guard = connection.lock().await;
            let message = CoordinatorToAgentMessage { target, operation };
            if write_frame(&mut guard.writer, &message).await.is_err() {
                drop(guard);
                self.connections.remove(&agent_index);
                return ResponseType::FailureAgentNotFound;
            }
            guard.pending.push_back((target, tx));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(status)) => status,
            Ok(Err(_)) => ResponseType::FailureAgentNotFound,
            Err(_) => ResponseType::FailureTimeout,
        }
    }
}

/// Synchronous-looking "send to a set of endpoints" facade over an
/// [`AgentLink`], per §4.4.
pub struct RemoteClient {
    link: Arc<dyn AgentLink>,
    registry: Arc<ComponentRegistry>,
    broadcast_timeout: Duration,
}

impl RemoteClient {
    pub fn new(link: Arc<dyn AgentLink>, registry: Arc<ComponentRegistry>, broadcast_timeout: Duration) -> Self {
        Self { link, registry, broadcast_timeout }
    }

    /// Sends `operation` to every address in `targets`, concurrently, and
    /// waits for all of them. A target address that no longer names a
    /// registered Worker at the timeout deadline is absent-is-success
    /// (§4.1 tie-break): its `FailureTimeout` is rewritten to `Success`.
    pub async fn broadcast(&self, operation: Operation, targets: &[SimulatorAddress]) -> Response {
        let mut futures = Vec::with_capacity(targets.len());
        for &target in targets {
            let link = self.link.clone();
            let operation = operation.clone();
            let timeout = self.broadcast_timeout;
            futures.push(async move { (target, link.send(target, operation, timeout).await) });
        }

        let results = futures::future::join_all(futures).await;
        let mut response = Response::new();
        for (target, status) in results {
            let status = if status == ResponseType::FailureTimeout && !self.worker_still_registered(target) {
                ResponseType::Success
            } else {
                status
            };
            response.insert(target, status);
        }
        response
    }

    fn worker_still_registered(&self, target: SimulatorAddress) -> bool {
        let Some(worker_index) = target.worker_index().index() else {
            return true;
        };
        let Some(agent_index) = target.agent_index().index() else {
            return true;
        };
        self.registry
            .all_workers()
            .iter()
            .any(|worker| worker.agent_index == agent_index && worker.worker_index == worker_index)
    }

    /// Routes `operation` to the "first worker" for `test_id`: the Worker
    /// with lowest `(agentIndex, workerIndex)` among those hosting it.
    pub async fn send_to_first_worker(&self, first_worker: SimulatorAddress, operation: Operation) -> ResponseType {
        self.link.send(first_worker, operation, self.broadcast_timeout).await
    }

    /// Idempotent `InitTestSuite` registration with every Worker under
    /// every known Agent.
    pub async fn init_test_suite(&self, suite: &TestSuite) -> Response {
        let targets: Vec<_> = self.registry.all_workers().iter().map(|worker| worker.address()).collect();
        self.broadcast(Operation::InitTestSuite(suite.clone()), &targets).await
    }

    /// Sends `TerminateWorkers` to every known Worker; if `wait`, also
    /// waits (via the caller-supplied Failure Container) for every known
    /// Worker address to be observed finished, up to
    /// `wait_timeout`. Best-effort per §4.1: a Worker that never acks is
    /// logged, not retried.
    pub async fn terminate_workers(&self, wait: bool, failure_container: &crate::failure_container::FailureContainer, wait_timeout: Duration) -> Response {
        let targets: Vec<_> = self.registry.all_workers().iter().map(|worker| worker.address()).collect();
        let response = self.broadcast(Operation::TerminateWorkers, &targets).await;

        if wait {
            let reached = failure_container.wait_for_worker_shutdown(targets.len(), wait_timeout).await;
            if !reached {
                let missing = self.registry.get_missing_workers(&failure_container.finished_workers());
                warn!(?missing, "workers did not acknowledge termination within the wait timeout");
            }
        }
        response
    }

    /// Best-effort log fan-out to every known Agent; failures are ignored.
    pub async fn log_on_all_agents(&self, message: &str) {
        for agent in self.registry.all_agents() {
            let target = SimulatorAddress::agent(agent.address_index).broadcast_at(AddressLevel::Agent);
            let status = self.link.send(target, Operation::Log(message.to_string()), self.broadcast_timeout).await;
            if status != ResponseType::Success {
                info!(agent = agent.address_index, ?status, "log fan-out did not succeed, ignoring");
            }
        }
    }
}

/// Counts registered Workers of a given role, used by the suite engine's
/// prerequisite check ("≥1 worker per required role", §4.1).
pub fn member_worker_count(registry: &ComponentRegistry) -> usize {
    registry.get_workers(WorkerType::Member, usize::MAX).len()
}
