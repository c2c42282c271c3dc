//! The Worker Process Manager: owns the set of live Worker child processes
//! on this Agent host.
//!
//! Mutation (`launch`/`shutdown`) is serialized per-address through a
//! [`dashmap::DashMap`], the same concurrent-registry style
//! `simbench-coordinator::registry::ComponentRegistry` uses. Shutdown is
//! grounded in `simbench-osl`'s `ProcessExecutor`: a graceful signal, a
//! timed wait, then a hard kill if the Worker hasn't exited.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use simbench_osl::core::executor::OSExecutor;
use simbench_osl::{ExecutionContext, ProcessExecutor, SecurityContext};
use simbench_osl::operations::{ProcessKillOperation, ProcessSignalOperation};
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::error::WorkerProcessError;
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{WorkerData, WorkerType};

/// Parameters for launching one Worker child process.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<String>,
    pub worker_type: WorkerType,
    pub version_spec: String,
}

impl LaunchRequest {
    pub fn new(command: impl Into<String>, worker_type: WorkerType, version_spec: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
            worker_type,
            version_spec: version_spec.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

struct ManagedProcess {
    child: tokio::process::Child,
    data: WorkerData,
}

/// Owns the set of local Worker processes for one Agent.
///
/// `agent_index` identifies this Agent within the Component Registry; every
/// address this manager hands out is rooted at it.
pub struct WorkerProcessManager {
    agent_index: u32,
    next_worker_index: AtomicU32,
    processes: DashMap<SimulatorAddress, ManagedProcess>,
    executor: ProcessExecutor,
}

impl WorkerProcessManager {
    pub fn new(agent_index: u32) -> Self {
        Self {
            agent_index,
            next_worker_index: AtomicU32::new(0),
            processes: DashMap::new(),
            executor: ProcessExecutor::new("worker-process-manager"),
        }
    }

    /// Assigns the next worker index, forks the child with the requested
    /// command line, and registers it under a fresh [`SimulatorAddress`].
    pub async fn launch(&self, request: LaunchRequest) -> Result<SimulatorAddress, WorkerProcessError> {
        let worker_index = self.next_worker_index.fetch_add(1, Ordering::SeqCst);

        let mut command = tokio::process::Command::new(&request.command);
        command.args(&request.args);
        for (key, value) in &request.env {
            command.env(key, value);
        }
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| WorkerProcessError::SpawnFailed {
            command: request.command.clone(),
            source,
        })?;

        let address = SimulatorAddress::worker(self.agent_index, worker_index);
        let data = WorkerData::new(self.agent_index, worker_index, request.worker_type, request.version_spec);
        info!(worker = %address, command = %request.command, "launched worker process");

        self.processes.insert(address, ManagedProcess { child, data });
        Ok(address)
    }

    /// A snapshot of every currently tracked Worker, in `(agentIndex,
    /// workerIndex)` order.
    pub fn worker_processes(&self) -> Vec<WorkerData> {
        let mut snapshot: Vec<WorkerData> = self
            .processes
            .iter()
            .map(|entry| entry.value().data.clone())
            .collect();
        snapshot.sort_by_key(WorkerData::ordering_key);
        snapshot
    }

    /// Refreshes the worker's `lastSeen` marker. Called whenever an
    /// incoming operation for this Worker is processed (feeds the Failure
    /// Monitor's inactivity check).
    pub fn touch(&self, address: SimulatorAddress) {
        if let Some(mut entry) = self.processes.get_mut(&address) {
            entry.data.refresh_last_seen();
        }
    }

    /// Marks the worker finished without removing it, so `getWorkers`-style
    /// callers still see it until the Failure Monitor's terminal-kind
    /// failure removes it from the Component Registry.
    pub fn mark_finished(&self, address: SimulatorAddress) {
        if let Some(mut entry) = self.processes.get_mut(&address) {
            entry.data.is_finished = true;
        }
    }

    /// Seconds since `address` last processed an incoming operation, for the
    /// Failure Monitor's inactivity check. Returns 0 for an untracked
    /// address rather than erroring, since a Worker that has already been
    /// removed has nothing left to time out.
    pub fn seconds_since_last_seen(&self, address: SimulatorAddress) -> u64 {
        self.processes
            .get(&address)
            .map(|entry| entry.data.seconds_since_last_seen())
            .unwrap_or(0)
    }

    /// The child's exit code if it has already exited, without blocking.
    /// Returns `None` for an untracked address or a still-running process.
    pub fn exit_code(&self, address: SimulatorAddress) -> Option<i32> {
        let mut entry = self.processes.get_mut(&address)?;
        entry.child.try_wait().ok().flatten().and_then(|status| status.code())
    }

    /// Returns the raw exit status of `address`'s child process if it has
    /// already exited, without blocking. `Ok(None)` means still running.
    pub fn try_exit_status(&self, address: SimulatorAddress) -> Result<Option<std::process::ExitStatus>, WorkerProcessError> {
        let mut entry = self
            .processes
            .get_mut(&address)
            .ok_or(WorkerProcessError::UnknownWorker(address))?;
        entry
            .child
            .try_wait()
            .map_err(|source| WorkerProcessError::SpawnFailed {
                command: "<poll exit status>".to_string(),
                source,
            })
    }

    /// Best-effort termination: SIGTERM, wait up to `timeout`, then SIGKILL
    /// if the child is still alive. Removes the worker from the tracked set
    /// regardless of outcome once this call returns.
    pub async fn shutdown(&self, address: SimulatorAddress, timeout: Duration) -> Result<(), WorkerProcessError> {
        let (_, mut managed) = self
            .processes
            .remove(&address)
            .ok_or(WorkerProcessError::UnknownWorker(address))?;

        let pid = managed.child.id().unwrap_or(0);
        let context = ExecutionContext::new(SecurityContext::new("agent".to_string()));

        if let Err(source) = self.executor.execute(ProcessSignalOperation::terminate(pid), &context).await {
            warn!(worker = %address, error = %source, "graceful signal failed, proceeding to wait/kill");
        }

        match tokio::time::timeout(timeout, managed.child.wait()).await {
            Ok(Ok(_status)) => {
                info!(worker = %address, "worker exited after graceful shutdown");
                Ok(())
            }
            _ => {
                warn!(worker = %address, "worker did not exit in time, escalating to SIGKILL");
                self.executor
                    .execute(ProcessKillOperation::new(pid), &context)
                    .await
                    .map_err(|source| WorkerProcessError::SignalFailed { address, source })?;
                let _ = tokio::time::timeout(Duration::from_secs(2), managed.child.wait()).await;
                Err(WorkerProcessError::ShutdownTimedOut(address))
            }
        }
    }
}
