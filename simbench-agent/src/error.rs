//! Error types for the Agent side of the system.

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use simbench_core::address::SimulatorAddress;
use thiserror::Error;

/// Errors raised while the Worker Process Manager launches, tracks, or
/// shuts down a local Worker process.
#[derive(Debug, Error)]
pub enum WorkerProcessError {
    #[error("failed to spawn worker command '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("worker {0} is not a tracked process")]
    UnknownWorker(SimulatorAddress),

    #[error("worker {0} did not exit within the shutdown timeout")]
    ShutdownTimedOut(SimulatorAddress),

    #[error("failed to signal worker {address}: {source}")]
    SignalFailed {
        address: SimulatorAddress,
        #[source]
        source: simbench_osl::OSError,
    },
}

/// Errors raised while the Failure Monitor scans a Worker's home directory
/// or forwards a detected failure upstream.
#[derive(Debug, Error)]
pub enum FailureMonitorError {
    #[error("failed to read worker home directory '{path}': {source}")]
    ScanFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read exception artifact '{path}': {source}")]
    ArtifactReadFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename exception artifact '{path}' after a failed send: {source}")]
    ArtifactRenameFailed {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the Worker workload registry.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("no workload registered under the name '{0}'")]
    UnknownWorkload(String),

    #[error("workload '{name}' failed during phase {phase:?}: {reason}")]
    PhaseFailed {
        name: String,
        phase: simbench_core::domain::TestPhase,
        reason: String,
    },
}

/// Top-level error for Agent-side operations, wrapping the per-component
/// error enums plus the transport errors surfaced by the Coordinator link.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    WorkerProcess(#[from] WorkerProcessError),

    #[error(transparent)]
    FailureMonitor(#[from] FailureMonitorError),

    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error("agent connector has no route to address {0}")]
    NoRoute(SimulatorAddress),

    #[error("coordinator link error: {0}")]
    Link(String),
}
