//! Agent-side components of the benchmark-orchestration system.
//!
//! An Agent is the long-running process on a test-cluster host that owns a
//! set of Worker processes. This crate provides:
//!
//! * [`process_manager`] — the Worker Process Manager: launch, track, and
//!   shut down Worker child processes.
//! * [`failure_monitor`] — the Worker Process Failure Monitor: scans each
//!   Worker's home directory for exception/OOM artifacts, tracks inactivity
//!   and exit status, and emits detected failures.
//! * [`connector`] — the Agent Connector: the single network endpoint per
//!   Agent, routing `Operation`s to the local Worker endpoint and forwarding
//!   responses/failures to the Coordinator.
//! * [`workload`] — the Worker endpoint's plug-in workload registry and the
//!   two reference workloads used to exercise it in tests.

pub mod connector;
pub mod error;
pub mod failure_monitor;
pub mod process_manager;
pub mod workload;

pub use connector::{
    AgentConnector, AgentToCoordinatorMessage, CoordinatorLink, CoordinatorToAgentMessage, InMemoryCoordinatorLink,
    TcpCoordinatorLink,
};
pub use error::{AgentError, FailureMonitorError, WorkerProcessError, WorkloadError};
pub use failure_monitor::{run_scan_loop, DetectedFailure, FailureMonitor, WorkerHome};
pub use process_manager::{LaunchRequest, WorkerProcessManager};
pub use workload::{FailingWorkload, SleepWorkload, TestLifecycle, WorkloadRegistry};
