//! Coordinator-side components of the benchmark-orchestration system.
//!
//! The Coordinator is the single central controller of a test-suite run.
//! This crate provides:
//!
//! * [`registry`] — the Component Registry: known Agents and Workers.
//! * [`remote_client`] — the Remote Client and its [`remote_client::AgentLink`]
//!   transport abstraction, connecting the Coordinator to every Agent.
//! * [`failure_container`] — the append-only log of reported Worker
//!   failures, and the derived `finishedWorkers` set.
//! * [`perf_stats`] — the per-test performance snapshot aggregator.
//! * [`phase_listeners`] — routes asynchronous failure reports to the
//!   `TestCaseRunner` that owns the affected test.
//! * [`runner`] — `TestCaseRunner`, the per-test eight-phase state machine.
//! * [`engine`] — `Coordinator`, the top-level suite engine.

pub mod engine;
pub mod error;
pub mod failure_container;
pub mod perf_stats;
pub mod phase_listeners;
pub mod registry;
pub mod remote_client;
pub mod runner;

pub use engine::{Coordinator, CoordinatorConfig, SuiteOutcome};
pub use error::{CoordinatorError, RegistryError};
pub use failure_container::FailureContainer;
pub use perf_stats::{AggregatedPerfStats, PerfSnapshot, PerformanceStatsContainer};
pub use phase_listeners::{PhaseReportListener, TestPhaseListeners};
pub use registry::ComponentRegistry;
pub use remote_client::{AgentLink, InMemoryAgentLink, RemoteClient, TcpAgentLink};
pub use runner::{PhaseBarriers, TestCaseRunner, TestRunOutcome};
