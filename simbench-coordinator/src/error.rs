//! Error taxonomy for the Coordinator-side components, per §7: transport
//! errors, remote-execution errors, and the Coordinator-local errors that
//! abort a suite run before it starts.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use simbench_core::address::SimulatorAddress;

/// Errors raised by the Component Registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent {0} is not registered")]
    UnknownAgent(u32),

    #[error("worker {0} is not registered")]
    UnknownWorker(SimulatorAddress),

    #[error("worker {0} is already registered")]
    DuplicateWorker(SimulatorAddress),
}

/// Top-level Coordinator error, covering prerequisite failures, transport
/// failures surfaced from the Remote Client, and suite-local state errors.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// No Agents were reachable, or fewer than one worker of a required
    /// role exists, at `runTestSuite` entry. Fatal before any test runs
    /// (§7, scenario 6).
    #[error("test suite prerequisites unmet: {0}")]
    PrerequisitesUnmet(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A broadcast's transport layer failed outright (not a per-target
    /// `ResponseType`, an actual send/connect failure).
    #[error("transport error talking to agent {agent_index}: {message}")]
    Transport { agent_index: u32, message: String },

    /// A broadcast did not hear back from every target within its timeout.
    #[error("broadcast to {targets:?} timed out after {timeout:?}")]
    BroadcastTimeout {
        targets: Vec<SimulatorAddress>,
        timeout: Duration,
    },

    /// A test's own phase command reported a non-success, non-absence
    /// outcome; the enclosing `TestCaseRunner` treats this as the test's
    /// terminal failure but does not bubble it past the suite engine.
    #[error("phase command failed for test {test_id}: {message}")]
    PhaseFailed { test_id: u32, message: String },

    #[error("no agents configured for this run")]
    NoAgents,
}
