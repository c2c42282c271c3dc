//! Failure Container: the Coordinator's append-only log of reported Worker
//! failures, per §4.5. Feeds the `TestCaseRunner`'s per-step critical-failure
//! poll and the Remote Client's `terminateWorkers(wait=true)` shutdown wait.

// Layer 1: Standard library imports
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tracing::info;

// Layer 3: Internal module imports
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{FailureKind, FailureOperation};

type Listener = Arc<dyn Fn(&FailureOperation) + Send + Sync>;

/// Append-only sink of `FailureOperation`s plus the derived
/// `finishedWorkers` set. Internal synchronization only — listeners are
/// invoked after the lock is released (§5: "listeners are invoked on a
/// dedicated dispatcher, never holding the container's lock").
pub struct FailureContainer {
    failures: Mutex<Vec<FailureOperation>>,
    finished_workers: Mutex<HashSet<SimulatorAddress>>,
    listeners: Mutex<Vec<Listener>>,
}

impl FailureContainer {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
            finished_workers: Mutex::new(HashSet::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Records `failure`; if its kind implies the Worker process is gone,
    /// adds the address to `finishedWorkers`. Notifies every listener
    /// afterwards, without holding either lock.
    pub fn add(&self, failure: FailureOperation) {
        if failure.kind.is_dead() {
            self.finished_workers.lock().insert(failure.worker_address);
        }
        self.failures.lock().push(failure.clone());

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(&failure);
        }
    }

    pub fn add_listener(&self, listener: Listener) {
        self.listeners.lock().push(listener);
    }

    /// Whether any recorded failure's kind is outside `tolerable`, across
    /// the whole suite. Used for the engine's between-tests restart/
    /// fail-fast decision (§4.1), where "has this suite seen a critical
    /// failure anywhere yet" is exactly the right question.
    pub fn has_critical_failure(&self, tolerable: &HashSet<FailureKind>) -> bool {
        self.failures.lock().iter().any(|failure| !tolerable.contains(&failure.kind))
    }

    /// Whether a recorded failure's kind is outside `tolerable` *and*
    /// concerns `test_id` specifically (or carries no test attribution at
    /// all, e.g. a Worker dying between tests). A single container is
    /// shared by every `TestCaseRunner` in a suite, so without this scoping
    /// a critical failure in test 0 would permanently fail every later
    /// test's in-run poll even once test 0 has finished.
    pub fn has_critical_failure_for_test(&self, test_id: u32, tolerable: &HashSet<FailureKind>) -> bool {
        self.failures
            .lock()
            .iter()
            .filter(|failure| failure.test_id.is_none_or(|id| id == test_id))
            .any(|failure| !tolerable.contains(&failure.kind))
    }

    pub fn count(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn all(&self) -> Vec<FailureOperation> {
        self.failures.lock().clone()
    }

    pub fn finished_workers(&self) -> HashSet<SimulatorAddress> {
        self.finished_workers.lock().clone()
    }

    /// Polls `finishedWorkers` until it reaches `expected_count` members or
    /// `timeout` elapses. Returns whether the expected count was reached.
    pub async fn wait_for_worker_shutdown(&self, expected_count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.finished_workers.lock().len() >= expected_count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                info!(expected_count, "timed out waiting for worker shutdown acknowledgements");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Default for FailureContainer {
    fn default() -> Self {
        Self::new()
    }
}
