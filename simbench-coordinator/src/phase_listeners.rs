//! Test Phase Listeners: registry mapping test index to the
//! `TestCaseRunner` that owns it, so an asynchronously arriving Worker
//! failure report can be routed to the runner responsible for reacting to
//! it (§5 ordering guarantee (iii): a dead target must unblock that
//! runner's pending wait rather than silently time out).

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use simbench_core::domain::FailureOperation;

/// Receives failure reports for the test a `TestCaseRunner` owns.
pub trait PhaseReportListener: Send + Sync {
    fn on_worker_failure(&self, failure: &FailureOperation);
}

/// test index → listener. Populated by the suite engine before a test's
/// runner starts, cleared once the runner finishes.
#[derive(Default)]
pub struct TestPhaseListeners {
    listeners: DashMap<u32, Arc<dyn PhaseReportListener>>,
}

impl TestPhaseListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, test_index: u32, listener: Arc<dyn PhaseReportListener>) {
        self.listeners.insert(test_index, listener);
    }

    pub fn unregister(&self, test_index: u32) {
        self.listeners.remove(&test_index);
    }

    /// Routes `failure` to the listener for its `test_id`, if one is
    /// registered. Failures with no `test_id` (e.g. a Worker that exited
    /// before any `InitTest`) have no runner to notify and are dropped
    /// here — they remain visible in the Failure Container regardless.
    pub fn notify(&self, failure: &FailureOperation) {
        let Some(test_id) = failure.test_id else {
            return;
        };
        if let Some(listener) = self.listeners.get(&test_id) {
            listener.on_worker_failure(failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use simbench_core::address::SimulatorAddress;
    use simbench_core::domain::FailureKind;

    struct RecordingListener(Mutex<Vec<FailureOperation>>);

    impl PhaseReportListener for RecordingListener {
        fn on_worker_failure(&self, failure: &FailureOperation) {
            self.0.lock().push(failure.clone());
        }
    }

    fn failure(test_id: Option<u32>) -> FailureOperation {
        FailureOperation {
            message: "boom".to_string(),
            kind: FailureKind::WorkerExit,
            worker_address: SimulatorAddress::worker(0, 0),
            agent_public_address: "10.0.0.1".to_string(),
            hazelcast_address: None,
            worker_id: "w0".to_string(),
            test_id,
            test_suite_ref: "suite0".to_string(),
            cause: Some("137".to_string()),
        }
    }

    #[test]
    fn notify_routes_to_registered_test_only() {
        let listeners = TestPhaseListeners::new();
        let recorder = Arc::new(RecordingListener(Mutex::new(Vec::new())));
        listeners.register(0, recorder.clone());

        listeners.notify(&failure(Some(0)));
        listeners.notify(&failure(Some(1)));

        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[test]
    fn notify_with_no_test_id_is_a_no_op() {
        let listeners = TestPhaseListeners::new();
        let recorder = Arc::new(RecordingListener(Mutex::new(Vec::new())));
        listeners.register(0, recorder.clone());

        listeners.notify(&failure(None));
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn unregister_stops_further_delivery() {
        let listeners = TestPhaseListeners::new();
        let recorder = Arc::new(RecordingListener(Mutex::new(Vec::new())));
        listeners.register(0, recorder.clone());
        listeners.unregister(0);

        listeners.notify(&failure(Some(0)));
        assert!(recorder.0.lock().is_empty());
    }
}
