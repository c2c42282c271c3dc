//! Component Registry: the Coordinator's hierarchical in-memory store of
//! known Agents and Workers, per §4.6. All mutation is serialized behind a
//! single lock; readers see a consistent snapshot.

// Layer 1: Standard library imports
use std::collections::BTreeMap;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::error::RegistryError;
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::{AgentData, WorkerData, WorkerType};

/// Internal, lock-guarded registry state. `workers` is keyed by
/// `SimulatorAddress` rather than a plain index: the address's own
/// `(agent, worker, test)` lexicographic `Ord` already gives the
/// `(agentIndex, workerIndex)` iteration order §4.1's "first worker"
/// tie-break and §4.6's `getWorkers` both require.
struct RegistryState {
    agents: BTreeMap<u32, AgentData>,
    workers: BTreeMap<SimulatorAddress, WorkerData>,
}

/// Hierarchical store of `AgentData`/`WorkerData`, guarded by a single
/// mutex (§5's "Component Registry: guarded by a single mutex; readers
/// obtain consistent snapshots").
pub struct ComponentRegistry {
    state: Mutex<RegistryState>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                agents: BTreeMap::new(),
                workers: BTreeMap::new(),
            }),
        }
    }

    pub fn add_agent(&self, agent: AgentData) {
        self.state.lock().agents.insert(agent.address_index, agent);
    }

    pub fn add_worker(&self, worker: WorkerData) -> Result<(), RegistryError> {
        let address = worker.address();
        let mut state = self.state.lock();
        if !state.agents.contains_key(&worker.agent_index) {
            return Err(RegistryError::UnknownAgent(worker.agent_index));
        }
        if state.workers.contains_key(&address) {
            return Err(RegistryError::DuplicateWorker(address));
        }
        state.workers.insert(address, worker);
        Ok(())
    }

    /// Removes a Worker from the registry. Per §4.1 invariant (b) /
    /// §8 ("every Worker removed... corresponds to at least one received
    /// terminal-kind failure"), callers must only invoke this after
    /// observing a `FailureKind::is_dead()` report for `address`.
    pub fn remove_worker(&self, address: SimulatorAddress) -> Result<WorkerData, RegistryError> {
        self.state
            .lock()
            .workers
            .remove(&address)
            .ok_or(RegistryError::UnknownWorker(address))
    }

    /// The first `target_count` Workers of `worker_type` in
    /// `(agentIndex, workerIndex)` order.
    pub fn get_workers(&self, worker_type: WorkerType, target_count: usize) -> Vec<WorkerData> {
        self.state
            .lock()
            .workers
            .values()
            .filter(|worker| worker.worker_type == worker_type)
            .take(target_count)
            .cloned()
            .collect()
    }

    /// Every registered Worker, in `(agentIndex, workerIndex)` order.
    pub fn all_workers(&self) -> Vec<WorkerData> {
        self.state.lock().workers.values().cloned().collect()
    }

    pub fn worker_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    pub fn agent_count(&self) -> usize {
        self.state.lock().agents.len()
    }

    pub fn get_agent(&self, address_index: u32) -> Option<AgentData> {
        self.state.lock().agents.get(&address_index).cloned()
    }

    pub fn all_agents(&self) -> Vec<AgentData> {
        self.state.lock().agents.values().cloned().collect()
    }

    /// Registered Worker addresses absent from `finished`, the set the
    /// `terminateWorkers(wait=true)` poll loop shrinks towards empty.
    pub fn get_missing_workers(&self, finished: &std::collections::HashSet<SimulatorAddress>) -> Vec<SimulatorAddress> {
        self.state
            .lock()
            .workers
            .keys()
            .filter(|address| !finished.contains(address))
            .copied()
            .collect()
    }

    pub fn refresh_last_seen(&self, address: SimulatorAddress) {
        if let Some(worker) = self.state.lock().workers.get_mut(&address) {
            worker.refresh_last_seen();
        }
    }

    pub fn seconds_since_last_seen(&self, address: SimulatorAddress) -> Option<u64> {
        self.state.lock().workers.get(&address).map(WorkerData::seconds_since_last_seen)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(index: u32) -> AgentData {
        AgentData {
            address_index: index,
            public_address: format!("10.0.0.{index}"),
            private_address: None,
        }
    }

    #[test]
    fn add_worker_requires_known_agent() {
        let registry = ComponentRegistry::new();
        let worker = WorkerData::new(0, 0, WorkerType::Member, "1.0");
        assert_eq!(registry.add_worker(worker), Err(RegistryError::UnknownAgent(0)));
    }

    #[test]
    fn add_worker_rejects_duplicates() {
        let registry = ComponentRegistry::new();
        registry.add_agent(agent(0));
        registry.add_worker(WorkerData::new(0, 0, WorkerType::Member, "1.0")).unwrap();
        let err = registry.add_worker(WorkerData::new(0, 0, WorkerType::Member, "1.0")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateWorker(SimulatorAddress::worker(0, 0)));
    }

    #[test]
    fn get_workers_orders_by_agent_then_worker_index() {
        let registry = ComponentRegistry::new();
        registry.add_agent(agent(0));
        registry.add_agent(agent(1));
        registry.add_worker(WorkerData::new(1, 0, WorkerType::Member, "1.0")).unwrap();
        registry.add_worker(WorkerData::new(0, 1, WorkerType::Member, "1.0")).unwrap();
        registry.add_worker(WorkerData::new(0, 0, WorkerType::Member, "1.0")).unwrap();

        let workers = registry.get_workers(WorkerType::Member, 3);
        let addresses: Vec<_> = workers.iter().map(WorkerData::address).collect();
        assert_eq!(
            addresses,
            vec![
                SimulatorAddress::worker(0, 0),
                SimulatorAddress::worker(0, 1),
                SimulatorAddress::worker(1, 0),
            ]
        );
    }

    #[test]
    fn get_workers_filters_by_type_and_caps_count() {
        let registry = ComponentRegistry::new();
        registry.add_agent(agent(0));
        registry.add_worker(WorkerData::new(0, 0, WorkerType::Client, "1.0")).unwrap();
        registry.add_worker(WorkerData::new(0, 1, WorkerType::Member, "1.0")).unwrap();
        registry.add_worker(WorkerData::new(0, 2, WorkerType::Member, "1.0")).unwrap();

        let workers = registry.get_workers(WorkerType::Member, 1);
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].address(), SimulatorAddress::worker(0, 1));
    }

    #[test]
    fn remove_worker_requires_existing_entry() {
        let registry = ComponentRegistry::new();
        let address = SimulatorAddress::worker(0, 0);
        assert_eq!(registry.remove_worker(address), Err(RegistryError::UnknownWorker(address)));
    }

    #[test]
    fn missing_workers_excludes_finished_set() {
        let registry = ComponentRegistry::new();
        registry.add_agent(agent(0));
        registry.add_worker(WorkerData::new(0, 0, WorkerType::Member, "1.0")).unwrap();
        registry.add_worker(WorkerData::new(0, 1, WorkerType::Member, "1.0")).unwrap();

        let mut finished = std::collections::HashSet::new();
        finished.insert(SimulatorAddress::worker(0, 0));

        let missing = registry.get_missing_workers(&finished);
        assert_eq!(missing, vec![SimulatorAddress::worker(0, 1)]);
    }

    #[test]
    fn agent_count_and_get_agent() {
        let registry = ComponentRegistry::new();
        registry.add_agent(agent(0));
        registry.add_agent(agent(1));
        assert_eq!(registry.agent_count(), 2);
        assert_eq!(registry.get_agent(1), Some(agent(1)));
        assert_eq!(registry.get_agent(9), None);
    }
}
