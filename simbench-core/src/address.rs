//! Hierarchical simulator addressing.
//!
//! A [`SimulatorAddress`] names a position in the four-level hierarchy the
//! whole system is organized around: the Coordinator, an Agent, a Worker
//! hosted by that Agent, and (orthogonally) the test a command concerns.
//! Each component below the Coordinator is either a positive index or the
//! wildcard `*` ("all"), so one address value can describe both a specific
//! target and a broadcast scope.

// Layer 1: Standard library imports
use std::fmt;
use std::str::FromStr;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One component of a [`SimulatorAddress`]: a concrete, non-negative index,
/// or the wildcard matching every index at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressComponent {
    /// A specific index.
    Index(u32),
    /// Matches all indices at this level.
    Wildcard,
}

impl AddressComponent {
    /// Returns `true` if this component is the wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, AddressComponent::Wildcard)
    }

    /// Returns the concrete index, if any.
    pub fn index(&self) -> Option<u32> {
        match self {
            AddressComponent::Index(i) => Some(*i),
            AddressComponent::Wildcard => None,
        }
    }
}

impl fmt::Display for AddressComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressComponent::Index(i) => write!(f, "{i}"),
            AddressComponent::Wildcard => write!(f, "*"),
        }
    }
}

impl FromStr for AddressComponent {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(AddressComponent::Wildcard)
        } else {
            s.parse::<u32>()
                .map(AddressComponent::Index)
                .map_err(|_| AddressParseError::InvalidComponent(s.to_string()))
        }
    }
}

/// Hierarchical address `(agent, worker, test)`, implicitly rooted at the
/// single Coordinator.
///
/// Immutable and value-typed: every operation (`parent`, `broadcast_at`)
/// returns a new address rather than mutating in place. Round-trips through
/// its string form (`"agent:worker:test"`, each component a non-negative
/// integer or `*`) so it can travel as a JSON map key or log field.
///
/// # Examples
///
/// ```rust
/// use simbench_core::address::{AddressLevel, SimulatorAddress};
///
/// let worker = SimulatorAddress::worker(2, 5);
/// assert_eq!(worker.to_string(), "2:5:*");
///
/// let agent = worker.parent().unwrap();
/// assert_eq!(agent, SimulatorAddress::agent(2));
///
/// let broadcast = worker.broadcast_at(AddressLevel::Agent);
/// assert_eq!(broadcast.to_string(), "2:*:*");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SimulatorAddress {
    agent: AddressComponent,
    worker: AddressComponent,
    test: AddressComponent,
}

/// The levels a [`SimulatorAddress`] can be scoped to for broadcast or
/// parent derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLevel {
    /// The single Coordinator; no agent/worker/test component is set.
    Coordinator,
    /// An Agent (and everything it hosts).
    Agent,
    /// A Worker hosted by an Agent.
    Worker,
    /// A test, orthogonal to the agent/worker axis.
    Test,
}

impl SimulatorAddress {
    /// The address of the Coordinator itself: all components wildcarded.
    pub const COORDINATOR: SimulatorAddress = SimulatorAddress {
        agent: AddressComponent::Wildcard,
        worker: AddressComponent::Wildcard,
        test: AddressComponent::Wildcard,
    };

    /// Address naming a specific Agent, with worker and test unset.
    pub fn agent(agent_index: u32) -> Self {
        Self {
            agent: AddressComponent::Index(agent_index),
            worker: AddressComponent::Wildcard,
            test: AddressComponent::Wildcard,
        }
    }

    /// Address naming a specific Worker hosted by a specific Agent.
    pub fn worker(agent_index: u32, worker_index: u32) -> Self {
        Self {
            agent: AddressComponent::Index(agent_index),
            worker: AddressComponent::Index(worker_index),
            test: AddressComponent::Wildcard,
        }
    }

    /// Address naming a specific Worker, scoped to one test.
    pub fn worker_for_test(agent_index: u32, worker_index: u32, test_index: u32) -> Self {
        Self {
            agent: AddressComponent::Index(agent_index),
            worker: AddressComponent::Index(worker_index),
            test: AddressComponent::Index(test_index),
        }
    }

    /// Address naming a test, with agent/worker wildcarded (broadcast to
    /// every Worker participating in the test).
    pub fn test(test_index: u32) -> Self {
        Self {
            agent: AddressComponent::Wildcard,
            worker: AddressComponent::Wildcard,
            test: AddressComponent::Index(test_index),
        }
    }

    /// The agent component.
    pub fn agent_index(&self) -> AddressComponent {
        self.agent
    }

    /// The worker component.
    pub fn worker_index(&self) -> AddressComponent {
        self.worker
    }

    /// The test component.
    pub fn test_index(&self) -> AddressComponent {
        self.test
    }

    /// Returns `true` if every concrete component of `self` matches the
    /// corresponding component of `other`, treating wildcards on either side
    /// as matching anything. Used to test whether a broadcast address
    /// covers a specific target address.
    pub fn matches(&self, other: &SimulatorAddress) -> bool {
        Self::component_matches(self.agent, other.agent)
            && Self::component_matches(self.worker, other.worker)
            && Self::component_matches(self.test, other.test)
    }

    fn component_matches(a: AddressComponent, b: AddressComponent) -> bool {
        match (a, b) {
            (AddressComponent::Wildcard, _) | (_, AddressComponent::Wildcard) => true,
            (AddressComponent::Index(x), AddressComponent::Index(y)) => x == y,
        }
    }

    /// Derives the parent address one level up: a Worker's parent is its
    /// Agent; an Agent's parent is the Coordinator. Returns `None` for an
    /// address that is already at the Coordinator level (agent wildcarded).
    pub fn parent(&self) -> Option<SimulatorAddress> {
        if !self.worker.is_wildcard() {
            Some(SimulatorAddress {
                agent: self.agent,
                worker: AddressComponent::Wildcard,
                test: self.test,
            })
        } else if !self.agent.is_wildcard() {
            Some(SimulatorAddress::COORDINATOR)
        } else {
            None
        }
    }

    /// Rewrites this address into a broadcast address at the given level:
    /// every component below that level is wildcarded, components at or
    /// above it are kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simbench_core::address::{AddressLevel, SimulatorAddress};
    ///
    /// let w = SimulatorAddress::worker_for_test(1, 2, 3);
    /// assert_eq!(w.broadcast_at(AddressLevel::Agent).to_string(), "1:*:*");
    /// assert_eq!(w.broadcast_at(AddressLevel::Coordinator).to_string(), "*:*:*");
    /// ```
    pub fn broadcast_at(&self, level: AddressLevel) -> SimulatorAddress {
        match level {
            AddressLevel::Coordinator => SimulatorAddress::COORDINATOR,
            AddressLevel::Agent => SimulatorAddress {
                agent: self.agent,
                worker: AddressComponent::Wildcard,
                test: AddressComponent::Wildcard,
            },
            AddressLevel::Worker => SimulatorAddress {
                agent: self.agent,
                worker: self.worker,
                test: AddressComponent::Wildcard,
            },
            AddressLevel::Test => SimulatorAddress {
                agent: AddressComponent::Wildcard,
                worker: AddressComponent::Wildcard,
                test: self.test,
            },
        }
    }
}

impl fmt::Display for SimulatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.agent, self.worker, self.test)
    }
}

/// Error returned when parsing a [`SimulatorAddress`] from its string form
/// fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// The string did not have exactly three colon-separated components.
    #[error("expected 3 colon-separated components (agent:worker:test), got: {0}")]
    WrongShape(String),

    /// One component was neither `*` nor a non-negative integer.
    #[error("invalid address component: {0}")]
    InvalidComponent(String),
}

impl FromStr for SimulatorAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [agent, worker, test] = parts.as_slice() else {
            return Err(AddressParseError::WrongShape(s.to_string()));
        };
        Ok(SimulatorAddress {
            agent: agent.parse()?,
            worker: worker.parse()?,
            test: test.parse()?,
        })
    }
}

impl TryFrom<String> for SimulatorAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimulatorAddress> for String {
    fn from(addr: SimulatorAddress) -> Self {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trip() {
        let addr = SimulatorAddress::worker_for_test(1, 2, 3);
        let s = addr.to_string();
        assert_eq!(s, "1:2:3");
        assert_eq!(s.parse::<SimulatorAddress>().unwrap(), addr);
    }

    #[test]
    fn test_wildcard_round_trip() {
        let addr = SimulatorAddress::COORDINATOR;
        assert_eq!(addr.to_string(), "*:*:*");
        assert_eq!("*:*:*".parse::<SimulatorAddress>().unwrap(), addr);
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        assert!("1:2".parse::<SimulatorAddress>().is_err());
        assert!("1:2:3:4".parse::<SimulatorAddress>().is_err());
    }

    #[test]
    fn test_invalid_component_is_rejected() {
        assert!("a:2:3".parse::<SimulatorAddress>().is_err());
        assert!("-1:2:3".parse::<SimulatorAddress>().is_err());
    }

    #[test]
    fn test_parent_of_worker_is_agent() {
        let worker = SimulatorAddress::worker(2, 5);
        assert_eq!(worker.parent(), Some(SimulatorAddress::agent(2)));
    }

    #[test]
    fn test_parent_of_agent_is_coordinator() {
        let agent = SimulatorAddress::agent(2);
        assert_eq!(agent.parent(), Some(SimulatorAddress::COORDINATOR));
    }

    #[test]
    fn test_parent_of_coordinator_is_none() {
        assert_eq!(SimulatorAddress::COORDINATOR.parent(), None);
    }

    #[test]
    fn test_broadcast_at_agent_wildcards_worker_and_test() {
        let w = SimulatorAddress::worker_for_test(1, 2, 3);
        assert_eq!(w.broadcast_at(AddressLevel::Agent).to_string(), "1:*:*");
    }

    #[test]
    fn test_broadcast_at_coordinator_wildcards_everything() {
        let w = SimulatorAddress::worker_for_test(1, 2, 3);
        assert_eq!(
            w.broadcast_at(AddressLevel::Coordinator),
            SimulatorAddress::COORDINATOR
        );
    }

    #[test]
    fn test_matches_wildcard_covers_any_index() {
        let broadcast = SimulatorAddress::agent(1);
        let target = SimulatorAddress::worker(1, 7);
        assert!(broadcast.matches(&target));

        let other_agent = SimulatorAddress::worker(2, 7);
        assert!(!broadcast.matches(&other_agent));
    }

    #[test]
    fn test_matches_is_symmetric_for_wildcards() {
        let a = SimulatorAddress::agent(1);
        let b = SimulatorAddress::worker(1, 7);
        assert_eq!(a.matches(&b), b.matches(&a));
    }

    #[test]
    fn test_ordering_is_total_for_lexicographic_first_worker() {
        let a = SimulatorAddress::worker(0, 1);
        let b = SimulatorAddress::worker(0, 2);
        let c = SimulatorAddress::worker(1, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_serde_round_trip() {
        let addr = SimulatorAddress::worker_for_test(3, 4, 5);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"3:4:5\"");
        let back: SimulatorAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(agent in 0u32..1000, worker in 0u32..1000, test in 0u32..1000) {
            let addr = SimulatorAddress::worker_for_test(agent, worker, test);
            let s = addr.to_string();
            let parsed: SimulatorAddress = s.parse().unwrap();
            proptest::prop_assert_eq!(parsed, addr);
        }
    }
}
