//! # simbench-core — shared primitives for the benchmark-orchestration system
//!
//! Address and message primitives shared by the Coordinator and Agent, plus
//! the domain-neutral wire vocabulary (`Operation`, `Response`, `TestPhase`,
//! `FailureKind`, `FailureOperation`, `TestCase`, `TestSuite`) that both
//! sides exchange.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use simbench_core::prelude::*;
//!
//! // Addresses identify Agents, Workers, and Tests within a run.
//! let agent = SimulatorAddress::agent(1);
//! let worker = SimulatorAddress::worker(1, 3);
//! assert_eq!(worker.parent(), Some(agent));
//!
//! // Operations carry routing info via the enclosing envelope.
//! let op = Operation::RunPhase { test_id: 0, phase: TestPhase::Setup };
//! let envelope = MessageEnvelope::new(op).with_reply_to(worker);
//! ```
//!
//! # Core Features
//!
//! ## Zero-Cost Abstractions
//! - **`SimulatorAddress` is `Copy`**, no heap allocation per address
//! - **Compile-time message type verification** via the `Message` trait
//!
//! # Module Organization
//!
//! - [`address`] - `SimulatorAddress`, the hierarchical routing identifier
//! - [`domain`] - `TestPhase`, `FailureKind`, `TestCase`, `TestSuite`,
//!   registry entries, and the `Operation`/`Response`/`FailureOperation`
//!   wire types
//! - [`message`] - `Message` trait, `MessageEnvelope`, priority system

pub mod address;
pub mod domain;
pub mod message;

pub mod prelude;

// Re-export commonly used types
pub use address::{AddressComponent, AddressLevel, SimulatorAddress};
pub use domain::{
    AgentData, FailureKind, FailureOperation, Operation, PerfSnapshot, Response, ResponseType,
    TestCase, TestData, TestPhase, TestSuite, WorkerData, WorkerType,
};
pub use message::{Message, MessageEnvelope, MessagePriority};
