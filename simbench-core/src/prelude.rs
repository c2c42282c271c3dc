//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits for
//! working with `simbench-core`. Import this module to get started quickly:
//!
//! ```rust
//! use simbench_core::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Addressing
//! - [`SimulatorAddress`] - Hierarchical `(agent, worker, test)` address
//! - [`AddressComponent`] - A single address component (index or wildcard)
//! - [`AddressLevel`] - Level used by `broadcast_at`
//!
//! ## Domain
//! - [`TestPhase`] - The eight ordered test-phase stages
//! - [`FailureKind`] - Worker failure classification
//! - [`TestCase`] / [`TestSuite`] - Suite and test-case definitions
//! - [`Operation`] / [`Response`] / [`FailureOperation`] - Wire messages
//!
//! ## Messaging
//! - [`Message`] - Core trait for messages
//! - [`MessageEnvelope`] - Message wrapper with routing metadata
//! - [`MessagePriority`] - Priority levels (Critical, High, Normal, Low)
//!
//! # Example
//!
//! ```rust,ignore
//! use simbench_core::prelude::*;
//!
//! let worker = SimulatorAddress::worker(1, 3);
//! let op = Operation::RunPhase { test_id: 0, phase: TestPhase::Setup };
//! let envelope = MessageEnvelope::new(op).with_reply_to(worker);
//! assert_eq!(envelope.message_type(), "operation");
//! ```

// Addressing
pub use crate::address::{AddressComponent, AddressLevel, SimulatorAddress};

// Domain
pub use crate::domain::{
    AgentData, FailureKind, FailureOperation, Operation, Response, ResponseType, TestCase,
    TestData, TestPhase, TestSuite, WorkerData, WorkerType,
};

// Messaging
pub use crate::message::{Message, MessageEnvelope, MessagePriority};
