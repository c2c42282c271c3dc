//! Concrete operation type implementations.
//!
//! This module provides concrete implementations of the `Operation` trait for
//! the process operations the Agent side of the system needs: spawning,
//! killing, and signalling Worker child processes.
//!
//! # Architecture
//!
//! Operations are concrete types that implement the `Operation` trait:
//!
//! ```text
//! WorkerProcessManager::launch(request)
//!     ↓ (creates)
//! ProcessSpawnOperation
//!     ↓ (passed to)
//! ProcessExecutor::execute(operation, context)
//!     ↓ (produces)
//! ExecutionResult
//! ```
//!
//! # Operation Categories
//!
//! - **Process Operations**: Worker process management (spawn, kill, signal)
//!
//! # Design Principles
//!
//! 1. **Stateless**: Operations contain all data needed for execution
//! 2. **Cloneable**: Operations can be duplicated for retry logic
//! 3. **Type-Safe**: Strong typing prevents misuse

// Process operation types (modular structure)
pub mod process;

// Re-export all operation types for convenient access
pub use process::{ProcessKillOperation, ProcessSignalOperation, ProcessSpawnOperation};
