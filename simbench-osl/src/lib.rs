//! Simbench OS Layer
//!
//! `simbench-osl` is the Agent-facing OS abstraction layer: it provides the
//! process executor behind the Worker Process Manager (spawn/signal/kill a
//! Worker child process), and the length-prefixed JSON frame codec used by
//! the wire transport (`simbench-coordinator`'s `RemoteClient` and
//! `simbench-agent`'s `CoordinatorLink` read/write these frames directly
//! over `tokio::net::TcpStream`, without going through an `OSExecutor`).
//!
//! # Core Components
//!
//! * **Core Abstractions** - Foundational traits and types in the [`core`] module
//! * **Process Executor** - Spawn/kill/signal a Worker child process
//! * **Transport** - Length-prefixed frame encode/decode for the wire protocol
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use simbench_osl::core::{ExecutionContext, SecurityContext};
//!
//! // Create a security context for the current principal
//! let security_context = SecurityContext::new("agent".to_string());
//! let execution_context = ExecutionContext::new(security_context);
//!
//! // Operations and executors use these contexts for audit trails
//! ```

pub mod core;
pub mod executors;
pub mod operations;
pub mod transport;

// Re-export core types for convenient access
pub use core::{
    ExecutionContext, ExecutionResult, OSError, OSExecutor, OSResult, Operation, OperationType,
    Permission, SecurityContext,
};
pub use executors::ProcessExecutor;
pub use operations::{ProcessKillOperation, ProcessSignalOperation, ProcessSpawnOperation};
pub use transport::{read_frame, write_frame, FrameError};
