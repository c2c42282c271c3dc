//! Concrete `OSExecutor` implementations backing the Agent's OS-facing
//! operations.
//!
//! This module provides the executors the Agent side of the system runs
//! against: spawning and signalling Worker child processes. Uses tokio for
//! async I/O.
//!
//! # Usage
//!
//! ```rust,no_run
//! use simbench_osl::executors::ProcessExecutor;
//! use simbench_osl::core::executor::OSExecutor;
//! use simbench_osl::operations::process::ProcessSpawnOperation;
//! use simbench_osl::core::context::{ExecutionContext, SecurityContext};
//!
//! # async fn example() -> simbench_osl::core::result::OSResult<()> {
//! let executor = ProcessExecutor::new("worker-launcher");
//! let operation = ProcessSpawnOperation::new("worker-bin");
//! let security_context = SecurityContext::new("agent".to_string());
//! let context = ExecutionContext::new(security_context);
//!
//! let result = executor.execute(operation, &context).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Structure
//!
//! - `process/` - Spawn, kill, signal a Worker child process

pub mod process;

pub use process::ProcessExecutor;
