//! Configuration loading shared by the `simbench-coordinator` and
//! `simbench-agent` binaries.
//!
//! This crate is deliberately a thin wiring layer: argument parsing lives
//! in each binary's own `clap::Parser` struct, and everything here does is
//! turn the agents file and suite descriptor described by the Environment /
//! configuration surface into the domain types `simbench-coordinator` and
//! `simbench-agent` already know how to run.

pub mod config;
pub mod error;

pub use config::{load_agents_file, load_suite_descriptor, AgentEntry, LoadedSuite, TestCaseConfig, TestSuiteConfig};
pub use error::ConfigError;
