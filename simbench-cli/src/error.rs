//! Errors raised while loading the agents file and suite descriptor.

use thiserror::Error;

/// Failures encountered while turning the on-disk CLI inputs (agents file,
/// suite descriptor) into the domain types the Coordinator and Agent need.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agents file '{path}' line {line}: {message}")]
    AgentsFile { path: String, line: usize, message: String },

    #[error("failed to parse suite descriptor '{path}': {source}")]
    SuiteDescriptor {
        path: String,
        #[source]
        source: config::ConfigError,
    },

    #[error("suite descriptor declared no test cases")]
    EmptySuite,
}
