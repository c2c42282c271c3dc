//! Loads the two on-disk CLI inputs described by the Environment /
//! configuration surface: the agents file (plain text, line-oriented) and
//! the suite descriptor (TOML, via the `config` crate).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use simbench_core::domain::{FailureKind, TestCase, TestPhase, TestSuite};

use crate::error::ConfigError;

/// One line of the agents file: `publicIp[,privateIp]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEntry {
    pub public_address: String,
    pub private_address: Option<String>,
}

/// Parses the agents file: one `publicIp[,privateIp]` per non-blank,
/// non-comment line. Line order determines each Agent's `addressIndex`.
pub fn load_agents_file(path: impl AsRef<Path>) -> Result<Vec<AgentEntry>, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

    let mut entries = Vec::new();
    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, ',');
        let public_address = parts.next().unwrap_or_default().trim().to_string();
        if public_address.is_empty() {
            return Err(ConfigError::AgentsFile {
                path: path.display().to_string(),
                line: index + 1,
                message: "missing public address".to_string(),
            });
        }
        let private_address = parts.next().map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        entries.push(AgentEntry { public_address, private_address });
    }
    Ok(entries)
}

fn default_last_test_phase_to_sync() -> TestPhase {
    TestPhase::GlobalWarmup
}

fn default_verify_enabled() -> bool {
    true
}

fn default_workers_per_agent() -> u32 {
    1
}

/// One `[[test_cases]]` entry of the suite descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCaseConfig {
    pub id: String,
    /// Names the `Workload` the Agent's `WorkloadRegistry` should build;
    /// stored under the `class` property so `TestCase::workload_class()`
    /// finds it unchanged.
    pub class: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl From<TestCaseConfig> for TestCase {
    fn from(config: TestCaseConfig) -> Self {
        let mut test_case = TestCase::new(config.id).with_property("class", config.class);
        for (key, value) in config.properties {
            test_case = test_case.with_property(key, value);
        }
        test_case
    }
}

/// Deserialized shape of the suite descriptor TOML file.
///
/// Mirrors `TestSuite` field-for-field, plus `workers_per_agent`: the
/// domain `TestSuite` has no notion of how many Workers a run needs (the
/// Coordinator only sees the Workers already present in the Component
/// Registry), so the descriptor carries the expected Worker count per
/// Agent for this binary to seed the registry with before the run starts.
#[derive(Debug, Clone, Deserialize)]
pub struct TestSuiteConfig {
    pub test_cases: Vec<TestCaseConfig>,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub wait_for_test_case: bool,
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub tolerable_failures: HashSet<FailureKind>,
    #[serde(default = "default_last_test_phase_to_sync")]
    pub last_test_phase_to_sync: TestPhase,
    #[serde(default)]
    pub refresh_jvm: bool,
    #[serde(default = "default_verify_enabled")]
    pub verify_enabled: bool,
    #[serde(default = "default_workers_per_agent")]
    pub workers_per_agent: u32,
}

/// `TestSuiteConfig` converted into the domain `TestSuite`, plus the
/// CLI-only `workers_per_agent` figure kept alongside it.
#[derive(Debug, Clone)]
pub struct LoadedSuite {
    pub suite: TestSuite,
    pub workers_per_agent: u32,
}

/// Loads and parses the suite descriptor at `path` via the `config` crate's
/// TOML backend, then converts it into the domain `TestSuite`.
pub fn load_suite_descriptor(path: impl AsRef<Path>) -> Result<LoadedSuite, ConfigError> {
    let path = path.as_ref();
    let parsed = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()))
        .build()
        .and_then(config::Config::try_deserialize::<TestSuiteConfig>)
        .map_err(|source| ConfigError::SuiteDescriptor { path: path.display().to_string(), source })?;

    if parsed.test_cases.is_empty() {
        return Err(ConfigError::EmptySuite);
    }

    let workers_per_agent = parsed.workers_per_agent;
    let test_cases = parsed.test_cases.into_iter().map(TestCase::from).collect();
    let mut suite = TestSuite::new(test_cases);
    suite.duration_seconds = parsed.duration_seconds;
    suite.wait_for_test_case = parsed.wait_for_test_case;
    suite.fail_fast = parsed.fail_fast;
    suite.tolerable_failures = parsed.tolerable_failures;
    suite.last_test_phase_to_sync = parsed.last_test_phase_to_sync;
    suite.refresh_jvm = parsed.refresh_jvm;
    suite.verify_enabled = parsed.verify_enabled;

    Ok(LoadedSuite { suite, workers_per_agent })
}
