//! Coordinator binary: loads an agents file and a suite descriptor, waits
//! for every configured Agent to connect, then runs the suite and exits
//! with the status code described by the Environment / configuration
//! surface (0 = no critical failures, nonzero otherwise).

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use simbench_cli::{load_agents_file, load_suite_descriptor};
use simbench_coordinator::{AgentLink, ComponentRegistry, Coordinator, CoordinatorConfig, TcpAgentLink};
use simbench_core::domain::{AgentData, WorkerData, WorkerType};
use tokio::net::TcpListener;
use tracing::{error, info};

/// The Coordinator binary's environment / configuration surface.
#[derive(Parser, Debug)]
#[command(name = "simbench-coordinator", about = "Coordinator process for the benchmark-orchestration system")]
struct Args {
    /// Address to listen on for incoming Agent connections.
    #[arg(long, default_value = "0.0.0.0:7000")]
    listen_address: String,

    /// Newline-separated `publicIp[,privateIp]` agents file. Line order
    /// assigns each Agent's `addressIndex`.
    #[arg(long)]
    agents_file: std::path::PathBuf,

    /// TOML suite descriptor.
    #[arg(long)]
    suite: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            error!(%error, "coordinator exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<i32, anyhow::Error> {
    let agent_entries = load_agents_file(&args.agents_file)?;
    let loaded_suite = load_suite_descriptor(&args.suite)?;

    let registry = Arc::new(ComponentRegistry::new());
    for (index, entry) in agent_entries.iter().enumerate() {
        let address_index = index as u32;
        registry.add_agent(AgentData {
            address_index,
            public_address: entry.public_address.clone(),
            private_address: entry.private_address.clone(),
        });
        // The wire protocol only identifies a Worker once it reports
        // activity; there is no `RegisterWorker` operation. This binary is
        // a thin stub (see the crate's Environment / configuration surface
        // notes), so it assumes every Agent launches `workers_per_agent`
        // Member Workers at startup and seeds the registry accordingly
        // rather than waiting for a handshake that doesn't exist on the
        // wire.
        for worker_index in 0..loaded_suite.workers_per_agent {
            let worker = WorkerData::new(address_index, worker_index, WorkerType::Member, "1.0");
            registry.add_worker(worker).map_err(|source| anyhow::anyhow!("failed to seed worker registry: {source}"))?;
        }
    }

    let link = Arc::new(TcpAgentLink::new());
    let coordinator = Coordinator::new(registry.clone(), link.clone() as Arc<dyn AgentLink>, CoordinatorConfig::default());

    let listener = TcpListener::bind(args.listen_address.as_str()).await?;
    info!(address = %args.listen_address, expected_agents = agent_entries.len(), "listening for agent connections");
    accept_agents(&listener, &link, &coordinator, agent_entries.len()).await?;

    let outcome = coordinator.run_test_suite(loaded_suite.suite).await?;
    info!(exit_code = outcome.exit_code, failure_count = outcome.failure_count, test_count = outcome.test_outcomes.len(), "suite finished");
    for test_outcome in &outcome.test_outcomes {
        let stats = coordinator.perf_stats().snapshot(test_outcome.test_id);
        if stats.total_operation_count > 0 {
            info!(
                test_id = test_outcome.test_id,
                total_operation_count = stats.total_operation_count,
                min_latency_p50_millis = ?stats.min_latency_p50_millis,
                max_latency_p99_millis = ?stats.max_latency_p99_millis,
                "benchmark results"
            );
        }
    }
    Ok(outcome.exit_code)
}

/// Accepts exactly `expected` Agent connections, wiring every `Failure`
/// frame observed on them into the Coordinator's own `FailureContainer` (so
/// Workers reporting failures mid-run are visible to the suite run that is
/// about to start) and every `PerfReport` frame into its
/// `PerformanceStatsContainer`.
async fn accept_agents(
    listener: &TcpListener,
    link: &Arc<TcpAgentLink>,
    coordinator: &Coordinator,
    expected: usize,
) -> Result<(), anyhow::Error> {
    let failures = coordinator.failures().clone();
    let perf_stats = coordinator.perf_stats().clone();
    for _ in 0..expected {
        let (stream, peer) = listener.accept().await?;
        let failures = failures.clone();
        let perf_stats = perf_stats.clone();
        let agent_index = link
            .accept_and_register(
                stream,
                Arc::new(move |failure| failures.add(failure)),
                Arc::new(move |test_id, worker, snapshot| perf_stats.record(test_id, worker, snapshot)),
            )
            .await?;
        info!(agent_index, %peer, "agent connected");
    }
    Ok(())
}
