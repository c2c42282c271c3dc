//! Agent binary: connects to the Coordinator's listener, launches this
//! host's Worker processes, and serves `RunPhase`/`InitTest`/
//! `TerminateWorkers` operations against the reference `Workload`s until the
//! connection is closed.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use simbench_agent::{
    run_scan_loop, AgentConnector, FailureMonitor, LaunchRequest, TcpCoordinatorLink, WorkerHome,
    WorkerProcessManager, WorkloadRegistry,
};
use simbench_core::domain::WorkerType;
use tracing::{error, info, warn};

/// The Agent binary's environment / configuration surface: the Coordinator
/// address to connect to, this Agent's registry index, the command line
/// used to launch its Worker processes, and the optional address overrides
/// the Coordinator reports back to other Agents.
#[derive(Parser, Debug)]
#[command(name = "simbench-agent", about = "Agent process for the benchmark-orchestration system")]
struct Args {
    /// Address of the Coordinator's connector listener, e.g. "10.0.0.1:7000".
    #[arg(long)]
    bind_address: String,

    /// This Agent's index within the Coordinator's Component Registry.
    #[arg(long)]
    address_index: u32,

    /// Overrides the address this Agent is reachable at publicly. Defaults
    /// to `bind_address` when unset.
    #[arg(long)]
    public_address: Option<String>,

    /// Overrides the address used for intra-cluster traffic, if the
    /// deployment distinguishes public and private networks.
    #[arg(long)]
    private_address: Option<String>,

    /// Command used to launch each Worker process hosted by this Agent.
    /// Omit to run with no managed child processes (phase dispatch still
    /// works against the in-process reference workloads).
    #[arg(long)]
    worker_command: Option<String>,

    /// Extra argument passed to `worker_command`, repeatable.
    #[arg(long = "worker-arg")]
    worker_args: Vec<String>,

    /// Number of Worker processes to launch at startup.
    #[arg(long, default_value_t = 1)]
    worker_count: u32,

    /// Directory each launched Worker's home directory is created under
    /// (scanned by the Failure Monitor for exception/OOM artifacts).
    #[arg(long, default_value = "./worker-homes")]
    worker_home_dir: String,

    /// Role the launched Workers play in the data-grid cluster.
    #[arg(long, default_value = "member")]
    worker_type: String,

    /// Interval between Failure Monitor scan ticks.
    #[arg(long, default_value_t = 5)]
    failure_scan_interval_secs: u64,

    /// Seconds of Worker inactivity before a `WORKER_TIMEOUT` is reported.
    #[arg(long, default_value_t = 60)]
    worker_inactivity_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "agent exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

fn parse_worker_type(raw: &str) -> WorkerType {
    if raw.eq_ignore_ascii_case("client") {
        WorkerType::Client
    } else {
        WorkerType::Member
    }
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    let public_address = args.public_address.clone().unwrap_or_else(|| args.bind_address.clone());
    info!(
        agent_index = args.address_index,
        %public_address,
        private_address = args.private_address.as_deref().unwrap_or("<none>"),
        "connecting to coordinator"
    );

    let (link, read_half) = TcpCoordinatorLink::connect(&args.bind_address, args.address_index).await?;
    let registry = WorkloadRegistry::new().with_reference_workloads();
    let connector = Arc::new(
        AgentConnector::new(args.address_index, registry, Arc::new(link)).with_public_address(public_address.clone()),
    );

    let process_manager = Arc::new(WorkerProcessManager::new(args.address_index));
    let monitor = Arc::new(FailureMonitor::new(Duration::from_secs(args.worker_inactivity_timeout_secs)));
    monitor.start_timeout_detection();

    if let Some(command) = &args.worker_command {
        let worker_type = parse_worker_type(&args.worker_type);
        for worker_index in 0..args.worker_count {
            let home_dir = std::path::Path::new(&args.worker_home_dir).join(format!("worker-{worker_index}"));
            std::fs::create_dir_all(&home_dir)?;

            let mut request = LaunchRequest::new(command.clone(), worker_type, "1.0").working_dir(
                home_dir
                    .to_str()
                    .ok_or_else(|| anyhow::anyhow!("worker home directory path is not valid UTF-8"))?,
            );
            for extra_arg in &args.worker_args {
                request = request.arg(extra_arg.clone());
            }

            let address = process_manager.launch(request).await?;
            monitor.track(WorkerHome { address, path: home_dir });
            info!(worker = %address, "launched worker process");
        }
    } else {
        info!("no worker_command configured, running with no managed child processes");
    }

    let scanning = Arc::new(AtomicBool::new(true));
    let scan_task = {
        let monitor = Arc::clone(&monitor);
        let process_manager = Arc::clone(&process_manager);
        let connector = Arc::clone(&connector);
        let scanning = Arc::clone(&scanning);
        let public_address = public_address.clone();
        let check_interval = Duration::from_secs(args.failure_scan_interval_secs);

        tokio::spawn(async move {
            run_scan_loop(
                &monitor,
                check_interval,
                &scanning,
                |address| process_manager.seconds_since_last_seen(address),
                |address| process_manager.exit_code(address),
                |detected| {
                    let worker_id = format!("worker-{}", detected.address.worker_index());
                    if detected.kind.is_dead() {
                        process_manager.mark_finished(detected.address);
                        monitor.untrack(detected.address);
                    }
                    let connector = Arc::clone(&connector);
                    let public_address = public_address.clone();
                    tokio::spawn(async move {
                        if let Err(error) = connector.report_failure(detected, &public_address, &worker_id, None).await {
                            warn!(%error, "failed to report detected failure upstream");
                        }
                    });
                },
            )
            .await;
        })
    };

    connector.run_tcp_reader(read_half).await?;
    info!(agent_index = args.address_index, "coordinator connection closed, shutting down");

    scanning.store(false, Ordering::SeqCst);
    scan_task.abort();
    Ok(())
}
