//! The Worker Process Failure Monitor: a background scanner that detects
//! exception artifacts, OOM artifacts, inactivity, and unexpected exits for
//! every non-finished Worker on this Agent, then emits `FailureOperation`
//! upstream.
//!
//! Per §4.2 the checks run in a fixed order per Worker per scan tick:
//! exception files, then OOM, then inactivity, then exit status. Once a
//! Worker is OOM-detected, subsequent scans skip its remaining checks.

// Layer 1: Standard library imports
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use simbench_core::address::SimulatorAddress;
use simbench_core::domain::FailureKind;
use tracing::{info, warn};
use walkdir::WalkDir;

// Layer 3: Internal module imports
use crate::error::FailureMonitorError;

/// One Worker's home directory, scanned each tick for failure artifacts.
#[derive(Debug, Clone)]
pub struct WorkerHome {
    pub address: SimulatorAddress,
    pub path: PathBuf,
}

/// A failure detected during one scan of a single Worker, before it has
/// been wrapped into a `FailureOperation` and addressed to the Coordinator.
#[derive(Debug, Clone)]
pub struct DetectedFailure {
    pub address: SimulatorAddress,
    pub kind: FailureKind,
    pub message: String,
    pub test_id: Option<u32>,
    pub cause: Option<String>,
}

/// Per-Worker bookkeeping the monitor needs between ticks, independent of
/// the Component Registry's `WorkerData` (which the Worker Process Manager
/// owns).
struct MonitorState {
    oome_detected: bool,
    last_seen_reset: std::time::Instant,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            oome_detected: false,
            last_seen_reset: std::time::Instant::now(),
        }
    }
}

/// Background scanner for one Agent's Worker home directories.
///
/// Timeout detection is off by default; `start_timeout_detection` /
/// `stop_timeout_detection` toggle it per §4.2's lifecycle, resetting every
/// tracked Worker's inactivity clock on start.
pub struct FailureMonitor {
    homes: DashMap<SimulatorAddress, WorkerHome>,
    state: DashMap<SimulatorAddress, MonitorState>,
    timeout_detection_enabled: AtomicBool,
    last_seen_timeout: Duration,
}

impl FailureMonitor {
    pub fn new(last_seen_timeout: Duration) -> Self {
        Self {
            homes: DashMap::new(),
            state: DashMap::new(),
            timeout_detection_enabled: AtomicBool::new(false),
            last_seen_timeout,
        }
    }

    /// Registers a Worker's home directory for scanning. Called by the
    /// Worker Process Manager immediately after `launch`.
    pub fn track(&self, home: WorkerHome) {
        self.state.insert(home.address, MonitorState::default());
        self.homes.insert(home.address, home);
    }

    /// Stops scanning a Worker, e.g. after it has been removed from the
    /// Component Registry.
    pub fn untrack(&self, address: SimulatorAddress) {
        self.homes.remove(&address);
        self.state.remove(&address);
    }

    pub fn start_timeout_detection(&self) {
        self.timeout_detection_enabled.store(true, Ordering::SeqCst);
        let now = std::time::Instant::now();
        for mut entry in self.state.iter_mut() {
            entry.last_seen_reset = now;
        }
    }

    pub fn stop_timeout_detection(&self) {
        self.timeout_detection_enabled.store(false, Ordering::SeqCst);
    }

    /// Runs one scan tick over every tracked, non-finished Worker and
    /// returns every failure detected this tick, in tracked order.
    ///
    /// `last_seen_seconds` supplies each Worker's seconds-since-activity
    /// (from the Worker Process Manager's registry); `exit_status` supplies
    /// the child's exit code if it has already exited.
    pub fn scan_tick<F, G>(
        &self,
        last_seen_seconds: F,
        exit_status: G,
    ) -> Result<Vec<DetectedFailure>, FailureMonitorError>
    where
        F: Fn(SimulatorAddress) -> u64,
        G: Fn(SimulatorAddress) -> Option<i32>,
    {
        let mut failures = Vec::new();
        let addresses: Vec<SimulatorAddress> = self.homes.iter().map(|entry| *entry.key()).collect();

        for address in addresses {
            let Some(home) = self.homes.get(&address).map(|entry| entry.value().clone()) else {
                continue;
            };

            let oome_already_detected = self
                .state
                .get(&address)
                .map(|entry| entry.oome_detected)
                .unwrap_or(false);

            failures.extend(self.scan_exception_files(&home)?);

            if oome_already_detected {
                continue;
            }

            if self.scan_oom(&home)? {
                if let Some(mut entry) = self.state.get_mut(&address) {
                    entry.oome_detected = true;
                }
                failures.push(DetectedFailure {
                    address,
                    kind: FailureKind::WorkerOom,
                    message: "OOM artifact detected in worker home".to_string(),
                    test_id: None,
                    cause: None,
                });
                continue;
            }

            if self.timeout_detection_enabled.load(Ordering::SeqCst) {
                let elapsed = last_seen_seconds(address);
                if elapsed > 0 && elapsed % self.last_seen_timeout.as_secs().max(1) == 0 {
                    failures.push(DetectedFailure {
                        address,
                        kind: FailureKind::WorkerTimeout,
                        message: format!("no activity for {elapsed}s"),
                        test_id: None,
                        cause: None,
                    });
                }
            }

            if let Some(code) = exit_status(address) {
                if code == 0 {
                    failures.push(DetectedFailure {
                        address,
                        kind: FailureKind::WorkerFinished,
                        message: "worker exited with code 0".to_string(),
                        test_id: None,
                        cause: None,
                    });
                } else {
                    warn!(worker = %address, exit_code = code, "worker exited unexpectedly");
                    failures.push(DetectedFailure {
                        address,
                        kind: FailureKind::WorkerExit,
                        message: format!("worker exited with code {code}"),
                        test_id: None,
                        cause: Some(code.to_string()),
                    });
                }
            }
        }

        Ok(failures)
    }

    fn scan_exception_files(&self, home: &WorkerHome) -> Result<Vec<DetectedFailure>, FailureMonitorError> {
        if !home.path.exists() {
            return Ok(Vec::new());
        }

        let mut failures = Vec::new();
        for entry in WalkDir::new(&home.path).max_depth(1).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("exception") {
                continue;
            }

            let content = std::fs::read_to_string(path).map_err(|source| FailureMonitorError::ArtifactReadFailed {
                path: path.display().to_string(),
                source,
            })?;
            let mut lines = content.lines();
            let test_id_line = lines.next().unwrap_or("null").trim();
            let test_id = test_id_line.parse::<u32>().ok();
            let cause: String = lines.collect::<Vec<_>>().join("\n");

            info!(worker = %home.address, path = %path.display(), "exception artifact detected");
            failures.push(DetectedFailure {
                address: home.address,
                kind: FailureKind::WorkerException,
                message: format!("exception artifact {}", path.display()),
                test_id,
                cause: if cause.is_empty() { None } else { Some(cause) },
            });
        }
        Ok(failures)
    }

    fn scan_oom(&self, home: &WorkerHome) -> Result<bool, FailureMonitorError> {
        if !home.path.exists() {
            return Ok(false);
        }
        if home.path.join("worker.oome").exists() {
            return Ok(true);
        }
        for entry in WalkDir::new(&home.path).max_depth(1).into_iter().filter_map(Result::ok) {
            if entry.path().extension().and_then(|ext| ext.to_str()) == Some("hprof") {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Marks an exception artifact handled after a successful upstream
    /// delivery: deletes the file so it is not re-emitted next scan.
    pub fn mark_delivered(&self, path: &Path) -> Result<(), FailureMonitorError> {
        std::fs::remove_file(path).map_err(|source| FailureMonitorError::ArtifactReadFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Marks an exception artifact as failed-to-deliver: renames it so a
    /// later scan does not re-emit it, but an operator can still retrieve
    /// it from disk.
    pub fn mark_send_failed(&self, path: &Path) -> Result<(), FailureMonitorError> {
        let renamed = path.with_extension("exception.sendFailure");
        std::fs::rename(path, &renamed).map_err(|source| FailureMonitorError::ArtifactRenameFailed {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Runs the scan loop at `check_interval`, forwarding every detected
/// failure to `on_failure`, until `running` is cleared. Mirrors the
/// source's dedicated scanner thread; here a single cancellable async task.
pub async fn run_scan_loop<F, G, H>(
    monitor: &FailureMonitor,
    check_interval: Duration,
    running: &AtomicBool,
    last_seen_seconds: F,
    exit_status: G,
    mut on_failure: H,
) where
    F: Fn(SimulatorAddress) -> u64,
    G: Fn(SimulatorAddress) -> Option<i32>,
    H: FnMut(DetectedFailure),
{
    while running.load(Ordering::SeqCst) {
        match monitor.scan_tick(&last_seen_seconds, &exit_status) {
            Ok(failures) => {
                for failure in failures {
                    on_failure(failure);
                }
            }
            Err(error) => warn!(%error, "failure monitor scan tick failed"),
        }
        tokio::time::sleep(check_interval).await;
    }
}

/// Tolerable set helper: whether `kinds` contains every kind that reached
/// the Failure Container this tick — used only by tests to assert on
/// `HashSet<FailureKind>` contents without importing the Coordinator crate.
#[cfg(test)]
fn kinds_of(failures: &[DetectedFailure]) -> HashSet<FailureKind> {
    failures.iter().map(|f| f.kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn worker_home() -> (tempfile::TempDir, WorkerHome) {
        let dir = tempfile::tempdir().expect("tempdir");
        let home = WorkerHome {
            address: SimulatorAddress::worker(0, 0),
            path: dir.path().to_path_buf(),
        };
        (dir, home)
    }

    #[test]
    fn exception_file_is_detected_and_deleted_after_delivery() {
        let (dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        monitor.track(home.clone());

        let exception_path = dir.path().join("1.exception");
        let mut file = std::fs::File::create(&exception_path).expect("create exception file");
        writeln!(file, "7").expect("write test id");
        writeln!(file, "boom: stack trace here").expect("write cause");
        drop(file);

        let failures = monitor.scan_tick(|_| 0, |_| None).expect("scan");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::WorkerException);
        assert_eq!(failures[0].test_id, Some(7));

        monitor.mark_delivered(&exception_path).expect("mark delivered");
        assert!(!exception_path.exists());

        let rescan = monitor.scan_tick(|_| 0, |_| None).expect("rescan");
        assert!(rescan.is_empty());
    }

    #[test]
    fn exception_file_is_renamed_after_failed_delivery() {
        let (dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        monitor.track(home);

        let exception_path = dir.path().join("2.exception");
        std::fs::write(&exception_path, "null\nsome cause").expect("write exception");

        let failures = monitor.scan_tick(|_| 0, |_| None).expect("scan");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].test_id, None);

        monitor.mark_send_failed(&exception_path).expect("mark send failed");
        assert!(!exception_path.exists());
        assert!(dir.path().join("2.exception.sendFailure").exists());
    }

    #[test]
    fn oom_sentinel_file_is_detected_once() {
        let (dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        monitor.track(home.clone());

        std::fs::write(dir.path().join("worker.oome"), "").expect("write oome sentinel");

        let first = monitor.scan_tick(|_| 0, |_| None).expect("first scan");
        assert_eq!(kinds_of(&first), HashSet::from([FailureKind::WorkerOom]));

        let second = monitor.scan_tick(|_| 0, |_| None).expect("second scan skips oom worker");
        assert!(second.is_empty());
    }

    #[test]
    fn hprof_file_also_signals_oom() {
        let (dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        monitor.track(home);

        std::fs::write(dir.path().join("heap.hprof"), b"dump").expect("write hprof");

        let failures = monitor.scan_tick(|_| 0, |_| None).expect("scan");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::WorkerOom);
    }

    #[test]
    fn inactivity_timeout_fires_periodically_when_enabled() {
        let (_dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(10));
        monitor.track(home);
        monitor.start_timeout_detection();

        let no_timeout = monitor.scan_tick(|_| 5, |_| None).expect("scan at 5s");
        assert!(no_timeout.is_empty());

        let timeout = monitor.scan_tick(|_| 10, |_| None).expect("scan at 10s");
        assert_eq!(timeout.len(), 1);
        assert_eq!(timeout[0].kind, FailureKind::WorkerTimeout);
    }

    #[test]
    fn inactivity_timeout_disabled_by_default() {
        let (_dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(10));
        monitor.track(home);

        let failures = monitor.scan_tick(|_| 10, |_| None).expect("scan");
        assert!(failures.is_empty());
    }

    #[test]
    fn exit_status_zero_reports_finished() {
        let (_dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        monitor.track(home);

        let failures = monitor.scan_tick(|_| 0, |_| Some(0)).expect("scan");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::WorkerFinished);
    }

    #[test]
    fn exit_status_nonzero_reports_exit() {
        let (_dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        monitor.track(home);

        let failures = monitor.scan_tick(|_| 0, |_| Some(137)).expect("scan");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::WorkerExit);
        assert_eq!(failures[0].cause, Some("137".to_string()));
    }

    #[test]
    fn untrack_stops_future_scans() {
        let (dir, home) = worker_home();
        let monitor = FailureMonitor::new(Duration::from_secs(30));
        let address = home.address;
        monitor.track(home);
        std::fs::write(dir.path().join("a.exception"), "null\ncause").expect("write exception");

        monitor.untrack(address);
        let failures = monitor.scan_tick(|_| 0, |_| None).expect("scan after untrack");
        assert!(failures.is_empty());
    }
}
