//! Launch-and-probe orchestration for the bundled server.

use crate::server::{
    LockFile, ProbeOutcome, ReadinessProbe, ServerLauncher, ServerState, ShellConfig, ShellError,
    ShellResult, process_running,
};

use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use error_location::ErrorLocation;
use tauri::async_runtime::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

/// Manages the application server's lifetime.
///
/// Responsibilities:
/// - Launch the server process exactly once per session
/// - Run the readiness probe and publish its one-shot outcome
/// - Terminate the server on shutdown, cancelling an in-flight probe
/// - Maintain the single-instance lock file
pub struct ServerManager {
    config: ShellConfig,
    server_dir: PathBuf,
    launcher: ServerLauncher,
    server_pid: Arc<Mutex<Option<u32>>>,
    lock_file: Arc<Mutex<Option<LockFile>>>,
    state_tx: watch::Sender<ServerState>,
    state_rx: watch::Receiver<ServerState>,
    shutdown_requested: Arc<AtomicBool>,
    started: AtomicBool,
}

impl ServerManager {
    pub fn new(config: ShellConfig, server_dir: PathBuf, resource_dir: Option<PathBuf>) -> Self {
        let (state_tx, state_rx) = watch::channel(ServerState::Stopped);
        let launcher = ServerLauncher::new(&config.runtime, resource_dir, server_dir.clone());

        Self {
            config,
            server_dir,
            launcher,
            server_pid: Arc::new(Mutex::new(None)),
            lock_file: Arc::new(Mutex::new(None)),
            state_tx,
            state_rx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
        }
    }

    /// Launch the server and begin probing for readiness.
    ///
    /// Returns the one-shot receiver the UI layer awaits for the single
    /// terminal surface transition, or `None` when startup already ran
    /// this session. A launch failure is logged and left for the probe
    /// to surface: an endpoint nobody listens on and a server that never
    /// started look identical from the outside, and the probe is the one
    /// authority for the terminal decision.
    pub async fn start(&self) -> ShellResult<Option<oneshot::Receiver<ProbeOutcome>>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }

        self.set_state(ServerState::Starting);

        std::fs::create_dir_all(&self.server_dir).map_err(|source| {
            ShellError::DataDirCreation {
                path: self.server_dir.clone(),
                source,
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let port = self.config.server.port;
        let lock = match LockFile::acquire(&self.server_dir, port) {
            Ok(lock) => lock,
            Err(e) => {
                self.set_state(ServerState::Failed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        *self.lock_file.lock().await = Some(lock);

        match self.launcher.launch() {
            Ok(launched) => {
                *self.server_pid.lock().await = Some(launched.pid);
            }
            Err(e) => {
                error!("Failed to launch application server: {e}");
            }
        }

        let probe = ReadinessProbe::new(
            self.config.server.probe_addr(),
            &self.config.probe,
            self.shutdown_requested.clone(),
        );
        let (ready_tx, ready_rx) = oneshot::channel();
        let state_tx = self.state_tx.clone();
        let interval_ms = self.config.probe.interval_ms;

        tauri::async_runtime::spawn(async move {
            let outcome = probe.run().await;

            match &outcome {
                ProbeOutcome::Ready { attempt } => {
                    info!("Server accepting connections on port {port} (attempt {attempt})");
                    let _ = state_tx.send(ServerState::Running { port });
                }
                ProbeOutcome::Exhausted { attempts } => {
                    let elapsed_secs = u64::from(*attempts) * interval_ms / 1000;
                    warn!(
                        "Server never accepted connections: {attempts} attempts (~{elapsed_secs}s)"
                    );
                    let _ = state_tx.send(ServerState::Failed {
                        error: format!("server unreachable after {attempts} attempts"),
                    });
                }
                ProbeOutcome::Cancelled => {
                    info!("Readiness probe cancelled by shutdown");
                }
            }

            let _ = ready_tx.send(outcome);
        });

        Ok(Some(ready_rx))
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state_rx.clone()
    }

    /// Get current state.
    pub async fn state(&self) -> ServerState {
        self.state_rx.borrow().clone()
    }

    /// Address the surface navigates to once the server is reachable.
    pub fn live_url(&self) -> String {
        crate::surface::live_url(&self.config.server)
    }

    /// Worst-case duration of the readiness probe.
    pub fn probe_budget_secs(&self) -> u64 {
        self.config.probe.budget_secs()
    }

    /// Get server process PID (if launched).
    pub async fn server_pid(&self) -> Option<u32> {
        *self.server_pid.lock().await
    }

    fn set_state(&self, state: ServerState) {
        let _ = self.state_tx.send(state);
    }

    /// Stop the shell's side of the world: cancel an in-flight probe,
    /// terminate the server process, release the lock.
    pub async fn stop(&self) -> ShellResult<()> {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.set_state(ServerState::ShuttingDown);

        let pid = self.server_pid.lock().await.take();
        if let Some(pid) = pid {
            term_server(pid);

            let timeout = Duration::from_secs(self.config.server.shutdown_timeout_secs);
            let poll_interval = Duration::from_millis(100);
            let start = Instant::now();

            while start.elapsed() < timeout && process_running(pid) {
                tokio::time::sleep(poll_interval).await;
            }

            if process_running(pid) {
                info!("Force killing application server (pid {pid})");
                kill_server(pid);
            }
        }

        if let Some(mut lock) = self.lock_file.lock().await.take() {
            lock.release();
        }

        self.set_state(ServerState::Stopped);
        info!("Application server stopped");

        Ok(())
    }
}

#[cfg(unix)]
fn term_server(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    info!("Sending SIGTERM to pid {pid}");
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).ok();
}

#[cfg(unix)]
fn kill_server(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).ok();
}

#[cfg(windows)]
fn term_server(pid: u32) {
    use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

    info!("Sending CTRL_BREAK to pid {pid}");
    unsafe {
        GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid);
    }
}

#[cfg(windows)]
fn kill_server(pid: u32) {
    std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output()
        .ok();
}
