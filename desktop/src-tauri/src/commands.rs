//! Tauri IPC commands for the loading page.

use crate::server::{ServerManager, ServerState, ShellStatus};

use std::sync::Arc;

use log::error;
use tauri::State;

/// Called by the loading page once it has rendered. Returns the current
/// status and triggers the one-time server startup.
///
/// The handshake protocol:
/// 1. The loading page subscribes to server-state-changed events
/// 2. The loading page calls frontend_ready (this command)
/// 3. The shell launches the server and the readiness probe, once
/// 4. The page shows progress from events until the shell navigates away
///
/// Gating startup on this call also guarantees the loading document is
/// rendered before the first probe attempt.
#[tauri::command]
pub async fn frontend_ready(
    app: tauri::AppHandle,
    manager: State<'_, Arc<ServerManager>>,
) -> Result<ShellStatus, String> {
    tracing::info!("Loading page ready");

    if let Err(e) = crate::start_shell(&app).await {
        error!("Startup failed: {e}");
    }

    Ok(snapshot(&manager).await)
}

/// Get current shell status.
///
/// Polled by the loading page for its status line.
#[tauri::command]
pub async fn get_shell_status(
    manager: State<'_, Arc<ServerManager>>,
) -> Result<ShellStatus, String> {
    Ok(snapshot(&manager).await)
}

async fn snapshot(manager: &ServerManager) -> ShellStatus {
    let state = manager.state().await;
    let url = match &state {
        ServerState::Running { .. } => Some(manager.live_url()),
        _ => None,
    };
    let pid = manager.server_pid().await;

    build_shell_status(&state, url, pid)
}

/// Converts internal server state to the frontend-facing status.
///
/// Shared by the IPC commands and the state change events.
pub fn build_shell_status(state: &ServerState, url: Option<String>, pid: Option<u32>) -> ShellStatus {
    let (state_str, error, recovery_hint) = match state {
        ServerState::Stopped => ("stopped".into(), None, None),
        ServerState::Starting => ("starting".into(), None, None),
        ServerState::Running { .. } => ("running".into(), None, None),
        ServerState::ShuttingDown => ("shutting_down".into(), None, None),
        ServerState::Failed { error } => (
            "failed".into(),
            Some(error.clone()),
            Some("Feche e abra o aplicativo novamente.".into()),
        ),
    };

    ShellStatus {
        state: state_str,
        url,
        pid,
        error,
        recovery_hint,
    }
}
