mod commands;
mod logging;
mod server;
mod surface;

#[cfg(test)]
mod tests;

use logging::setup_logging;
use server::{ProbeOutcome, ServerManager, ServerState, ShellConfig, ShellError, ShellResult};

use std::sync::Arc;

use tauri::{Emitter, Manager};
use tracing::{error, info, warn};

const SERVER_DATA_DIR: &str = ".django";
const SHELL_DATA_DIR: &str = ".shell";

const MAIN_WINDOW: &str = "main";

// Tauri event names (must match the loading page's listeners)
const EVENT_SERVER_READY: &str = "server-ready";
const EVENT_SERVER_ERROR: &str = "server-error";
const EVENT_SERVER_STATE_CHANGED: &str = "server-state-changed";

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            // Focus existing window on second instance attempt
            if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
                window.show().ok();
                window.set_focus().ok();
            }
        }))
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;

            // Server data directory (.django/) - lock, log and installed app
            let server_dir = app_data_dir.join(SERVER_DATA_DIR);
            std::fs::create_dir_all(&server_dir)?;

            // Shell data directory (.shell/) - config and shell logs
            let shell_dir = app_data_dir.join(SHELL_DATA_DIR);
            std::fs::create_dir_all(&shell_dir)?;

            let config = ShellConfig::load_or_create(&shell_dir)
                .map_err(|e| format!("Config error: {}", e))?;

            setup_logging(&shell_dir, &config.logging)?;

            info!("Starting Guilda Manager v{}", env!("CARGO_PKG_VERSION"));
            info!("Server directory: {:?}", server_dir);
            info!("Shell directory: {:?}", shell_dir);

            // Setup signal handlers for graceful shutdown on Unix
            #[cfg(unix)]
            {
                let app_handle = app.handle().clone();
                std::thread::spawn(move || {
                    use signal_hook::consts::{SIGINT, SIGTERM};
                    use signal_hook::iterator::Signals;

                    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to register signal handlers: {e}");
                            return;
                        }
                    };

                    if let Some(sig) = signals.forever().next() {
                        info!("Received signal {sig}, shutting down...");

                        if let Some(manager) = app_handle.try_state::<Arc<ServerManager>>() {
                            tauri::async_runtime::block_on(async {
                                if let Err(e) = manager.stop().await {
                                    error!("Failed to stop server on signal: {e}");
                                }
                            });
                        }

                        std::process::exit(0);
                    }
                });
            }

            let resource_dir = app.path().resource_dir().ok();
            let manager = Arc::new(ServerManager::new(config, server_dir, resource_dir));
            app.manage(manager.clone());

            // Forward state changes to the loading page
            let app_handle = app.handle().clone();
            let manager_for_events = manager.clone();
            let mut state_rx = manager.subscribe();
            tauri::async_runtime::spawn(async move {
                while state_rx.changed().await.is_ok() {
                    let state = state_rx.borrow().clone();
                    let url = match &state {
                        ServerState::Running { .. } => Some(manager_for_events.live_url()),
                        _ => None,
                    };
                    let pid = manager_for_events.server_pid().await;

                    let status = commands::build_shell_status(&state, url, pid);
                    app_handle.emit(EVENT_SERVER_STATE_CHANGED, status).ok();
                }
            });

            Ok(())
        })
        .on_page_load(|webview, payload| {
            if let tauri::webview::PageLoadEvent::Finished = payload.event() {
                tracing::debug!("Page load finished: {}", payload.url());
                webview.eval(surface::BACK_NAV_SCRIPT).ok();
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::frontend_ready,
            commands::get_shell_status,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            use tauri::RunEvent;

            if let RunEvent::ExitRequested { api, code, .. } = event {
                info!("Exit requested (code: {:?})", code);
                api.prevent_exit();

                let app_handle_clone = app_handle.clone();
                tauri::async_runtime::block_on(async move {
                    if let Some(manager) = app_handle_clone.try_state::<Arc<ServerManager>>() {
                        info!("Stopping server before exit...");
                        match manager.stop().await {
                            Ok(()) => info!("Server stopped successfully"),
                            Err(e) => error!("Failed to stop server: {}", e),
                        }
                    }
                });

                std::process::exit(code.unwrap_or(0));
            }
        });
}

/// Launch the server and schedule the single terminal surface
/// transition. Safe to call more than once: only the first call starts
/// anything.
pub(crate) async fn start_shell(app: &tauri::AppHandle) -> ShellResult<()> {
    let manager = app.state::<Arc<ServerManager>>().inner().clone();

    let ready_rx = match manager.start().await {
        Ok(Some(rx)) => rx,
        Ok(None) => return Ok(()),
        Err(e) => {
            app.emit(
                EVENT_SERVER_ERROR,
                format!("{e}\n\nDica: {}", e.recovery_hint()),
            )
            .ok();
            return Err(e);
        }
    };

    let app_handle = app.clone();
    tauri::async_runtime::spawn(async move {
        match ready_rx.await {
            Ok(ProbeOutcome::Ready { attempt }) => {
                let url = manager.live_url();
                info!("Navigating to {url} (ready on attempt {attempt})");
                navigate_main_window(&app_handle, &url);
                app_handle.emit(EVENT_SERVER_READY, url).ok();
            }
            Ok(ProbeOutcome::Exhausted { attempts }) => {
                let e = ShellError::startup_exhausted(attempts, manager.probe_budget_secs());
                warn!("{e}");
                navigate_main_window(&app_handle, &surface::error_page_url());
                app_handle
                    .emit(
                        EVENT_SERVER_ERROR,
                        format!("{e}\n\nDica: {}", e.recovery_hint()),
                    )
                    .ok();
            }
            Ok(ProbeOutcome::Cancelled) | Err(_) => {
                // Shutdown raced the probe; nothing left to show
            }
        }
    });

    Ok(())
}

fn navigate_main_window(app: &tauri::AppHandle, url: &str) {
    let Some(window) = app.get_webview_window(MAIN_WINDOW) else {
        warn!("Main window is gone, skipping navigation");
        return;
    };

    match url.parse::<tauri::Url>() {
        Ok(parsed) => {
            if let Err(e) = window.navigate(parsed) {
                error!("Failed to navigate webview: {e}");
            }
        }
        Err(e) => error!("Invalid navigation target {url}: {e}"),
    }
}
