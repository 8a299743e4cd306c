//! Launches the bundled Django application through an external Python
//! interpreter.
//!
//! The application itself is an opaque collaborator: the shell knows a
//! single entry point (`start_server` on module `app_main`, no
//! arguments, no observed return value) and nothing else. The serving
//! loop lives inside the spawned process; the shell only records the
//! PID and watches the port from the outside.

use crate::server::{RuntimeSettings, ShellError, ShellResult};

use std::fs::File;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use error_location::ErrorLocation;
use tracing::{info, warn};

const ENTRY_MODULE: &str = "app_main";
const ENTRY_FUNCTION: &str = "start_server";

const APP_DIR_NAME: &str = "app";
const SERVER_LOG_FILENAME: &str = "django-server.log";
const BUNDLED_PYTHON: &str = "python/bin/python3";

pub struct ServerLauncher {
    python_override: Option<PathBuf>,
    app_override: Option<PathBuf>,
    resource_dir: Option<PathBuf>,
    server_dir: PathBuf,
}

/// Handle to the spawned server process. The child itself is detached;
/// only the PID survives for shutdown.
pub struct LaunchedServer {
    pub pid: u32,
}

impl ServerLauncher {
    pub fn new(
        settings: &RuntimeSettings,
        resource_dir: Option<PathBuf>,
        server_dir: PathBuf,
    ) -> Self {
        Self {
            python_override: settings.python_path.clone(),
            app_override: settings.app_dir.clone(),
            resource_dir,
            server_dir,
        }
    }

    /// Python source line that invokes the entry point.
    pub(crate) fn entry_invocation() -> String {
        format!("import {ENTRY_MODULE}; {ENTRY_MODULE}.{ENTRY_FUNCTION}()")
    }

    /// Find a Python interpreter.
    ///
    /// Search order:
    /// 1. Configured override (runtime.python_path)
    /// 2. Bundled runtime under the resource directory
    /// 3. System PATH
    pub fn resolve_interpreter(&self) -> ShellResult<PathBuf> {
        if let Some(ref python) = self.python_override {
            if python.exists() {
                info!("Using Python (configured): {}", python.display());
                return Ok(python.clone());
            }
            warn!(
                "Configured python_path {} does not exist, falling back",
                python.display()
            );
        }

        if let Some(ref resources) = self.resource_dir {
            let bundled = resources.join(BUNDLED_PYTHON);
            if bundled.exists() {
                info!("Using Python (bundled): {}", bundled.display());
                return Ok(bundled);
            }
        }

        for name in ["python3", "python"] {
            if let Ok(output) = Command::new("which").arg(name).output()
                && output.status.success()
            {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    info!("Using Python (PATH): {path}");
                    return Ok(PathBuf::from(path));
                }
            }
        }

        Err(ShellError::InterpreterNotFound {
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Locate the application directory, installing the bundled copy
    /// into the writable server directory on first run. Resources may be
    /// read-only and the application writes its SQLite database next to
    /// its own files, so it always runs from the server directory.
    pub fn resolve_app_dir(&self) -> ShellResult<PathBuf> {
        let entry_file = format!("{ENTRY_MODULE}.py");

        if let Some(ref dir) = self.app_override
            && dir.join(&entry_file).exists()
        {
            info!("Using application (configured): {}", dir.display());
            return Ok(dir.clone());
        }

        let installed = self.server_dir.join(APP_DIR_NAME);
        if installed.join(&entry_file).exists() {
            return Ok(installed);
        }

        if let Some(ref resources) = self.resource_dir {
            let bundled = resources.join(APP_DIR_NAME);
            if bundled.join(&entry_file).exists() {
                copy_dir(&bundled, &installed)?;
                info!("Installed bundled application to {}", installed.display());
                return Ok(installed);
            }
        }

        Err(ShellError::AppDirMissing {
            path: installed,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Start the server process, detached.
    ///
    /// Fire-and-forget beyond the spawn itself: readiness is observed
    /// over TCP by the probe, never through the child handle. Server
    /// stdout/stderr go to a log file in the server data directory.
    pub fn launch(&self) -> ShellResult<LaunchedServer> {
        let python = self.resolve_interpreter()?;
        let app_dir = self.resolve_app_dir()?;

        let log_path = self.server_dir.join(SERVER_LOG_FILENAME);
        let log_out = File::create(&log_path).map_err(|source| ShellError::ProcessSpawn {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;
        let log_err = log_out
            .try_clone()
            .map_err(|source| ShellError::ProcessSpawn {
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut cmd = Command::new(&python);
        cmd.arg("-c")
            .arg(Self::entry_invocation())
            .current_dir(&app_dir)
            .env("PYTHONPATH", &app_dir)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_out))
            .stderr(Stdio::from(log_err));

        // Detach on Unix
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = cmd.spawn().map_err(|source| ShellError::ProcessSpawn {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let pid = child.id();
        info!(
            "Spawned application server (pid {pid}): {} -c \"{}\"",
            python.display(),
            Self::entry_invocation()
        );

        // Detached: the child owns the serving loop
        drop(child);

        Ok(LaunchedServer { pid })
    }
}

fn copy_dir(src: &Path, dest: &Path) -> ShellResult<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
