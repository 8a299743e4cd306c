//! Lock file for single-instance enforcement.
//!
//! The server port is fixed, so a second shell instance must never
//! launch a second server. The file holds JSON with the shell PID, the
//! port and the start time; a lock left behind by a crashed shell is
//! detected by checking whether the recorded PID is still alive.

use crate::server::{ShellError, ShellResult};

use std::fs::OpenOptions;
use std::io::Write;
use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const LOCK_FILENAME: &str = "shell.lock";
#[cfg(unix)]
const LOCK_FILE_MODE: u32 = 0o600; // Owner read/write only

pub struct LockFile {
    path: PathBuf,
    held: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct LockInfo {
    pid: u32,
    port: u16,
    started_at: String,
}

impl LockFile {
    /// Try to acquire the lock file.
    ///
    /// Creation is exclusive (`create_new`); when the file already
    /// exists, the recorded PID decides between "another instance is
    /// running" and "stale lock, take over".
    pub fn acquire(data_dir: &Path, port: u16) -> ShellResult<Self> {
        let path = data_dir.join(LOCK_FILENAME);

        match Self::try_create(&path, port) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if let Ok(existing) = Self::read_info(&path)
                    && process_running(existing.pid)
                {
                    return Err(ShellError::AlreadyRunning {
                        path,
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                tracing::info!("Removing stale lock file at {}", path.display());
                std::fs::remove_file(&path).ok();
                Self::try_create(&path, port).map_err(|source| ShellError::LockAcquisition {
                    path,
                    source,
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(source) => Err(ShellError::LockAcquisition {
                path,
                source,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    fn try_create(path: &Path, port: u16) -> std::io::Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(LOCK_FILE_MODE);

        let mut file = options.open(path)?;

        let info = LockInfo {
            pid: std::process::id(),
            port,
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        let content = serde_json::to_string_pretty(&info).unwrap();
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            held: true,
        })
    }

    /// Read lock info from existing file. A file that fails to parse is
    /// treated the same as a stale lock by the caller.
    fn read_info(path: &Path) -> std::io::Result<LockInfo> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Release the lock file.
    ///
    /// Called automatically on drop, but can be called explicitly for
    /// graceful shutdown.
    pub fn release(&mut self) {
        if self.held {
            self.held = false;
            std::fs::remove_file(&self.path).ok();
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Check whether a process with the given PID is alive.
#[cfg(unix)]
pub(crate) fn process_running(pid: u32) -> bool {
    // kill(pid, 0) returns 0 if the process exists, -1 otherwise
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(windows)]
pub(crate) fn process_running(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle == 0 {
            return false;
        }

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle);

        result != 0 && exit_code == STILL_ACTIVE as u32
    }
}
