use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Failed to create data directory at {path}: {source} {location}")]
    DataDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {message} {location}")]
    ConfigInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("No Python interpreter found {location}")]
    InterpreterNotFound { location: ErrorLocation },

    #[error("Bundled application not found at {path} {location}")]
    AppDirMissing {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Failed to spawn application server: {source} {location}")]
    ProcessSpawn {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error(
        "Server did not accept connections within {attempts} attempts (~{elapsed_secs}s) {location}"
    )]
    StartupExhausted {
        attempts: u32,
        elapsed_secs: u64,
        location: ErrorLocation,
    },

    #[error("Another instance is already running (lock file: {path}) {location}")]
    AlreadyRunning {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Failed to acquire lock at {path}: {source} {location}")]
    LockAcquisition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },
}

impl ShellError {
    #[track_caller]
    pub fn startup_exhausted(attempts: u32, elapsed_secs: u64) -> Self {
        Self::StartupExhausted {
            attempts,
            elapsed_secs,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::InterpreterNotFound { .. } => {
                "No usable Python interpreter was found. \
                   Set runtime.python_path in config.toml or install Python 3."
            }
            Self::AppDirMissing { .. } => {
                "The bundled application files are missing. \
                   Please reinstall Guilda Manager."
            }
            Self::StartupExhausted { .. } => {
                "The local server never started accepting connections. \
                   Close and reopen the application, or check the server log."
            }
            Self::AlreadyRunning { .. } => {
                "Guilda Manager is already running. \
                   Check your taskbar or task manager."
            }
            Self::ConfigInvalid { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            Self::LockAcquisition { .. } => {
                "Unable to create lock file. \
                   Check file permissions in the application directory."
            }
            Self::DataDirCreation { .. } => {
                "Unable to create application data directory. \
                   Check file permissions or available disk space."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for ShellError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
