//! Shell configuration with validation and versioning.

use crate::server::{ShellError, ShellResult};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Configuration file format version. Increment when adding new fields
/// or changing structure.
pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PROBE_INTERVAL_MS: u64 = 250;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 200;
const DEFAULT_MAX_ATTEMPTS: u32 = 240;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_RETENTION: u32 = 7;

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Loopback endpoint the server is expected on
    #[serde(default)]
    pub server: ServerSettings,

    /// Readiness probe cadence and budget
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Interpreter and application location overrides
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Shell logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host the server binds to (loopback only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the bundled server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long to wait for the server process to exit on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Delay between connection attempts (milliseconds)
    #[serde(default = "default_probe_interval")]
    pub interval_ms: u64,

    /// Per-attempt connect timeout (milliseconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Attempt budget before the startup is declared failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Explicit Python interpreter, tried before the bundled runtime
    #[serde(default)]
    pub python_path: Option<PathBuf>,

    /// Explicit application directory (must contain the entry module)
    #[serde(default)]
    pub app_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative to the shell data directory)
    #[serde(default = "default_log_dir")]
    pub directory: String,

    /// Number of rotated log files to keep
    #[serde(default = "default_log_retention")]
    pub retention_count: u32,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}
fn default_probe_interval() -> u64 {
    DEFAULT_PROBE_INTERVAL_MS
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}
fn default_log_retention() -> u32 {
    DEFAULT_LOG_RETENTION
}

// === Default Implementations ===

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerSettings::default(),
            probe: ProbeSettings::default(),
            runtime: RuntimeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_probe_interval(),
            connect_timeout_ms: default_connect_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
            retention_count: default_log_retention(),
        }
    }
}

impl ServerSettings {
    /// Socket address the probe targets and the surface navigates to.
    /// `validate` restricts the host to loopback names, so the fallback
    /// only covers the "localhost" spelling.
    pub fn probe_addr(&self) -> SocketAddr {
        let ip: IpAddr = self
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        SocketAddr::new(ip, self.port)
    }
}

impl ProbeSettings {
    /// Worst-case wall-clock budget of the whole probe loop.
    pub fn budget_secs(&self) -> u64 {
        u64::from(self.max_attempts) * self.interval_ms / 1000
    }
}

// === Configuration Operations ===

impl ShellConfig {
    /// Load config from file, creating default if not exists.
    pub fn load_or_create(data_dir: &Path) -> ShellResult<Self> {
        let config_path = data_dir.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self =
                toml::from_str(&content).map_err(|e| ShellError::ConfigInvalid {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(data_dir)?;
            }

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(data_dir)?;
            Ok(config)
        }
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename so an interrupted write never
    /// leaves a half-written config behind.
    pub fn save(&self, data_dir: &Path) -> ShellResult<()> {
        let config_path = data_dir.join("config.toml");
        let content = toml::to_string_pretty(self).map_err(|e| ShellError::ConfigInvalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> ShellResult<Self> {
        // Version 0 -> 1: probe settings gained their own section
        if config.version == 0 {
            config.probe = ProbeSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> ShellResult<()> {
        if self.server.host != DEFAULT_HOST && self.server.host != "localhost" {
            return Err(ShellError::ConfigInvalid {
                message: format!("Host must be {DEFAULT_HOST} or localhost"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.server.port < MIN_PORT {
            return Err(ShellError::ConfigInvalid {
                message: format!("Port must be >= {} (unprivileged)", MIN_PORT),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.probe.max_attempts == 0 {
            return Err(ShellError::ConfigInvalid {
                message: "Probe attempt budget must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.probe.interval_ms == 0 || self.probe.connect_timeout_ms == 0 {
            return Err(ShellError::ConfigInvalid {
                message: "Probe interval and connect timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ShellError::ConfigInvalid {
                message: "Shutdown timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.logging.retention_count == 0 {
            return Err(ShellError::ConfigInvalid {
                message: "Log retention must keep at least one file".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}
