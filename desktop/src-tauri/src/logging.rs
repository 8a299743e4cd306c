//! Logging setup with file rotation.

use crate::server::LoggingSettings;

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging with console and rotating file output.
///
/// # Log Layers
/// - Console: human-readable, colored output
/// - File: daily rotation in the shell data dir, retention from config
pub fn setup_logging(
    data_dir: &Path,
    settings: &LoggingSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_dir = data_dir.join(&settings.directory);
    std::fs::create_dir_all(&logs_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(settings.retention_count as usize)
        .filename_prefix("guilda-desktop")
        .filename_suffix("log")
        .build(&logs_dir)?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
