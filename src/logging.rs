//! Logging setup
//!
//! Installs a `tracing` subscriber that writes every event both to the log
//! file and to stdout. Each line carries a local timestamp, the level and the
//! structured fields the engine attaches (`op`, `path`, `source`, `error`).

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

use crate::core::LoggingSettings;

/// Environment variable that overrides the configured filter
pub const LOG_ENV_VAR: &str = "REPLICA_SYNC_LOG";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the level filter: `REPLICA_SYNC_LOG` wins over the configured level
pub fn build_env_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid {} value: {}", LOG_ENV_VAR, directives)),
        _ => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("Invalid log level: {}", settings.level)),
    }
}

/// Open the log file for appending, creating missing parent directories
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Initialize the global logging subscriber.
///
/// With a log file, output goes to the file and stdout; without one, to
/// stdout only. Can only succeed once per process.
pub fn init_logging(settings: &LoggingSettings, log_file: Option<&Path>) -> Result<()> {
    if !LoggingSettings::FORMATS.contains(&settings.format.as_str()) {
        bail!(
            "Unknown log format '{}', expected one of: {}",
            settings.format,
            LoggingSettings::FORMATS.join(", ")
        );
    }
    let filter = build_env_filter(settings)?;

    match log_file {
        Some(path) => {
            let file = Mutex::new(open_log_file(path)?);
            install(&settings.format, filter, file.and(std::io::stdout), false)
        }
        None => install(&settings.format, filter, std::io::stdout, true),
    }
}

fn install<W>(format: &str, filter: EnvFilter, writer: W, ansi: bool) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(true)
        .with_writer(writer);

    let installed = if format == "json" {
        builder.json().try_init()
    } else {
        builder.with_ansi(ansi).try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}
