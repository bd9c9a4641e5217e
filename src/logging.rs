use anyhow::{Context, Result};
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

use crate::config::Config;

/// Initialize logging for the dashboard.
///
/// Everything goes to rotated files; only errors reach stderr
/// so the live view stays readable.
pub fn init_logging(config: &Config) -> Result<LoggerHandle> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;

    let handle = Logger::try_with_str(&config.log_level)
        .with_context(|| format!("Invalid log level {:?}", config.log_level))?
        .log_to_file(
            FileSpec::default()
                .directory(&config.log_dir)
                .basename("fleetwatch")
                .suffix("log"),
        )
        .rotate(
            Criterion::Size(5_000_000),
            Naming::Numbers,
            Cleanup::KeepLogFiles(10),
        )
        .duplicate_to_stderr(Duplicate::Error)
        .start()
        .context("Failed to start logger")?;

    Ok(handle)
}
