//! Tracing subscriber setup.

use anyhow::Context;
use jobtrawl_core::LoggingConfig;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. With a log directory configured,
/// output goes to a fresh timestamped file there instead of stderr. Returns
/// the log file path, if any.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let (file_layer, log_path) = match &config.directory {
        Some(dir) => {
            let path = log_file_path(dir, chrono::Local::now());
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let file = std::fs::File::create(&path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().with_target(true).with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(log_path)
}

/// `jobtrawl_<YYYY-MM-DD_HH_MM_SS>.log` inside `dir`.
pub fn log_file_path<Tz>(dir: &Path, now: chrono::DateTime<Tz>) -> PathBuf
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!("jobtrawl_{}.log", now.format("%Y-%m-%d_%H_%M_%S")))
}
