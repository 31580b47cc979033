//! Logging setup for debugging and error tracking.
//!
//! Installs a fern dispatcher behind the `log` facade. The engine logs
//! through `info!`/`warn!`/`error!` macros everywhere; whether those land
//! in a file, on stderr, or nowhere is decided here once at startup.

use anyhow::{Context, Result};
use log::LevelFilter;

use crate::config::LoggingConfig;

/// Initialize the global logger from config.
///
/// A disabled config installs nothing; log macros become no-ops. Must be
/// called at most once per process.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Info)
        .level_for("taskmirror", LevelFilter::Debug);

    let dispatch = match &config.file {
        Some(path) => dispatch.chain(
            fern::log_file(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?,
        ),
        None => dispatch.chain(std::io::stderr()),
    };

    dispatch.apply().context("Failed to install logger")?;
    Ok(())
}
