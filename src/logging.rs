//! Diagnostic logging to stderr.
//!
//! The installer's summary goes to stdout; `log` records go to stderr so the
//! two never interleave in captured output.

use anyhow::{anyhow, bail, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

pub const DEFAULT_LOG_LEVEL: &str = "warn";

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        other => bail!(
            "invalid log level '{}'; expected one of: off, error, warn, info, debug, trace",
            other
        ),
    }
}

/// Install the terminal logger. Fails if a logger is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    let level = parse_level(level)?;
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)
        .map_err(|err| anyhow!("failed to initialize terminal logging: {err}"))
}
