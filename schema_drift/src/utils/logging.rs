//! Logging utilities for schema_drift
//!
//! Log output goes to stderr or a file; stdout is left for the drift report.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Configuration used when none is supplied
pub fn default_logging(level: &str) -> LoggingConfig {
    LoggingConfig {
        level: level.to_string(),
        file: None,
        format: "text".to_string(),
        console: true,
        include_timestamps: false,
    }
}

/// Parse a configured level name, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level);
    let directive = format!("schema_drift={}", level)
        .parse()
        .map_err(|e| Error::LoggingError(format!("Invalid log directive: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = Mutex::new(File::create(file_path)?);
        let builder = fmt().with_env_filter(env_filter).with_writer(file).with_ansi(false);

        if json {
            install(builder.json().finish())
        } else if config.include_timestamps {
            install(builder.finish())
        } else {
            install(builder.without_time().finish())
        }
    } else if config.console {
        let builder = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

        if json {
            install(builder.json().finish())
        } else if config.include_timestamps {
            install(builder.finish())
        } else {
            install(builder.without_time().finish())
        }
    } else {
        Ok(())
    }
}

fn install<S>(subscriber: S) -> Result<()>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::LoggingError(e.to_string()))
}
