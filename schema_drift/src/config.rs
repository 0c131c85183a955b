//! Configuration handling for schema_drift

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::schema::dialect::{Dialect, DialectProfile};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete schema_drift configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub declared: Option<DeclaredConfig>,
    pub dialect: Option<DialectConfig>,
    #[serde(default)]
    pub comparison: ComparisonConfig,
    pub logging: Option<LoggingConfig>,
    pub output: Option<OutputConfig>,
}

impl Config {
    /// Minimal configuration for a database URL and a declared schema file
    pub fn new(database: DatabaseConfig, declared_path: Option<&str>) -> Self {
        Self {
            database,
            declared: declared_path.map(|path| DeclaredConfig {
                path: path.to_string(),
                default_nullable: None,
            }),
            dialect: None,
            comparison: ComparisonConfig::default(),
            logging: None,
            output: None,
        }
    }

    /// Dialect of the configured database driver
    pub fn dialect(&self) -> Result<Dialect> {
        Dialect::from_driver(&self.database.driver)
    }

    /// Normalization profile: the driver's built-in profile plus `[dialect]` overrides
    pub fn dialect_profile(&self) -> Result<DialectProfile> {
        Ok(DialectProfile::from_config(
            self.dialect()?,
            self.dialect.as_ref(),
        ))
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
            .as_ref()
            .map(|o| o.format)
            .unwrap_or_default()
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub schema: Option<String>,
}

impl DatabaseConfig {
    /// Build a configuration from a connection URL, inferring the driver from its scheme
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| Error::ConfigError(format!("Database URL has no scheme: {}", url)))?;

        let driver = Dialect::from_driver(scheme)?.to_string();

        Ok(Self {
            driver,
            url: url.to_string(),
            pool_size: None,
            timeout_seconds: None,
            schema: None,
        })
    }

    /// Bound on connecting and on a whole introspection run
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }
}

/// Where the declared schema comes from
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeclaredConfig {
    pub path: String,
    pub default_nullable: Option<bool>,
}

/// Overrides of the built-in dialect profile
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DialectConfig {
    pub case_sensitive: Option<bool>,
    pub strip_default_casts: Option<bool>,
    pub type_aliases: Option<HashMap<String, String>>,
}

/// Comparison scope
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ComparisonConfig {
    /// Tables left out of the comparison on both sides, e.g. migration history tables
    #[serde(default)]
    pub ignore_tables: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub console: bool,
    pub include_timestamps: bool,
}

/// Report output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}
