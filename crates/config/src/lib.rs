//! Configuration for the bakers registry history tool.

mod config;
mod discovery;

use std::{fs, io, path::Path};

pub use config::{Config, FetchConfig, LoggingConfig, RegistryConfig, RpcConfig};
pub use discovery::{DiscoveryConfig, IndexerConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Loads and validates a TOML config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)?;
    parse_config(&raw)
}

/// Parses and validates a TOML config string.
pub fn parse_config(raw: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
