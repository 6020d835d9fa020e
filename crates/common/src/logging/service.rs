//! Logging initialization for binaries.

use std::path::Path;

use tracing::info;

use super::{init, FileLoggingConfig, LoggerConfig};

/// Configuration parameters for logging initialization.
#[derive(Debug)]
pub struct LoggingInitConfig<'a> {
    pub service_name: &'a str,
    pub service_version: Option<&'a str>,
    /// OpenTelemetry OTLP endpoint URL
    pub otlp_url: Option<&'a str>,
    /// Directory for file-based logging
    pub log_dir: Option<&'a Path>,
    /// Prefix for log file names, defaults to the service name
    pub log_file_prefix: Option<&'a str>,
    /// Use JSON format instead of compact
    pub json_format: Option<bool>,
    pub ansi: bool,
}

/// Builds a [`LoggerConfig`] from the flat parameters a binary has at hand.
pub fn logger_config_from(config: &LoggingInitConfig<'_>) -> LoggerConfig {
    let mut lconfig = LoggerConfig::new(config.service_name.to_owned()).with_ansi(config.ansi);

    if let Some(version) = config.service_version {
        lconfig = lconfig.with_service_version(version.to_owned());
    }

    if let Some(url) = config.otlp_url {
        lconfig.set_otlp_url(url.to_owned());
    }

    if let Some(dir) = config.log_dir {
        let prefix = config.log_file_prefix.unwrap_or(config.service_name);
        let file_config = FileLoggingConfig::new(dir.to_path_buf(), prefix.to_owned())
            .with_json_format(config.json_format.unwrap_or(false));
        lconfig = lconfig.with_file_logging(file_config);
    }

    if let Some(json_format) = config.json_format {
        lconfig = lconfig.with_json_logging(json_format);
    }

    lconfig
}

/// Initialize logging from configuration.
pub fn init_logging_from_config(config: LoggingInitConfig<'_>) {
    let lconfig = logger_config_from(&config);
    let file_config = lconfig.file_logging_config.clone();

    init(lconfig);

    if let Some(url) = config.otlp_url {
        info!(%url, "using OpenTelemetry tracing output");
    }
    if let Some(file_config) = file_config {
        info!(
            log_dir = %file_config.directory.display(),
            log_prefix = %file_config.file_name_prefix,
            "file logging enabled"
        );
    }
}
