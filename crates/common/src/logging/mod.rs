//! Logging subsystem with optional file and OpenTelemetry output.
//!
//! Everything is written to stderr so that stdout stays reserved for command output.

pub mod manager;
mod service;
pub mod types;


pub use manager::{finalize, init};
pub use service::{init_logging_from_config, logger_config_from, LoggingInitConfig};
pub use types::{FileLoggingConfig, LoggerConfig, OtlpExportConfig, StdoutConfig};

// Re-export tracing-appender types for convenience
pub use tracing_appender::rolling::Rotation;
