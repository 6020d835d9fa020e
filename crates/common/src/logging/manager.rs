//! Logging initialization and shutdown management.

use std::{io, sync::OnceLock};

use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime::Tokio,
    trace::{Config, TracerProvider as SdkTracerProvider},
};
use tracing::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    filter::Directive, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::types::LoggerConfig;

/// Global tracer provider for proper shutdown
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Crates whose INFO output is noise for a command line tool.
const QUIET_CRATES: [&str; 3] = ["hyper=warn", "reqwest=warn", "h2=warn"];

fn build_filter() -> EnvFilter {
    let mut filt = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    for directive in QUIET_CRATES {
        if let Ok(d) = directive.parse::<Directive>() {
            filt = filt.add_directive(d);
        }
    }
    filt
}

/// Initializes the logging subsystem with the provided config.
///
/// Must be called from within a tokio runtime if an OTLP endpoint is configured.
pub fn init(config: LoggerConfig) {
    let filt = build_filter();

    let stderr_sub = if config.stdout_config.json_format {
        layer()
            .json()
            .with_writer(io::stderr)
            .with_filter(filt.clone())
            .boxed()
    } else {
        layer()
            .compact()
            .with_writer(io::stderr)
            .with_ansi(config.stdout_config.ansi)
            .with_filter(filt.clone())
            .boxed()
    };

    let file_layer = config.file_logging_config.as_ref().map(|file_config| {
        let file_appender = RollingFileAppender::new(
            file_config.rotation.clone(),
            &file_config.directory,
            &file_config.file_name_prefix,
        );

        if file_config.json_format {
            layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(filt.clone())
                .boxed()
        } else {
            layer()
                .compact()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(filt.clone())
                .boxed()
        }
    });

    let otel_layer = config.otel_url.as_ref().and_then(|otel_url| {
        let trace_config = Config::default().with_resource(config.build_resource());

        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(otel_url)
            .with_timeout(config.otlp_export_config.timeout);

        let tp = match opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(trace_config)
            .install_batch(Tokio)
        {
            Ok(tp) => tp,
            Err(e) => {
                // The subscriber isn't up yet, so this goes straight to stderr.
                eprintln!("logging: failed to set up OTLP exporter at {otel_url}: {e}");
                return None;
            }
        };

        store_tracer_provider(tp.clone());

        let tt = tp.tracer("bakers-registry");
        Some(tracing_opentelemetry::layer().with_tracer(tt))
    });

    tracing_subscriber::registry()
        .with(stderr_sub)
        .with(file_layer)
        .with(otel_layer)
        .init();

    debug!(
        service_name = %config.service_name,
        service_version = ?config.service_version,
        "logging initialized"
    );
}

/// Keeps the provider for [`finalize`]. Only the first provider is kept; returns whether `tp` was.
pub(super) fn store_tracer_provider(tp: SdkTracerProvider) -> bool {
    if TRACER_PROVIDER.set(tp).is_err() {
        error!("tracer provider already set, keeping the first one");
        return false;
    }
    true
}

/// Flushes pending spans and tears down the tracer provider, if one was installed.
pub fn finalize() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            error!(%e, "failed to shut down tracer provider");
        }
    } else {
        trace!("no tracer provider to shut down");
    }

    global::shutdown_tracer_provider();
}
