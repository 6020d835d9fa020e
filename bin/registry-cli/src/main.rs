//! Command line tool to browse the bakers registry and its history.
//!
//! Results go to stdout as JSON, logs to stderr.

use std::{
    io::{self, IsTerminal},
    process,
};

use registry_common::logging::{self, LoggingInitConfig};
use tokio::runtime;

mod args;
mod cmd;

use args::Args;
use cmd::{exec_subc, resolve_config};

const SERVICE_NAME: &str = "bakers-registry";

fn run(args: Args) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(async move {
        logging::init_logging_from_config(LoggingInitConfig {
            service_name: SERVICE_NAME,
            service_version: Some(env!("CARGO_PKG_VERSION")),
            otlp_url: config.logging.otlp_url.as_deref(),
            log_dir: config.logging.log_dir.as_deref(),
            log_file_prefix: config.logging.log_file_prefix.as_deref(),
            json_format: config.logging.json_format,
            ansi: io::stderr().is_terminal(),
        });
        let res = exec_subc(args.subc, &config).await;
        logging::finalize();
        res
    })
}

fn main() {
    let args: Args = argh::from_env();
    if let Err(e) = run(args) {
        eprintln!("ERROR\n{e:?}");
        process::exit(1);
    }
}
