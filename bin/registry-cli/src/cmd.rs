//! Subcommand implementations.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use registry_codec::{template, DisplayRecord};
use registry_config::{load_config, Config};
use registry_history::{HistorySettings, HistoryWindow, RecordMode, RegistryHistory};
use registry_indexer::build_source;
use registry_primitives::Address;
use registry_rpc::{BlockRef, TezosRpcClient};
use serde::Serialize;
use tracing::debug;

use crate::args::{Args, SubcAll, SubcGet, SubcLog, SubcPlan, Subcommand};

/// Loads the configuration named on the command line, applying overrides.
pub(crate) fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(url) = &args.rpc_url {
        config.rpc.url = url.clone();
    }
    Ok(config)
}

fn open_history(config: &Config) -> anyhow::Result<RegistryHistory> {
    let timeout = Duration::from_millis(config.fetch.request_timeout_ms);
    let rpc = TezosRpcClient::new(&config.rpc.url, config.registry.address.clone(), timeout)
        .context("failed to set up node client")?;
    let source = build_source(&config.discovery, &config.fetch)
        .context("failed to set up indexer backends")?;
    debug!(rpc = %config.rpc.url, source = source.name(), "opened registry history");

    Ok(RegistryHistory::new(
        Arc::new(rpc),
        Arc::from(source),
        HistorySettings::from_config(config),
    ))
}

fn mode(raw: bool) -> RecordMode {
    if raw {
        RecordMode::Raw
    } else {
        RecordMode::Decoded
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

pub(crate) async fn exec_subc(subc: Subcommand, config: &Config) -> anyhow::Result<()> {
    match subc {
        Subcommand::Log(subc) => exec_log(subc, config).await,
        Subcommand::Get(subc) => exec_get(subc, config).await,
        Subcommand::All(subc) => exec_all(subc, config).await,
        Subcommand::New(_) => print_json(&template()),
        Subcommand::Plan(subc) => exec_plan(subc, config).await,
    }
}

async fn exec_log(subc: SubcLog, config: &Config) -> anyhow::Result<()> {
    let window = match (subc.full, subc.since) {
        (true, _) => HistoryWindow::Full,
        (false, Some(since)) => HistoryWindow::Since(since),
        (false, None) => HistoryWindow::Recent,
    };
    let log = open_history(config)?
        .build_log(window, mode(subc.raw))
        .await
        .context("failed to build change log")?;
    print_json(&log)
}

async fn exec_get(subc: SubcGet, config: &Config) -> anyhow::Result<()> {
    let address = Address::new(subc.baker);
    let record = open_history(config)?
        .get_baker(&address, mode(subc.raw), BlockRef::from(subc.level))
        .await
        .with_context(|| format!("failed to look up {address}"))?;
    match record {
        Some(record) => print_json(&record),
        None => anyhow::bail!("{address} is not in the registry"),
    }
}

async fn exec_all(subc: SubcAll, config: &Config) -> anyhow::Result<()> {
    let bakers = open_history(config)?
        .all_bakers(mode(subc.raw))
        .await
        .context("failed to reconstruct registry")?;
    print_json(&bakers)
}

fn read_input(path: &Path) -> anyhow::Result<DisplayRecord> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON object", path.display()))
}

async fn exec_plan(subc: SubcPlan, config: &Config) -> anyhow::Result<()> {
    let input = read_input(&subc.input)?;
    let plan = open_history(config)?
        .plan_upsert(Address::new(subc.baker), &input)
        .await
        .context("failed to plan registry write")?;
    print_json(&plan)
}
