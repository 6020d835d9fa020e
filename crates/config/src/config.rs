use std::path::PathBuf;

use registry_primitives::{
    constants::{
        DEFAULT_BLOCKS_PER_CYCLE, DEFAULT_BOOKKEEPING_FIELDS, DEFAULT_RECENT_CYCLES,
        DEFAULT_REGISTRY_ADDRESS,
    },
    Address, TieBreak,
};
use serde::{Deserialize, Serialize};

use crate::{discovery::DiscoveryConfig, ConfigError};

/// Default value for `url` in [`RpcConfig`].
const DEFAULT_RPC_URL: &str = "https://mainnet.api.tez.ie";

/// Default per-request timeout in ms.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default number of blocks fetched at once.
const DEFAULT_BLOCK_WORKERS: usize = 10;

/// Default number of concurrent point lookups.
const DEFAULT_LOOKUP_WORKERS: usize = 10;

/// Default number of indexers queried at once when cross-validating.
const DEFAULT_VALIDATION_WORKERS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Address of the registry contract.
    #[serde(default = "default_registry_address")]
    pub address: Address,

    /// Number of levels per cycle, used to resolve `cycle:N` windows.
    #[serde(default = "default_blocks_per_cycle")]
    pub blocks_per_cycle: u64,

    /// How many cycles before the head cycle a change log starts by default.
    #[serde(default = "default_recent_cycles")]
    pub recent_cycles: u64,

    /// Rule for picking between two updates of one address at the same level.
    #[serde(default)]
    pub tie_break: TieBreak,

    /// Fields stripped from raw records.
    #[serde(default = "default_bookkeeping_fields")]
    pub bookkeeping_fields: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: default_registry_address(),
            blocks_per_cycle: default_blocks_per_cycle(),
            recent_cycles: default_recent_cycles(),
            tie_break: TieBreak::default(),
            bookkeeping_fields: default_bookkeeping_fields(),
        }
    }
}

fn default_registry_address() -> Address {
    Address::new(DEFAULT_REGISTRY_ADDRESS)
}

fn default_blocks_per_cycle() -> u64 {
    DEFAULT_BLOCKS_PER_CYCLE
}

fn default_recent_cycles() -> u64 {
    DEFAULT_RECENT_CYCLES
}

fn default_bookkeeping_fields() -> Vec<String> {
    DEFAULT_BOOKKEEPING_FIELDS
        .iter()
        .map(|f| (*f).to_owned())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Tezos node RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub url: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_owned()
}

/// Fan-out widths and timeouts for the network reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_block_workers")]
    pub block_workers: usize,

    #[serde(default = "default_lookup_workers")]
    pub lookup_workers: usize,

    #[serde(default = "default_validation_workers")]
    pub validation_workers: usize,

    /// Timeout applied to every single network call, in ms.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            block_workers: default_block_workers(),
            lookup_workers: default_lookup_workers(),
            validation_workers: default_validation_workers(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_block_workers() -> usize {
    DEFAULT_BLOCK_WORKERS
}

fn default_lookup_workers() -> usize {
    DEFAULT_LOOKUP_WORKERS
}

fn default_validation_workers() -> usize {
    DEFAULT_VALIDATION_WORKERS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// OpenTelemetry OTLP endpoint URL for distributed tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_url: Option<String>,

    /// Directory path for file-based logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,

    /// Use JSON format for logs instead of compact format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_format: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging configuration (optional section in TOML).
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Checks the values serde can't.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.blocks_per_cycle == 0 {
            return Err(ConfigError::Invalid(
                "registry.blocks_per_cycle must be positive".into(),
            ));
        }

        let widths = [
            ("fetch.block_workers", self.fetch.block_workers),
            ("fetch.lookup_workers", self.fetch.lookup_workers),
            ("fetch.validation_workers", self.fetch.validation_workers),
        ];
        if let Some((name, _)) = widths.iter().find(|(_, w)| *w == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be positive")));
        }

        if self.fetch.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "fetch.request_timeout_ms must be positive".into(),
            ));
        }

        self.discovery.validate()
    }
}
