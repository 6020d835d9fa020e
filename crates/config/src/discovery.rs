use registry_primitives::constants::DEFAULT_ROW_LIMIT;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default value for `url` of the tzkt backend.
const DEFAULT_TZKT_URL: &str = "https://api.tzkt.io";

/// Default value for `network` of the conseil backend.
const DEFAULT_CONSEIL_NETWORK: &str = "mainnet";

/// One indexer backend able to list the levels an address was touched at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum IndexerConfig {
    /// Paged account operations endpoint.
    Tzkt {
        url: String,
        #[serde(default = "default_row_limit")]
        row_limit: usize,
    },

    /// Tabular operations query endpoint.
    Tzstats {
        url: String,
        #[serde(default = "default_row_limit")]
        row_limit: usize,
    },

    /// Structured query service.
    Conseil {
        url: String,
        #[serde(default = "default_conseil_network")]
        network: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        #[serde(default = "default_row_limit")]
        row_limit: usize,
    },
}

impl IndexerConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Tzkt { .. } => "tzkt",
            Self::Tzstats { .. } => "tzstats",
            Self::Conseil { .. } => "conseil",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Tzkt { url, .. } | Self::Tzstats { url, .. } | Self::Conseil { url, .. } => url,
        }
    }

    pub fn row_limit(&self) -> usize {
        match self {
            Self::Tzkt { row_limit, .. }
            | Self::Tzstats { row_limit, .. }
            | Self::Conseil { row_limit, .. } => *row_limit,
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self::Tzkt {
            url: DEFAULT_TZKT_URL.to_owned(),
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

fn default_row_limit() -> usize {
    DEFAULT_ROW_LIMIT
}

fn default_conseil_network() -> String {
    DEFAULT_CONSEIL_NETWORK.to_owned()
}

fn default_indexers() -> Vec<IndexerConfig> {
    vec![IndexerConfig::default()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Indexers to query. Only the first is used unless `cross_validate` is set.
    #[serde(default = "default_indexers")]
    pub indexers: Vec<IndexerConfig>,

    /// Query every indexer and require them to agree on the level set.
    #[serde(default)]
    pub cross_validate: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            indexers: default_indexers(),
            cross_validate: false,
        }
    }
}

impl DiscoveryConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.indexers.is_empty() {
            return Err(ConfigError::Invalid(
                "discovery.indexers must list at least one backend".into(),
            ));
        }

        if let Some(idx) = self.indexers.iter().find(|i| i.row_limit() == 0) {
            return Err(ConfigError::Invalid(format!(
                "row_limit of the {} indexer must be positive",
                idx.backend_name()
            )));
        }

        Ok(())
    }
}
