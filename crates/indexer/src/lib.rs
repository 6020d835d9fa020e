//! Discovery of the block levels at which the registry was updated, using public indexers.

mod conseil;
mod cross_validate;
mod errors;
mod http;
mod source;
mod tzkt;
mod tzstats;

use std::time::Duration;

pub use conseil::{conseil_query, parse_conseil, ConseilSource};
pub use cross_validate::CrossValidatedSource;
pub use errors::IndexerError;
use registry_common::fanout::Fanout;
use registry_config::{DiscoveryConfig, FetchConfig, IndexerConfig};
#[cfg(feature = "test-utils")]
pub use source::MockUpdateSource;
pub use source::UpdateSource;
use tracing::info;
pub use tzkt::{parse_tzkt, TzktSource};
pub use tzstats::{parse_tzstats, TzstatsSource};

/// Builds one backend from its configuration.
pub fn build_backend(
    config: &IndexerConfig,
    timeout: Duration,
) -> Result<Box<dyn UpdateSource>, IndexerError> {
    let source: Box<dyn UpdateSource> = match config {
        IndexerConfig::Tzkt { url, row_limit } => {
            Box::new(TzktSource::new(url, *row_limit, timeout)?)
        }
        IndexerConfig::Tzstats { url, row_limit } => {
            Box::new(TzstatsSource::new(url, *row_limit, timeout)?)
        }
        IndexerConfig::Conseil {
            url,
            network,
            api_key,
            row_limit,
        } => Box::new(ConseilSource::new(
            url,
            network,
            api_key.clone(),
            *row_limit,
            timeout,
        )?),
    };
    Ok(source)
}

/// Builds the update source selected by configuration.
///
/// With `cross_validate` set and more than one backend listed, every backend is queried and they
/// must agree. Otherwise only the first backend is used.
pub fn build_source(
    discovery: &DiscoveryConfig,
    fetch: &FetchConfig,
) -> Result<Box<dyn UpdateSource>, IndexerError> {
    let timeout = Duration::from_millis(fetch.request_timeout_ms);

    if discovery.cross_validate && discovery.indexers.len() > 1 {
        let backends = discovery
            .indexers
            .iter()
            .map(|cfg| build_backend(cfg, timeout))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            backends = ?discovery.indexers.iter().map(IndexerConfig::backend_name).collect::<Vec<_>>(),
            "cross-validating update levels"
        );
        let fanout = Fanout::new(fetch.validation_workers, timeout);
        return Ok(Box::new(CrossValidatedSource::new(backends, fanout)?));
    }

    let first = discovery.indexers.first().ok_or(IndexerError::NoBackends)?;
    build_backend(first, timeout)
}
