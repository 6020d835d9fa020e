use std::{collections::BTreeSet, fmt};

use async_trait::async_trait;
use registry_primitives::{Address, Level};

use crate::IndexerError;

/// Lists the block levels at which operations touched an address.
///
/// Backends only return a bounded, recent window of levels (their row limit), never the full
/// history.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait UpdateSource: fmt::Debug + Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Returns the distinct levels at which `address` was involved in an applied operation.
    async fn discover(&self, address: &Address) -> Result<BTreeSet<Level>, IndexerError>;
}
