use std::collections::BTreeSet;

use async_trait::async_trait;
use registry_common::fanout::Fanout;
use registry_primitives::{Address, Level};
use tracing::{debug, warn};

use crate::{IndexerError, UpdateSource};

/// Queries several backends concurrently and only succeeds when they all return the same levels.
#[derive(Debug)]
pub struct CrossValidatedSource {
    sources: Vec<Box<dyn UpdateSource>>,
    fanout: Fanout,
}

impl CrossValidatedSource {
    pub fn new(sources: Vec<Box<dyn UpdateSource>>, fanout: Fanout) -> Result<Self, IndexerError> {
        if sources.is_empty() {
            return Err(IndexerError::NoBackends);
        }
        Ok(Self { sources, fanout })
    }
}

#[async_trait]
impl UpdateSource for CrossValidatedSource {
    fn name(&self) -> &'static str {
        "cross-validated"
    }

    async fn discover(&self, address: &Address) -> Result<BTreeSet<Level>, IndexerError> {
        let results = self
            .fanout
            .try_join(&self.sources, |source| source.discover(address))
            .await?;

        let mut named = self.sources.iter().map(|s| s.name()).zip(results);
        let Some((reference_name, reference)) = named.next() else {
            return Err(IndexerError::NoBackends);
        };

        for (name, levels) in named {
            if levels != reference {
                let only_left: Vec<_> = reference.difference(&levels).copied().collect();
                let only_right: Vec<_> = levels.difference(&reference).copied().collect();
                warn!(
                    left = reference_name,
                    right = name,
                    ?only_left,
                    ?only_right,
                    "indexers disagree"
                );
                return Err(IndexerError::Mismatch {
                    left: reference_name,
                    right: name,
                    only_left,
                    only_right,
                });
            }
        }

        debug!(%address, backends = self.sources.len(), count = reference.len(), "indexers agree");
        Ok(reference)
    }
}
