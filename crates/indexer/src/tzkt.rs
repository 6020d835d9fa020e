use std::{collections::BTreeSet, time::Duration};

use async_trait::async_trait;
use registry_primitives::{Address, Level};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::{
    http::{client, level_of, read_json},
    IndexerError, UpdateSource,
};

const NAME: &str = "tzkt";

/// Reads levels from the tzkt account operations endpoint.
#[derive(Debug, Clone)]
pub struct TzktSource {
    http: Client,
    url: String,
    row_limit: usize,
}

impl TzktSource {
    pub fn new(url: &str, row_limit: usize, timeout: Duration) -> Result<Self, IndexerError> {
        Ok(Self {
            http: client(NAME, timeout)?,
            url: url.trim_end_matches('/').to_owned(),
            row_limit,
        })
    }
}

/// Parses `[{"level": N, ...}, ...]`.
pub fn parse_tzkt(body: &Value) -> Result<BTreeSet<Level>, IndexerError> {
    body.as_array()
        .ok_or_else(|| IndexerError::malformed(NAME, "expected an array of operations"))?
        .iter()
        .map(|op| {
            let level = op
                .get("level")
                .ok_or_else(|| IndexerError::malformed(NAME, "operation without level"))?;
            level_of(NAME, level)
        })
        .collect()
}

#[async_trait]
impl UpdateSource for TzktSource {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn discover(&self, address: &Address) -> Result<BTreeSet<Level>, IndexerError> {
        let url = format!("{}/v1/accounts/{address}/operations", self.url);
        let req = self.http.get(url).query(&[("limit", self.row_limit)]);
        let levels = parse_tzkt(&read_json(NAME, req).await?)?;
        debug!(backend = NAME, %address, count = levels.len(), "discovered update levels");
        Ok(levels)
    }
}
