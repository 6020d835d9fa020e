use std::{collections::BTreeSet, time::Duration};

use async_trait::async_trait;
use registry_primitives::{Address, Level};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    http::{client, level_of, read_json},
    IndexerError, UpdateSource,
};

const NAME: &str = "conseil";

/// Reads levels from a Conseil operations query: every applied call to the address plus the
/// level of its origination.
#[derive(Debug, Clone)]
pub struct ConseilSource {
    http: Client,
    url: String,
    network: String,
    api_key: Option<String>,
    row_limit: usize,
}

impl ConseilSource {
    pub fn new(
        url: &str,
        network: &str,
        api_key: Option<String>,
        row_limit: usize,
        timeout: Duration,
    ) -> Result<Self, IndexerError> {
        Ok(Self {
            http: client(NAME, timeout)?,
            url: url.trim_end_matches('/').to_owned(),
            network: network.to_owned(),
            api_key,
            row_limit,
        })
    }

    async fn query(&self, body: &Value) -> Result<BTreeSet<Level>, IndexerError> {
        let url = format!("{}/v2/data/tezos/{}/operations", self.url, self.network);
        let mut req = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("apiKey", key);
        }
        parse_conseil(&read_json(NAME, req).await?)
    }
}

/// Builds a query for the block levels of applied operations where `field` equals `address`.
pub fn conseil_query(field: &str, address: &Address, limit: usize) -> Value {
    json!({
        "fields": ["block_level"],
        "predicates": [
            { "field": field, "operation": "eq", "set": [address.as_str()], "inverse": false },
            { "field": "status", "operation": "eq", "set": ["applied"], "inverse": false }
        ],
        "limit": limit
    })
}

/// Parses `[{"block_level": N}, ...]`.
pub fn parse_conseil(body: &Value) -> Result<BTreeSet<Level>, IndexerError> {
    body.as_array()
        .ok_or_else(|| IndexerError::malformed(NAME, "expected an array of rows"))?
        .iter()
        .map(|row| {
            let level = row
                .get("block_level")
                .ok_or_else(|| IndexerError::malformed(NAME, "row without block_level"))?;
            level_of(NAME, level)
        })
        .collect()
}

#[async_trait]
impl UpdateSource for ConseilSource {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn discover(&self, address: &Address) -> Result<BTreeSet<Level>, IndexerError> {
        let calls = conseil_query("destination", address, self.row_limit);
        let origination = conseil_query("originated_contracts", address, 1);

        let (mut levels, origin) = tokio::try_join!(self.query(&calls), self.query(&origination))?;
        levels.extend(origin);

        debug!(backend = NAME, %address, count = levels.len(), "discovered update levels");
        Ok(levels)
    }
}
