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

const NAME: &str = "tzstats";

/// Reads levels from the tzstats operations table.
#[derive(Debug, Clone)]
pub struct TzstatsSource {
    http: Client,
    url: String,
    row_limit: usize,
}

impl TzstatsSource {
    pub fn new(url: &str, row_limit: usize, timeout: Duration) -> Result<Self, IndexerError> {
        Ok(Self {
            http: client(NAME, timeout)?,
            url: url.trim_end_matches('/').to_owned(),
            row_limit,
        })
    }
}

/// Parses table rows `[[height], ...]`; only the first column is read.
pub fn parse_tzstats(body: &Value) -> Result<BTreeSet<Level>, IndexerError> {
    body.as_array()
        .ok_or_else(|| IndexerError::malformed(NAME, "expected an array of rows"))?
        .iter()
        .map(|row| {
            let height = row
                .as_array()
                .and_then(|cols| cols.first())
                .ok_or_else(|| IndexerError::malformed(NAME, "empty row"))?;
            level_of(NAME, height)
        })
        .collect()
}

#[async_trait]
impl UpdateSource for TzstatsSource {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn discover(&self, address: &Address) -> Result<BTreeSet<Level>, IndexerError> {
        let url = format!("{}/tables/op", self.url);
        let limit = self.row_limit.to_string();
        let req = self.http.get(url).query(&[
            ("receiver", address.as_str()),
            ("limit", limit.as_str()),
            ("columns", "height"),
            ("status", "applied"),
        ]);
        let levels = parse_tzstats(&read_json(NAME, req).await?)?;
        debug!(backend = NAME, %address, count = levels.len(), "discovered update levels");
        Ok(levels)
    }
}
