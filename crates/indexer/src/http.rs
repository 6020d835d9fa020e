use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::IndexerError;

pub(crate) fn client(backend: &'static str, timeout: Duration) -> Result<Client, IndexerError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| IndexerError::network(backend, e))
}

pub(crate) async fn read_json(
    backend: &'static str,
    req: RequestBuilder,
) -> Result<Value, IndexerError> {
    let resp = req.send().await.map_err(|e| {
        if e.is_timeout() {
            IndexerError::Timeout
        } else {
            IndexerError::network(backend, e)
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(IndexerError::Status {
            backend,
            status: status.as_u16(),
        });
    }

    resp.json()
        .await
        .map_err(|e| IndexerError::malformed(backend, e.to_string()))
}

/// Reads a level out of a JSON value, accepting numeric strings.
pub(crate) fn level_of(backend: &'static str, value: &Value) -> Result<u64, IndexerError> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| IndexerError::malformed(backend, format!("not a level: {value}")))
}
