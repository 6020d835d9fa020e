use std::time::Duration;

use async_trait::async_trait;
use registry_primitives::{Address, Level, RawRecord};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::{
    micheline::RegistrySchema, operations::extract_results, AppliedResult, BlockRef, Operation,
    RegistryRpc, RpcError,
};

/// Validation pass of the block operations list holding manager operations.
const MANAGER_PASS: u32 = 3;

/// [`RegistryRpc`] over a Tezos node's HTTP RPC.
///
/// The contract's storage type is fetched on first use and cached for the client's lifetime.
#[derive(Debug)]
pub struct TezosRpcClient {
    http: reqwest::Client,
    base_url: String,
    registry: Address,
    schema: OnceCell<RegistrySchema>,
}

impl TezosRpcClient {
    pub fn new(
        base_url: &str,
        registry: Address,
        request_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            registry,
            schema: OnceCell::new(),
        })
    }

    /// Uses a known schema instead of fetching the contract script.
    pub fn with_schema(mut self, schema: RegistrySchema) -> Self {
        self.schema = OnceCell::new_with(Some(schema));
        self
    }

    pub fn registry(&self) -> &Address {
        &self.registry
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends a request and reads a JSON body. A 404 is `Ok(None)`.
    async fn read_json(&self, req: RequestBuilder, url: &str) -> Result<Option<Value>, RpcError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(Some(resp.json().await?))
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, RpcError> {
        let url = self.url(path);
        trace!(%url, "GET");
        self.read_json(self.http.get(&url), &url).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Option<Value>, RpcError> {
        let url = self.url(path);
        trace!(%url, "POST");
        self.read_json(self.http.post(&url).json(body), &url).await
    }

    /// Returns the registry's schema, fetching the contract script the first time.
    pub async fn schema(&self) -> Result<&RegistrySchema, RpcError> {
        self.schema
            .get_or_try_init(|| async {
                let path = format!(
                    "chains/main/blocks/head/context/contracts/{}/script",
                    self.registry
                );
                let script = self.get(&path).await?.ok_or_else(|| {
                    RpcError::malformed(format!("contract {} has no script", self.registry))
                })?;
                debug!(registry = %self.registry, "loaded registry schema");
                Ok::<_, RpcError>(RegistrySchema::from_script(&script)?)
            })
            .await
    }
}

/// Reads the cycle out of a block metadata response, old or new layout.
pub fn parse_head_cycle(metadata: &Value) -> Result<u64, RpcError> {
    metadata
        .pointer("/level_info/cycle")
        .or_else(|| metadata.pointer("/level/cycle"))
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::malformed("block metadata has no cycle"))
}

#[async_trait]
impl RegistryRpc for TezosRpcClient {
    async fn head_cycle(&self) -> Result<u64, RpcError> {
        let metadata = self
            .get("chains/main/blocks/head/metadata")
            .await?
            .ok_or_else(|| RpcError::malformed("head block has no metadata"))?;
        parse_head_cycle(&metadata)
    }

    async fn get_record(
        &self,
        address: &Address,
        block: BlockRef,
    ) -> Result<Option<RawRecord>, RpcError> {
        let schema = self.schema().await?;
        let path = format!(
            "chains/main/blocks/{block}/context/contracts/{}/big_map_get",
            self.registry
        );
        let body = json!({
            "key": { "string": address.as_str() },
            "type": { "prim": "address" },
        });

        match self.post(&path, &body).await? {
            None | Some(Value::Null) => {
                trace!(%address, %block, "no registry entry");
                Ok(None)
            }
            Some(value) => Ok(Some(schema.decode_record(&value)?)),
        }
    }

    async fn manager_operations(&self, level: Level) -> Result<Vec<Operation>, RpcError> {
        let path = format!("chains/main/blocks/{level}/operations/{MANAGER_PASS}");
        let listing = self
            .get(&path)
            .await?
            .ok_or(RpcError::BlockNotFound(level))?;
        let ops: Vec<Operation> =
            serde_json::from_value(listing).map_err(|e| RpcError::malformed(e.to_string()))?;
        debug!(%level, count = ops.len(), "fetched manager operations");
        Ok(ops)
    }

    async fn operation_result(&self, op: &Operation) -> Result<Vec<AppliedResult>, RpcError> {
        let schema = self.schema().await?;
        extract_results(schema, &self.registry, op)
    }
}
