//! Extraction of the registry entries each block wrote.

use registry_common::fanout::Fanout;
use registry_primitives::{Address, Level, LevelUpdate, PartialUpdate};
use registry_rpc::{AppliedResult, RegistryRpc};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::HistoryError;

/// Reads the per-block partial updates of the registry.
#[derive(Debug)]
pub struct BlockDiffFetcher<'a, R: ?Sized> {
    rpc: &'a R,
    fanout: Fanout,
}

/// Adds the entries of one applied result to `update`. Later writes win.
fn absorb(update: &mut PartialUpdate, result: AppliedResult) {
    match result {
        AppliedResult::BigMapDiff(diff) => update.extend(diff),
        AppliedResult::Storage(slots) => {
            // Only a storage whose first slot is the address to record mapping is usable.
            let Some(Value::Object(mapping)) = slots.into_iter().next() else {
                trace!("storage result without an inline registry mapping");
                return;
            };
            for (address, record) in mapping {
                if let Value::Object(record) = record {
                    update.insert(Address::new(address), record);
                }
            }
        }
    }
}

impl<'a, R: RegistryRpc + ?Sized> BlockDiffFetcher<'a, R> {
    pub fn new(rpc: &'a R, fanout: Fanout) -> Self {
        Self { rpc, fanout }
    }

    /// Collects every registry entry written by the manager operations of the block at `level`.
    ///
    /// Operations that are unrelated to the registry, were not applied, or whose receipts cannot be
    /// decoded are skipped. Failing to list the block's operations or to reach the node while
    /// reading a result is an error.
    pub async fn fetch_level(&self, level: Level) -> Result<LevelUpdate, HistoryError> {
        let ops = self.rpc.manager_operations(level).await?;

        let mut update = PartialUpdate::new();
        for op in &ops {
            match self.rpc.operation_result(op).await {
                Ok(results) => {
                    for result in results {
                        absorb(&mut update, result);
                    }
                }
                Err(err) if err.is_operation_local() => {
                    trace!(%level, op = ?op.hash, %err, "skipping operation");
                }
                Err(err) => {
                    warn!(%level, op = ?op.hash, %err, "failed to read operation result");
                    return Err(err.into());
                }
            }
        }

        debug!(%level, operations = ops.len(), entries = update.len(), "fetched block diff");
        Ok(LevelUpdate::new(level, update))
    }

    /// Fetches many levels concurrently. The result is sorted by ascending level.
    pub async fn fetch_levels(
        &self,
        levels: impl IntoIterator<Item = Level>,
    ) -> Result<Vec<LevelUpdate>, HistoryError> {
        let mut updates = self
            .fanout
            .try_join(levels, |level| self.fetch_level(level))
            .await?;
        updates.sort_by_key(LevelUpdate::level);
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::eq;
    use registry_primitives::RawRecord;
    use registry_rpc::{MockRegistryRpc, Operation, RpcError};
    use serde_json::json;

    use super::*;

    fn rec(v: Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    fn op(hash: &str) -> Operation {
        Operation {
            hash: Some(hash.to_owned()),
            contents: vec![],
        }
    }

    fn diff(entries: &[(&str, Value)]) -> AppliedResult {
        AppliedResult::BigMapDiff(
            entries
                .iter()
                .map(|(a, v)| (Address::from(*a), rec(v.clone())))
                .collect(),
        )
    }

    fn fanout() -> Fanout {
        Fanout::new(10, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fetch_level_merges_operations_and_skips_failures() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_manager_operations()
            .with(eq(42))
            .returning(|_| Ok(vec![op("oo1"), op("oo2"), op("oo3"), op("oo4"), op("oo5")]));
        rpc.expect_operation_result().returning(|op| {
            match op.hash.as_deref() {
                Some("oo1") => Ok(vec![diff(&[("tz1a", json!({"v": 1}))])]),
                Some("oo2") => Err(RpcError::Unrelated),
                Some("oo3") => Ok(vec![AppliedResult::Storage(vec![
                    json!({ "tz1b": { "v": 2 }, "tz1a": { "v": 3 } }),
                    json!("tz1owner"),
                ])]),
                Some("oo4") => Err(RpcError::NotApplied("failed".into())),
                _ => Err(RpcError::receipt("receipt has neither a diff nor storage")),
            }
        });

        let fetcher = BlockDiffFetcher::new(&rpc, fanout());
        let update = fetcher.fetch_level(42).await.unwrap();

        assert_eq!(update.level(), 42);
        assert_eq!(update.entries().len(), 2);
        assert_eq!(update.entries()[&Address::from("tz1a")]["v"], json!(3));
        assert_eq!(update.entries()[&Address::from("tz1b")]["v"], json!(2));
    }

    #[tokio::test]
    async fn test_storage_without_mapping_is_ignored() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_manager_operations()
            .returning(|_| Ok(vec![op("oo1")]));
        rpc.expect_operation_result()
            .returning(|_| Ok(vec![AppliedResult::Storage(vec![json!(17), json!("tz1owner")])]));

        let fetcher = BlockDiffFetcher::new(&rpc, fanout());
        assert!(fetcher.fetch_level(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_manager_operations()
            .returning(|level| Err(RpcError::BlockNotFound(level)));

        let fetcher = BlockDiffFetcher::new(&rpc, fanout());
        assert!(matches!(
            fetcher.fetch_level(7).await,
            Err(HistoryError::Rpc(RpcError::BlockNotFound(7)))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_aborts_level() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_manager_operations()
            .with(eq(42))
            .returning(|_| Ok(vec![op("oo1"), op("oo2")]));
        rpc.expect_operation_result().returning(|op| match op.hash.as_deref() {
            Some("oo1") => Ok(vec![diff(&[("tz1a", json!({"v": 1}))])]),
            _ => Err(RpcError::network("connection reset")),
        });

        let fetcher = BlockDiffFetcher::new(&rpc, fanout());
        assert!(matches!(
            fetcher.fetch_level(42).await,
            Err(HistoryError::Rpc(RpcError::Network(_)))
        ));
    }

    #[tokio::test]
    async fn test_contract_read_failures_abort_level() {
        let failures: [fn() -> RpcError; 3] = [
            || RpcError::Timeout,
            || RpcError::Status {
                status: 502,
                url: "https://node.example/chains/main/blocks/head/context/contracts/KT1Registry/script".into(),
            },
            || RpcError::malformed("contract KT1Registry has no script"),
        ];
        for failure in failures {
            let mut rpc = MockRegistryRpc::new();
            rpc.expect_manager_operations()
                .returning(|_| Ok(vec![op("oo1")]));
            rpc.expect_operation_result()
                .returning(move |_| Err(failure()));

            let fetcher = BlockDiffFetcher::new(&rpc, fanout());
            let err = fetcher.fetch_level(3).await.unwrap_err();
            assert!(matches!(err, HistoryError::Rpc(_)), "{err:?}");
            assert!(err.to_string().contains(&failure().to_string()), "{err}");
        }
    }

    #[tokio::test]
    async fn test_failed_level_fails_fetch_levels() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_manager_operations()
            .returning(|level| Ok(vec![op(&format!("oo{level}"))]));
        rpc.expect_operation_result().returning(|op| match op.hash.as_deref() {
            Some("oo20") => Err(RpcError::Timeout),
            _ => Ok(vec![]),
        });

        let fetcher = BlockDiffFetcher::new(&rpc, fanout());
        assert!(fetcher.fetch_levels([10, 20, 30]).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_levels_sorted_ascending() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_manager_operations().returning(|_| Ok(vec![]));

        let fetcher = BlockDiffFetcher::new(&rpc, fanout());
        let updates = fetcher.fetch_levels([30, 10, 20]).await.unwrap();
        let levels: Vec<_> = updates.iter().map(LevelUpdate::level).collect();
        assert_eq!(levels, vec![10, 20, 30]);
    }
}
