//! A fake node and indexer backed by a map of registry writes per level.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use registry_history::{HistorySettings, RegistryHistory};
use registry_indexer::{IndexerError, UpdateSource};
use registry_primitives::{
    constants::DEFAULT_BLOCKS_PER_CYCLE, Address, Level, PartialUpdate, RawRecord,
};
use registry_rpc::{AppliedResult, BlockRef, Operation, RegistryRpc, RpcError};
use serde_json::Value;

/// Hash of an operation whose result the node refuses to return.
const BROKEN_OP: &str = "broken";

/// Builds a raw record from a JSON object literal.
pub fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("record must be a JSON object, got {other}"),
    }
}

/// Registry writes by level, served both as a node and as an indexer.
#[derive(Debug, Clone, Default)]
pub struct FakeChain {
    writes: BTreeMap<Level, PartialUpdate>,
    /// Levels the indexer reports although the registry was not written.
    noise: BTreeSet<Level>,
    /// Levels carrying an operation whose result cannot be read.
    broken: BTreeSet<Level>,
    head: Level,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the block at `level` wrote `value` as `address`'s entry.
    pub fn write(mut self, level: Level, address: &str, value: Value) -> Self {
        self.writes
            .entry(level)
            .or_default()
            .insert(Address::from(address), record(value));
        self.head = self.head.max(level);
        self
    }

    pub fn noise(mut self, level: Level) -> Self {
        self.noise.insert(level);
        self.head = self.head.max(level);
        self
    }

    pub fn broken_op(mut self, level: Level) -> Self {
        self.broken.insert(level);
        self
    }

    pub fn head(mut self, level: Level) -> Self {
        self.head = level;
        self
    }

    /// Latest entry of `address` at or below `level`.
    pub fn record_at(&self, address: &Address, level: Level) -> Option<RawRecord> {
        self.writes
            .range(..=level)
            .rev()
            .find_map(|(_, update)| update.get(address).cloned())
    }

    fn op_hash(level: Level, address: &Address) -> String {
        format!("{level}/{address}")
    }

    fn parse_hash(hash: &str) -> Option<(Level, Address)> {
        let (level, address) = hash.split_once('/')?;
        Some((level.parse().ok()?, Address::from(address)))
    }
}

#[async_trait]
impl RegistryRpc for FakeChain {
    async fn head_cycle(&self) -> Result<u64, RpcError> {
        Ok(self.head / DEFAULT_BLOCKS_PER_CYCLE)
    }

    async fn get_record(
        &self,
        address: &Address,
        block: BlockRef,
    ) -> Result<Option<RawRecord>, RpcError> {
        let level = match block {
            BlockRef::Head => self.head,
            BlockRef::Level(level) if level > self.head => {
                return Err(RpcError::BlockNotFound(level))
            }
            BlockRef::Level(level) => level,
        };
        Ok(self.record_at(address, level))
    }

    async fn manager_operations(&self, level: Level) -> Result<Vec<Operation>, RpcError> {
        if level > self.head {
            return Err(RpcError::BlockNotFound(level));
        }

        let mut ops: Vec<_> = self
            .writes
            .get(&level)
            .into_iter()
            .flat_map(|update| update.keys())
            .map(|address| Operation {
                hash: Some(Self::op_hash(level, address)),
                contents: Vec::new(),
            })
            .collect();
        if self.broken.contains(&level) {
            ops.push(Operation {
                hash: Some(BROKEN_OP.to_owned()),
                contents: Vec::new(),
            });
        }
        // An unrelated transfer in every block.
        ops.push(Operation {
            hash: None,
            contents: Vec::new(),
        });
        Ok(ops)
    }

    async fn operation_result(&self, op: &Operation) -> Result<Vec<AppliedResult>, RpcError> {
        let hash = op.hash.as_deref().ok_or(RpcError::Unrelated)?;
        if hash == BROKEN_OP {
            return Err(RpcError::NotApplied("backtracked".to_owned()));
        }
        let (level, address) = Self::parse_hash(hash).ok_or(RpcError::Unrelated)?;
        let entry = self
            .writes
            .get(&level)
            .and_then(|update| update.get(&address))
            .cloned()
            .ok_or(RpcError::Unrelated)?;
        Ok(vec![AppliedResult::BigMapDiff(PartialUpdate::from([(
            address, entry,
        )]))])
    }
}

#[async_trait]
impl UpdateSource for FakeChain {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn discover(&self, _address: &Address) -> Result<BTreeSet<Level>, IndexerError> {
        Ok(self.writes.keys().chain(&self.noise).copied().collect())
    }
}

/// A [`RegistryHistory`] reading from `chain` with default settings.
pub fn history_over(chain: FakeChain) -> RegistryHistory {
    let chain = Arc::new(chain);
    RegistryHistory::new(chain.clone(), chain, HistorySettings::default())
}
