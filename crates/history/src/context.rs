use std::{collections::BTreeSet, fmt, sync::Arc, time::Duration};

use registry_common::fanout::Fanout;
use registry_config::Config;
use registry_indexer::UpdateSource;
use registry_primitives::{Address, Level, LevelUpdate, RawRecord, Snapshot};
use registry_rpc::{BlockRef, RegistryRpc};
use tracing::{debug, info};

use crate::{
    BlockDiffFetcher, HistoryError, HistoryWindow, Normalizer, RecordMode, Since,
    SnapshotService, UpdateReducer, WindowFilter,
};

/// Tunables of the history pipeline.
#[derive(Debug, Clone)]
pub struct HistorySettings {
    pub registry: Address,
    pub window: WindowFilter,
    pub recent_cycles: u64,
    pub reducer: UpdateReducer,
    pub bookkeeping_fields: Vec<String>,
    pub block_fanout: Fanout,
    pub lookup_fanout: Fanout,
}

impl HistorySettings {
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_millis(config.fetch.request_timeout_ms);
        Self {
            registry: config.registry.address.clone(),
            window: WindowFilter::new(config.registry.blocks_per_cycle),
            recent_cycles: config.registry.recent_cycles,
            reducer: UpdateReducer::new(config.registry.tie_break.clone()),
            bookkeeping_fields: config.registry.bookkeeping_fields.clone(),
            block_fanout: Fanout::new(config.fetch.block_workers, timeout),
            lookup_fanout: Fanout::new(config.fetch.lookup_workers, timeout),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Entry point to the registry history: snapshots, the merged registry state and change logs.
pub struct RegistryHistory {
    rpc: Arc<dyn RegistryRpc>,
    source: Arc<dyn UpdateSource>,
    settings: HistorySettings,
}

impl fmt::Debug for RegistryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHistory")
            .field("source", &self.source)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RegistryHistory {
    pub fn new(
        rpc: Arc<dyn RegistryRpc>,
        source: Arc<dyn UpdateSource>,
        settings: HistorySettings,
    ) -> Self {
        Self {
            rpc,
            source,
            settings,
        }
    }

    pub fn settings(&self) -> &HistorySettings {
        &self.settings
    }

    pub(crate) fn normalizer(&self, mode: RecordMode) -> Normalizer {
        Normalizer::new(mode, self.settings.bookkeeping_fields.clone())
    }

    fn fetcher(&self) -> BlockDiffFetcher<'_, dyn RegistryRpc> {
        BlockDiffFetcher::new(self.rpc.as_ref(), self.settings.block_fanout)
    }

    pub(crate) fn snapshot_service<'a>(
        &'a self,
        normalizer: &'a Normalizer,
    ) -> SnapshotService<'a, dyn RegistryRpc> {
        SnapshotService::new(self.rpc.as_ref(), self.settings.lookup_fanout, normalizer)
    }

    /// Resolves a window to its level floor. [`HistoryWindow::Recent`] asks the node for the
    /// current cycle.
    pub async fn resolve_window(&self, window: HistoryWindow) -> Result<Option<Level>, HistoryError> {
        let since = match window {
            HistoryWindow::Full => None,
            HistoryWindow::Since(since) => Some(since),
            HistoryWindow::Recent => {
                let head_cycle = self.rpc.head_cycle().await?;
                Some(Since::Cycle(
                    head_cycle.saturating_sub(self.settings.recent_cycles),
                ))
            }
        };
        let floor = self.settings.window.resolve(since);
        debug!(?window, ?floor, "resolved history window");
        Ok(floor)
    }

    /// Discovers the levels above `floor` that touched the registry and fetches their updates,
    /// in ascending level order.
    pub async fn updates(&self, floor: Option<Level>) -> Result<Vec<LevelUpdate>, HistoryError> {
        let discovered = self.source.discover(&self.settings.registry).await?;
        let levels = self.settings.window.filter(discovered, floor);
        info!(
            source = self.source.name(),
            ?floor,
            levels = levels.len(),
            "fetching registry updates"
        );
        self.fetcher().fetch_levels(levels).await
    }

    /// Looks up the entries of `addresses` at `block`.
    pub async fn snapshot(
        &self,
        addresses: impl IntoIterator<Item = Address>,
        block: BlockRef,
        mode: RecordMode,
    ) -> Result<Snapshot, HistoryError> {
        let normalizer = self.normalizer(mode);
        self.snapshot_service(&normalizer)
            .snapshot(addresses, block)
            .await
    }

    /// Looks up a single baker's entry.
    pub async fn get_baker(
        &self,
        address: &Address,
        mode: RecordMode,
        block: BlockRef,
    ) -> Result<Option<RawRecord>, HistoryError> {
        let mut snapshot = self.snapshot([address.clone()], block, mode).await?;
        Ok(snapshot.remove(address))
    }

    /// Reconstructs every entry the indexer knows about by merging all discovered updates.
    pub async fn all_bakers(&self, mode: RecordMode) -> Result<Snapshot, HistoryError> {
        let updates = self.updates(None).await?;
        let Some(merged) = self.settings.reducer.merge_all(updates) else {
            return Ok(Snapshot::new());
        };
        info!(level = merged.level(), bakers = merged.len(), "merged registry updates");

        let normalizer = self.normalizer(mode);
        merged
            .into_snapshot()
            .into_iter()
            .map(|(address, record)| Ok((address, normalizer.normalize(record)?)))
            .collect()
    }
}

/// Every address touched by any of `updates`.
pub(crate) fn touched_addresses(updates: &[LevelUpdate]) -> BTreeSet<Address> {
    updates
        .iter()
        .flat_map(|u| u.addresses().cloned())
        .collect()
}
