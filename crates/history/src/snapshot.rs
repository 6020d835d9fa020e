//! Point-in-time lookups of registry entries.

use registry_codec::{decode, display_name};
use registry_common::fanout::Fanout;
use registry_primitives::{Address, RawRecord, Snapshot};
use registry_rpc::{BlockRef, RegistryRpc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::HistoryError;

/// How records are presented to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// As stored, minus bookkeeping fields.
    Raw,
    /// Human-readable form.
    #[default]
    Decoded,
}

/// Brings raw records into the form requested by a [`RecordMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    mode: RecordMode,
    bookkeeping_fields: Vec<String>,
}

impl Normalizer {
    pub fn new(mode: RecordMode, bookkeeping_fields: Vec<String>) -> Self {
        Self {
            mode,
            bookkeeping_fields,
        }
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    /// Strips bookkeeping fields, then decodes in [`RecordMode::Decoded`].
    pub fn normalize(&self, mut record: RawRecord) -> Result<RawRecord, HistoryError> {
        for field in &self.bookkeeping_fields {
            record.remove(field);
        }
        match self.mode {
            RecordMode::Raw => Ok(record),
            RecordMode::Decoded => Ok(decode(&record)?),
        }
    }
}

/// Name shown for a baker in change logs: its decoded `bakerName`, or its address.
pub fn baker_label(address: &Address, raw: &RawRecord) -> String {
    display_name(raw).unwrap_or_else(|| address.to_string())
}

/// Looks up registry entries for a set of addresses at one block.
#[derive(Debug)]
pub struct SnapshotService<'a, R: ?Sized> {
    rpc: &'a R,
    fanout: Fanout,
    normalizer: &'a Normalizer,
}

impl<'a, R: RegistryRpc + ?Sized> SnapshotService<'a, R> {
    pub fn new(rpc: &'a R, fanout: Fanout, normalizer: &'a Normalizer) -> Self {
        Self {
            rpc,
            fanout,
            normalizer,
        }
    }

    /// Fetches and normalizes the entries of `addresses` at `block`.
    ///
    /// Addresses without an entry are left out. Any failed lookup fails the whole snapshot.
    pub async fn snapshot(
        &self,
        addresses: impl IntoIterator<Item = Address>,
        block: BlockRef,
    ) -> Result<Snapshot, HistoryError> {
        let rpc = self.rpc;
        let found = self
            .fanout
            .try_join(addresses, |address| async move {
                let record = rpc.get_record(&address, block).await?;
                Ok::<_, HistoryError>((address, record))
            })
            .await?;

        let requested = found.len();
        let snapshot = found
            .into_iter()
            .filter_map(|(address, record)| record.map(|r| (address, r)))
            .map(|(address, record)| Ok((address, self.normalizer.normalize(record)?)))
            .collect::<Result<Snapshot, HistoryError>>()?;

        debug!(%block, requested, found = snapshot.len(), "took registry snapshot");
        Ok(snapshot)
    }
}
