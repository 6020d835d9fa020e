use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Address, Level};

/// A registry record exactly as the contract stores it, field name to value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// All the registry entries touched by one block. May be empty.
pub type PartialUpdate = BTreeMap<Address, RawRecord>;

/// Reconciled registry state at some point in time.
///
/// Being a map, a snapshot can never hold two records for the same address.
pub type Snapshot = BTreeMap<Address, RawRecord>;

/// The partial update observed at a given level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpdate {
    level: Level,
    entries: PartialUpdate,
}

impl LevelUpdate {
    pub fn new(level: Level, entries: PartialUpdate) -> Self {
        Self { level, entries }
    }

    pub fn empty(level: Level) -> Self {
        Self::new(level, PartialUpdate::new())
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn entries(&self) -> &PartialUpdate {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }

    pub fn into_parts(self) -> (Level, PartialUpdate) {
        (self.level, self.entries)
    }

    pub fn into_entries(self) -> PartialUpdate {
        self.entries
    }
}
