//! Reduction of per-level partial updates into one reconciled state.
//!
//! Each entry keeps the level it was observed at, so that merging is associative: whichever way a
//! sequence of updates is grouped, every address ends up with its record from the highest level,
//! with equal levels settled by the configured [`TieBreak`].

use std::collections::BTreeMap;

use registry_primitives::{Address, Level, LevelUpdate, RawRecord, Snapshot, TieBreak};

/// A record together with the level it was observed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedRecord {
    pub level: Level,
    pub record: RawRecord,
}

/// The result of merging one or more level updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedUpdate {
    level: Level,
    entries: BTreeMap<Address, StampedRecord>,
}

impl MergedUpdate {
    /// Highest level among the merged updates.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn entries(&self) -> &BTreeMap<Address, StampedRecord> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the per-entry levels.
    pub fn into_snapshot(self) -> Snapshot {
        self.entries
            .into_iter()
            .map(|(address, stamped)| (address, stamped.record))
            .collect()
    }
}

impl From<LevelUpdate> for MergedUpdate {
    fn from(update: LevelUpdate) -> Self {
        let (level, entries) = update.into_parts();
        Self {
            level,
            entries: entries
                .into_iter()
                .map(|(address, record)| (address, StampedRecord { level, record }))
                .collect(),
        }
    }
}

/// Merges partial updates, latest level first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReducer {
    tie_break: TieBreak,
}

impl UpdateReducer {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> &TieBreak {
        &self.tie_break
    }

    fn pick(&self, left: StampedRecord, right: StampedRecord) -> StampedRecord {
        if left.level != right.level {
            return if left.level > right.level { left } else { right };
        }
        if self.tie_break.prefers_right(&left.record, &right.record) {
            right
        } else {
            left
        }
    }

    /// Merges two updates. `a` is the left (earlier folded) operand for tie-breaking.
    pub fn merge(&self, a: impl Into<MergedUpdate>, b: impl Into<MergedUpdate>) -> MergedUpdate {
        let a = a.into();
        let b = b.into();

        let mut entries = a.entries;
        for (address, right) in b.entries {
            let merged = match entries.remove(&address) {
                Some(left) => self.pick(left, right),
                None => right,
            };
            entries.insert(address, merged);
        }

        MergedUpdate {
            level: a.level.max(b.level),
            entries,
        }
    }

    /// Left fold of [`Self::merge`]. Returns `None` for an empty input.
    pub fn merge_all(&self, updates: impl IntoIterator<Item = LevelUpdate>) -> Option<MergedUpdate> {
        updates
            .into_iter()
            .map(MergedUpdate::from)
            .reduce(|acc, next| self.merge(acc, next))
    }
}
