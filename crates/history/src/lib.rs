//! History of the bakers registry.
//!
//! Levels that touched the registry are discovered through an indexer, the entries each of those
//! blocks wrote are read from a node, and the results are either merged into the current state of
//! the registry or diffed one after another into a change log.

mod block_diff;
mod changelog;
mod context;
mod diff;
mod errors;
mod reducer;
mod snapshot;
mod upsert;
mod window;

pub use block_diff::BlockDiffFetcher;
pub use changelog::ChangeLogBuilder;
pub use context::{HistorySettings, RegistryHistory};
pub use diff::{diff, DiffFragment};
pub use errors::HistoryError;
pub use reducer::{MergedUpdate, StampedRecord, UpdateReducer};
pub use snapshot::{baker_label, Normalizer, RecordMode, SnapshotService};
pub use upsert::{plan_upsert, UpsertKind, UpsertPlan};
pub use window::{HistoryWindow, Since, WindowFilter};
