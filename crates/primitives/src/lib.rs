//! Data types shared across the bakers registry history crates.
//!
//! Everything here is plain data: block levels, registry addresses, the raw records the
//! registry contract stores, and the change log entries produced from them. None of these types
//! interpret the record fields.

mod address;
mod change;
pub mod constants;
mod record;
mod tie_break;

pub use address::Address;
pub use change::{ChangeEntry, ChangeKind};
pub use record::{LevelUpdate, PartialUpdate, RawRecord, Snapshot};
pub use tie_break::TieBreak;

/// Block height. The only notion of time the registry history knows about.
pub type Level = u64;
