//! Defaults for the registry and the Tezos mainnet it lives on.

/// The bakers registry contract on mainnet.
pub const DEFAULT_REGISTRY_ADDRESS: &str = "KT1ChNsEFxwyCbJyWGSL3KdjeXE28AY1Kaog";

/// Number of levels in a cycle.
pub const DEFAULT_BLOCKS_PER_CYCLE: u64 = 4096;

/// How many cycles before the head cycle a change log starts when no window is given.
pub const DEFAULT_RECENT_CYCLES: u64 = 2;

/// Row limit applied to every indexer query.
pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// Record field the registry uses to stamp the time of the last update.
pub const LAST_UPDATE_FIELD: &str = "last_update";

/// Record field naming the account that submitted the update.
pub const REPORTER_FIELD: &str = "reporterAccount";

/// Bookkeeping fields stripped from raw records before they are returned or compared.
pub const DEFAULT_BOOKKEEPING_FIELDS: [&str; 2] = [LAST_UPDATE_FIELD, REPORTER_FIELD];

/// Registry fee for creating a new entry, in mutez.
pub const CREATE_FEE_MUTEZ: u64 = 1_500_000;

/// Registry fee for updating an existing entry, in mutez.
pub const UPDATE_FEE_MUTEZ: u64 = 500_000;
