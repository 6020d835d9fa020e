use std::fmt;

use async_trait::async_trait;
use registry_primitives::{Address, Level, RawRecord};

use crate::{AppliedResult, Operation, RpcError};

/// Block at which a lookup is made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockRef {
    #[default]
    Head,
    Level(Level),
}

impl From<Option<Level>> for BlockRef {
    fn from(level: Option<Level>) -> Self {
        level.map_or(Self::Head, Self::Level)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str("head"),
            Self::Level(level) => write!(f, "{level}"),
        }
    }
}

/// Read access to a node hosting the registry contract.
///
/// Every call is a side-effect-free query, so implementations may be called concurrently.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait RegistryRpc: Send + Sync {
    /// Returns the cycle of the current head block.
    async fn head_cycle(&self) -> Result<u64, RpcError>;

    /// Looks up one registry entry at the given block. An absent entry is `Ok(None)`.
    async fn get_record(
        &self,
        address: &Address,
        block: BlockRef,
    ) -> Result<Option<RawRecord>, RpcError>;

    /// Lists the manager operations included at `level`.
    async fn manager_operations(&self, level: Level) -> Result<Vec<Operation>, RpcError>;

    /// Decodes the registry effects of one operation.
    ///
    /// Operations that do not call the registry fail with [`RpcError::Unrelated`].
    async fn operation_result(&self, op: &Operation) -> Result<Vec<AppliedResult>, RpcError>;
}
