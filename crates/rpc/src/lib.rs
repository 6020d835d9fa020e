//! Access to the registry contract through a Tezos node.
//!
//! [`RegistryRpc`] is the interface the history pipeline depends on. [`TezosRpcClient`] implements
//! it over the node's HTTP RPC, decoding Micheline against the contract's storage type.

mod client;
mod errors;
pub mod micheline;
mod operations;
mod traits;

pub use client::{parse_head_cycle, TezosRpcClient};
pub use errors::RpcError;
pub use operations::{extract_results, AppliedResult, Operation};
#[cfg(feature = "test-utils")]
pub use traits::MockRegistryRpc;
pub use traits::{BlockRef, RegistryRpc};
