use registry_primitives::Level;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::micheline::MichelineError;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport-level failure talking to the node.
    #[error("network error: {0}")]
    Network(String),

    /// The node answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The node answered with a body of the wrong shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("micheline: {0}")]
    Micheline(#[from] MichelineError),

    #[error("block {0} not found")]
    BlockNotFound(Level),

    /// The operation does not call the registry contract.
    #[error("operation does not target the registry")]
    Unrelated,

    /// The operation targets the registry but was not applied.
    #[error("operation was not applied: {0}")]
    NotApplied(String),

    /// The operation's receipt lacks the fields its results are read from.
    #[error("unreadable receipt: {0}")]
    Receipt(String),

    #[error("request timed out")]
    Timeout,
}

impl RpcError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a malformed-response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Creates an unreadable-receipt error.
    pub fn receipt(msg: impl Into<String>) -> Self {
        Self::Receipt(msg.into())
    }

    /// Whether the error concerns a single operation only, so the rest of its block can still be
    /// read. Failures to reach the node or read the contract are not.
    pub fn is_operation_local(&self) -> bool {
        matches!(
            self,
            Self::Unrelated | Self::NotApplied(_) | Self::Receipt(_) | Self::Micheline(_)
        )
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<Elapsed> for RpcError {
    fn from(_: Elapsed) -> Self {
        Self::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_local_errors() {
        assert!(RpcError::Unrelated.is_operation_local());
        assert!(RpcError::NotApplied("failed".into()).is_operation_local());
        assert!(RpcError::receipt("missing operation result").is_operation_local());
        assert!(RpcError::from(MichelineError::NotARecord).is_operation_local());
    }

    #[test]
    fn test_transport_errors_are_not_operation_local() {
        assert!(!RpcError::network("connection reset").is_operation_local());
        assert!(!RpcError::Timeout.is_operation_local());
        assert!(!RpcError::Status {
            status: 502,
            url: "https://node.example".into(),
        }
        .is_operation_local());
        assert!(!RpcError::malformed("contract KT1Registry has no script").is_operation_local());
        assert!(!RpcError::BlockNotFound(42).is_operation_local());
    }
}
