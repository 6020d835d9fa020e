use registry_primitives::Level;
use thiserror::Error;
use tokio::time::error::Elapsed;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("{backend}: network error: {msg}")]
    Network { backend: &'static str, msg: String },

    #[error("{backend}: unexpected status {status}")]
    Status { backend: &'static str, status: u16 },

    #[error("{backend}: malformed response: {msg}")]
    Malformed { backend: &'static str, msg: String },

    /// Two backends disagree on the set of levels.
    #[error(
        "indexers disagree: only in {left}: {only_left:?}, only in {right}: {only_right:?}"
    )]
    Mismatch {
        left: &'static str,
        right: &'static str,
        only_left: Vec<Level>,
        only_right: Vec<Level>,
    },

    #[error("no indexer configured")]
    NoBackends,

    #[error("indexer request timed out")]
    Timeout,
}

impl IndexerError {
    pub fn network(backend: &'static str, err: impl ToString) -> Self {
        Self::Network {
            backend,
            msg: err.to_string(),
        }
    }

    pub fn malformed(backend: &'static str, msg: impl Into<String>) -> Self {
        Self::Malformed {
            backend,
            msg: msg.into(),
        }
    }
}

impl From<Elapsed> for IndexerError {
    fn from(_: Elapsed) -> Self {
        Self::Timeout
    }
}
