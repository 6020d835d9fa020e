use registry_codec::CodecError;
use registry_indexer::IndexerError;
use registry_rpc::RpcError;
use thiserror::Error;
use tokio::time::error::Elapsed;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// A window start that is neither a level nor `level:N` / `cycle:N`.
    #[error("invalid since specifier: {0:?}")]
    InvalidSince(String),

    #[error("indexer: {0}")]
    Indexer(#[from] IndexerError),

    #[error("rpc: {0}")]
    Rpc(#[from] RpcError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("request timed out")]
    Timeout,
}

impl From<Elapsed> for HistoryError {
    fn from(_: Elapsed) -> Self {
        Self::Timeout
    }
}
