use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid hex in field {field}: {source}")]
    InvalidHex {
        field: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("field {0} is not valid utf-8")]
    InvalidUtf8(String),

    #[error("invalid decimal amount: {0:?}")]
    InvalidDecimal(String),

    #[error("field {field} should be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}
