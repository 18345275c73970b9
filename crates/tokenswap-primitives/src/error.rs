/// Unified error type for all primitives operations.
///
/// Covers hex decoding, fixed-size hash parsing, binary reader underflow and
/// Rabin key or signing failures.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid rabin key: {0}")]
    InvalidRabinKey(String),

    #[error("no rabin padding found within {0} bytes")]
    RabinPaddingExhausted(usize),

    #[error("unexpected end of data")]
    UnexpectedEof,
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
