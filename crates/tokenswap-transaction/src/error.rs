/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. input index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred while producing an unlocking script.
    #[error("signing error: {0}")]
    SigningError(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An underlying script error (forwarded from `tokenswap-script`).
    #[error("script error: {0}")]
    Script(#[from] tokenswap_script::ScriptError),
    /// An underlying primitives error (forwarded from `tokenswap-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] tokenswap_primitives::PrimitivesError),
}
