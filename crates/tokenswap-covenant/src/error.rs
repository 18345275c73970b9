//! Covenant error types.
//!
//! Business-rule rejections are grouped in [`Rejection`] so callers can tell
//! a covenant saying "no" apart from input that could not be decoded.

use std::fmt;

use tokenswap_primitives::PrimitivesError;
use tokenswap_script::ScriptError;
use tokenswap_transaction::TransactionError;

/// Which token code a swap refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSlot {
    /// The token the buyer receives.
    A,
    /// The token the seller receives, and its change.
    B,
}

impl fmt::Display for TokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSlot::A => write!(f, "A"),
            TokenSlot::B => write!(f, "B"),
        }
    }
}

/// A terminal business-rule rejection by a covenant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The preimage does not authenticate the spent script, value or
    /// transaction.
    #[error("preimage mismatch: {0}")]
    PreimageMismatch(String),

    /// A supplied token code part does not hash to the deployed code hash.
    #[error("token {slot} code hash mismatch")]
    TokenCodeMismatch {
        /// The token whose code was wrong.
        slot: TokenSlot,
    },

    /// The oracle proof does not verify under the configured key(s).
    #[error("bad oracle signature")]
    BadOracleSignature,

    /// The reconstructed outputs do not match the transaction's outputs.
    #[error("output mismatch: expected hashOutputs {expected}, preimage commits to {actual}")]
    OutputMismatch {
        /// Hex of `sha256d` over the reconstructed outputs.
        expected: String,
        /// Hex of `hashOutputs` from the preimage.
        actual: String,
    },

    /// The new amount exceeds what the spend path allows.
    #[error("supply exceeded: amount {amount} over limit {limit}")]
    SupplyExceeded {
        /// The requested amount.
        amount: u64,
        /// The applicable limit.
        limit: u64,
    },
}

/// Errors that can occur during covenant operations.
#[derive(Debug, thiserror::Error)]
pub enum CovenantError {
    /// A covenant rejected the spend.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Arguments could not be decoded (bad lengths, wrong count, bad numbers).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Token B amounts do not add up before a settlement is built.
    #[error("token conservation violated: expected {expected}, actual {actual}")]
    ConservationViolated {
        /// The previous token B balance.
        expected: u64,
        /// Token B amount plus change amount from the order.
        actual: u64,
    },

    /// A contract descriptor is invalid or cannot be instantiated.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// The oracle could not produce an attestation.
    #[error("oracle error: {0}")]
    Oracle(String),

    /// Settlement configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Reading a descriptor or config file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Transaction error.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Script error.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Primitives error.
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),

    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CovenantError {
    /// The business-rule rejection carried by this error, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CovenantError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}
