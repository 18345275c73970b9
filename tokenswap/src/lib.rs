#![deny(missing_docs)]

//! Atomic token swaps on BSV.
//!
//! Re-exports the workspace crates for single-crate usage.

pub use tokenswap_primitives as primitives;
pub use tokenswap_script as script;
pub use tokenswap_transaction as transaction;
pub use tokenswap_covenant as covenant;

pub use tokenswap_covenant::{
    CovenantError, CovenantVerifier, Rejection, SettlementBuilder, SwapCovenant, TokenCovenant,
};
