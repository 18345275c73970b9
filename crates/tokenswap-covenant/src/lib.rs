#![deny(missing_docs)]
//! Atomic token swap covenants.
//!
//! Provides the token covenant, the one-shot swap covenant that settles an
//! exchange of two token balances, Rabin oracle attestations, a native
//! script verifier for both covenants and a builder for settlement
//! transactions.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod oracle;
pub mod preimage;
pub mod settlement;
pub mod swap;
pub mod token;
pub mod verifier;

pub use config::SettlementConfig;
pub use descriptor::{ContractDescriptor, ParamValue};
pub use error::{CovenantError, Rejection, TokenSlot};
pub use layout::{ContractId, Pkh, TokenState};
pub use oracle::{OracleVerifier, RabinWitness, SwapAttestation, SwapOrder, TransferRequest, Witness};
pub use settlement::{SettlementBuilder, SwapUnlocker, SwapUtxo, TokenUnlocker, UnsignedSettlement};
pub use swap::{SettleArgs, SwapCovenant, SwapParams, SwapStatus};
pub use token::{OracleKeySet, TokenCovenant, TokenParams, TransferArgs};
pub use verifier::{Covenant, CovenantVerifier, ScriptVerifier, TxContext, VerifyResult};
