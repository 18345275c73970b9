//! Script templates.
//!
//! The `UnlockingScriptTemplate` trait is the signing seam: covenant
//! unlockers implement it to turn a transaction and an input index into the
//! unlocking script for that input. The P2PKH module builds the plain
//! locking scripts a settlement pays to.

pub mod p2pkh;

use tokenswap_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// Trait for templates that produce unlocking scripts.
pub trait UnlockingScriptTemplate {
    /// Produce an unlocking script for the given input.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The index of the input to sign.
    ///
    /// # Returns
    /// `Ok(Script)` containing the unlocking script, or an error on failure.
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError>;

    /// Estimate the byte length of the unlocking script.
    ///
    /// Used for fee estimation before the actual script is computed.
    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32;
}
