/// Token swap transaction layer - transactions, sighash and templates.
///
/// Provides the Transaction type with inputs and outputs, binary/hex
/// serialization, the BIP-143 (FORKID) signature hash, a parser for the
/// sighash preimage that covenants inspect, and the unlocking-script
/// template trait used to sign covenant inputs.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod template;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use sighash::SighashPreimage;

#[cfg(test)]
mod tests;
