//! Core transaction type.
//!
//! Represents a transaction with version, inputs, outputs and locktime.
//! Supports binary and hex serialization, txid computation, the per-input
//! sighash preimage and signing through an [`UnlockingScriptTemplate`].

use tokenswap_primitives::chainhash::Hash;
use tokenswap_primitives::hash::sha256d;
use tokenswap_primitives::util::{BsvReader, BsvWriter, VarInt};
use tokenswap_script::Script;

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash;
use crate::template::UnlockingScriptTemplate;
use crate::TransactionError;

/// A transaction consisting of a version, inputs, outputs and a lock time.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Parse a transaction from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The slice must contain exactly one transaction with no trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = BsvReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `BsvReader`.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;
        // Each input takes at least 41 bytes; cap the allocation accordingly.
        let mut inputs = Vec::with_capacity((input_count.value() as usize).min(reader.remaining() / 41));
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;
        let mut outputs = Vec::with_capacity((output_count.value() as usize).min(reader.remaining() / 9));
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Serialize this transaction to raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Compute the transaction ID in internal byte order.
    pub fn tx_id(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes()))
    }

    /// Compute the transaction ID as a display-order hex string.
    pub fn tx_id_hex(&self) -> String {
        self.tx_id().to_string()
    }

    /// Append an input.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Return the number of inputs in the transaction.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Append an output.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Return the number of outputs in the transaction.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Compute the sum of all output satoshi values.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Add an input spending a known UTXO.
    ///
    /// The spent output is attached to the input so that it can be signed
    /// and verified without the source transaction.
    ///
    /// # Arguments
    /// * `prev_tx_id` - Txid of the previous transaction.
    /// * `vout` - The output index being spent.
    /// * `prev_locking_script` - Locking script of the previous output.
    /// * `satoshis` - The satoshi value of the previous output.
    pub fn add_input_from(
        &mut self,
        prev_tx_id: &Hash,
        vout: u32,
        prev_locking_script: Script,
        satoshis: u64,
    ) {
        let mut input = TransactionInput::new();
        input.source_txid = *prev_tx_id.as_bytes();
        input.source_tx_out_index = vout;
        input.set_source_output(Some(TransactionOutput::new(satoshis, prev_locking_script)));
        self.inputs.push(input);
    }

    fn source_output(&self, input_index: usize) -> Result<&TransactionOutput, TransactionError> {
        let input = self.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                self.inputs.len()
            ))
        })?;
        input.source_tx_output().ok_or_else(|| {
            TransactionError::SigningError(format!(
                "missing source output on input {}",
                input_index
            ))
        })
    }

    /// Compute the BIP-143 sighash preimage for an input.
    ///
    /// The scriptCode and value come from the input's attached source output.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input.
    /// * `sighash_flag` - The combined sighash flags (e.g. `SIGHASH_ALL_FORKID`).
    pub fn calc_input_preimage(
        &self,
        input_index: usize,
        sighash_flag: u32,
    ) -> Result<Vec<u8>, TransactionError> {
        let source = self.source_output(input_index)?;
        sighash::calc_preimage(
            self,
            input_index,
            source.locking_script.to_bytes(),
            sighash_flag,
            source.satoshis,
        )
    }

    /// Compute the BIP-143 signature hash for an input.
    pub fn calc_input_signature_hash(
        &self,
        input_index: usize,
        sighash_flag: u32,
    ) -> Result<[u8; 32], TransactionError> {
        let source = self.source_output(input_index)?;
        sighash::signature_hash(
            self,
            input_index,
            source.locking_script.to_bytes(),
            sighash_flag,
            source.satoshis,
        )
    }

    /// Produce the unlocking script for an input with `template` and set it.
    ///
    /// # Returns
    /// `Ok(())` once the input carries its unlocking script.
    pub fn sign_input(
        &mut self,
        input_index: u32,
        template: &dyn UnlockingScriptTemplate,
    ) -> Result<(), TransactionError> {
        let script = template.sign(self, input_index)?;
        let input = self.inputs.get_mut(input_index as usize).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!("input index {} out of range", input_index))
        })?;
        input.unlocking_script = Some(script);
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
