//! Transaction input referencing a previous output.
//!
//! Besides the wire fields, an input can carry the output it spends. The
//! sighash and every covenant check need that output's locking script and
//! value, and neither is part of the input's serialization.

use tokenswap_primitives::util::{BsvReader, BsvWriter, VarInt};
use tokenswap_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The 32-byte transaction ID of the output being spent, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_tx_out_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    /// The unlocking script. `None` until the input is signed.
    pub unlocking_script: Option<Script>,

    /// The output being spent, when known. Not serialized.
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// Create a new input with a zeroed outpoint and a finalized sequence.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_output: None,
        }
    }

    /// Deserialize a `TransactionInput` from a `BsvReader`.
    ///
    /// The source output is unknown after parsing and must be attached with
    /// [`TransactionInput::set_source_output`] before the input can be
    /// signed or verified.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let source_txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script,
            source_output: None,
        })
    }

    /// Serialize this input into a `BsvWriter`.
    ///
    /// An unsigned input is written with an empty unlocking script.
    pub fn write_to(&self, writer: &mut BsvWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
        match &self.unlocking_script {
            Some(script) => writer.write_var_bytes(script.to_bytes()),
            None => writer.write_varint(VarInt(0)),
        }
        writer.write_u32_le(self.sequence_number);
    }

    /// Attach (or clear) the output this input spends.
    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// The output this input spends, if attached.
    pub fn source_tx_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    /// Satoshi value of the spent output, if attached.
    pub fn source_tx_satoshis(&self) -> Option<u64> {
        self.source_output.as_ref().map(|o| o.satoshis)
    }

    /// Locking script of the spent output, if attached.
    pub fn source_tx_script(&self) -> Option<&Script> {
        self.source_output.as_ref().map(|o| &o.locking_script)
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
