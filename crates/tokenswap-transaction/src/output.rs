//! Transaction output with satoshi value and locking script.
//!
//! Covenants rebuild outputs and compare their serialization byte for byte,
//! so the wire format here is the one hashed into `hashOutputs`.

use tokenswap_primitives::util::{BsvReader, BsvWriter, VarInt};
use tokenswap_script::Script;

use crate::TransactionError;

/// A single output in a transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The number of satoshis locked by this output.
    pub satoshis: u64,

    /// The locking script that defines spending conditions.
    pub locking_script: Script,
}

impl TransactionOutput {
    /// Create an output paying `satoshis` to `locking_script`.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput { satoshis, locking_script }
    }

    /// Deserialize a `TransactionOutput` from a `BsvReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// The output, or a `SerializationError` if the data is truncated.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `BsvWriter`.
    pub fn write_to(&self, writer: &mut BsvWriter) {
        writer.write_u64_le(self.satoshis);
        let script_bytes = self.locking_script.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
    }

    /// Serialize this output to a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}

/// Concatenate the wire serialization of several outputs.
///
/// This is the exact byte string hashed into `hashOutputs` for
/// `SIGHASH_ALL`, and the form in which covenants receive the outputs that
/// surround the ones they rebuild.
pub fn serialize_outputs(outputs: &[TransactionOutput]) -> Vec<u8> {
    let mut writer = BsvWriter::new();
    for output in outputs {
        output.write_to(&mut writer);
    }
    writer.into_bytes()
}

/// Parse a concatenation of serialized outputs.
///
/// # Returns
/// The outputs in order, or a `SerializationError` if the bytes do not
/// split exactly into whole outputs.
pub fn parse_outputs(bytes: &[u8]) -> Result<Vec<TransactionOutput>, TransactionError> {
    let mut reader = BsvReader::new(bytes);
    let mut outputs = Vec::new();
    while reader.remaining() > 0 {
        outputs.push(TransactionOutput::read_from(&mut reader)?);
    }
    Ok(outputs)
}

impl Default for TransactionOutput {
    fn default() -> Self {
        Self::new(0, Script::new())
    }
}
