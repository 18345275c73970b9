//! Parsed BIP-143 sighash preimage.

use tokenswap_primitives::hash::sha256d;
use tokenswap_primitives::util::{BsvReader, BsvWriter};
use tokenswap_script::Script;

use crate::TransactionError;

/// The BIP-143 preimage split into its fields.
///
/// A covenant reads its own locking script (`script_code`), the value it
/// locks (`value`) and the commitment to the spending transaction's outputs
/// (`hash_outputs`) from here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SighashPreimage {
    pub version: u32,
    pub hash_prevouts: [u8; 32],
    pub hash_sequence: [u8; 32],
    /// Txid of the spent outpoint, internal byte order.
    pub outpoint_txid: [u8; 32],
    pub outpoint_index: u32,
    pub script_code: Script,
    /// Satoshis locked in the spent output.
    pub value: u64,
    pub sequence: u32,
    pub hash_outputs: [u8; 32],
    pub lock_time: u32,
    pub sighash_type: u32,
}

impl SighashPreimage {
    /// Parse a preimage from its serialized form.
    ///
    /// # Returns
    /// The preimage, or a `SerializationError` if the bytes are truncated or
    /// carry trailing data.
    pub fn parse(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = BsvReader::new(bytes);
        let field = |name: &'static str| {
            move |e: tokenswap_primitives::PrimitivesError| {
                TransactionError::SerializationError(format!("reading preimage {}: {}", name, e))
            }
        };

        let version = r.read_u32_le().map_err(field("version"))?;
        let hash_prevouts = r.read_array::<32>().map_err(field("hashPrevouts"))?;
        let hash_sequence = r.read_array::<32>().map_err(field("hashSequence"))?;
        let outpoint_txid = r.read_array::<32>().map_err(field("outpoint txid"))?;
        let outpoint_index = r.read_u32_le().map_err(field("outpoint index"))?;
        let script_len = r.read_varint().map_err(field("scriptCode length"))?;
        let script_code = Script::from_bytes(
            r.read_bytes(script_len.value() as usize).map_err(field("scriptCode"))?,
        );
        let value = r.read_u64_le().map_err(field("value"))?;
        let sequence = r.read_u32_le().map_err(field("nSequence"))?;
        let hash_outputs = r.read_array::<32>().map_err(field("hashOutputs"))?;
        let lock_time = r.read_u32_le().map_err(field("nLocktime"))?;
        let sighash_type = r.read_u32_le().map_err(field("sighash type"))?;

        if r.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after preimage",
                r.remaining()
            )));
        }

        Ok(SighashPreimage {
            version,
            hash_prevouts,
            hash_sequence,
            outpoint_txid,
            outpoint_index,
            script_code,
            value,
            sequence,
            hash_outputs,
            lock_time,
            sighash_type,
        })
    }

    /// Serialize the preimage back into its wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BsvWriter::with_capacity(160 + self.script_code.len());
        w.write_u32_le(self.version);
        w.write_bytes(&self.hash_prevouts);
        w.write_bytes(&self.hash_sequence);
        w.write_bytes(&self.outpoint_txid);
        w.write_u32_le(self.outpoint_index);
        w.write_var_bytes(self.script_code.to_bytes());
        w.write_u64_le(self.value);
        w.write_u32_le(self.sequence);
        w.write_bytes(&self.hash_outputs);
        w.write_u32_le(self.lock_time);
        w.write_u32_le(self.sighash_type);
        w.into_bytes()
    }

    /// The signature hash this preimage commits to.
    pub fn digest(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }
}
