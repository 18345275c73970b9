//! Signature hash computation.
//!
//! BSV uses the BIP-143 digest with the FORKID flag. Covenants receive the
//! preimage itself, not only its digest, and read their spending context out
//! of it; [`SighashPreimage`] is that parsed form.
//!
//! See <https://github.com/bitcoin-sv/bitcoin-sv/blob/master/doc/abc/replay-protected-sighash.md#digest-algorithm>

mod preimage;

pub use preimage::SighashPreimage;

use tokenswap_primitives::hash::sha256d;
use tokenswap_primitives::util::BsvWriter;

use crate::output::serialize_outputs;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Only sign the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The sighash type covenants require: ALL | FORKID.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Compute the BIP-143 signature hash for a given input.
///
/// # Arguments
/// * `tx`                  - The transaction being signed.
/// * `input_index`         - Index of the input being signed.
/// * `prev_output_script`  - The locking script (scriptCode) of the output being spent.
/// * `sighash_type`        - The combined sighash flags.
/// * `satoshis`            - The satoshi value of the output being spent.
///
/// # Returns
/// `sha256d` of the preimage.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_preimage(tx, input_index, prev_output_script, sighash_type, satoshis)?;
    Ok(sha256d(&preimage))
}

/// Compute the preimage bytes before double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes)
/// 3. hashSequence (32 bytes)
/// 4. outpoint (32+4 bytes)
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE)
/// 7. nSequence (4 bytes LE)
/// 8. hashOutputs (32 bytes)
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        ))
    })?;
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if !anyone_can_pay { prevouts_hash(tx) } else { [0u8; 32] };

    let hash_sequence = if !anyone_can_pay
        && base_type != SIGHASH_SINGLE
        && base_type != SIGHASH_NONE
    {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        sha256d(&serialize_outputs(&tx.outputs))
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        sha256d(&tx.outputs[input_index].to_bytes())
    } else {
        [0u8; 32]
    };

    let mut writer = BsvWriter::with_capacity(160 + prev_output_script.len());
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_tx_out_index);
    writer.write_var_bytes(prev_output_script);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_tx_out_index);
    }
    sha256d(writer.as_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}
