//! Preimage self-check and output commitment.
//!
//! A covenant receives the BIP-143 preimage of its own spend as an
//! argument. Checking that the preimage hashes to the transaction's real
//! sighash lets the covenant trust the script code, value and
//! `hashOutputs` it reads out of it.

use tokenswap_primitives::hash::sha256d;
use tokenswap_script::Script;
use tokenswap_transaction::sighash::{self, SIGHASH_ALL_FORKID};
use tokenswap_transaction::SighashPreimage;

use crate::error::{CovenantError, Rejection};
use crate::verifier::TxContext;

fn mismatch(reason: impl Into<String>) -> CovenantError {
    Rejection::PreimageMismatch(reason.into()).into()
}

/// Authenticate a preimage against the spending context.
///
/// Checks, in order: sighash type ALL|FORKID, script code equal to
/// `own_script`, value equal to the spent output's value, and digest equal
/// to the sighash recomputed from the transaction.
///
/// # Arguments
/// * `preimage` - Serialized preimage from the unlocking script.
/// * `own_script` - The locking script being executed.
/// * `ctx` - The spending transaction and input.
///
/// # Returns
/// The parsed preimage, `MalformedInput` if it does not parse, or
/// `PreimageMismatch` naming the first failed check.
pub fn check_preimage(
    preimage: &[u8],
    own_script: &Script,
    ctx: &TxContext<'_>,
) -> Result<SighashPreimage, CovenantError> {
    let parsed = SighashPreimage::parse(preimage)
        .map_err(|e| CovenantError::MalformedInput(format!("preimage: {}", e)))?;

    if parsed.sighash_type != SIGHASH_ALL_FORKID {
        return Err(mismatch(format!("sighash type {:#x}", parsed.sighash_type)));
    }
    if &parsed.script_code != own_script {
        return Err(mismatch("script code is not the executing locking script"));
    }
    if parsed.value != ctx.input_satoshis {
        return Err(mismatch(format!(
            "value {} does not match spent output value {}",
            parsed.value, ctx.input_satoshis
        )));
    }
    let expected = sighash::signature_hash(
        ctx.tx,
        ctx.input_index,
        own_script.to_bytes(),
        SIGHASH_ALL_FORKID,
        ctx.input_satoshis,
    )
    .map_err(|e| CovenantError::MalformedInput(format!("transaction context: {}", e)))?;
    if parsed.digest() != expected {
        return Err(mismatch("digest does not commit to the spending transaction"));
    }
    Ok(parsed)
}

/// Check that `outputs` (serialized) is exactly what the preimage commits to.
///
/// # Returns
/// `OutputMismatch` carrying both hashes when `sha256d(outputs)` differs
/// from `hashOutputs`.
pub fn check_outputs(preimage: &SighashPreimage, outputs: &[u8]) -> Result<(), CovenantError> {
    let expected = sha256d(outputs);
    if expected != preimage.hash_outputs {
        return Err(Rejection::OutputMismatch {
            expected: hex::encode(expected),
            actual: hex::encode(preimage.hash_outputs),
        }
        .into());
    }
    Ok(())
}
