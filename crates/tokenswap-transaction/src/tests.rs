//! Tests for the tokenswap-transaction crate.
//!
//! Covers wire parsing of real transactions, txid computation, the BIP-143
//! preimage layout and its parsed form, and template-driven signing.

use tokenswap_primitives::chainhash::Hash;
use tokenswap_primitives::hash::sha256d;
use tokenswap_script::Script;

use crate::output::{parse_outputs, serialize_outputs, TransactionOutput};
use crate::sighash::{self, SighashPreimage, SIGHASH_ALL_FORKID};
use crate::template::{p2pkh, UnlockingScriptTemplate};
use crate::transaction::Transaction;
use crate::TransactionError;

/// One input, a 1500-satoshi data-carrying output and a P2PKH output.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

const DUMMY_TXID: &str = "1477af6b2667c29670467e4e0728b685ee07b240235771862318e29ddbe58458";

fn covenant_like_tx() -> Transaction {
    let mut tx = Transaction::new();
    let locking = Script::from_asm("OP_DUP OP_DROP OP_RETURN").unwrap();
    tx.add_input_from(&Hash::from_hex(DUMMY_TXID).unwrap(), 0, locking, 100_000);
    tx.add_output(TransactionOutput::new(546, p2pkh::lock(&[0x11; 20])));
    tx.add_output(TransactionOutput::new(1000, p2pkh::lock(&[0x22; 20])));
    tx
}

#[test]
fn test_from_hex_and_back() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert_eq!(tx.version, 1);
    assert_eq!(tx.input_count(), 1);
    assert_eq!(tx.output_count(), 2);
    assert_eq!(tx.outputs[0].satoshis, 1500);
    assert_eq!(tx.to_hex(), SOURCE_RAW_TX);
}

#[test]
fn test_trailing_and_truncated_bytes() {
    let mut bytes = hex::decode(SOURCE_RAW_TX).unwrap();
    bytes.push(0x00);
    assert!(Transaction::from_bytes(&bytes).is_err());
    assert!(Transaction::from_bytes(&bytes[..40]).is_err());
    assert!(Transaction::from_bytes(&[]).is_err());
    assert!(Transaction::from_hex("zz").is_err());
}

#[test]
fn test_tx_id_is_reversed_sha256d() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let mut expected = sha256d(&tx.to_bytes());
    assert_eq!(tx.tx_id().as_bytes(), &expected);
    expected.reverse();
    assert_eq!(tx.tx_id_hex(), hex::encode(expected));
}

#[test]
fn test_outputs_serialize_and_parse() {
    let tx = covenant_like_tx();
    let bytes = serialize_outputs(&tx.outputs);
    assert_eq!(bytes.len(), 2 * (8 + 1 + 25));
    assert_eq!(parse_outputs(&bytes).unwrap(), tx.outputs);
    assert!(parse_outputs(&bytes[..bytes.len() - 1]).is_err());
    assert!(parse_outputs(&[]).unwrap().is_empty());
}

#[test]
fn test_preimage_layout() {
    let tx = covenant_like_tx();
    let script = tx.inputs[0].source_tx_script().unwrap().clone();
    let preimage = tx.calc_input_preimage(0, SIGHASH_ALL_FORKID).unwrap();
    let expected_len = 4 + 32 + 32 + 36 + 1 + script.len() + 8 + 4 + 32 + 4 + 4;
    assert_eq!(preimage.len(), expected_len);
    assert_eq!(&preimage[preimage.len() - 4..], &SIGHASH_ALL_FORKID.to_le_bytes());
}

#[test]
fn test_parsed_preimage_fields() {
    let tx = covenant_like_tx();
    let bytes = tx.calc_input_preimage(0, SIGHASH_ALL_FORKID).unwrap();
    let preimage = SighashPreimage::parse(&bytes).unwrap();

    assert_eq!(preimage.version, 1);
    assert_eq!(&preimage.script_code, tx.inputs[0].source_tx_script().unwrap());
    assert_eq!(preimage.value, 100_000);
    assert_eq!(preimage.outpoint_txid, *Hash::from_hex(DUMMY_TXID).unwrap().as_bytes());
    assert_eq!(preimage.outpoint_index, 0);
    assert_eq!(preimage.hash_outputs, sha256d(&serialize_outputs(&tx.outputs)));
    assert_eq!(preimage.sighash_type, SIGHASH_ALL_FORKID);
    assert_eq!(preimage.to_bytes(), bytes);
    assert_eq!(preimage.digest(), tx.calc_input_signature_hash(0, SIGHASH_ALL_FORKID).unwrap());
}

#[test]
fn test_preimage_parse_rejects_bad_lengths() {
    let tx = covenant_like_tx();
    let mut bytes = tx.calc_input_preimage(0, SIGHASH_ALL_FORKID).unwrap();
    assert!(SighashPreimage::parse(&bytes[..bytes.len() - 1]).is_err());
    bytes.push(0);
    assert!(matches!(
        SighashPreimage::parse(&bytes),
        Err(TransactionError::SerializationError(_))
    ));
}

#[test]
fn test_hash_outputs_tracks_output_changes() {
    let tx = covenant_like_tx();
    let before = tx.calc_input_signature_hash(0, SIGHASH_ALL_FORKID).unwrap();
    let mut changed = tx.clone();
    changed.outputs[1].satoshis += 1;
    let after = changed.calc_input_signature_hash(0, SIGHASH_ALL_FORKID).unwrap();
    assert_ne!(before, after);

    // SIGHASH_NONE does not commit to outputs.
    let none = sighash::SIGHASH_NONE | sighash::SIGHASH_FORKID;
    assert_eq!(
        tx.calc_input_signature_hash(0, none).unwrap(),
        changed.calc_input_signature_hash(0, none).unwrap()
    );
}

#[test]
fn test_preimage_needs_source_output() {
    let mut tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert!(matches!(
        tx.calc_input_preimage(0, SIGHASH_ALL_FORKID),
        Err(TransactionError::SigningError(_))
    ));
    assert!(matches!(
        tx.calc_input_preimage(3, SIGHASH_ALL_FORKID),
        Err(TransactionError::InvalidTransaction(_))
    ));
    tx.inputs[0].set_source_output(Some(TransactionOutput::new(5, Script::new())));
    assert!(tx.calc_input_preimage(0, SIGHASH_ALL_FORKID).is_ok());
}

struct PushDigest;

impl UnlockingScriptTemplate for PushDigest {
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let digest = tx.calc_input_signature_hash(input_index as usize, SIGHASH_ALL_FORKID)?;
        let mut script = Script::new();
        script.append_push_data(&digest)?;
        Ok(script)
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: u32) -> u32 {
        33
    }
}

#[test]
fn test_sign_input_sets_unlocking_script() {
    let mut tx = covenant_like_tx();
    let digest = tx.calc_input_signature_hash(0, SIGHASH_ALL_FORKID).unwrap();
    tx.sign_input(0, &PushDigest).unwrap();
    let script = tx.inputs[0].unlocking_script.as_ref().unwrap();
    assert_eq!(script.len() as u32, PushDigest.estimate_length(&tx, 0));
    assert_eq!(&script.to_bytes()[1..], &digest);

    // Unlocking scripts are not part of the preimage.
    assert_eq!(tx.calc_input_signature_hash(0, SIGHASH_ALL_FORKID).unwrap(), digest);
    assert!(tx.sign_input(1, &PushDigest).is_err());
}

#[test]
fn test_signed_tx_parses_back() {
    let mut tx = covenant_like_tx();
    tx.sign_input(0, &PushDigest).unwrap();
    let parsed = Transaction::from_hex(&tx.to_hex()).unwrap();
    assert_eq!(parsed.to_bytes(), tx.to_bytes());
    assert_eq!(parsed.inputs[0].unlocking_script, tx.inputs[0].unlocking_script);
}
