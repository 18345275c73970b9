//! End-to-end settlement: build, sign and verify a swap, and the ways it
//! is rejected.

mod common;

use common::*;
use tokenswap_covenant::{
    CovenantError, CovenantVerifier, RabinWitness, Rejection, SettlementBuilder, SettlementConfig,
    SwapCovenant, SwapParams, SwapStatus, TokenSlot, TokenState, TxContext, Witness,
};
use tokenswap_script::Script;
use tokenswap_transaction::sighash::{self, SIGHASH_ALL_FORKID};
use tokenswap_transaction::template::p2pkh;
use tokenswap_transaction::{Transaction, TransactionOutput};

#[test]
fn test_canonical_settlement_verifies() {
    let f = Fixture::new();
    let tx = f.builder(f.attest(700, 300)).build().unwrap().sign().unwrap();

    assert_eq!(tx.output_count(), 6);
    let token_state = |i: usize| {
        let state = f.token_a.parse_locking_script(&tx.outputs[i].locking_script);
        state.or_else(|_| f.token_b.parse_locking_script(&tx.outputs[i].locking_script)).unwrap()
    };
    assert!(tx.outputs[0].locking_script.starts_with(f.token_a.code_part()));
    assert_eq!(token_state(0), TokenState::holder(BUYER, 1000));
    assert_eq!(token_state(1), TokenState::holder(ISSUER, 700));
    assert_eq!(token_state(2), TokenState::holder(CHANGE, 300));
    assert_eq!(tx.outputs[3], TransactionOutput::new(546, p2pkh::lock(&BUYER)));
    assert_eq!(tx.outputs[4], TransactionOutput::new(546, p2pkh::lock(&ISSUER)));
    assert_eq!(tx.outputs[5], TransactionOutput::new(CHANGE_SATOSHIS, p2pkh::lock(&CHANGE)));
    assert!(tx.outputs[..3].iter().all(|o| o.satoshis == 546));

    let result = f.verifier().verify_input(&tx, 0);
    assert!(result.success, "{:?}", result.error);
}

#[test]
fn test_settlement_after_leading_output() {
    let f = Fixture::new();
    let leading = TransactionOutput::new(546, f.swap.locking_script().clone());
    let tx = f
        .builder(f.attest(700, 300))
        .leading_outputs(vec![leading.clone()])
        .build()
        .unwrap()
        .sign()
        .unwrap();

    assert_eq!(tx.output_count(), 7);
    assert_eq!(tx.outputs[0], leading);
    f.check(&tx, 0).unwrap();
}

#[test]
fn test_settled_tx_survives_wire_roundtrip() {
    let f = Fixture::new();
    let tx = f.builder(f.attest(700, 300)).build().unwrap().sign().unwrap();
    let mut parsed = Transaction::from_hex(&tx.to_hex()).unwrap();
    parsed.inputs[0].set_source_output(tx.inputs[0].source_tx_output().cloned());
    assert!(f.verifier().verify_input(&parsed, 0).success);
}

#[test]
fn test_builder_rejects_unbalanced_change() {
    let f = Fixture::new();
    let err = f.builder(f.attest(700, 301)).build().unwrap_err();
    assert!(matches!(
        err,
        CovenantError::ConservationViolated { expected: 1000, actual: 1001 }
    ));

    let err = f.builder(f.attest(700, 299)).build().unwrap_err();
    assert!(matches!(err, CovenantError::ConservationViolated { actual: 999, .. }));
}

#[test]
fn test_builder_requires_change_destination() {
    let f = Fixture::new();
    let builder = SettlementBuilder::new(
        &f.swap,
        f.utxo(),
        f.attest(700, 300),
        f.token_a.code_part().clone(),
        f.token_b.code_part().clone(),
    )
    .previous_token_b_amount(TOKEN_B_SUPPLY);
    assert!(matches!(builder.build(), Err(CovenantError::Config(_))));

    let tx = builder.change(CHANGE, CHANGE_SATOSHIS).build().unwrap().sign().unwrap();
    assert_eq!(tx.outputs[5], TransactionOutput::new(CHANGE_SATOSHIS, p2pkh::lock(&CHANGE)));
}

#[test]
fn test_builder_rejects_notify_value_other_than_swap() {
    let f = Fixture::new();
    let config = SettlementConfig { notify_satoshis: 600, ..SettlementConfig::default() };
    let err = f.builder(f.attest(700, 300)).config(config.clone()).build().unwrap_err();
    assert!(matches!(err, CovenantError::Config(_)));

    let swap = SwapCovenant::new(SwapParams { notify_satoshis: 600, ..f.swap.params().clone() })
        .unwrap();
    let tx = SettlementBuilder::new(
        &swap,
        f.utxo(),
        f.attest(700, 300),
        f.token_a.code_part().clone(),
        f.token_b.code_part().clone(),
    )
    .change(CHANGE, CHANGE_SATOSHIS)
    .previous_token_b_amount(TOKEN_B_SUPPLY)
    .config(config)
    .build()
    .unwrap()
    .sign()
    .unwrap();
    assert_eq!(tx.outputs[3].satoshis, 600);
    assert_eq!(tx.outputs[4].satoshis, 600);
    let result = CovenantVerifier::new().with(swap).verify_input(&tx, 0);
    assert!(result.success, "{:?}", result.error);
}

#[test]
fn test_swap_with_other_notify_value_does_not_match() {
    let f = Fixture::new();
    let tx = f.builder(f.attest(700, 300)).build().unwrap().sign().unwrap();
    let other = SwapCovenant::new(SwapParams { notify_satoshis: 600, ..f.swap.params().clone() })
        .unwrap();
    let result = CovenantVerifier::new().with(other).verify_input(&tx, 0);
    assert!(result.error.unwrap().contains("no registered covenant"));
}

#[test]
fn test_forced_unbalanced_change_fails_outputs() {
    let f = Fixture::new();
    let mut unsigned = f.builder(f.attest(700, 300)).build().unwrap();
    unsigned.args.change_token_amount = 301;
    unsigned.args.oracle_sig = f.attest(700, 301).signature;
    let tx = unsigned.sign().unwrap();

    assert!(matches!(rejection(f.check(&tx, 0)), Rejection::OutputMismatch { .. }));
}

#[test]
fn test_mutating_any_output_is_rejected() {
    let f = Fixture::new();
    let attestation = f.attest(700, 300);
    let template = f.builder(attestation).build().unwrap();

    for index in 0..template.tx.output_count() {
        for mutation in 0..3 {
            let mut unsigned = template.clone();
            let output = &mut unsigned.tx.outputs[index];
            match mutation {
                0 => output.satoshis += 1,
                _ => {
                    let mut bytes = output.locking_script.to_bytes().to_vec();
                    let at = if mutation == 1 { 0 } else { bytes.len() - 1 };
                    bytes[at] ^= 0x01;
                    output.locking_script = Script::from(bytes);
                }
            }
            let tx = unsigned.sign().unwrap();
            let r = rejection(f.check(&tx, 0));
            assert!(
                matches!(r, Rejection::OutputMismatch { .. }),
                "output {} mutation {}: {:?}",
                index,
                mutation,
                r
            );
        }
    }
}

#[test]
fn test_extra_output_is_rejected() {
    let f = Fixture::new();
    let mut unsigned = f.builder(f.attest(700, 300)).build().unwrap();
    unsigned.tx.add_output(TransactionOutput::new(1, p2pkh::lock(&[9; 20])));
    let tx = unsigned.sign().unwrap();
    assert!(matches!(rejection(f.check(&tx, 0)), Rejection::OutputMismatch { .. }));
}

#[test]
fn test_signature_from_unconfigured_key() {
    let f = Fixture::new();
    let rogue = RabinWitness::new(rogue_key());
    let attestation = rogue.attest_swap(&f.order(700, 300)).unwrap();
    let tx = f.builder(attestation).build().unwrap().sign().unwrap();

    assert_eq!(rejection(f.check(&tx, 0)), Rejection::BadOracleSignature);
    let result = f.verifier().verify_input(&tx, 0);
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("bad oracle signature"));
}

#[test]
fn test_signature_over_other_terms() {
    let f = Fixture::new();
    let mut attestation = f.attest(700, 300);
    attestation.order.token_a_amount = 999;
    let tx = f.builder(attestation).build().unwrap().sign().unwrap();
    assert_eq!(rejection(f.check(&tx, 0)), Rejection::BadOracleSignature);
}

#[test]
fn test_swapped_code_hashes() {
    let f = Fixture::new();
    let mut params = f.swap.params().clone();
    std::mem::swap(&mut params.token_a_hash, &mut params.token_b_hash);
    let swapped = SwapCovenant::new(params).unwrap();

    let tx = SettlementBuilder::new(
        &swapped,
        f.utxo(),
        f.attest(700, 300),
        f.token_a.code_part().clone(),
        f.token_b.code_part().clone(),
    )
    .change(CHANGE, CHANGE_SATOSHIS)
    .previous_token_b_amount(TOKEN_B_SUPPLY)
    .build()
    .unwrap()
    .sign()
    .unwrap();

    let verifier = CovenantVerifier::new().with(swapped);
    let input = &tx.inputs[0];
    let source = input.source_tx_output().unwrap();
    let ctx = TxContext { tx: &tx, input_index: 0, input_satoshis: source.satoshis };
    let unlocking = input.unlocking_script.as_ref().unwrap();
    let result = verifier.check(unlocking, &source.locking_script, &ctx);
    assert_eq!(rejection(result), Rejection::TokenCodeMismatch { slot: TokenSlot::A });
}

#[test]
fn test_code_check_precedes_oracle_check() {
    let f = Fixture::new();
    let rogue = RabinWitness::new(rogue_key());
    let attestation = rogue.attest_swap(&f.order(700, 300)).unwrap();
    let mut unsigned = f.builder(attestation).build().unwrap();
    unsigned.args.token_b_code = f.token_a.code_part().clone();
    let tx = unsigned.sign().unwrap();
    assert_eq!(rejection(f.check(&tx, 0)), Rejection::TokenCodeMismatch { slot: TokenSlot::B });
}

#[test]
fn test_preimage_for_wrong_value() {
    let f = Fixture::new();
    let unsigned = f.builder(f.attest(700, 300)).build().unwrap();
    let mut args = unsigned.args.clone();
    let mut tx = unsigned.tx;
    args.preimage = sighash::calc_preimage(
        &tx,
        0,
        f.swap.locking_script().to_bytes(),
        SIGHASH_ALL_FORKID,
        SWAP_SATOSHIS + 1,
    )
    .unwrap();
    tx.inputs[0].unlocking_script = Some(args.to_unlocking_script().unwrap());

    match rejection(f.check(&tx, 0)) {
        Rejection::PreimageMismatch(reason) => assert!(reason.contains("value")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_preimage_from_other_transaction() {
    let f = Fixture::new();
    let signed = f.builder(f.attest(700, 300)).build().unwrap().sign().unwrap();
    let mut other = signed.clone();
    other.lock_time = 1;
    assert!(matches!(rejection(f.check(&other, 0)), Rejection::PreimageMismatch(_)));
}

#[test]
fn test_truncated_unlocking_script() {
    let f = Fixture::new();
    let mut tx = f.builder(f.attest(700, 300)).build().unwrap().sign().unwrap();
    let mut bytes = tx.inputs[0].unlocking_script.as_ref().unwrap().to_bytes().to_vec();
    bytes.truncate(bytes.len() - 10);
    tx.inputs[0].unlocking_script = Some(Script::from(bytes));
    assert!(matches!(f.check(&tx, 0), Err(CovenantError::MalformedInput(_))));
}

#[test]
fn test_order_for_other_contracts() {
    let f = Fixture::new();
    let mut order = f.order(700, 300);
    std::mem::swap(&mut order.contract_id_a, &mut order.contract_id_b);
    let attestation = f.witness.attest_swap(&order).unwrap();
    assert!(matches!(f.builder(attestation).build(), Err(CovenantError::Oracle(_))));
}

#[test]
fn test_swap_status_after_settlement() {
    let f = Fixture::new();
    let utxo = f.utxo();
    assert_eq!(SwapStatus::observe(&utxo.txid, utxo.vout, &[]), SwapStatus::Open);
    let tx = f.builder(f.attest(700, 300)).build().unwrap().sign().unwrap();
    assert_eq!(SwapStatus::observe(&utxo.txid, utxo.vout, &[tx]), SwapStatus::Settled);
}
