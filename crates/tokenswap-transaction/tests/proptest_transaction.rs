use proptest::prelude::*;

use tokenswap_script::Script;
use tokenswap_transaction::sighash::{SighashPreimage, SIGHASH_ALL_FORKID};
use tokenswap_transaction::{Transaction, TransactionInput, TransactionOutput};

/// Strategy for a transaction whose inputs all carry their source output.
fn arb_transaction() -> impl Strategy<Value = Transaction> {
    let arb_input = (
        prop::array::uniform32(any::<u8>()),
        any::<u32>(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
        prop::collection::vec(any::<u8>(), 0..96),
        any::<u64>(),
    )
        .prop_map(|(hash, idx, unlocking, seq, locking, value)| {
            let mut input = TransactionInput::new();
            input.source_txid = hash;
            input.source_tx_out_index = idx;
            if !unlocking.is_empty() {
                input.unlocking_script = Some(Script::from_bytes(&unlocking));
            }
            input.sequence_number = seq;
            input.set_source_output(Some(TransactionOutput::new(value, Script::from_bytes(&locking))));
            input
        });

    let arb_output = (any::<u64>(), prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(satoshis, script)| TransactionOutput::new(satoshis, Script::from_bytes(&script)));

    (
        any::<u32>(),
        prop::collection::vec(arb_input, 1..4),
        prop::collection::vec(arb_output, 1..7),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, lock_time)| {
            let mut tx = Transaction::new();
            tx.version = version;
            tx.lock_time = lock_time;
            inputs.into_iter().for_each(|i| tx.add_input(i));
            outputs.into_iter().for_each(|o| tx.add_output(o));
            tx
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transaction_bytes_parse_back(tx in arb_transaction()) {
        let parsed = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        prop_assert_eq!(parsed.to_bytes(), tx.to_bytes());
    }

    #[test]
    fn parsed_preimage_reserializes_and_digests(tx in arb_transaction()) {
        for index in 0..tx.input_count() {
            let bytes = tx.calc_input_preimage(index, SIGHASH_ALL_FORKID).unwrap();
            let preimage = SighashPreimage::parse(&bytes).unwrap();
            prop_assert_eq!(preimage.to_bytes(), bytes);
            prop_assert_eq!(
                preimage.digest(),
                tx.calc_input_signature_hash(index, SIGHASH_ALL_FORKID).unwrap()
            );
            prop_assert_eq!(Some(preimage.value), tx.inputs[index].source_tx_satoshis());
        }
    }
}
