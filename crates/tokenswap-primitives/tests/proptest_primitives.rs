use proptest::prelude::*;

use tokenswap_primitives::chainhash::Hash;
use tokenswap_primitives::rabin::{mersenne, RabinPrivateKey};
use tokenswap_primitives::util::{BsvReader, BsvWriter, VarInt};

fn oracle_key() -> RabinPrivateKey {
    RabinPrivateKey::from_primes(mersenne(127), mersenne(521)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rabin_signature_verifies_for_its_message(
        msg in prop::collection::vec(any::<u8>(), 0..160)
    ) {
        let sk = oracle_key();
        let sig = sk.sign(&msg).unwrap();
        prop_assert!(sk.public_key().verify(&msg, &sig));
    }

    #[test]
    fn rabin_signature_rejects_flipped_byte(
        msg in prop::collection::vec(any::<u8>(), 1..96),
        idx in any::<prop::sample::Index>(),
    ) {
        let sk = oracle_key();
        let sig = sk.sign(&msg).unwrap();
        let mut tampered = msg.clone();
        let i = idx.index(tampered.len());
        tampered[i] ^= 0x01;
        prop_assert!(!sk.public_key().verify(&tampered, &sig));
    }

    #[test]
    fn varint_reads_back(v in any::<u64>()) {
        let mut w = BsvWriter::new();
        w.write_varint(VarInt(v));
        prop_assert_eq!(w.len(), VarInt(v).length());
        let bytes = w.into_bytes();
        let mut r = BsvReader::new(&bytes);
        prop_assert_eq!(r.read_varint().unwrap().value(), v);
    }

    #[test]
    fn hash_display_parses_back(bytes in prop::array::uniform32(any::<u8>())) {
        let h = Hash::new(bytes);
        let parsed: Hash = h.to_string().parse().unwrap();
        prop_assert_eq!(parsed, h);
    }
}
