//! Pay-to-Public-Key-Hash (P2PKH) locking scripts.
//!
//! Settlements pay notifications and satoshi change to plain P2PKH outputs:
//! `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.

use tokenswap_script::opcodes::*;
use tokenswap_script::Script;

/// Byte length of a P2PKH locking script.
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// Create a P2PKH locking script paying to a 20-byte public key hash.
///
/// # Arguments
/// * `pkh` - Hash160 of the recipient's public key.
///
/// # Returns
/// The 25-byte P2PKH locking script.
pub fn lock(pkh: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(pkh);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_layout() {
        let pkh: [u8; 20] = hex::decode("e2a623699e81b291c0327f408fea765d534baa2a")
            .unwrap()
            .try_into()
            .unwrap();
        let script = lock(&pkh);
        assert_eq!(script.to_hex(), "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac");
        assert!(script.is_p2pkh());
        assert_eq!(script.public_key_hash().unwrap(), pkh);
    }
}
