//! Oracle attestations.
//!
//! The oracle (witness) signs swap terms and gated token transfers with a
//! Rabin key. Covenants only ever need the verification side, which is the
//! [`OracleVerifier`] capability; signing lives behind the [`Witness`] trait.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tokenswap_primitives::rabin::{RabinPrivateKey, RabinPublicKey, RabinSignature};

use crate::error::CovenantError;
use crate::layout::{encode_amount, pkh_hex, ContractId, Pkh, AMOUNT_LEN, CONTRACT_ID_LEN, PKH_LEN};

/// Something that can check an oracle proof over a message.
pub trait OracleVerifier {
    /// Return `true` if `proof` is a valid signature over `message`.
    fn verify(&self, message: &[u8], proof: &RabinSignature) -> bool;
}

impl OracleVerifier for RabinPublicKey {
    fn verify(&self, message: &[u8], proof: &RabinSignature) -> bool {
        RabinPublicKey::verify(self, message, proof)
    }
}

/// Terms of a swap as attested by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    /// Contract id of token A.
    pub contract_id_a: ContractId,
    /// Receives token A.
    #[serde(with = "pkh_hex")]
    pub buyer_pkh: Pkh,
    /// Amount of token A.
    pub token_a_amount: u64,
    /// Contract id of token B.
    pub contract_id_b: ContractId,
    /// Receives token B.
    #[serde(with = "pkh_hex")]
    pub seller_pkh: Pkh,
    /// Amount of token B.
    pub token_b_amount: u64,
    /// Token B returned as change.
    pub change_token_b_amount: u64,
}

impl SwapOrder {
    /// The signed message:
    /// `cidA || buyer || amountA || cidB || seller || amountB || change`.
    pub fn message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(2 * (CONTRACT_ID_LEN + PKH_LEN) + 3 * AMOUNT_LEN);
        msg.extend_from_slice(self.contract_id_a.as_bytes());
        msg.extend_from_slice(&self.buyer_pkh);
        msg.extend_from_slice(&encode_amount(self.token_a_amount));
        msg.extend_from_slice(self.contract_id_b.as_bytes());
        msg.extend_from_slice(&self.seller_pkh);
        msg.extend_from_slice(&encode_amount(self.token_b_amount));
        msg.extend_from_slice(&encode_amount(self.change_token_b_amount));
        msg
    }
}

/// An oracle-gated token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Contract id of the token.
    pub contract_id: ContractId,
    /// New owner.
    #[serde(with = "pkh_hex")]
    pub new_owner: Pkh,
    /// New balance.
    pub new_amount: u64,
}

impl TransferRequest {
    /// The signed message: `contractId || newOwner || newAmount`.
    pub fn message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(CONTRACT_ID_LEN + PKH_LEN + AMOUNT_LEN);
        msg.extend_from_slice(self.contract_id.as_bytes());
        msg.extend_from_slice(&self.new_owner);
        msg.extend_from_slice(&encode_amount(self.new_amount));
        msg
    }
}

/// The oracle's response to a swap request.
///
/// `order` echoes the terms that were signed; builders use it rather than
/// their own copy of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAttestation {
    /// Signature and padding.
    pub signature: RabinSignature,
    /// The signed terms.
    pub order: SwapOrder,
}

/// An oracle that attests to swaps and gated transfers.
pub trait Witness {
    /// The key attestations verify under.
    fn public_key(&self) -> &RabinPublicKey;

    /// Sign swap terms.
    fn attest_swap(&self, order: &SwapOrder) -> Result<SwapAttestation, CovenantError>;

    /// Sign a gated transfer.
    fn attest_transfer(&self, request: &TransferRequest) -> Result<RabinSignature, CovenantError>;
}

/// A witness holding a Rabin private key in memory.
#[derive(Debug, Clone)]
pub struct RabinWitness {
    key: RabinPrivateKey,
}

impl RabinWitness {
    /// Create a witness from a private key.
    pub fn new(key: RabinPrivateKey) -> Self {
        RabinWitness { key }
    }

    fn sign(&self, message: &[u8]) -> Result<RabinSignature, CovenantError> {
        self.key.sign(message).map_err(|e| CovenantError::Oracle(e.to_string()))
    }
}

impl Witness for RabinWitness {
    fn public_key(&self) -> &RabinPublicKey {
        self.key.public_key()
    }

    fn attest_swap(&self, order: &SwapOrder) -> Result<SwapAttestation, CovenantError> {
        let signature = self.sign(&order.message())?;
        debug!(padding = signature.padding.len(), "attested swap");
        Ok(SwapAttestation { signature, order: order.clone() })
    }

    fn attest_transfer(&self, request: &TransferRequest) -> Result<RabinSignature, CovenantError> {
        self.sign(&request.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenswap_primitives::rabin::mersenne;

    fn witness() -> RabinWitness {
        RabinWitness::new(RabinPrivateKey::from_primes(mersenne(127), mersenne(521)).unwrap())
    }

    fn order() -> SwapOrder {
        SwapOrder {
            contract_id_a: ContractId::new([0x0a; 32]),
            buyer_pkh: [0xb1; 20],
            token_a_amount: 1000,
            contract_id_b: ContractId::new([0x0b; 32]),
            seller_pkh: [0x5e; 20],
            token_b_amount: 700,
            change_token_b_amount: 300,
        }
    }

    #[test]
    fn test_swap_message_layout() {
        let msg = order().message();
        assert_eq!(msg.len(), 32 + 20 + 32 + 32 + 20 + 32 + 32);
        assert_eq!(&msg[..32], &[0x0a; 32]);
        assert_eq!(&msg[32..52], &[0xb1; 20]);
        assert_eq!(&msg[52..54], &[0xe8, 0x03]);
        assert_eq!(&msg[84..116], &[0x0b; 32]);
        assert_eq!(&msg[168..170], &[0x2c, 0x01]);
    }

    #[test]
    fn test_attest_swap_verifies() {
        let w = witness();
        let att = w.attest_swap(&order()).unwrap();
        assert_eq!(att.order, order());
        assert!(OracleVerifier::verify(w.public_key(), &order().message(), &att.signature));

        let mut other = order();
        other.change_token_b_amount = 301;
        assert!(!OracleVerifier::verify(w.public_key(), &other.message(), &att.signature));
    }

    #[test]
    fn test_attest_transfer() {
        let w = witness();
        let req = TransferRequest {
            contract_id: ContractId::new([1; 32]),
            new_owner: [2; 20],
            new_amount: 50,
        };
        let sig = w.attest_transfer(&req).unwrap();
        assert!(w.public_key().verify(&req.message(), &sig));
        assert_eq!(req.message().len(), 84);
    }

    #[test]
    fn test_order_json() {
        let json = serde_json::to_value(order()).unwrap();
        assert_eq!(json["buyer_pkh"], hex::encode([0xb1; 20]));
        assert_eq!(json["token_b_amount"], 700);
        let back: SwapOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order());
    }
}
