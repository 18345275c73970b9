//! Shared fixtures: two tokens, a swap between them and its witness.
#![allow(dead_code)]

use tokenswap_covenant::descriptor::DEFAULT_TOKEN_BRFC_ID;
use tokenswap_covenant::swap::NOTIFY_SATOSHIS;
use tokenswap_covenant::{
    ContractId, CovenantError, CovenantVerifier, OracleKeySet, Pkh, RabinWitness, Rejection,
    SettlementBuilder, SwapAttestation, SwapCovenant, SwapOrder, SwapParams, SwapUtxo,
    TokenCovenant, TokenParams, TxContext, Witness,
};
use tokenswap_primitives::chainhash::Hash;
use tokenswap_primitives::rabin::{mersenne, RabinPrivateKey};
use tokenswap_transaction::Transaction;

pub const SWAP_TXID: &str = "1477af6b2667c29670467e4e0728b685ee07b240235771862318e29ddbe58458";
pub const CONTRACT_ID_A: &str = "6b2e97ea4fe3c1d04b6c3bbf2e0c5cbf8cc39b3c85c6ba8b1c0d7bb1a7e6d3f1";
pub const CONTRACT_ID_B: &str = "0e0ce4cc4e1c6e9e1e4c2f3e6a4b3a9a7f2c8c0f5d0b7a1e5f3c2b1a09080706";

pub const ISSUER: Pkh = [0x1d; 20];
pub const BUYER: Pkh = [0xb1; 20];
pub const CHANGE: Pkh = [0xc4; 20];

pub const SWAP_SATOSHIS: u64 = 100_000;
pub const CHANGE_SATOSHIS: u64 = 1000;
pub const TOKEN_B_SUPPLY: u64 = 1000;

pub fn witness_key() -> RabinPrivateKey {
    RabinPrivateKey::from_primes(mersenne(127), mersenne(521)).unwrap()
}

pub fn rogue_key() -> RabinPrivateKey {
    RabinPrivateKey::from_primes(mersenne(521), mersenne(607)).unwrap()
}

pub fn token(contract_id: &str, max_supply: u64) -> TokenCovenant {
    let w = witness_key().public_key().clone();
    TokenCovenant::new(TokenParams {
        brfc_id: DEFAULT_TOKEN_BRFC_ID.to_vec(),
        contract_id: contract_id.parse().unwrap(),
        issuer_pkh: ISSUER,
        oracle_keys: OracleKeySet::from_slots([None, Some(w.clone()), Some(w.clone()), Some(w)]),
        max_supply,
    })
    .unwrap()
}

pub struct Fixture {
    pub witness: RabinWitness,
    pub token_a: TokenCovenant,
    pub token_b: TokenCovenant,
    pub swap: SwapCovenant,
}

impl Fixture {
    /// The witness doubles as issuer and seller, as in a typical listing.
    pub fn new() -> Self {
        let witness = RabinWitness::new(witness_key());
        let token_a = token(CONTRACT_ID_A, 0);
        let token_b = token(CONTRACT_ID_B, TOKEN_B_SUPPLY);
        let swap = SwapCovenant::new(SwapParams {
            witness_pkh: ISSUER,
            token_a_hash: token_a.code_hash(),
            token_b_hash: token_b.code_hash(),
            contract_id_a: ContractId::from_hex(CONTRACT_ID_A).unwrap(),
            contract_id_b: ContractId::from_hex(CONTRACT_ID_B).unwrap(),
            issuer_pkh: ISSUER,
            oracle_key: witness.public_key().clone(),
            notify_satoshis: NOTIFY_SATOSHIS,
        })
        .unwrap();
        Fixture { witness, token_a, token_b, swap }
    }

    pub fn order(&self, token_b_amount: u64, change: u64) -> SwapOrder {
        SwapOrder {
            contract_id_a: ContractId::from_hex(CONTRACT_ID_A).unwrap(),
            buyer_pkh: BUYER,
            token_a_amount: 1000,
            contract_id_b: ContractId::from_hex(CONTRACT_ID_B).unwrap(),
            seller_pkh: ISSUER,
            token_b_amount,
            change_token_b_amount: change,
        }
    }

    pub fn attest(&self, token_b_amount: u64, change: u64) -> SwapAttestation {
        self.witness.attest_swap(&self.order(token_b_amount, change)).unwrap()
    }

    pub fn utxo(&self) -> SwapUtxo {
        SwapUtxo { txid: Hash::from_hex(SWAP_TXID).unwrap(), vout: 0, satoshis: SWAP_SATOSHIS }
    }

    pub fn builder(&self, attestation: SwapAttestation) -> SettlementBuilder<'_> {
        SettlementBuilder::new(
            &self.swap,
            self.utxo(),
            attestation,
            self.token_a.code_part().clone(),
            self.token_b.code_part().clone(),
        )
        .change(CHANGE, CHANGE_SATOSHIS)
        .previous_token_b_amount(TOKEN_B_SUPPLY)
    }

    pub fn verifier(&self) -> CovenantVerifier {
        CovenantVerifier::new()
            .with(self.swap.clone())
            .with(self.token_a.clone())
            .with(self.token_b.clone())
    }

    /// Run the covenant owning input `index` and return its typed result.
    pub fn check(&self, tx: &Transaction, index: usize) -> Result<(), CovenantError> {
        let input = &tx.inputs[index];
        let source = input.source_tx_output().unwrap();
        let ctx = TxContext { tx, input_index: index, input_satoshis: source.satoshis };
        self.verifier().check(
            input.unlocking_script.as_ref().unwrap(),
            &source.locking_script,
            &ctx,
        )
    }
}

pub fn rejection(result: Result<(), CovenantError>) -> Rejection {
    match result {
        Err(CovenantError::Rejected(r)) => r,
        other => panic!("expected a rejection, got {:?}", other),
    }
}
