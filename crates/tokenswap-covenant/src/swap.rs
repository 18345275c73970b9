//! Swap covenant.
//!
//! A one-shot contract that settles an exchange of token A for token B.
//! Settlement is valid only if the spending transaction's outputs are
//! byte-for-byte the six outputs rebuilt from the oracle-attested terms.

use num_bigint::BigInt;
use tracing::debug;

use tokenswap_primitives::chainhash::Hash;
use tokenswap_primitives::hash::hash160;
use tokenswap_primitives::rabin::{RabinPublicKey, RabinSignature};
use tokenswap_script::Script;
use tokenswap_transaction::output::serialize_outputs;
use tokenswap_transaction::template::p2pkh;
use tokenswap_transaction::{Transaction, TransactionOutput};

use crate::descriptor::{ContractDescriptor, ParamValue};
use crate::error::{CovenantError, Rejection, TokenSlot};
use crate::layout::{ArgReader, ContractId, Pkh, TokenState};
use crate::oracle::{OracleVerifier, SwapOrder};
use crate::preimage::{check_outputs, check_preimage};
use crate::token::signature_value;
use crate::verifier::TxContext;

/// Default satoshis carried by each notification output.
pub const NOTIFY_SATOSHIS: u64 = 546;

/// Number of outputs a settlement rebuilds.
pub const SETTLEMENT_OUTPUTS: usize = 6;

/// Deployment parameters of a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    /// Witness (oracle operator) address hash, notified on settlement.
    pub witness_pkh: Pkh,
    /// Hash160 of token A's code part.
    pub token_a_hash: [u8; 20],
    /// Hash160 of token B's code part.
    pub token_b_hash: [u8; 20],
    /// Contract id of token A.
    pub contract_id_a: ContractId,
    /// Contract id of token B.
    pub contract_id_b: ContractId,
    /// Issuer address hash.
    pub issuer_pkh: Pkh,
    /// Oracle key that signs the swap terms.
    pub oracle_key: RabinPublicKey,
    /// Satoshis of each notification output. Committed in the locking
    /// script, so every verifier of the swap rebuilds the same outputs.
    pub notify_satoshis: u64,
}

impl SwapParams {
    fn descriptor_args(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("witnessPkh", ParamValue::Bytes(self.witness_pkh.to_vec())),
            ("tokenAHash", ParamValue::Bytes(self.token_a_hash.to_vec())),
            ("tokenBHash", ParamValue::Bytes(self.token_b_hash.to_vec())),
            ("contractIdA", ParamValue::Bytes(self.contract_id_a.as_bytes().to_vec())),
            ("contractIdB", ParamValue::Bytes(self.contract_id_b.as_bytes().to_vec())),
            ("issuerPkh", ParamValue::Bytes(self.issuer_pkh.to_vec())),
            ("oracleKey", ParamValue::Int(BigInt::from(self.oracle_key.modulus().clone()))),
            ("notifySatoshis", ParamValue::Int(BigInt::from(self.notify_satoshis))),
        ]
    }
}

/// Arguments of a swap `settle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleArgs {
    /// Receives token A.
    pub buyer: Pkh,
    /// Amount of token A.
    pub token_a_amount: u64,
    /// Receives token B.
    pub seller: Pkh,
    /// Amount of token B.
    pub token_b_amount: u64,
    /// Receives the token B change and the satoshi change.
    pub change_pkh: Pkh,
    /// Token B change amount.
    pub change_token_amount: u64,
    /// Satoshis of the P2PKH change output.
    pub change_satoshis: u64,
    /// Satoshis locked in each token output.
    pub holder_satoshis: u64,
    /// Serialized outputs placed before the six settlement outputs.
    pub prev_output: Vec<u8>,
    /// Code part of token A.
    pub token_a_code: Script,
    /// Code part of token B.
    pub token_b_code: Script,
    /// BIP-143 preimage of this spend.
    pub preimage: Vec<u8>,
    /// Oracle signature over the swap terms.
    pub oracle_sig: RabinSignature,
}

impl SettleArgs {
    const ARG_COUNT: usize = 14;

    /// The terms these arguments claim were attested.
    pub fn order(&self, params: &SwapParams) -> SwapOrder {
        SwapOrder {
            contract_id_a: params.contract_id_a,
            buyer_pkh: self.buyer,
            token_a_amount: self.token_a_amount,
            contract_id_b: params.contract_id_b,
            seller_pkh: self.seller,
            token_b_amount: self.token_b_amount,
            change_token_b_amount: self.change_token_amount,
        }
    }

    /// Encode as an unlocking script, one push per argument.
    pub fn to_unlocking_script(&self) -> Result<Script, CovenantError> {
        let mut s = Script::new();
        s.append_push_data(&self.buyer)?;
        s.append_number(&BigInt::from(self.token_a_amount))?;
        s.append_push_data(&self.seller)?;
        s.append_number(&BigInt::from(self.token_b_amount))?;
        s.append_push_data(&self.change_pkh)?;
        s.append_number(&BigInt::from(self.change_token_amount))?;
        s.append_number(&BigInt::from(self.change_satoshis))?;
        s.append_number(&BigInt::from(self.holder_satoshis))?;
        s.append_push_data(&self.prev_output)?;
        s.append_push_data(self.token_a_code.to_bytes())?;
        s.append_push_data(self.token_b_code.to_bytes())?;
        s.append_push_data(&self.preimage)?;
        s.append_number(&BigInt::from(self.oracle_sig.sig.clone()))?;
        s.append_push_data(&self.oracle_sig.padding)?;
        Ok(s)
    }

    /// Decode from an unlocking script.
    pub fn from_unlocking_script(script: &Script) -> Result<Self, CovenantError> {
        let mut args = ArgReader::new(script, "settle", Self::ARG_COUNT)?;
        Ok(SettleArgs {
            buyer: args.pkh("buyer")?,
            token_a_amount: args.u64("tokenAAmount")?,
            seller: args.pkh("seller")?,
            token_b_amount: args.u64("tokenBAmount")?,
            change_pkh: args.pkh("changeAddress")?,
            change_token_amount: args.u64("changeTokenAmount")?,
            change_satoshis: args.u64("changeSatoshis")?,
            holder_satoshis: args.u64("holderSatoshis")?,
            prev_output: args.bytes("prevOutput")?,
            token_a_code: Script::from(args.bytes("tokenACode")?),
            token_b_code: Script::from(args.bytes("tokenBCode")?),
            preimage: args.bytes("preimage")?,
            oracle_sig: {
                let sig = signature_value(&args.number("oracleSig")?)?;
                RabinSignature::new(sig, args.bytes("oraclePadding")?)
            },
        })
    }
}

/// Whether a swap UTXO has been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStatus {
    /// Unspent; can still be settled.
    Open,
    /// Spent by a settlement.
    Settled,
}

impl SwapStatus {
    /// Status of the swap at `txid:vout` given the transactions seen so far.
    pub fn observe(txid: &Hash, vout: u32, txs: &[Transaction]) -> SwapStatus {
        let spent = txs.iter().flat_map(|tx| tx.inputs.iter()).any(|input| {
            input.source_txid == *txid.as_bytes() && input.source_tx_out_index == vout
        });
        if spent {
            SwapStatus::Settled
        } else {
            SwapStatus::Open
        }
    }
}

/// A deployed swap contract.
#[derive(Debug, Clone)]
pub struct SwapCovenant {
    params: SwapParams,
    locking_script: Script,
}

impl SwapCovenant {
    /// Instantiate the built-in swap descriptor.
    pub fn new(params: SwapParams) -> Result<Self, CovenantError> {
        Self::with_descriptor(params, &ContractDescriptor::token_swap()?)
    }

    /// Instantiate a swap from a given descriptor.
    pub fn with_descriptor(
        params: SwapParams,
        descriptor: &ContractDescriptor,
    ) -> Result<Self, CovenantError> {
        if params.notify_satoshis == 0 {
            return Err(CovenantError::Config("notify_satoshis must be non-zero".into()));
        }
        let locking_script = descriptor.instantiate(&params.descriptor_args())?;
        Ok(SwapCovenant { params, locking_script })
    }

    /// Deployment parameters.
    pub fn params(&self) -> &SwapParams {
        &self.params
    }

    /// The swap's locking script.
    pub fn locking_script(&self) -> &Script {
        &self.locking_script
    }

    /// Satoshis of each notification output.
    pub fn notify_satoshis(&self) -> u64 {
        self.params.notify_satoshis
    }

    /// Rebuild the six settlement outputs, in order.
    pub fn expected_outputs(
        &self,
        args: &SettleArgs,
    ) -> Result<Vec<TransactionOutput>, CovenantError> {
        let token_output =
            |code: &Script, owner: Pkh, amount: u64| -> Result<TransactionOutput, CovenantError> {
                let mut script = code.clone();
                script.append_script(&TokenState::holder(owner, amount).to_script()?);
                Ok(TransactionOutput::new(args.holder_satoshis, script))
            };
        Ok(vec![
            token_output(&args.token_a_code, args.buyer, args.token_a_amount)?,
            token_output(&args.token_b_code, args.seller, args.token_b_amount)?,
            token_output(&args.token_b_code, args.change_pkh, args.change_token_amount)?,
            TransactionOutput::new(self.notify_satoshis(), p2pkh::lock(&args.buyer)),
            TransactionOutput::new(self.notify_satoshis(), p2pkh::lock(&self.params.witness_pkh)),
            TransactionOutput::new(args.change_satoshis, p2pkh::lock(&args.change_pkh)),
        ])
    }

    /// Check a settlement spending the swap UTXO locked by `locking`.
    ///
    /// Checks run in order and stop at the first failure: preimage, token
    /// code hashes, oracle signature, then the rebuilt outputs.
    pub fn settle(
        &self,
        locking: &Script,
        args: &SettleArgs,
        ctx: &TxContext<'_>,
    ) -> Result<(), CovenantError> {
        if locking != &self.locking_script {
            return Err(CovenantError::MalformedInput(
                "locking script is not this swap".into(),
            ));
        }
        let preimage = check_preimage(&args.preimage, locking, ctx)?;
        debug!("swap preimage ok");

        if hash160(args.token_a_code.to_bytes()) != self.params.token_a_hash {
            return Err(Rejection::TokenCodeMismatch { slot: TokenSlot::A }.into());
        }
        if hash160(args.token_b_code.to_bytes()) != self.params.token_b_hash {
            return Err(Rejection::TokenCodeMismatch { slot: TokenSlot::B }.into());
        }
        debug!("swap token codes ok");

        let order = args.order(&self.params);
        if !OracleVerifier::verify(&self.params.oracle_key, &order.message(), &args.oracle_sig) {
            return Err(Rejection::BadOracleSignature.into());
        }
        debug!("swap oracle signature ok");

        let mut outputs = args.prev_output.clone();
        outputs.extend_from_slice(&serialize_outputs(&self.expected_outputs(args)?));
        check_outputs(&preimage, &outputs)?;
        debug!("swap outputs ok");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use tokenswap_primitives::rabin::{mersenne, RabinPrivateKey};

    fn params() -> SwapParams {
        let key = RabinPrivateKey::from_primes(mersenne(127), mersenne(521)).unwrap();
        SwapParams {
            witness_pkh: [0x77; 20],
            token_a_hash: [0xa0; 20],
            token_b_hash: [0xb0; 20],
            contract_id_a: ContractId::new([0x0a; 32]),
            contract_id_b: ContractId::new([0x0b; 32]),
            issuer_pkh: [0x77; 20],
            oracle_key: key.public_key().clone(),
            notify_satoshis: NOTIFY_SATOSHIS,
        }
    }

    fn args() -> SettleArgs {
        SettleArgs {
            buyer: [1; 20],
            token_a_amount: 1000,
            seller: [2; 20],
            token_b_amount: 700,
            change_pkh: [3; 20],
            change_token_amount: 300,
            change_satoshis: 1000,
            holder_satoshis: 546,
            prev_output: vec![],
            token_a_code: Script::from_asm("OP_1 OP_RETURN").unwrap(),
            token_b_code: Script::from_asm("OP_2 OP_RETURN").unwrap(),
            preimage: vec![0x55; 200],
            oracle_sig: RabinSignature::new(BigUint::from(0xdead_beefu64) << 400u32, vec![0]),
        }
    }

    #[test]
    fn test_expected_outputs_order() {
        let swap = SwapCovenant::new(params()).unwrap();
        let outputs = swap.expected_outputs(&args()).unwrap();
        assert_eq!(outputs.len(), SETTLEMENT_OUTPUTS);
        let sats: Vec<u64> = outputs.iter().map(|o| o.satoshis).collect();
        assert_eq!(sats, vec![546, 546, 546, 546, 546, 1000]);

        let state = |i: usize| {
            let bytes = outputs[i].locking_script.to_bytes();
            TokenState::from_bytes(&bytes[bytes.len() - 53..]).unwrap()
        };
        assert_eq!(state(0), TokenState::holder([1; 20], 1000));
        assert_eq!(state(1), TokenState::holder([2; 20], 700));
        assert_eq!(state(2), TokenState::holder([3; 20], 300));
        assert_eq!(outputs[3].locking_script.public_key_hash().unwrap(), [1; 20]);
        assert_eq!(outputs[4].locking_script.public_key_hash().unwrap(), [0x77; 20]);
        assert_eq!(outputs[5].locking_script.public_key_hash().unwrap(), [3; 20]);
    }

    #[test]
    fn test_notify_satoshis_committed_in_script() {
        let default = SwapCovenant::new(params()).unwrap();
        let swap = SwapCovenant::new(SwapParams { notify_satoshis: 600, ..params() }).unwrap();
        assert_ne!(default.locking_script(), swap.locking_script());

        let outputs = swap.expected_outputs(&args()).unwrap();
        assert_eq!(outputs[3].satoshis, 600);
        assert_eq!(outputs[4].satoshis, 600);
    }

    #[test]
    fn test_zero_notify_satoshis() {
        let result = SwapCovenant::new(SwapParams { notify_satoshis: 0, ..params() });
        assert!(matches!(result, Err(CovenantError::Config(_))));
    }

    #[test]
    fn test_settle_args_script() {
        let script = args().to_unlocking_script().unwrap();
        assert_eq!(script.chunks().unwrap().len(), 14);
        assert_eq!(SettleArgs::from_unlocking_script(&script).unwrap(), args());
    }

    #[test]
    fn test_settle_args_wrong_count() {
        let mut script = args().to_unlocking_script().unwrap();
        script.append_push_data(&[1]).unwrap();
        assert!(matches!(
            SettleArgs::from_unlocking_script(&script),
            Err(CovenantError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_locking_script_tracks_params() {
        let a = SwapCovenant::new(params()).unwrap();
        let mut p = params();
        std::mem::swap(&mut p.token_a_hash, &mut p.token_b_hash);
        let b = SwapCovenant::new(p).unwrap();
        assert_ne!(a.locking_script(), b.locking_script());
    }

    #[test]
    fn test_status() {
        let txid = Hash::new([9; 32]);
        let mut spender = Transaction::new();
        spender.add_input_from(&txid, 0, Script::new(), 546);
        assert_eq!(SwapStatus::observe(&txid, 0, &[]), SwapStatus::Open);
        assert_eq!(SwapStatus::observe(&txid, 1, &[spender.clone()]), SwapStatus::Open);
        assert_eq!(SwapStatus::observe(&txid, 0, &[spender]), SwapStatus::Settled);
    }
}
