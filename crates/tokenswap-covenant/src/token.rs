//! Token covenant.
//!
//! A token UTXO is locked by `codePart || <state>`, where the code part is
//! fixed per contract (issuer, contract id, oracle keys, max supply) and the
//! trailing 53-byte push carries the authorization counter, owner and
//! balance. Spending it must re-create the same code part with the new state.

use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};
use tracing::debug;

use tokenswap_primitives::hash::hash160;
use tokenswap_primitives::rabin::{RabinPublicKey, RabinSignature};
use tokenswap_script::Script;
use tokenswap_transaction::TransactionOutput;

use crate::descriptor::{ContractDescriptor, ParamValue};
use crate::error::{CovenantError, Rejection};
use crate::layout::{ArgReader, ContractId, Pkh, TokenState, STATE_LEN};
use crate::oracle::{OracleVerifier, TransferRequest};
use crate::preimage::{check_outputs, check_preimage};
use crate::verifier::TxContext;

/// Number of oracle key slots in a token contract.
pub const ORACLE_KEY_SLOTS: usize = 4;

/// The oracle keys a token accepts gated transfers from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleKeySet([Option<RabinPublicKey>; ORACLE_KEY_SLOTS]);

impl OracleKeySet {
    /// Fill the first slots with `keys`.
    ///
    /// # Returns
    /// The key set, or `Oracle` if more than four keys are given.
    pub fn new(keys: Vec<RabinPublicKey>) -> Result<Self, CovenantError> {
        if keys.len() > ORACLE_KEY_SLOTS {
            return Err(CovenantError::Oracle(format!(
                "at most {} oracle keys, got {}",
                ORACLE_KEY_SLOTS,
                keys.len()
            )));
        }
        let mut slots: [Option<RabinPublicKey>; ORACLE_KEY_SLOTS] = Default::default();
        for (slot, key) in slots.iter_mut().zip(keys) {
            *slot = Some(key);
        }
        Ok(OracleKeySet(slots))
    }

    /// Build a key set with explicit (possibly empty) slots.
    pub fn from_slots(slots: [Option<RabinPublicKey>; ORACLE_KEY_SLOTS]) -> Self {
        OracleKeySet(slots)
    }

    /// The configured keys, skipping empty slots.
    pub fn keys(&self) -> impl Iterator<Item = &RabinPublicKey> {
        self.0.iter().flatten()
    }

    /// The number pushed for slot `index`: the modulus, or 0 when empty.
    pub fn slot_value(&self, index: usize) -> BigInt {
        match self.0.get(index) {
            Some(Some(key)) => BigInt::from(key.modulus().clone()),
            _ => BigInt::zero(),
        }
    }
}

impl OracleVerifier for OracleKeySet {
    /// Accept a proof from any configured key.
    fn verify(&self, message: &[u8], proof: &RabinSignature) -> bool {
        self.keys().any(|k| k.verify(message, proof))
    }
}

/// Deployment parameters of a token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParams {
    /// BRFC protocol id.
    pub brfc_id: Vec<u8>,
    /// Contract id.
    pub contract_id: ContractId,
    /// Issuer public key hash.
    pub issuer_pkh: Pkh,
    /// Oracle keys for gated transfers.
    pub oracle_keys: OracleKeySet,
    /// Maximum supply, 0 for unbounded.
    pub max_supply: u64,
}

impl TokenParams {
    fn descriptor_args(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("brfcId", ParamValue::Bytes(self.brfc_id.clone())),
            ("contractId", ParamValue::Bytes(self.contract_id.as_bytes().to_vec())),
            ("issuerPkh", ParamValue::Bytes(self.issuer_pkh.to_vec())),
            ("oracleKey0", ParamValue::Int(self.oracle_keys.slot_value(0))),
            ("oracleKey1", ParamValue::Int(self.oracle_keys.slot_value(1))),
            ("oracleKey2", ParamValue::Int(self.oracle_keys.slot_value(2))),
            ("oracleKey3", ParamValue::Int(self.oracle_keys.slot_value(3))),
            ("maxSupply", ParamValue::Int(BigInt::from(self.max_supply))),
        ]
    }
}

/// Arguments of a token `transfer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferArgs {
    /// Owner of the re-created token output.
    pub new_owner: Pkh,
    /// Balance of the re-created token output.
    pub new_amount: u64,
    /// Satoshis locked in the re-created token output.
    pub holder_satoshis: u64,
    /// Serialized outputs before the token output.
    pub prev_outputs: Vec<u8>,
    /// Serialized outputs after the token output.
    pub next_outputs: Vec<u8>,
    /// BIP-143 preimage of this spend.
    pub preimage: Vec<u8>,
    /// Oracle proof, required when the authorization counter is non-zero.
    pub auth_proof: Option<RabinSignature>,
}

impl TransferArgs {
    const ARG_COUNT: usize = 8;

    /// Encode as an unlocking script, one push per argument.
    ///
    /// A missing proof is written as signature 0 with empty padding.
    pub fn to_unlocking_script(&self) -> Result<Script, CovenantError> {
        let mut s = Script::new();
        s.append_push_data(&self.new_owner)?;
        s.append_number(&BigInt::from(self.new_amount))?;
        s.append_number(&BigInt::from(self.holder_satoshis))?;
        s.append_push_data(&self.prev_outputs)?;
        s.append_push_data(&self.next_outputs)?;
        s.append_push_data(&self.preimage)?;
        match &self.auth_proof {
            Some(proof) => {
                s.append_number(&BigInt::from(proof.sig.clone()))?;
                s.append_push_data(&proof.padding)?;
            }
            None => {
                s.append_number(&BigInt::zero())?;
                s.append_push_data(&[])?;
            }
        }
        Ok(s)
    }

    /// Decode from an unlocking script.
    pub fn from_unlocking_script(script: &Script) -> Result<Self, CovenantError> {
        let mut args = ArgReader::new(script, "transfer", Self::ARG_COUNT)?;
        let new_owner = args.pkh("newOwner")?;
        let new_amount = args.u64("newAmount")?;
        let holder_satoshis = args.u64("holderSatoshis")?;
        let prev_outputs = args.bytes("prevOutputs")?;
        let next_outputs = args.bytes("nextOutputs")?;
        let preimage = args.bytes("preimage")?;
        let sig = args.number("authSig")?;
        let padding = args.bytes("authPadding")?;
        let auth_proof = if sig.is_zero() && padding.is_empty() {
            None
        } else {
            Some(RabinSignature::new(signature_value(&sig)?, padding))
        };
        Ok(TransferArgs {
            new_owner,
            new_amount,
            holder_satoshis,
            prev_outputs,
            next_outputs,
            preimage,
            auth_proof,
        })
    }
}

pub(crate) fn signature_value(n: &BigInt) -> Result<BigUint, CovenantError> {
    if n.is_negative() {
        return Err(CovenantError::MalformedInput("oracle signature is negative".into()));
    }
    Ok(n.magnitude().clone())
}

/// A deployed token contract.
#[derive(Debug, Clone)]
pub struct TokenCovenant {
    params: TokenParams,
    code_part: Script,
    code_hash: [u8; 20],
}

impl TokenCovenant {
    /// Instantiate the built-in token descriptor.
    pub fn new(params: TokenParams) -> Result<Self, CovenantError> {
        Self::with_descriptor(params, &ContractDescriptor::token()?)
    }

    /// Instantiate a token from a given descriptor.
    pub fn with_descriptor(
        params: TokenParams,
        descriptor: &ContractDescriptor,
    ) -> Result<Self, CovenantError> {
        let code_part = descriptor.instantiate(&params.descriptor_args())?;
        let code_hash = hash160(code_part.to_bytes());
        Ok(TokenCovenant { params, code_part, code_hash })
    }

    /// Deployment parameters.
    pub fn params(&self) -> &TokenParams {
        &self.params
    }

    /// The code part shared by every UTXO of this token.
    pub fn code_part(&self) -> &Script {
        &self.code_part
    }

    /// Hash160 of the code part.
    pub fn code_hash(&self) -> [u8; 20] {
        self.code_hash
    }

    /// Locking script for a token UTXO in `state`.
    pub fn locking_script(&self, state: &TokenState) -> Result<Script, CovenantError> {
        let mut script = self.code_part.clone();
        script.append_script(&state.to_script()?);
        Ok(script)
    }

    /// Decode the state of a token UTXO of this contract.
    ///
    /// # Returns
    /// The state, or `MalformedInput` if the script is not this token's code
    /// part followed by exactly one 53-byte state push.
    pub fn parse_locking_script(&self, script: &Script) -> Result<TokenState, CovenantError> {
        if !script.starts_with(&self.code_part) {
            return Err(CovenantError::MalformedInput(format!(
                "not a locking script of token {}",
                self.params.contract_id
            )));
        }
        let tail = &script.to_bytes()[self.code_part.len()..];
        match tail.split_first() {
            Some((&len, state)) if len as usize == STATE_LEN && state.len() == STATE_LEN => {
                TokenState::from_bytes(state)
            }
            _ => Err(CovenantError::MalformedInput(format!(
                "token state must be a single {}-byte push",
                STATE_LEN
            ))),
        }
    }

    /// The output a transfer must create.
    pub fn expected_output(
        &self,
        auth_counter: u8,
        args: &TransferArgs,
    ) -> Result<TransactionOutput, CovenantError> {
        let state = TokenState { auth_counter, owner: args.new_owner, amount: args.new_amount };
        Ok(TransactionOutput::new(args.holder_satoshis, self.locking_script(&state)?))
    }

    /// Check a spend of the token UTXO locked by `locking`.
    ///
    /// Checks run in order and stop at the first failure: preimage, the
    /// re-created output, the oracle proof on the gated path, then supply.
    pub fn transfer(
        &self,
        locking: &Script,
        args: &TransferArgs,
        ctx: &TxContext<'_>,
    ) -> Result<(), CovenantError> {
        let state = self.parse_locking_script(locking)?;
        let preimage = check_preimage(&args.preimage, locking, ctx)?;
        debug!(contract = %self.params.contract_id, "token preimage ok");

        let expected = self.expected_output(state.auth_counter, args)?;
        let mut outputs = args.prev_outputs.clone();
        outputs.extend_from_slice(&expected.to_bytes());
        outputs.extend_from_slice(&args.next_outputs);
        check_outputs(&preimage, &outputs)?;
        debug!(contract = %self.params.contract_id, "token outputs ok");

        if state.is_oracle_gated() {
            let request = TransferRequest {
                contract_id: self.params.contract_id,
                new_owner: args.new_owner,
                new_amount: args.new_amount,
            };
            let verified = args
                .auth_proof
                .as_ref()
                .is_some_and(|proof| self.params.oracle_keys.verify(&request.message(), proof));
            if !verified {
                return Err(Rejection::BadOracleSignature.into());
            }
            let limit = self.params.max_supply;
            if limit != 0 && args.new_amount > limit {
                return Err(Rejection::SupplyExceeded { amount: args.new_amount, limit }.into());
            }
        } else if args.new_amount > state.amount {
            return Err(Rejection::SupplyExceeded {
                amount: args.new_amount,
                limit: state.amount,
            }
            .into());
        }
        Ok(())
    }
}
