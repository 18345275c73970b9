//! Settlement transaction building.
//!
//! Building happens in two phases. [`SettlementBuilder::build`] checks token
//! conservation and lays out the transaction from the attested order;
//! [`UnsignedSettlement::sign`] computes the preimage and writes the
//! unlocking script through [`SwapUnlocker`]. Between the two phases the
//! caller may still add inputs (for example fee funding).

use tracing::{debug, info};

use tokenswap_primitives::chainhash::Hash;
use tokenswap_primitives::util::VarInt;
use tokenswap_script::Script;
use tokenswap_transaction::output::serialize_outputs;
use tokenswap_transaction::sighash::SIGHASH_ALL_FORKID;
use tokenswap_transaction::template::UnlockingScriptTemplate;
use tokenswap_transaction::{Transaction, TransactionError, TransactionOutput};

use crate::config::SettlementConfig;
use crate::error::CovenantError;
use crate::layout::Pkh;
use crate::oracle::SwapAttestation;
use crate::swap::{SettleArgs, SwapCovenant};
use crate::token::TransferArgs;

/// The swap output being settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapUtxo {
    /// Txid of the transaction that created the swap output.
    pub txid: Hash,
    /// Output index.
    pub vout: u32,
    /// Satoshis locked in the swap output.
    pub satoshis: u64,
}

/// A settlement laid out but not yet signed.
#[derive(Debug, Clone)]
pub struct UnsignedSettlement {
    /// The transaction; its swap input has no unlocking script yet.
    pub tx: Transaction,
    /// Settle arguments with an empty preimage.
    pub args: SettleArgs,
    /// Index of the swap input.
    pub input_index: u32,
}

impl UnsignedSettlement {
    /// Compute the preimage and set the swap input's unlocking script.
    pub fn sign(mut self) -> Result<Transaction, CovenantError> {
        let unlocker = SwapUnlocker::new(self.args);
        self.tx.sign_input(self.input_index, &unlocker)?;
        info!(
            txid = %self.tx.tx_id(),
            outputs = self.tx.output_count(),
            "signed swap settlement"
        );
        Ok(self.tx)
    }
}

/// Assembles a settlement transaction from an oracle attestation.
#[derive(Debug, Clone)]
pub struct SettlementBuilder<'a> {
    covenant: &'a SwapCovenant,
    utxo: SwapUtxo,
    attestation: SwapAttestation,
    token_a_code: Script,
    token_b_code: Script,
    change: Option<(Pkh, u64)>,
    previous_token_b_amount: u64,
    leading_outputs: Vec<TransactionOutput>,
    config: SettlementConfig,
}

impl<'a> SettlementBuilder<'a> {
    /// Start a settlement of `utxo` with the terms in `attestation`.
    ///
    /// # Arguments
    /// * `covenant` - The swap being settled.
    /// * `utxo` - The swap output.
    /// * `attestation` - The oracle's signature and the order it signed.
    /// * `token_a_code` - Code part of token A.
    /// * `token_b_code` - Code part of token B.
    pub fn new(
        covenant: &'a SwapCovenant,
        utxo: SwapUtxo,
        attestation: SwapAttestation,
        token_a_code: Script,
        token_b_code: Script,
    ) -> Self {
        SettlementBuilder {
            covenant,
            utxo,
            attestation,
            token_a_code,
            token_b_code,
            change: None,
            previous_token_b_amount: 0,
            leading_outputs: Vec::new(),
            config: SettlementConfig::default(),
        }
    }

    /// Where the token B change and satoshi change go. Required.
    pub fn change(mut self, pkh: Pkh, satoshis: u64) -> Self {
        self.change = Some((pkh, satoshis));
        self
    }

    /// The token B balance being split into the seller's amount and change.
    pub fn previous_token_b_amount(mut self, amount: u64) -> Self {
        self.previous_token_b_amount = amount;
        self
    }

    /// Outputs placed before the six settlement outputs.
    pub fn leading_outputs(mut self, outputs: Vec<TransactionOutput>) -> Self {
        self.leading_outputs = outputs;
        self
    }

    /// Override the default configuration. Its `notify_satoshis` must match
    /// the value the swap was deployed with.
    pub fn config(mut self, config: SettlementConfig) -> Self {
        self.config = config;
        self
    }

    /// Check conservation and lay out the settlement.
    ///
    /// # Returns
    /// The unsigned settlement, `ConservationViolated` if token B amount
    /// plus change differs from the previous token B balance, `Oracle`
    /// if the attested order names other contracts than the swap, or
    /// `Config` if no change destination was given or the configured
    /// notification value disagrees with the swap's.
    pub fn build(&self) -> Result<UnsignedSettlement, CovenantError> {
        self.config.validate()?;
        if self.config.notify_satoshis != self.covenant.notify_satoshis() {
            return Err(CovenantError::Config(format!(
                "notify_satoshis {} differs from the swap's {}",
                self.config.notify_satoshis,
                self.covenant.notify_satoshis()
            )));
        }
        let (change_pkh, change_satoshis) = self
            .change
            .ok_or_else(|| CovenantError::Config("settlement change destination not set".into()))?;
        let order = &self.attestation.order;
        let params = self.covenant.params();
        if order.contract_id_a != params.contract_id_a || order.contract_id_b != params.contract_id_b
        {
            return Err(CovenantError::Oracle(format!(
                "attested order is for {}/{}, swap is for {}/{}",
                order.contract_id_a, order.contract_id_b, params.contract_id_a, params.contract_id_b
            )));
        }

        let total = order.token_b_amount.checked_add(order.change_token_b_amount);
        if total != Some(self.previous_token_b_amount) {
            return Err(CovenantError::ConservationViolated {
                expected: self.previous_token_b_amount,
                actual: order.token_b_amount.saturating_add(order.change_token_b_amount),
            });
        }

        let args = SettleArgs {
            buyer: order.buyer_pkh,
            token_a_amount: order.token_a_amount,
            seller: order.seller_pkh,
            token_b_amount: order.token_b_amount,
            change_pkh,
            change_token_amount: order.change_token_b_amount,
            change_satoshis,
            holder_satoshis: self.config.holder_satoshis,
            prev_output: serialize_outputs(&self.leading_outputs),
            token_a_code: self.token_a_code.clone(),
            token_b_code: self.token_b_code.clone(),
            preimage: Vec::new(),
            oracle_sig: self.attestation.signature.clone(),
        };

        let mut tx = Transaction::new();
        tx.add_input_from(
            &self.utxo.txid,
            self.utxo.vout,
            self.covenant.locking_script().clone(),
            self.utxo.satoshis,
        );
        for output in &self.leading_outputs {
            tx.add_output(output.clone());
        }
        for output in self.covenant.expected_outputs(&args)? {
            tx.add_output(output);
        }
        debug!(
            swap = %self.utxo.txid,
            vout = self.utxo.vout,
            outputs = tx.output_count(),
            "built settlement"
        );
        Ok(UnsignedSettlement { tx, args, input_index: 0 })
    }
}

/// Preimage bytes outside the script code and its length prefix.
const PREIMAGE_FIXED_LEN: usize = 156;

fn preimage_len(tx: &Transaction, input_index: u32) -> usize {
    let script_len = tx
        .inputs
        .get(input_index as usize)
        .and_then(|i| i.source_tx_script())
        .map_or(0, |s| s.len());
    PREIMAGE_FIXED_LEN + VarInt::from(script_len).length() + script_len
}

fn signing_error(e: CovenantError) -> TransactionError {
    TransactionError::SigningError(e.to_string())
}

/// Unlocking template for a swap input.
#[derive(Debug, Clone)]
pub struct SwapUnlocker {
    args: SettleArgs,
}

impl SwapUnlocker {
    /// Wrap settle arguments; their preimage is filled in when signing.
    pub fn new(args: SettleArgs) -> Self {
        SwapUnlocker { args }
    }
}

impl UnlockingScriptTemplate for SwapUnlocker {
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let preimage = tx.calc_input_preimage(input_index as usize, SIGHASH_ALL_FORKID)?;
        let args = SettleArgs { preimage, ..self.args.clone() };
        args.to_unlocking_script().map_err(signing_error)
    }

    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32 {
        let args =
            SettleArgs { preimage: vec![0; preimage_len(tx, input_index)], ..self.args.clone() };
        args.to_unlocking_script().map_or(0, |s| s.len() as u32)
    }
}

/// Unlocking template for a token input.
#[derive(Debug, Clone)]
pub struct TokenUnlocker {
    args: TransferArgs,
}

impl TokenUnlocker {
    /// Wrap transfer arguments; their preimage is filled in when signing.
    pub fn new(args: TransferArgs) -> Self {
        TokenUnlocker { args }
    }
}

impl UnlockingScriptTemplate for TokenUnlocker {
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let preimage = tx.calc_input_preimage(input_index as usize, SIGHASH_ALL_FORKID)?;
        let args = TransferArgs { preimage, ..self.args.clone() };
        args.to_unlocking_script().map_err(signing_error)
    }

    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32 {
        let args =
            TransferArgs { preimage: vec![0; preimage_len(tx, input_index)], ..self.args.clone() };
        args.to_unlocking_script().map_or(0, |s| s.len() as u32)
    }
}
