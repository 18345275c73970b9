//! Script verification.
//!
//! [`ScriptVerifier`] is the seam a full script VM would sit behind. The
//! [`CovenantVerifier`] implementation runs the token and swap checks
//! natively: it picks the registered [`Covenant`] whose locking script
//! matches, decodes the unlocking script into typed arguments and runs the
//! covenant's check against the transaction context.

use tracing::{debug, warn};

use tokenswap_script::Script;
use tokenswap_transaction::Transaction;

use crate::error::CovenantError;
use crate::swap::{SettleArgs, SwapCovenant};
use crate::token::{TokenCovenant, TransferArgs};

/// The transaction an input is verified against.
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    /// The spending transaction.
    pub tx: &'a Transaction,
    /// Index of the input being verified.
    pub input_index: usize,
    /// Satoshis locked in the spent output.
    pub input_satoshis: u64,
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// Whether the spend is valid.
    pub success: bool,
    /// Why it is not.
    pub error: Option<String>,
}

impl VerifyResult {
    /// A successful result.
    pub fn ok() -> Self {
        VerifyResult { success: true, error: None }
    }

    /// A failed result carrying `error`.
    pub fn failed(error: impl Into<String>) -> Self {
        VerifyResult { success: false, error: Some(error.into()) }
    }
}

impl From<Result<(), CovenantError>> for VerifyResult {
    fn from(result: Result<(), CovenantError>) -> Self {
        match result {
            Ok(()) => VerifyResult::ok(),
            Err(e) => VerifyResult::failed(e.to_string()),
        }
    }
}

/// Executes an unlocking/locking script pair against a transaction.
pub trait ScriptVerifier {
    /// Verify `unlocking` against `locking` in `ctx`.
    fn verify(&self, unlocking: &Script, locking: &Script, ctx: &TxContext<'_>) -> VerifyResult;
}

/// A contract the native verifier can execute.
pub trait Covenant {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether `locking` is a UTXO of this contract.
    fn matches(&self, locking: &Script) -> bool;

    /// Decode `unlocking` and run the contract's check.
    fn execute(
        &self,
        unlocking: &Script,
        locking: &Script,
        ctx: &TxContext<'_>,
    ) -> Result<(), CovenantError>;
}

impl Covenant for TokenCovenant {
    fn name(&self) -> &str {
        "Token"
    }

    fn matches(&self, locking: &Script) -> bool {
        self.parse_locking_script(locking).is_ok()
    }

    fn execute(
        &self,
        unlocking: &Script,
        locking: &Script,
        ctx: &TxContext<'_>,
    ) -> Result<(), CovenantError> {
        let args = TransferArgs::from_unlocking_script(unlocking)?;
        self.transfer(locking, &args, ctx)
    }
}

impl Covenant for SwapCovenant {
    fn name(&self) -> &str {
        "TokenSwap"
    }

    fn matches(&self, locking: &Script) -> bool {
        locking == self.locking_script()
    }

    fn execute(
        &self,
        unlocking: &Script,
        locking: &Script,
        ctx: &TxContext<'_>,
    ) -> Result<(), CovenantError> {
        let args = SettleArgs::from_unlocking_script(unlocking)?;
        self.settle(locking, &args, ctx)
    }
}

/// Native verifier over a set of registered covenants.
#[derive(Default)]
pub struct CovenantVerifier {
    covenants: Vec<Box<dyn Covenant>>,
}

impl CovenantVerifier {
    /// A verifier with no covenants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a covenant.
    pub fn register(&mut self, covenant: Box<dyn Covenant>) {
        self.covenants.push(covenant);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, covenant: impl Covenant + 'static) -> Self {
        self.register(Box::new(covenant));
        self
    }

    /// Run the matching covenant and return its typed result.
    ///
    /// # Returns
    /// `Ok(())` on success, the covenant's error on failure, or
    /// `MalformedInput` if no registered covenant owns `locking`.
    pub fn check(
        &self,
        unlocking: &Script,
        locking: &Script,
        ctx: &TxContext<'_>,
    ) -> Result<(), CovenantError> {
        let covenant = self.covenants.iter().find(|c| c.matches(locking)).ok_or_else(|| {
            CovenantError::MalformedInput(format!(
                "no registered covenant for locking script of {} bytes",
                locking.len()
            ))
        })?;
        debug!(covenant = covenant.name(), input = ctx.input_index, "executing covenant");
        let result = covenant.execute(unlocking, locking, ctx);
        match &result {
            Ok(()) => debug!(covenant = covenant.name(), "covenant accepted spend"),
            Err(CovenantError::Rejected(r)) => {
                warn!(covenant = covenant.name(), input = ctx.input_index, "rejected: {}", r)
            }
            Err(e) => warn!(covenant = covenant.name(), input = ctx.input_index, "failed: {}", e),
        }
        result
    }

    /// Verify input `input_index` of `tx` using its attached source output.
    pub fn verify_input(&self, tx: &Transaction, input_index: usize) -> VerifyResult {
        let Some(input) = tx.inputs.get(input_index) else {
            return VerifyResult::failed(format!("input index {} out of range", input_index));
        };
        let Some(unlocking) = input.unlocking_script.as_ref() else {
            return VerifyResult::failed(format!("input {} has no unlocking script", input_index));
        };
        let Some(source) = input.source_tx_output() else {
            return VerifyResult::failed(format!("input {} has no source output", input_index));
        };
        let ctx = TxContext { tx, input_index, input_satoshis: source.satoshis };
        self.verify(unlocking, &source.locking_script, &ctx)
    }
}

impl ScriptVerifier for CovenantVerifier {
    fn verify(&self, unlocking: &Script, locking: &Script, ctx: &TxContext<'_>) -> VerifyResult {
        self.check(unlocking, locking, ctx).into()
    }
}
