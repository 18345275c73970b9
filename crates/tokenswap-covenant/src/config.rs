//! Settlement configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tokenswap_transaction::sighash::SIGHASH_ALL_FORKID;

use crate::error::CovenantError;

fn default_dust() -> u64 {
    546
}

fn default_sighash() -> u32 {
    SIGHASH_ALL_FORKID
}

/// Values a settlement builder uses for the outputs it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Satoshis locked in each token output.
    #[serde(default = "default_dust")]
    pub holder_satoshis: u64,
    /// Satoshis of each notification output; must equal the swap's
    /// deployed value.
    #[serde(default = "default_dust")]
    pub notify_satoshis: u64,
    /// Sighash type of the covenant preimage. Only ALL|FORKID is accepted.
    #[serde(default = "default_sighash")]
    pub sighash_type: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        SettlementConfig {
            holder_satoshis: default_dust(),
            notify_satoshis: default_dust(),
            sighash_type: default_sighash(),
        }
    }
}

impl SettlementConfig {
    /// Parse and validate a config from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, CovenantError> {
        let config: SettlementConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CovenantError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Reject zero dust values and any sighash type other than ALL|FORKID.
    pub fn validate(&self) -> Result<(), CovenantError> {
        if self.holder_satoshis == 0 {
            return Err(CovenantError::Config("holder_satoshis must be non-zero".into()));
        }
        if self.notify_satoshis == 0 {
            return Err(CovenantError::Config("notify_satoshis must be non-zero".into()));
        }
        if self.sighash_type != SIGHASH_ALL_FORKID {
            return Err(CovenantError::Config(format!(
                "sighash_type {:#x} unsupported, covenants require ALL|FORKID",
                self.sighash_type
            )));
        }
        Ok(())
    }
}
