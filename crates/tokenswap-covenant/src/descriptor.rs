//! Compiled contract descriptors.
//!
//! A descriptor is the JSON artifact a contract compiler emits: the contract
//! name, its constructor parameters and an ASM template in which each
//! parameter appears as `$name`. Instantiating a descriptor substitutes the
//! parameters as pushes and yields the deployed code part. The covenant
//! logic itself runs natively in [`crate::verifier`]; the code bytes matter
//! because their Hash160 is what a swap commits to.

use std::collections::HashSet;
use std::path::Path;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use tokenswap_script::Script;

use crate::error::CovenantError;

const TOKEN_DESC: &str = include_str!("../artifacts/Token_desc.json");
const TOKEN_SWAP_DESC: &str = include_str!("../artifacts/TokenSwap_desc.json");

/// BRFC protocol id baked into tokens by default.
pub const DEFAULT_TOKEN_BRFC_ID: [u8; 6] = [0xb0, 0x2d, 0xe8, 0xc8, 0x89, 0x30];

/// Kind of a constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Arbitrary bytes.
    Bytes,
    /// A 20-byte hash.
    Ripemd160,
    /// A script number.
    Int,
}

/// A declared constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDesc {
    /// Name used as `$name` in the ASM template.
    pub name: String,
    /// Parameter kind.
    #[serde(rename = "type")]
    pub kind: ParamKind,
}

/// A value supplied for a constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Raw bytes, for `bytes` and `ripemd160` parameters.
    Bytes(Vec<u8>),
    /// A number, for `int` parameters.
    Int(BigInt),
}

impl From<&[u8]> for ParamValue {
    fn from(bytes: &[u8]) -> Self {
        ParamValue::Bytes(bytes.to_vec())
    }
}

impl From<BigInt> for ParamValue {
    fn from(n: BigInt) -> Self {
        ParamValue::Int(n)
    }
}

/// A compiled contract artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    /// Contract name.
    pub contract: String,
    /// Artifact format version.
    pub version: u32,
    /// Constructor parameters, in declaration order.
    pub params: Vec<ParamDesc>,
    /// ASM template with `$name` placeholders.
    pub asm: String,
}

impl ContractDescriptor {
    /// Parse and validate a descriptor from JSON.
    pub fn from_json(json: &str) -> Result<Self, CovenantError> {
        let desc: ContractDescriptor = serde_json::from_str(json)?;
        desc.validate()?;
        Ok(desc)
    }

    /// Load and validate a descriptor from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CovenantError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The built-in token contract.
    pub fn token() -> Result<Self, CovenantError> {
        Self::from_json(TOKEN_DESC)
    }

    /// The built-in swap contract.
    pub fn token_swap() -> Result<Self, CovenantError> {
        Self::from_json(TOKEN_SWAP_DESC)
    }

    /// Check that the template and parameter list agree.
    ///
    /// Every parameter must be declared once and used in the template, and
    /// every placeholder must be declared.
    pub fn validate(&self) -> Result<(), CovenantError> {
        if self.contract.is_empty() {
            return Err(CovenantError::Descriptor("contract name is empty".into()));
        }
        let mut declared = HashSet::new();
        for p in &self.params {
            if !declared.insert(p.name.as_str()) {
                return Err(CovenantError::Descriptor(format!(
                    "{}: parameter {} declared twice",
                    self.contract, p.name
                )));
            }
        }
        let used: HashSet<&str> = self.placeholders().collect();
        if let Some(name) = used.difference(&declared).next() {
            return Err(CovenantError::Descriptor(format!(
                "{}: placeholder ${} is not a declared parameter",
                self.contract, name
            )));
        }
        if let Some(name) = declared.difference(&used).next() {
            return Err(CovenantError::Descriptor(format!(
                "{}: parameter {} is never used",
                self.contract, name
            )));
        }
        Ok(())
    }

    fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.asm.split_whitespace().filter_map(|t| t.strip_prefix('$'))
    }

    fn param(&self, name: &str) -> Option<&ParamDesc> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Substitute constructor arguments into the template.
    ///
    /// # Arguments
    /// * `args` - One value per declared parameter, by name.
    ///
    /// # Returns
    /// The instantiated code part, or `Descriptor` if an argument is
    /// missing, unknown or of the wrong kind.
    pub fn instantiate(&self, args: &[(&str, ParamValue)]) -> Result<Script, CovenantError> {
        for (name, value) in args {
            let desc = self.param(name).ok_or_else(|| {
                CovenantError::Descriptor(format!("{}: unknown parameter {}", self.contract, name))
            })?;
            match (desc.kind, value) {
                (ParamKind::Bytes, ParamValue::Bytes(_)) | (ParamKind::Int, ParamValue::Int(_)) => {}
                (ParamKind::Ripemd160, ParamValue::Bytes(b)) if b.len() == 20 => {}
                _ => {
                    return Err(CovenantError::Descriptor(format!(
                        "{}: parameter {} expects {:?}",
                        self.contract, name, desc.kind
                    )))
                }
            }
        }

        let mut script = Script::new();
        for token in self.asm.split_whitespace() {
            let Some(name) = token.strip_prefix('$') else {
                script.append_asm_token(token)?;
                continue;
            };
            let value = args.iter().find(|(n, _)| *n == name).map(|(_, v)| v).ok_or_else(|| {
                CovenantError::Descriptor(format!("{}: missing parameter {}", self.contract, name))
            })?;
            match value {
                ParamValue::Bytes(b) => script.append_push_data(b)?,
                ParamValue::Int(n) => script.append_number(n)?,
            }
        }
        Ok(script)
    }
}
