//! Fixed-width serialization contract.
//!
//! Widths here are load-bearing: covenant code splits its state and the
//! oracle message at these offsets, so changing one breaks every deployed
//! covenant.
//!
//! | field                 | width | encoding                          |
//! |-----------------------|-------|-----------------------------------|
//! | authorization counter | 1     | raw byte                          |
//! | owner pkh             | 20    | raw bytes                         |
//! | token amount          | 32    | little-endian sign-magnitude      |
//! | contract id           | 32    | raw bytes                         |

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use tokenswap_script::chunk::ScriptChunk;
use tokenswap_script::{scriptnum, Script};

use crate::error::CovenantError;

/// Width of the authorization counter.
pub const AUTH_COUNTER_LEN: usize = 1;
/// Width of a public key hash.
pub const PKH_LEN: usize = 20;
/// Width of a token amount.
pub const AMOUNT_LEN: usize = 32;
/// Width of a contract id.
pub const CONTRACT_ID_LEN: usize = 32;
/// Width of a serialized token state.
pub const STATE_LEN: usize = AUTH_COUNTER_LEN + PKH_LEN + AMOUNT_LEN;

/// A 20-byte public key hash (Hash160).
pub type Pkh = [u8; PKH_LEN];

/// Encode a token amount into its 32-byte form.
pub fn encode_amount(amount: u64) -> [u8; AMOUNT_LEN] {
    let mut out = [0u8; AMOUNT_LEN];
    out[..8].copy_from_slice(&amount.to_le_bytes());
    // u64 never reaches the sign bit of byte 31.
    out
}

/// Decode a 32-byte token amount.
///
/// # Returns
/// The amount, or `MalformedInput` for a wrong width, a negative value or
/// a value that does not fit in `u64`.
pub fn decode_amount(bytes: &[u8]) -> Result<u64, CovenantError> {
    if bytes.len() != AMOUNT_LEN {
        return Err(CovenantError::MalformedInput(format!(
            "amount must be {} bytes, got {}",
            AMOUNT_LEN,
            bytes.len()
        )));
    }
    number_to_u64(&scriptnum::bin2num(bytes), "amount")
}

fn number_to_u64(n: &BigInt, what: &str) -> Result<u64, CovenantError> {
    if n.is_negative() {
        return Err(CovenantError::MalformedInput(format!("{} is negative: {}", what, n)));
    }
    n.to_u64()
        .ok_or_else(|| CovenantError::MalformedInput(format!("{} out of range: {}", what, n)))
}

/// Read a 20-byte public key hash.
pub fn pkh_from_slice(bytes: &[u8]) -> Result<Pkh, CovenantError> {
    bytes.try_into().map_err(|_| {
        CovenantError::MalformedInput(format!(
            "public key hash must be {} bytes, got {}",
            PKH_LEN,
            bytes.len()
        ))
    })
}

/// Identifier of a token contract: the 32 bytes of its genesis txid, in
/// the order the txid is written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContractId([u8; CONTRACT_ID_LEN]);

impl ContractId {
    /// Wrap raw contract id bytes.
    pub fn new(bytes: [u8; CONTRACT_ID_LEN]) -> Self {
        ContractId(bytes)
    }

    /// Parse a 64-character hex contract id.
    pub fn from_hex(s: &str) -> Result<Self, CovenantError> {
        let bytes = hex::decode(s)
            .map_err(|e| CovenantError::MalformedInput(format!("contract id: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Read a contract id from a 32-byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CovenantError> {
        let arr = bytes.try_into().map_err(|_| {
            CovenantError::MalformedInput(format!(
                "contract id must be {} bytes, got {}",
                CONTRACT_ID_LEN,
                bytes.len()
            ))
        })?;
        Ok(ContractId(arr))
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; CONTRACT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", hex::encode(self.0))
    }
}

impl FromStr for ContractId {
    type Err = CovenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractId::from_hex(s)
    }
}

impl Serialize for ContractId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContractId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContractId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper writing a [`Pkh`] as a hex string.
pub mod pkh_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{pkh_from_slice, Pkh};

    /// Serialize as lowercase hex.
    pub fn serialize<S: Serializer>(pkh: &Pkh, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(pkh))
    }

    /// Deserialize from a 40-character hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pkh, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        pkh_from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// The mutable state of a token UTXO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenState {
    /// Zero for holder transfers, non-zero for oracle-gated (mint/admin)
    /// transfers.
    pub auth_counter: u8,
    /// Owner of the balance.
    pub owner: Pkh,
    /// Token balance.
    pub amount: u64,
}

impl TokenState {
    /// A holder-path state.
    pub fn holder(owner: Pkh, amount: u64) -> Self {
        TokenState { auth_counter: 0, owner, amount }
    }

    /// Whether spending this state requires an oracle proof.
    pub fn is_oracle_gated(&self) -> bool {
        self.auth_counter != 0
    }

    /// Serialize into `authCounter || owner || amount`.
    pub fn to_bytes(&self) -> [u8; STATE_LEN] {
        let mut out = [0u8; STATE_LEN];
        out[0] = self.auth_counter;
        out[AUTH_COUNTER_LEN..AUTH_COUNTER_LEN + PKH_LEN].copy_from_slice(&self.owner);
        out[AUTH_COUNTER_LEN + PKH_LEN..].copy_from_slice(&encode_amount(self.amount));
        out
    }

    /// Parse a 53-byte state.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CovenantError> {
        if bytes.len() != STATE_LEN {
            return Err(CovenantError::MalformedInput(format!(
                "token state must be {} bytes, got {}",
                STATE_LEN,
                bytes.len()
            )));
        }
        let (counter, rest) = bytes.split_at(AUTH_COUNTER_LEN);
        let (owner, amount) = rest.split_at(PKH_LEN);
        Ok(TokenState {
            auth_counter: counter[0],
            owner: pkh_from_slice(owner)?,
            amount: decode_amount(amount)?,
        })
    }

    /// The state as it trails a code part: a single data push.
    pub fn to_script(&self) -> Result<Script, CovenantError> {
        let mut script = Script::new();
        script.append_push_data(&self.to_bytes())?;
        Ok(script)
    }
}

/// Sequential decoder for unlocking-script arguments.
///
/// Every argument is one push; any decoding failure is `MalformedInput`
/// naming the argument.
pub(crate) struct ArgReader {
    chunks: std::vec::IntoIter<ScriptChunk>,
    operation: &'static str,
}

impl ArgReader {
    pub(crate) fn new(
        unlocking: &Script,
        operation: &'static str,
        expected: usize,
    ) -> Result<Self, CovenantError> {
        let chunks = unlocking
            .chunks()
            .map_err(|e| CovenantError::MalformedInput(format!("{}: {}", operation, e)))?;
        if chunks.len() != expected {
            return Err(CovenantError::MalformedInput(format!(
                "{} takes {} arguments, got {}",
                operation,
                expected,
                chunks.len()
            )));
        }
        Ok(ArgReader { chunks: chunks.into_iter(), operation })
    }

    pub(crate) fn bytes(&mut self, name: &str) -> Result<Vec<u8>, CovenantError> {
        let chunk = self.chunks.next().ok_or_else(|| {
            CovenantError::MalformedInput(format!("{}: missing {}", self.operation, name))
        })?;
        chunk
            .push_value()
            .map_err(|e| CovenantError::MalformedInput(format!("{} {}: {}", self.operation, name, e)))
    }

    pub(crate) fn pkh(&mut self, name: &str) -> Result<Pkh, CovenantError> {
        pkh_from_slice(&self.bytes(name)?)
    }

    pub(crate) fn number(&mut self, name: &str) -> Result<BigInt, CovenantError> {
        let bytes = self.bytes(name)?;
        scriptnum::check_minimal(&bytes)
            .map_err(|e| CovenantError::MalformedInput(format!("{} {}: {}", self.operation, name, e)))?;
        Ok(scriptnum::bin2num(&bytes))
    }

    pub(crate) fn u64(&mut self, name: &str) -> Result<u64, CovenantError> {
        number_to_u64(&self.number(name)?, name)
    }
}
