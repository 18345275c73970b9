/// Script type - a sequence of opcodes and data pushes.
///
/// Locking scripts of covenants are `codePart || state`, unlocking scripts
/// are a flat list of argument pushes. The Script wraps a `Vec<u8>` and
/// provides construction, ASM conversion and the few classifications the
/// settlement needs.

use std::fmt;

use num_bigint::BigInt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::scriptnum;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from an ASM string.
    ///
    /// Known opcode names are emitted directly and any other token is
    /// treated as hex push data. Whitespace of any kind separates tokens.
    ///
    /// # Arguments
    /// * `asm` - A whitespace-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or `InvalidAsmToken` naming the first bad token.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            script.append_asm_token(token)?;
        }
        Ok(script)
    }

    /// Append one ASM token: an opcode name or hex push data.
    pub fn append_asm_token(&mut self, token: &str) -> Result<(), ScriptError> {
        if let Some(opcode) = string_to_opcode(token) {
            self.0.push(opcode);
            return Ok(());
        }
        let data =
            hex::decode(token).map_err(|_| ScriptError::InvalidAsmToken(token.to_string()))?;
        self.append_push_data(&data)
    }

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM representation.
    ///
    /// # Returns
    /// A space-separated ASM string, or an empty string if the script is
    /// empty or malformed.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(ScriptChunk::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Extract the 20-byte public key hash from a P2PKH script.
    ///
    /// # Returns
    /// The hash, or `NotP2PKH` if the script does not match the pattern.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2PKH);
        }
        let mut pkh = [0u8; 20];
        pkh.copy_from_slice(&self.0[3..23]);
        Ok(pkh)
    }

    /// Parse the script into a vector of decoded chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Append data bytes with the minimal push prefix.
    ///
    /// An empty slice is encoded as `OP_0`.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append a number push.
    ///
    /// Uses `OP_0`, `OP_1NEGATE` and `OP_1`..`OP_16` where they apply and a
    /// minimal script-number data push otherwise.
    pub fn append_number(&mut self, val: &BigInt) -> Result<(), ScriptError> {
        let bytes = scriptnum::encode(val);
        match bytes.as_slice() {
            [] => self.0.push(OP_0),
            [0x81] => self.0.push(OP_1NEGATE),
            [n @ 1..=16] => self.0.push(OP_1 + n - 1),
            _ => self.append_push_data(&bytes)?,
        }
        Ok(())
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4) to prevent misuse.
    /// Use `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op).to_string()));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append the raw bytes of another script.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }

    /// Check whether this script begins with the bytes of `prefix`.
    pub fn starts_with(&self, prefix: &Script) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
