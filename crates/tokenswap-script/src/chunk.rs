//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its payload.
//! Covenant unlocking scripts are plain sequences of pushes, so decoding
//! them into chunks is how typed arguments are recovered.

use crate::opcodes::*;
use crate::scriptnum;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Convert this chunk to its ASM string representation.
    ///
    /// Data pushes are rendered as hex; everything else uses the opcode name.
    pub fn to_asm_string(&self) -> String {
        if self.op > OP_0 && self.op <= OP_PUSHDATA4 {
            if let Some(ref data) = self.data {
                return hex::encode(data);
            }
        }
        opcode_to_string(self.op).to_string()
    }

    /// Return the bytes this chunk leaves on the stack, if it is a push.
    ///
    /// `OP_0` yields an empty vector, `OP_1NEGATE` and `OP_1`..`OP_16`
    /// yield their minimal script-number encoding.
    ///
    /// # Returns
    /// The pushed bytes, or `NotAPush` for any other opcode.
    pub fn push_value(&self) -> Result<Vec<u8>, ScriptError> {
        if let Some(ref data) = self.data {
            return Ok(data.clone());
        }
        match self.op {
            OP_0 => Ok(Vec::new()),
            OP_1NEGATE => Ok(vec![0x81]),
            op if (OP_1..=OP_16).contains(&op) => {
                Ok(scriptnum::encode(&((op - OP_1 + 1) as i64).into()))
            }
            op => Err(ScriptError::NotAPush(opcode_to_string(op).to_string())),
        }
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Every byte is parsed as an operation, including the bytes after an
/// `OP_RETURN`, so a stateful covenant's trailing state push is returned
/// as its own chunk.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// A vector of parsed chunks, or `DataTooSmall` if a push is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        let (header, length) = match op {
            OP_DATA_1..=OP_DATA_75 => (1, op as usize),
            OP_PUSHDATA1 => {
                let len = bytes.get(pos + 1).ok_or(ScriptError::DataTooSmall)?;
                (2, *len as usize)
            }
            OP_PUSHDATA2 => {
                let len = bytes.get(pos + 1..pos + 3).ok_or(ScriptError::DataTooSmall)?;
                (3, u16::from_le_bytes([len[0], len[1]]) as usize)
            }
            OP_PUSHDATA4 => {
                let len = bytes.get(pos + 1..pos + 5).ok_or(ScriptError::DataTooSmall)?;
                (5, u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize)
            }
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
                continue;
            }
        };
        let start = pos + header;
        let data = bytes
            .get(start..start.saturating_add(length))
            .ok_or(ScriptError::DataTooSmall)?
            .to_vec();
        chunks.push(ScriptChunk { op, data: Some(data) });
        pos = start + length;
    }

    Ok(chunks)
}

/// Compute the push prefix bytes for a data payload of the given length.
///
/// A zero length yields `OP_0`, which pushes the empty byte string.
///
/// # Arguments
/// * `data_len` - The length of the data to be pushed.
///
/// # Returns
/// The prefix to prepend to the data, or `DataTooBig`.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode multiple payloads into one byte vector, each with its own prefix.
///
/// # Returns
/// The concatenated pushes, or `PartTooBig(i)` naming the oversized part.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut result = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let prefix = push_data_prefix(part.len()).map_err(|_| ScriptError::PartTooBig(i))?;
        result.extend_from_slice(&prefix);
        result.extend_from_slice(part);
    }
    Ok(result)
}
