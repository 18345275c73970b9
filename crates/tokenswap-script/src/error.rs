/// Error types for script operations.
///
/// Covers hex and ASM parsing, truncated pushes and script-number decoding.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// An ASM token was neither a known opcode nor valid hex data.
    #[error("invalid asm token '{0}'")]
    InvalidAsmToken(String),

    /// Attempted to use append_opcodes for a push data opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Script is not a P2PKH script.
    #[error("not a P2PKH")]
    NotP2PKH,

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// A push data part exceeds protocol limits.
    #[error("part too big '{0}'")]
    PartTooBig(usize),

    /// A chunk was expected to carry a number or data but is a plain opcode.
    #[error("expected a push, found {0}")]
    NotAPush(String),

    /// A number does not fit the requested width.
    #[error("number {value} does not fit in {size} bytes")]
    NumberTooBig { value: String, size: usize },

    /// A script number is not minimally encoded.
    #[error("numeric value {0} is not minimally encoded")]
    NonMinimalNumber(String),
}
