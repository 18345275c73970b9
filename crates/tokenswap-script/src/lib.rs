/// Token swap script layer - the Script type and its encodings.
///
/// Provides the Script newtype, opcode definitions, chunk parsing, minimal
/// push-data encoding and the script-number codec used to lay out covenant
/// parameters, state and unlocking arguments.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod scriptnum;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use chunk::ScriptChunk;
