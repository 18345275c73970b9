/// Token swap primitives - hashing, binary codecs and oracle signatures.
///
/// This crate provides the foundational building blocks shared by the
/// script, transaction and covenant crates:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Chain hash type for transaction identification
/// - Variable-length integers and little-endian readers/writers
/// - The Rabin signature scheme used for oracle attestations

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod rabin;

mod error;
pub use error::PrimitivesError;
