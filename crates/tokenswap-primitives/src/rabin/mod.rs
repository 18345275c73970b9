//! Rabin signature scheme for oracle attestations.
//!
//! The oracle signs a message by finding a padding that makes the expanded
//! message hash a quadratic residue modulo both secret primes, then taking
//! the square root. Verification is a single modular squaring, which is why
//! covenants can afford it inside script:
//!
//! ```text
//! sig^2 mod n == H(message || padding) mod n
//! ```
//!
//! `H` expands SHA-256 to 512 bits: `h = SHA256(m)`, then
//! `SHA256(h[..16]) || SHA256(h[16..])`, read as an unsigned little-endian
//! integer.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::hash::sha256;
use crate::PrimitivesError;

/// Upper bound on the number of zero padding bytes tried while signing.
///
/// Each attempt succeeds with probability about 1/4, so exhausting this bound
/// only happens with a broken key.
pub const MAX_PADDING_BYTES: usize = 256;

/// Compute the 512-bit Rabin message hash as an unsigned integer.
///
/// # Arguments
/// * `data` - The message bytes, already concatenated with any padding.
///
/// # Returns
/// The hash interpreted as a little-endian `BigUint`.
pub fn rabin_hash(data: &[u8]) -> BigUint {
    let h = sha256(data);
    let mut expanded = Vec::with_capacity(64);
    expanded.extend_from_slice(&sha256(&h[..16]));
    expanded.extend_from_slice(&sha256(&h[16..]));
    BigUint::from_bytes_le(&expanded)
}

/// A Rabin signature together with the padding it was produced over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RabinSignature {
    /// The square root `s` with `s^2 = H(m || padding) mod n`.
    pub sig: BigUint,
    /// Padding bytes appended to the message before hashing.
    pub padding: Vec<u8>,
}

impl RabinSignature {
    /// Create a signature from its parts.
    pub fn new(sig: BigUint, padding: Vec<u8>) -> Self {
        RabinSignature { sig, padding }
    }
}

/// A Rabin public key: the modulus `n = p * q`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RabinPublicKey {
    n: BigUint,
}

impl RabinPublicKey {
    /// Wrap a modulus. A zero modulus is rejected.
    pub fn new(n: BigUint) -> Result<Self, PrimitivesError> {
        if n.is_zero() {
            return Err(PrimitivesError::InvalidRabinKey("modulus is zero".into()));
        }
        Ok(RabinPublicKey { n })
    }

    /// Build a key from the unsigned little-endian bytes of the modulus.
    pub fn from_bytes_le(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        Self::new(BigUint::from_bytes_le(bytes))
    }

    /// Unsigned little-endian bytes of the modulus, without trailing zeros.
    pub fn to_bytes_le(&self) -> Vec<u8> {
        self.n.to_bytes_le()
    }

    /// Access the modulus.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Check a signature over `message`.
    ///
    /// # Arguments
    /// * `message` - The signed message, without padding.
    /// * `signature` - The signature and the padding it was produced over.
    ///
    /// # Returns
    /// `true` if `sig^2 mod n` equals the padded message hash mod `n`.
    pub fn verify(&self, message: &[u8], signature: &RabinSignature) -> bool {
        let mut padded = Vec::with_capacity(message.len() + signature.padding.len());
        padded.extend_from_slice(message);
        padded.extend_from_slice(&signature.padding);
        let h = rabin_hash(&padded) % &self.n;
        let squared = (&signature.sig * &signature.sig) % &self.n;
        squared == h
    }
}

/// A Rabin private key: two primes congruent to 3 mod 4.
#[derive(Clone)]
pub struct RabinPrivateKey {
    p: BigUint,
    q: BigUint,
    public: RabinPublicKey,
}

impl std::fmt::Debug for RabinPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabinPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl RabinPrivateKey {
    /// Create a private key from its two primes.
    ///
    /// Primality is not tested; the caller supplies primes. Both must be
    /// congruent to 3 mod 4 and distinct so square roots can be taken with a
    /// single exponentiation.
    pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self, PrimitivesError> {
        let four = BigUint::from(4u32);
        let three = BigUint::from(3u32);
        for prime in [&p, &q] {
            if prime <= &three || prime % &four != three {
                return Err(PrimitivesError::InvalidRabinKey(format!(
                    "prime {} is not congruent to 3 mod 4",
                    prime
                )));
            }
        }
        if p == q {
            return Err(PrimitivesError::InvalidRabinKey("primes must differ".into()));
        }
        let public = RabinPublicKey::new(&p * &q)?;
        Ok(RabinPrivateKey { p, q, public })
    }

    /// The matching public key.
    pub fn public_key(&self) -> &RabinPublicKey {
        &self.public
    }

    /// Sign a message.
    ///
    /// Zero bytes are appended to the message one at a time until the hash
    /// is a quadratic residue modulo both primes.
    ///
    /// # Returns
    /// The signature and padding, or `RabinPaddingExhausted` if no padding
    /// up to [`MAX_PADDING_BYTES`] works.
    pub fn sign(&self, message: &[u8]) -> Result<RabinSignature, PrimitivesError> {
        let n = self.public.modulus();
        let mut padding = Vec::new();
        loop {
            let mut padded = message.to_vec();
            padded.extend_from_slice(&padding);
            let h = rabin_hash(&padded) % n;
            if is_quadratic_residue(&h, &self.p) && is_quadratic_residue(&h, &self.q) {
                let sig = self.square_root(&h);
                return Ok(RabinSignature { sig, padding });
            }
            if padding.len() >= MAX_PADDING_BYTES {
                return Err(PrimitivesError::RabinPaddingExhausted(MAX_PADDING_BYTES));
            }
            padding.push(0);
        }
    }

    // CRT combination of the roots modulo p and q.
    fn square_root(&self, h: &BigUint) -> BigUint {
        let (p, q) = (&self.p, &self.q);
        let n = self.public.modulus();
        let one = BigUint::one();
        let two = BigUint::from(2u32);

        let root_p = h.modpow(&((p + &one) >> 2), p);
        let root_q = h.modpow(&((q + &one) >> 2), q);

        // p and q are prime, so Fermat gives the inverses.
        let q_inv_p = q.modpow(&(p - &two), p);
        let p_inv_q = p.modpow(&(q - &two), q);

        let term_p = root_p * q * q_inv_p;
        let term_q = root_q * p * p_inv_q;
        (term_p + term_q).mod_floor(n)
    }
}

fn is_quadratic_residue(a: &BigUint, prime: &BigUint) -> bool {
    let a = a % prime;
    if a.is_zero() {
        return true;
    }
    let exp = (prime - BigUint::one()) >> 1;
    a.modpow(&exp, prime).is_one()
}

/// Build the Mersenne prime `2^exp - 1`.
///
/// Mersenne primes are all congruent to 3 mod 4, which makes them handy for
/// deterministic test and demo keys.
pub fn mersenne(exp: u32) -> BigUint {
    (BigUint::one() << exp as usize) - BigUint::one()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(a: u32, b: u32) -> RabinPrivateKey {
        RabinPrivateKey::from_primes(mersenne(a), mersenne(b)).unwrap()
    }

    #[test]
    fn test_rabin_hash_is_512_bits_le() {
        let h = rabin_hash(b"");
        assert!(h.bits() <= 512);
        let d = sha256(b"");
        let mut expected = sha256(&d[..16]).to_vec();
        expected.extend_from_slice(&sha256(&d[16..]));
        assert_eq!(h, BigUint::from_bytes_le(&expected));
    }

    #[test]
    fn test_sign_then_verify() {
        let sk = key(127, 521);
        let msg = b"contractIdA buyer amount";
        let sig = sk.sign(msg).unwrap();
        assert!(sk.public_key().verify(msg, &sig));
        assert!(sig.padding.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_verify_rejects_other_message() {
        let sk = key(521, 607);
        let sig = sk.sign(b"700").unwrap();
        assert!(!sk.public_key().verify(b"701", &sig));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let sk = key(127, 521);
        let other = key(521, 607);
        let sig = sk.sign(b"swap").unwrap();
        assert!(!other.public_key().verify(b"swap", &sig));
    }

    #[test]
    fn test_verify_rejects_tampered_padding() {
        let sk = key(107, 521);
        let mut sig = sk.sign(b"terms").unwrap();
        sig.padding.push(0);
        assert!(!sk.public_key().verify(b"terms", &sig));
    }

    #[test]
    fn test_from_primes_rejects_1_mod_4() {
        // 13 = 1 mod 4
        let err = RabinPrivateKey::from_primes(BigUint::from(13u32), mersenne(127));
        assert!(err.is_err());
        assert!(RabinPrivateKey::from_primes(mersenne(127), mersenne(127)).is_err());
    }

    #[test]
    fn test_public_key_bytes() {
        let sk = key(127, 521);
        let bytes = sk.public_key().to_bytes_le();
        let back = RabinPublicKey::from_bytes_le(&bytes).unwrap();
        assert_eq!(&back, sk.public_key());
        assert!(RabinPublicKey::from_bytes_le(&[]).is_err());
    }
}
