//! Pure Rust prime-order group over Ed448-Goldilocks.
//!
//! This crate implements the Decaf construction on the Ed448-Goldilocks
//! curve: the twisted Edwards curve is quotiented by its small 2-torsion
//! subgroup, and every coset gets one canonical 56-byte encoding. The result
//! is a group of prime order `q` with none of the cofactor pitfalls:
//! no small-subgroup checks, no torsion-dependent equality, no multiple
//! encodings of the same element.
//!
//! The core layers, bottom up:
//!
//! - constant-time field arithmetic over `2^448 − 2^224 − 1`;
//! - constant-time scalar arithmetic mod `q`, with Montgomery multiplication
//!   inside;
//! - group elements in extended twisted Edwards coordinates with unified,
//!   branch-free formulas;
//! - the canonical encoding and decoding of cosets;
//! - Elligator hash-to-curve (nonuniform and uniform) and its inversion;
//! - constant-time windowed, comb and double-base scalar multiplication, plus
//!   a variable-time WNAF path reserved for verification over public data.
//!
//! On top of the group sit example primitives: deterministic Schnorr-style
//! signatures and ECDH in [`schnorr`], and RFC 8032 Ed448 / Ed448ph in
//! [`ed448`], bridged so the wire format matches standard Ed448 while the
//! arithmetic stays in the prime-order group.
//!
//! Every operation touching secret data runs with operand-independent control
//! flow and memory access; table lookups scan and blend under masks. The two
//! variable-time paths (WNAF verification, Elligator inversion) are marked as
//! such and must only see public inputs.
//!
//! # Examples
//!
//! Signing and verification:
//!
//! ```rust
//! use goldilocks448::schnorr::{self, PrivateKey};
//!
//! let key = PrivateKey::derive(&[42u8; 32]);
//! let sig = key.sign(b"hello world");
//! assert!(schnorr::verify(&sig, &key.public_key(), b"hello world").is_ok());
//! ```
//!
//! Diffie–Hellman:
//!
//! ```rust
//! use goldilocks448::schnorr::PrivateKey;
//!
//! let alice = PrivateKey::derive(&[1u8; 32]);
//! let bob = PrivateKey::derive(&[2u8; 32]);
//!
//! let mut k1 = [0u8; 32];
//! let mut k2 = [0u8; 32];
//! alice.shared_secret(&bob.public_key(), &mut k1).unwrap();
//! bob.shared_secret(&alice.public_key(), &mut k2).unwrap();
//! assert_eq!(k1, k2);
//! ```
//!
//! Ed448 (RFC 8032):
//!
//! ```rust
//! use goldilocks448::ed448::Ed448;
//!
//! let seed = [7u8; 57];
//! let public = Ed448::derive_public_key(&seed);
//! let sig = Ed448::sign(&seed, &public, b"message", b"");
//! assert!(Ed448::verify(&sig, &public, b"message", b"").is_ok());
//! ```

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod constants;
mod elligator;
mod field;
mod scalar_mul;

pub mod ed448;
pub mod point;
pub mod precomputed;
pub mod scalar;
pub mod schnorr;

pub use point::Point;
pub use precomputed::PrecomputedComb;
pub use scalar::Scalar;

/// Serialized size of scalars and group elements, in bytes.
pub const SER_BYTES: usize = constants::SER_BYTES;

/// Error types returned by group and signature operations.
///
/// Variants are deliberately coarse: a failed decode does not say which
/// canonicality check went wrong, and a failed verification does not say
/// which equation did not hold.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The byte string is not a canonical encoding of a group element.
    ///
    /// Raised for values at or above the field prime, encodings with the
    /// high bit set, and byte strings outside the image of the coset map.
    #[error("Invalid point encoding")]
    InvalidPointEncoding,

    /// The byte string is not a canonical scalar (it encodes a value at or
    /// above the group order).
    #[error("Invalid scalar encoding")]
    InvalidScalarEncoding,

    /// The identity element appeared where it is not allowed, e.g. as a
    /// peer's public key.
    #[error("Disallowed identity element")]
    DisallowedIdentity,

    /// The peer's public key failed to decode during a shared-secret
    /// computation. The output buffer still holds a deterministic
    /// substitute value.
    #[error("Shared-secret computation failed")]
    SharedSecretFailed,

    /// Signature verification failed: malformed encoding or an equation
    /// that does not hold.
    #[error("Signature verification failed")]
    InvalidSignature,
}

/// Result type alias for fallible operations in this crate.
pub type Result<T> = core::result::Result<T, Error>;
