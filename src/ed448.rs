//! RFC 8032 Ed448 signatures, including the prehashed variant (Ed448ph).
//!
//! The arithmetic runs in the prime-order group; the EdDSA wire format is
//! reached through the codec bridge, with secret scalars pre-divided by the
//! encode ratio so the encodings come out on the standard Ed448 points. All
//! hashing is SHAKE256 with the `SigEd448` domain prefix.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::constants::{EDDSA_DECODE_RATIO, EDDSA_ENCODE_RATIO};
use crate::point::Point;
use crate::precomputed::generator_comb;
use crate::scalar::Scalar;
use crate::{Error, Result};

/// Size of an Ed448 private key (a seed).
pub const ED448_PRIVATE_KEY_BYTES: usize = 57;

/// Size of an Ed448 public key.
pub const ED448_PUBLIC_KEY_BYTES: usize = 57;

/// Size of an Ed448 signature.
pub const ED448_SIGNATURE_BYTES: usize = ED448_PRIVATE_KEY_BYTES + ED448_PUBLIC_KEY_BYTES;

/// Output size of the Ed448ph message prehash.
pub const ED448_PREHASH_BYTES: usize = 64;

/// RFC 8032 clamping: clear the cofactor bits, set the top bit, clear the
/// spare byte.
fn clamp(ser: &mut [u8; ED448_PRIVATE_KEY_BYTES]) {
    ser[0] &= 0xfc;
    ser[ED448_PRIVATE_KEY_BYTES - 1] = 0;
    ser[ED448_PRIVATE_KEY_BYTES - 2] |= 0x80;
}

/// `SigEd448 || flag || len(context) || context` domain prefix.
fn hash_with_dom(prehashed: bool, context: &[u8]) -> Shake256 {
    debug_assert!(context.len() <= 255);
    let mut hash = Shake256::default();
    hash.update(b"SigEd448");
    hash.update(&[prehashed as u8, context.len() as u8]);
    hash.update(context);
    hash
}

fn expand_private_key(
    privkey: &[u8; ED448_PRIVATE_KEY_BYTES],
) -> Zeroizing<[u8; 2 * ED448_PRIVATE_KEY_BYTES]> {
    let mut hash = Shake256::default();
    hash.update(privkey);
    let mut expanded = Zeroizing::new([0u8; 2 * ED448_PRIVATE_KEY_BYTES]);
    hash.finalize_xof().read(expanded.as_mut());
    expanded
}

/// Clamp and decode the secret scalar from the expanded key.
fn clamped_secret_scalar(expanded: &[u8; 2 * ED448_PRIVATE_KEY_BYTES]) -> Scalar {
    let mut ser = Zeroizing::new([0u8; ED448_PRIVATE_KEY_BYTES]);
    ser.as_mut().copy_from_slice(&expanded[..ED448_PRIVATE_KEY_BYTES]);
    clamp(&mut ser);
    Scalar::decode_long(ser.as_ref())
}

/// Divide a scalar by the encode ratio, so that encoding the fixed-base
/// multiple lands on the standard Ed448 point.
fn divide_by_encode_ratio(scalar: &Scalar) -> Scalar {
    let mut out = *scalar;
    let mut c = 1;
    while c < EDDSA_ENCODE_RATIO {
        out = out.halve();
        c <<= 1;
    }
    out
}

fn prehash(message: &[u8]) -> [u8; ED448_PREHASH_BYTES] {
    let mut hash = Shake256::default();
    hash.update(message);
    let mut out = [0u8; ED448_PREHASH_BYTES];
    hash.finalize_xof().read(&mut out);
    out
}

/// RFC 8032 Ed448 signing and verification.
pub struct Ed448;

impl Ed448 {
    /// Derive the public key for a private seed.
    pub fn derive_public_key(
        privkey: &[u8; ED448_PRIVATE_KEY_BYTES],
    ) -> [u8; ED448_PUBLIC_KEY_BYTES] {
        let expanded = expand_private_key(privkey);
        let mut secret = clamped_secret_scalar(&expanded);
        let mut divided = divide_by_encode_ratio(&secret);
        let p = generator_comb().scalarmul(&divided);
        secret.zeroize();
        divided.zeroize();
        p.mul_by_ratio_and_encode_like_eddsa()
    }

    /// Sign a message with an optional context (at most 255 bytes).
    pub fn sign(
        privkey: &[u8; ED448_PRIVATE_KEY_BYTES],
        pubkey: &[u8; ED448_PUBLIC_KEY_BYTES],
        message: &[u8],
        context: &[u8],
    ) -> [u8; ED448_SIGNATURE_BYTES] {
        Ed448::sign_inner(privkey, pubkey, message, false, context)
    }

    /// Sign with the Ed448ph prehash: the message is hashed to 64 bytes
    /// first, and the domain prefix marks the signature as prehashed.
    pub fn sign_prehash(
        privkey: &[u8; ED448_PRIVATE_KEY_BYTES],
        pubkey: &[u8; ED448_PUBLIC_KEY_BYTES],
        message: &[u8],
        context: &[u8],
    ) -> [u8; ED448_SIGNATURE_BYTES] {
        let ph = prehash(message);
        Ed448::sign_inner(privkey, pubkey, &ph, true, context)
    }

    fn sign_inner(
        privkey: &[u8; ED448_PRIVATE_KEY_BYTES],
        pubkey: &[u8; ED448_PUBLIC_KEY_BYTES],
        message: &[u8],
        prehashed: bool,
        context: &[u8],
    ) -> [u8; ED448_SIGNATURE_BYTES] {
        let expanded = expand_private_key(privkey);
        let mut secret_scalar = clamped_secret_scalar(&expanded);

        // Nonce: hash the seed half and the message under the dom prefix.
        let mut hash = hash_with_dom(prehashed, context);
        hash.update(&expanded[ED448_PRIVATE_KEY_BYTES..]);
        hash.update(message);
        let mut nonce_bytes = Zeroizing::new([0u8; 2 * ED448_PRIVATE_KEY_BYTES]);
        hash.finalize_xof().read(nonce_bytes.as_mut());
        let mut nonce = Scalar::decode_long(nonce_bytes.as_ref());

        // Nonce point, with the ratio divided out before encoding.
        let mut nonce_div = divide_by_encode_ratio(&nonce);
        let nonce_point = generator_comb()
            .scalarmul(&nonce_div)
            .mul_by_ratio_and_encode_like_eddsa();
        nonce_div.zeroize();

        // Challenge over nonce point, public key and message.
        let mut hash = hash_with_dom(prehashed, context);
        hash.update(&nonce_point);
        hash.update(pubkey);
        hash.update(message);
        let mut challenge_bytes = Zeroizing::new([0u8; 2 * ED448_PRIVATE_KEY_BYTES]);
        hash.finalize_xof().read(challenge_bytes.as_mut());
        let mut challenge = Scalar::decode_long(challenge_bytes.as_ref());

        challenge = challenge.mul(&secret_scalar);
        let response = challenge.add(&nonce);

        let mut signature = [0u8; ED448_SIGNATURE_BYTES];
        signature[..ED448_PUBLIC_KEY_BYTES].copy_from_slice(&nonce_point);
        signature[ED448_PUBLIC_KEY_BYTES..ED448_PUBLIC_KEY_BYTES + 56]
            .copy_from_slice(&response.encode());

        secret_scalar.zeroize();
        nonce.zeroize();
        challenge.zeroize();
        signature
    }

    /// Verify a signature with an optional context.
    pub fn verify(
        signature: &[u8; ED448_SIGNATURE_BYTES],
        pubkey: &[u8; ED448_PUBLIC_KEY_BYTES],
        message: &[u8],
        context: &[u8],
    ) -> Result<()> {
        Ed448::verify_inner(signature, pubkey, message, false, context)
    }

    /// Verify an Ed448ph signature.
    pub fn verify_prehash(
        signature: &[u8; ED448_SIGNATURE_BYTES],
        pubkey: &[u8; ED448_PUBLIC_KEY_BYTES],
        message: &[u8],
        context: &[u8],
    ) -> Result<()> {
        let ph = prehash(message);
        Ed448::verify_inner(signature, pubkey, &ph, true, context)
    }

    fn verify_inner(
        signature: &[u8; ED448_SIGNATURE_BYTES],
        pubkey: &[u8; ED448_PUBLIC_KEY_BYTES],
        message: &[u8],
        prehashed: bool,
        context: &[u8],
    ) -> Result<()> {
        let pk_point = Option::<Point>::from(Point::decode_like_eddsa_and_mul_by_ratio(pubkey))
            .ok_or(Error::InvalidPointEncoding)?;

        let r_enc: &[u8; ED448_PUBLIC_KEY_BYTES] = signature[..ED448_PUBLIC_KEY_BYTES]
            .try_into()
            .expect("fixed split");
        let r_point = Option::<Point>::from(Point::decode_like_eddsa_and_mul_by_ratio(r_enc))
            .ok_or(Error::InvalidSignature)?;

        let mut hash = hash_with_dom(prehashed, context);
        hash.update(r_enc);
        hash.update(pubkey);
        hash.update(message);
        let mut challenge_bytes = [0u8; 2 * ED448_PRIVATE_KEY_BYTES];
        hash.finalize_xof().read(&mut challenge_bytes);
        let challenge = -Scalar::decode_long(&challenge_bytes);

        let mut response = Scalar::decode_long(&signature[ED448_PUBLIC_KEY_BYTES..]);
        let mut c = 1;
        while c < EDDSA_DECODE_RATIO {
            response = response.add(&response);
            c <<= 1;
        }

        // response·G − challenge·pk must reproduce the nonce point.
        let combo = pk_point.non_secret_combo_with_base(&response, &challenge);
        if bool::from(combo.ct_eq(&r_point)) {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let privkey = [7u8; ED448_PRIVATE_KEY_BYTES];
        let pubkey = Ed448::derive_public_key(&privkey);
        let msg = b"ed448 round trip";
        let sig = Ed448::sign(&privkey, &pubkey, msg, b"");
        assert!(Ed448::verify(&sig, &pubkey, msg, b"").is_ok());
        assert!(Ed448::verify(&sig, &pubkey, msg, b"ctx").is_err());
        assert!(Ed448::verify(&sig, &pubkey, b"other", b"").is_err());
    }

    #[test]
    fn prehash_round_trip() {
        let privkey = [8u8; ED448_PRIVATE_KEY_BYTES];
        let pubkey = Ed448::derive_public_key(&privkey);
        let msg = b"ed448ph round trip";
        let sig = Ed448::sign_prehash(&privkey, &pubkey, msg, b"ctx");
        assert!(Ed448::verify_prehash(&sig, &pubkey, msg, b"ctx").is_ok());
        // A plain signature over the same message is a different statement.
        assert!(Ed448::verify(&sig, &pubkey, msg, b"ctx").is_err());
    }

    #[test]
    fn context_binds_the_signature() {
        let privkey = [9u8; ED448_PRIVATE_KEY_BYTES];
        let pubkey = Ed448::derive_public_key(&privkey);
        let msg = b"context binding";
        let sig = Ed448::sign(&privkey, &pubkey, msg, b"alpha");
        assert!(Ed448::verify(&sig, &pubkey, msg, b"alpha").is_ok());
        assert!(Ed448::verify(&sig, &pubkey, msg, b"beta").is_err());
    }
}
