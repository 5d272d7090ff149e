//! Example crypto built on the group: key derivation, Schnorr-style
//! signatures and ECDH.
//!
//! The hash throughout is SHAKE256. Signing is deterministic: the nonce is
//! derived from the private key's symmetric seed and the message. The
//! signature equation is `s = r − c·x` with the challenge bound to the
//! public key, the nonce point and the message, so verification checks
//! `R == s·G + c·pub` with the variable-time double scalar multiplication
//! (both scalars are public there).

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use subtle::{ConditionallySelectable, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::constants::SER_BYTES;
use crate::point::Point;
use crate::precomputed::generator_comb;
use crate::scalar::Scalar;
use crate::{Error, Result};

/// Size of the symmetric seed a private key is derived from.
pub const SYMMETRIC_KEY_BYTES: usize = 32;

/// Size of an encoded public key.
pub const PUBLIC_KEY_BYTES: usize = SER_BYTES;

/// Size of a signature: an encoded point followed by an encoded scalar.
pub const SIGNATURE_BYTES: usize = 2 * SER_BYTES;

/// Scalars are derived from this many hash output bytes, enough to make the
/// reduction bias negligible.
const SCALAR_OVERKILL_BYTES: usize = SER_BYTES + 8;

const DERIVE_MAGIC: &[u8] = b"goldilocks448_derive_private_key";
const SIGN_MAGIC: &[u8] = b"goldilocks448_sign_shake";
const SS_INVALID_MAGIC: &[u8] = b"goldilocks448_ss_invalid";

/// A private key: the symmetric seed it was derived from, the secret scalar
/// and the cached public key. Zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    sym: [u8; SYMMETRIC_KEY_BYTES],
    secret: Scalar,
    public: [u8; PUBLIC_KEY_BYTES],
}

impl PrivateKey {
    /// Derive a private key from a symmetric seed with a domain-separated
    /// SHAKE256 expansion.
    pub fn derive(proto: &[u8; SYMMETRIC_KEY_BYTES]) -> PrivateKey {
        let mut sponge = Shake256::default();
        sponge.update(proto);
        sponge.update(DERIVE_MAGIC);
        let mut encoded_scalar = Zeroizing::new([0u8; SCALAR_OVERKILL_BYTES]);
        sponge.finalize_xof().read(encoded_scalar.as_mut());

        let secret = Scalar::decode_long(encoded_scalar.as_ref());
        let public = generator_comb().scalarmul(&secret).encode();
        PrivateKey {
            sym: *proto,
            secret,
            public,
        }
    }

    /// The encoded public key.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_BYTES] {
        self.public
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_BYTES] {
        let mut xof = Shake256::default();
        xof.update(message);
        self.sign_xof(&xof)
    }

    /// Sign data already absorbed into a SHAKE256 context.
    pub fn sign_xof(&self, xof: &Shake256) -> [u8; SIGNATURE_BYTES] {
        // Derive the nonce from the seed and the message.
        let mut ctx = xof.clone();
        ctx.update(&self.sym);
        ctx.update(SIGN_MAGIC);
        let mut overkill = Zeroizing::new([0u8; SCALAR_OVERKILL_BYTES]);
        ctx.finalize_xof().read(overkill.as_mut());
        let mut nonce = Scalar::decode_long(overkill.as_ref());

        let encoded = generator_comb().scalarmul(&nonce).encode();

        // Derive the challenge from the public key and the nonce point.
        let mut ctx = xof.clone();
        ctx.update(&self.public);
        ctx.update(&encoded);
        ctx.finalize_xof().read(overkill.as_mut());
        let mut challenge = Scalar::decode_long(overkill.as_ref());

        challenge = challenge.mul(&self.secret);
        let response = nonce.sub(&challenge);

        let mut sig = [0u8; SIGNATURE_BYTES];
        sig[..SER_BYTES].copy_from_slice(&encoded);
        sig[SER_BYTES..].copy_from_slice(&response.encode());

        nonce.zeroize();
        challenge.zeroize();
        sig
    }

    /// Compute a shared secret with a peer's encoded public key, filling
    /// `shared`.
    ///
    /// The transcript hashes both public keys in lexicographic order so both
    /// sides derive the same bytes. If the peer's key fails to decode the
    /// output is still filled, with a deterministic value bound to this key's
    /// seed, selected under a mask so the failing branch is not observable
    /// from the output handling; the `Err` return is the only signal.
    pub fn shared_secret(&self, their_pub: &[u8; PUBLIC_KEY_BYTES], shared: &mut [u8]) -> Result<()> {
        // less = 0xff when our key sorts below theirs.
        let mut less: u16 = 0;
        for i in 0..PUBLIC_KEY_BYTES {
            let delta = (self.public[i] as u16).wrapping_sub(their_pub[i] as u16);
            less &= delta.wrapping_sub(1);
            less |= delta;
        }
        let less = (less >> 8) as u8;

        let mut sponge = Shake256::default();
        let mut ss_ser = Zeroizing::new([0u8; SER_BYTES]);

        for i in 0..SER_BYTES {
            ss_ser[i] = (self.public[i] & less) | (their_pub[i] & !less);
        }
        sponge.update(ss_ser.as_ref());
        for i in 0..SER_BYTES {
            ss_ser[i] = (self.public[i] & !less) | (their_pub[i] & less);
        }
        sponge.update(ss_ser.as_ref());

        let (scaled, good) =
            Point::direct_scalarmul(their_pub, &self.secret, false, true);
        *ss_ser = scaled;

        // On failure substitute sym || "invalid" marker under the mask.
        let good_mask = u8::conditional_select(&0, &0xff, good);
        for i in 0..SER_BYTES {
            ss_ser[i] &= good_mask;
            if i < SYMMETRIC_KEY_BYTES {
                ss_ser[i] |= self.sym[i] & !good_mask;
            } else if i - SYMMETRIC_KEY_BYTES < SS_INVALID_MAGIC.len() {
                ss_ser[i] |= SS_INVALID_MAGIC[i - SYMMETRIC_KEY_BYTES] & !good_mask;
            }
        }
        sponge.update(ss_ser.as_ref());
        sponge.finalize_xof().read(shared);

        if bool::from(good) {
            Ok(())
        } else {
            Err(Error::SharedSecretFailed)
        }
    }
}

/// Verify a signature over a message.
pub fn verify(
    sig: &[u8; SIGNATURE_BYTES],
    public: &[u8; PUBLIC_KEY_BYTES],
    message: &[u8],
) -> Result<()> {
    let mut xof = Shake256::default();
    xof.update(message);
    verify_xof(sig, public, &xof)
}

/// Verify a signature over data already absorbed into a SHAKE256 context.
pub fn verify_xof(
    sig: &[u8; SIGNATURE_BYTES],
    public: &[u8; PUBLIC_KEY_BYTES],
    xof: &Shake256,
) -> Result<()> {
    let mut ctx = xof.clone();
    ctx.update(public);
    ctx.update(&sig[..SER_BYTES]);
    let mut overkill = [0u8; SCALAR_OVERKILL_BYTES];
    ctx.finalize_xof().read(&mut overkill);
    let challenge = Scalar::decode_long(&overkill);

    let point_enc: &[u8; SER_BYTES] = sig[..SER_BYTES].try_into().expect("fixed split");
    let response_enc: &[u8; SER_BYTES] = sig[SER_BYTES..].try_into().expect("fixed split");

    let point = Point::decode(point_enc, true);
    let pubpoint = Point::decode(public, false);
    let response = Scalar::decode(response_enc);

    let mut ret = point.is_some() & pubpoint.is_some() & response.is_some();

    let point = point.unwrap_or(Point::IDENTITY);
    let pubpoint = pubpoint.unwrap_or(Point::IDENTITY);
    let response = response.unwrap_or(Scalar::ZERO);

    let combo = pubpoint.non_secret_combo_with_base(&response, &challenge);
    ret &= combo.ct_eq(&point);

    if bool::from(ret) {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}
