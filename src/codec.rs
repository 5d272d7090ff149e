//! Canonical byte encoding of group elements.
//!
//! The encoding quotients the twisted curve by its 2-torsion and produces one
//! bit-exact byte string per coset: any two representatives of the same coset
//! serialize identically, and `encode(decode(b)) = b` for every valid `b`.
//! The identity has the unique all-zero encoding.
//!
//! This module also carries the bridge between the native encoding and the
//! EdDSA wire format (compressed Edwards `y` with the sign of `x`), used by
//! Ed448 signing. The bridge maps through a pair of doubling-shaped
//! isogenies whose composition is multiplication by 4; encoding multiplies
//! the point by the encode ratio and decoding by the decode ratio, so the
//! arithmetic domain stays the prime-order group while the wire format is
//! RFC 8032 compatible.

use subtle::{Choice, ConditionallyNegatable, ConditionallySelectable, ConstantTimeEq, CtOption};

use crate::constants::{EDWARDS_D, SER_BYTES};
use crate::field::FieldElement;
use crate::point::Point;

/// Solve for the canonical `s` (and `−t/s`) of a coset representative.
///
/// The toggles flip the sign choices; all zeroes gives the canonical
/// encoding, and the Elligator inverse walks the other combinations. The
/// third toggle selects the 4-torsion rotation on cofactor-8 curves and is
/// inert for this one.
pub(crate) fn deisogenize(
    p: &Point,
    toggle_hibit_s: Choice,
    toggle_hibit_t_over_s: Choice,
    _toggle_rotation: Choice,
) -> (FieldElement, FieldElement) {
    let a = p.y.mul_small(1 - EDWARDS_D); // (1−d)·Y = −d_tw·Y
    let c = a.mul(&p.t); // −d_tw·Y·T
    let a = p.x.mul(&p.z);
    let d = c.sub(&a); // aXZ − d_tw·YT with a = −1
    let a = p.z.add(&p.y);
    let b = p.z.sub(&p.y);
    let c = b.mul(&a); // Z² − Y²
    let b = c.mul_small(-EDWARDS_D); // (a − d_tw)(Z² − Y²)
    let (a, ok) = FieldElement::isqrt_chk(&b, Choice::from(1u8));
    debug_assert!(bool::from(ok));
    let b = a.mul_small(-EDWARDS_D); // u
    let c = b.mul(&a); // u·r
    let a = c.mul(&d); // u·r·(aZX − d_tw·YT)
    let d = b.add(&b); // 2u
    let mut c = d.mul(&p.z); // 2u·Z
    let neg = toggle_hibit_t_over_s ^ !c.hibit();
    let mut b = b;
    b.conditional_negate(neg);
    c.conditional_negate(neg);
    let d = b.mul(&p.y);
    let mut s = a.add(&d);
    s.conditional_negate(toggle_hibit_s ^ s.hibit());
    (s, c)
}

impl Point {
    /// Canonical encoding of the coset, 56 bytes.
    pub fn encode(&self) -> [u8; SER_BYTES] {
        let (s, _) = deisogenize(self, Choice::from(0u8), Choice::from(0u8), Choice::from(0u8));
        s.serialize()
    }

    /// Decode a canonical encoding.
    ///
    /// Fails on values `>= p`, on encodings with the high bit set, and on
    /// byte strings outside the image of the coset map. The all-zero string
    /// decodes to the identity only when `allow_identity` is set.
    pub fn decode(ser: &[u8; SER_BYTES], allow_identity: bool) -> CtOption<Point> {
        let (s, mut succ) = FieldElement::deserialize(ser);
        let zero = s.is_zero();
        succ &= Choice::from(allow_identity as u8) | !zero;
        succ &= !s.hibit();

        let a = s.square();
        let f = FieldElement::ONE.add(&a); // 1 − a_tw·s² with a_tw = −1
        succ &= !f.is_zero();
        let b = f.square();
        let c = a.mul_small(-4 * EDWARDS_D);
        let c = c.add(&b); // t²
        let d = f.mul(&s); // s·(1 + s²), the shared denominator
        let e = d.square();
        let b = c.mul(&e);

        let (e, ok) = FieldElement::isqrt_chk(&b, Choice::from(1u8));
        succ &= ok; // e = 1/(t·s·(1+s²))
        let mut b = e.mul(&d); // 1/t
        let mut d = e.mul(&c); // t / (s·(1+s²))
        let e = d.mul(&f); // t/s
        let negtos = e.hibit();
        b.conditional_negate(negtos);
        d.conditional_negate(negtos);

        let z = FieldElement::ONE.sub(&a); // 1 − s²
        let a2 = f.mul(&b); // (1 + s²)/t
        let mut y = z.mul(&a2); // Y = Z·(1 + s²)/t
        let x = s.add(&s); // X = 2s
        let t = x.mul(&a2); // T = 2s·(1 + s²)/t

        // The all-zero string lands on (0, 0, 1, 0); nudge Y to make it the
        // canonical identity.
        let fixup = u64::conditional_select(&0, &1, zero);
        y.0[0] += fixup;

        let p = Point { x, y, z, t };
        debug_assert!(bool::from(p.valid() | !succ));
        CtOption::new(p, succ)
    }

    /// Decode a canonical encoding from wire data, mapping failures onto the
    /// crate error taxonomy. The identity is rejected unless `allow_identity`
    /// is set.
    pub fn from_bytes(ser: &[u8; SER_BYTES], allow_identity: bool) -> crate::Result<Point> {
        match Option::<Point>::from(Point::decode(ser, allow_identity)) {
            Some(p) => Ok(p),
            None if !allow_identity && *ser == [0u8; SER_BYTES] => {
                Err(crate::Error::DisallowedIdentity)
            }
            None => Err(crate::Error::InvalidPointEncoding),
        }
    }

    /// Multiply by the EdDSA encode ratio and encode in EdDSA wire format
    /// (little-endian Edwards `y` with the sign bit of `x` in the last byte).
    pub fn mul_by_ratio_and_encode_like_eddsa(&self) -> [u8; SER_BYTES + 1] {
        // Doubling-shaped isogeny to the untwisted curve:
        // x' = 2xy/(x² + y²), y' = (y² − x²)/(2z² − y² + x²).
        let xx = self.x.square();
        let yy = self.y.square();
        let u = xx.add(&yy);
        let zx = self.y.add(&self.x);
        let num_x = zx.square().sub(&u); // 2xy
        let num_y = yy.sub(&xx);
        let zz = self.z.square();
        let den_y = zz.add(&zz).sub(&num_y); // 2z² − y² + x²

        let x_proj = num_x.mul(&den_y);
        let y_proj = num_y.mul(&u);
        let z_proj = u.mul(&den_y);

        let zi = z_proj.invert();
        let x_aff = x_proj.mul(&zi);
        let y_aff = y_proj.mul(&zi);

        let mut enc = [0u8; SER_BYTES + 1];
        enc[..SER_BYTES].copy_from_slice(&y_aff.serialize());
        enc[SER_BYTES] = u8::conditional_select(&0, &0x80, x_aff.lobit());
        enc
    }

    /// Decode an EdDSA wire-format point and multiply it by the EdDSA decode
    /// ratio into the prime-order group.
    pub fn decode_like_eddsa_and_mul_by_ratio(enc: &[u8; SER_BYTES + 1]) -> CtOption<Point> {
        let mut enc2 = *enc;
        let low = Choice::from(enc2[SER_BYTES] >> 7);
        enc2[SER_BYTES] &= 0x7f;
        // 448 is a multiple of 8, so nothing but the sign may live in the
        // final byte.
        let mut succ = enc2[SER_BYTES].ct_eq(&0);

        let y_bytes: [u8; SER_BYTES] = enc2[..SER_BYTES].try_into().expect("fixed prefix");
        let (y, ok) = FieldElement::deserialize(&y_bytes);
        succ &= ok;

        // x² = (1 − y²)/(1 − d·y²) on the untwisted curve.
        let yy = y.square();
        let num = FieldElement::ONE.sub(&yy);
        let dyy = yy.mul_small(EDWARDS_D);
        let denom = FieldElement::ONE.sub(&dyy);
        let prod = num.mul(&denom);
        let (isr, ok) = FieldElement::isqrt_chk(&prod, Choice::from(1u8));
        succ &= ok;
        let mut x = isr.mul(&num);
        x.conditional_negate(x.lobit() ^ low);
        succ &= !(x.is_zero() & low);

        // Doubling-shaped isogeny from the untwisted curve back to the
        // twisted one; with the encode direction it composes to [4].
        let c = x.square();
        let aa = y.square();
        let d = c.add(&aa); // x² + y²
        let tmp = y.add(&x);
        let b = tmp.square().sub(&d); // 2xy
        let t = aa.sub(&c); // y² − x²
        let two = FieldElement::ONE.add(&FieldElement::ONE);
        let a2 = two.sub(&d); // 2 − x² − y²

        let p = Point {
            x: a2.mul(&b),
            z: t.mul(&a2),
            y: t.mul(&d),
            t: b.mul(&d),
        };
        debug_assert!(bool::from(p.valid() | !succ));
        CtOption::new(p, succ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ED448_BASEPOINT_BYTES;
    use crate::scalar::Scalar;
    use sha3::digest::{ExtendableOutput, Update, XofReader};
    use sha3::Shake256;

    // The Ed448 base point in affine coordinates (RFC 8032), big-endian.
    const BASE_X_HEX: &str = "4f1970c66bed0ded221d15a622bf36da9e146570470f1767ea6de324\
                              a3d3a46412ae1af72ab66511433b80e18b00938e2626a82bc70cc05e";
    const BASE_Y_HEX: &str = "693f46716eb6bc248876203756c9c7624bea73736ca3984087789c1e\
                              05a0c2d73ad3ff1ce67c39c4fdbd132c4ed7c8ad9808795bf230fa14";
    // Twice the base point, from the Ed448 paper.
    const BASE2_X_HEX: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa9\
                               55555555555555555555555555555555555555555555555555555555";
    const BASE2_Y_HEX: &str = "ae05e9634ad7048db359d6205086c2b0036ed7a035884dd7b7e36d72\
                               8ad8c4b80d6565833a2a3098bbbcb2bed1cda06bdaeafbcdea9386ed";

    fn field_from_be_hex(hex_str: &str) -> FieldElement {
        let mut bytes = hex::decode(hex_str).unwrap();
        bytes.reverse();
        let (fe, ok) = FieldElement::deserialize(&bytes.try_into().unwrap());
        assert!(bool::from(ok));
        fe
    }

    #[test]
    fn basepoint_satisfies_untwisted_curve_equation() {
        // x² + y² = 1 + d·x²·y² with d = −39081
        let x = field_from_be_hex(BASE_X_HEX);
        let y = field_from_be_hex(BASE_Y_HEX);
        let xx = x.square();
        let yy = y.square();
        let lhs = xx.add(&yy);
        let rhs = FieldElement::ONE.add(&xx.mul(&yy).mul_small(EDWARDS_D));
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn basepoint_bytes_match_affine_coordinates() {
        let x = field_from_be_hex(BASE_X_HEX);
        let y = field_from_be_hex(BASE_Y_HEX);
        let mut expected = [0u8; SER_BYTES + 1];
        expected[..SER_BYTES].copy_from_slice(&y.serialize());
        expected[SER_BYTES] = u8::conditional_select(&0, &0x80, x.lobit());
        assert_eq!(expected, ED448_BASEPOINT_BYTES);
    }

    #[test]
    fn bridge_composition_is_multiplication_by_four() {
        // encode(decode(B)/4) must reproduce B bit for bit, and
        // encode(decode(B)/2) must land on 2B.
        let psi_b = Point::decode_like_eddsa_and_mul_by_ratio(&ED448_BASEPOINT_BYTES).unwrap();
        assert!(bool::from(psi_b.valid()));

        let quarter = Scalar::from(4u64).invert().unwrap();
        let back = (&psi_b * &quarter).mul_by_ratio_and_encode_like_eddsa();
        assert_eq!(back, ED448_BASEPOINT_BYTES);

        let half = Scalar::from(2u64).invert().unwrap();
        let twice = (&psi_b * &half).mul_by_ratio_and_encode_like_eddsa();
        let x2 = field_from_be_hex(BASE2_X_HEX);
        let y2 = field_from_be_hex(BASE2_Y_HEX);
        let mut expected = [0u8; SER_BYTES + 1];
        expected[..SER_BYTES].copy_from_slice(&y2.serialize());
        expected[SER_BYTES] = u8::conditional_select(&0, &0x80, x2.lobit());
        assert_eq!(twice, expected);
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut h = Shake256::default();
        h.update(b"codec round trip");
        let mut reader = h.finalize_xof();
        for _ in 0..50 {
            let mut bytes = [0u8; 2 * SER_BYTES];
            reader.read(&mut bytes);
            let p = Point::from_uniform_hash(&bytes);
            let enc = p.encode();
            let q = Point::decode(&enc, false).unwrap();
            assert_eq!(p, q);
            assert_eq!(q.encode(), enc);
        }
    }

    #[test]
    fn coset_representatives_encode_identically() {
        let mut h = Shake256::default();
        h.update(b"codec coset encodings");
        let mut reader = h.finalize_xof();
        for _ in 0..20 {
            let mut bytes = [0u8; 2 * SER_BYTES];
            reader.read(&mut bytes);
            let p = Point::from_uniform_hash(&bytes);
            let mut factor = [0u8; SER_BYTES];
            reader.read(&mut factor);
            factor[SER_BYTES - 1] &= 0x7f;
            assert_eq!(p.encode(), p.torque().encode());
            assert_eq!(p.encode(), p.pscale(&factor).encode());
            assert_eq!(p.encode(), p.torque().pscale(&factor).encode());
        }
    }

    #[test]
    fn identity_has_the_all_zero_encoding() {
        assert_eq!(Point::IDENTITY.encode(), [0u8; SER_BYTES]);
        let id = Point::decode(&[0u8; SER_BYTES], true).unwrap();
        assert_eq!(id, Point::IDENTITY);
        assert!(bool::from(id.valid()));
    }

    #[test]
    fn decode_rejections() {
        // Identity disallowed by default.
        assert!(bool::from(Point::decode(&[0u8; SER_BYTES], false).is_none()));

        // High bit set.
        let mut high = Point::generator().encode();
        high[SER_BYTES - 1] |= 0x80;
        assert!(bool::from(Point::decode(&high, true).is_none()));

        // Value >= p.
        let ff = [0xffu8; SER_BYTES];
        assert!(bool::from(Point::decode(&ff, true).is_none()));
    }
}
