//! Hash-to-curve and its inversion.
//!
//! The forward maps turn field-element-sized byte strings into group
//! elements: [`Point::from_nonuniform_hash`] covers at least half the group,
//! and [`Point::from_uniform_hash`] adds the images of two independent halves
//! for a uniformly distributed result.
//!
//! The inverse map reconstructs a preimage from a point plus a 4-bit hint
//! encoding the sign choices that the forward map collapsed. For a uniformly
//! distributed point roughly half of the sixteen hints succeed; callers
//! seeking a steganographic encoding try hints until one does. The inversion
//! is **not constant-time** and must only see public points.

use subtle::{Choice, ConditionallyNegatable, ConditionallySelectable, CtOption};

use crate::codec::deisogenize;
use crate::constants::{EDWARDS_D, SER_BYTES};
use crate::field::FieldElement;
use crate::point::Point;

impl Point {
    /// Map 56 bytes onto the group. The map is deterministic and its image
    /// covers about half the group; use [`Point::from_uniform_hash`] when the
    /// output must be uniform.
    pub fn from_nonuniform_hash(ser: &[u8; SER_BYTES]) -> Point {
        let (mut r0, _) = FieldElement::deserialize(ser);
        r0.strong_reduce();
        let a = r0.square();
        let r = a.neg(); // −r0²; p ≡ 3 (mod 4) so −1 is the QNR

        let dee = FieldElement::ONE.mul_small(EDWARDS_D);
        let c = r.mul_small(EDWARDS_D);

        // D := (dr + a − d)(dr − ar − d) with a = 1
        let a2 = c.sub(&dee);
        let a3 = a2.add(&FieldElement::ONE);
        let special_identity_case = a3.is_zero();
        let b = c.sub(&r);
        let b2 = b.sub(&dee);
        let dcap = a3.mul(&b2);

        // N := (r + 1)(a − 2d)
        let a4 = r.add(&FieldElement::ONE);
        let ncap = a4.mul_small(1 - 2 * EDWARDS_D);

        // e = ±1/sqrt(±N·D)
        let rn = r.mul(&ncap);
        let a5 = rn.mul(&dcap);
        let (e, mut square) = FieldElement::isqrt_chk(&a5, Choice::from(0u8));
        let r_is_zero = r.is_zero();
        square |= r_is_zero;
        square |= special_identity_case;

        // t/s, taking the alternate branch when ±N·D was not square
        let c2 = FieldElement::conditional_select(&r0, &r, square);
        // two steps so the word multiplier stays small
        let a6 = c2.mul_small(1 - 2 * EDWARDS_D);
        let b3 = a6.mul_small(1 - 2 * EDWARDS_D);
        let c3 = r.sub(&FieldElement::ONE);
        let a7 = b3.mul(&c3); // r? · (r − 1) · (a − 2d)²
        let mut b4 = a7.mul(&e);
        b4.conditional_negate(!square);
        let c4 = FieldElement::conditional_select(&r0, &FieldElement::ONE, square);
        let a8 = e.mul(&c4);
        let c5 = a8.mul(&dcap); // 1/s up to sign
        let b5 = b4.sub(&c5);

        // s = e · N · (square ? r : r0)
        let a9 = ncap.mul(&r0);
        let rn2 = FieldElement::conditional_select(&a9, &rn, square);
        let a10 = rn2.mul(&e);
        let c6 = a10.mul(&b5);

        let neg_s = a10.hibit() ^ !square;
        let mut s = a10;
        s.conditional_negate(neg_s);

        // (0, 0) maps to (s, t) = (0, 1), the identity
        let t = FieldElement::conditional_select(&c6, &FieldElement::ONE, c6.is_zero());

        // (X:Y:Z:T) = (2st, (1+s²)(1−s²), (1−s²)t, 2s(1+s²))
        let ss = s.square();
        let s2 = s.add(&s);
        let e2 = ss.add(&FieldElement::ONE);
        let t_coord = s2.mul(&e2);
        let x_coord = s2.mul(&t);
        let a11 = FieldElement::ONE.sub(&ss);
        let y_coord = e2.mul(&a11);
        let z_coord = a11.mul(&t);

        let p = Point {
            x: x_coord,
            y: y_coord,
            z: z_coord,
            t: t_coord,
        };
        debug_assert!(bool::from(p.valid()));
        p
    }

    /// Map 112 bytes onto the group with uniform output: the two halves are
    /// hashed independently and their images added.
    pub fn from_uniform_hash(ser: &[u8; 2 * SER_BYTES]) -> Point {
        let first: &[u8; SER_BYTES] = ser[..SER_BYTES].try_into().expect("fixed half");
        let second: &[u8; SER_BYTES] = ser[SER_BYTES..].try_into().expect("fixed half");
        let p = Point::from_nonuniform_hash(first);
        let q = Point::from_nonuniform_hash(second);
        p.add(&q)
    }

    /// Invert [`Point::from_nonuniform_hash`]. The hint's low bits choose the
    /// signs of `s`, `t/s` and `r0`; bit 3 selects the 4-torsion rotation on
    /// cofactor-8 curves and is inert here, so hints `h` and `h + 8`
    /// coincide. Succeeds iff the point has a preimage under those choices.
    ///
    /// Not constant-time; only for public points.
    pub fn invert_elligator_nonuniform(&self, hint: u32) -> CtOption<[u8; SER_BYTES]> {
        let (bytes, succ) = self.invert_elligator_raw(hint);
        CtOption::new(bytes, succ)
    }

    fn invert_elligator_raw(&self, hint: u32) -> ([u8; SER_BYTES], Choice) {
        let sgn_s = Choice::from((hint & 1) as u8);
        let sgn_t_over_s = Choice::from((hint >> 1 & 1) as u8);
        let sgn_r0 = Choice::from((hint >> 2 & 1) as u8);
        let sgn_ed_t = Choice::from((hint >> 3 & 1) as u8);

        let (a, c) = deisogenize(self, sgn_s, sgn_t_over_s, sgn_ed_t);

        // a = s, c = −t/s
        let b0 = c.mul(&a);
        let b1 = FieldElement::ONE.sub(&b0); // 1 + t
        let c0 = a.square(); // s²
        let is_identity = self.t.is_zero();
        // The identity's preimages: hint 0 gives the zero string; asking to
        // flip t/s pushes s out to "infinity", i.e. s = 1.
        let c1 = FieldElement::conditional_select(&c0, &FieldElement::ONE, is_identity & sgn_t_over_s);
        let b2 = FieldElement::conditional_select(
            &b1,
            &FieldElement::ZERO,
            is_identity & !sgn_t_over_s & !sgn_s,
        );

        let d0 = c1.mul_small(2 * EDWARDS_D - 1); // (2d − a)s²
        let a0 = b2.add(&d0);
        let d1 = d0.sub(&b2);
        let b3 = a0.mul(&d1);
        let a1 = FieldElement::conditional_select(&d1, &a0, sgn_s);
        let d2 = b3.neg(); // p ≡ 3 (mod 4)
        let (c2, mut succ) = FieldElement::isqrt_chk(&d2, Choice::from(1u8));
        let b4 = a1.mul(&c2);
        let mut r0 = b4;
        r0.conditional_negate(sgn_r0 ^ b4.hibit());
        succ &= !(r0.is_zero() & sgn_r0);

        (r0.serialize(), succ)
    }

    /// Invert [`Point::from_uniform_hash`] given the second half of the
    /// preimage: decodes that half, subtracts its image and inverts the
    /// remainder against the hint. On success the returned 112 bytes satisfy
    /// `from_uniform_hash(out) == self`.
    ///
    /// Not constant-time; only for public points.
    pub fn invert_elligator_uniform(
        &self,
        second_half: &[u8; SER_BYTES],
        hint: u32,
    ) -> CtOption<[u8; 2 * SER_BYTES]> {
        let tail = Point::from_nonuniform_hash(second_half);
        let remainder = self.sub(&tail);
        let (first, succ) = remainder.invert_elligator_raw(hint);
        let mut out = [0u8; 2 * SER_BYTES];
        out[..SER_BYTES].copy_from_slice(&first);
        out[SER_BYTES..].copy_from_slice(second_half);
        CtOption::new(out, succ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::digest::{ExtendableOutput, Update, XofReader};
    use sha3::Shake256;

    fn reader(seed: &str) -> impl FnMut(&mut [u8]) {
        let mut h = Shake256::default();
        h.update(seed.as_bytes());
        let mut r = h.finalize_xof();
        move |buf: &mut [u8]| r.read(buf)
    }

    #[test]
    fn zero_maps_to_identity() {
        let p = Point::from_nonuniform_hash(&[0u8; SER_BYTES]);
        assert_eq!(p, Point::IDENTITY);
    }

    #[test]
    fn uniform_is_sum_of_nonuniform_halves() {
        let mut read = reader("elligator uniform sum");
        for _ in 0..30 {
            let mut b = [0u8; 2 * SER_BYTES];
            read(&mut b);
            let whole = Point::from_uniform_hash(&b);
            let p = Point::from_nonuniform_hash(&b[..SER_BYTES].try_into().unwrap());
            let q = Point::from_nonuniform_hash(&b[SER_BYTES..].try_into().unwrap());
            assert_eq!(whole, p.add(&q));
            assert!(bool::from(whole.valid()));
        }
    }

    #[test]
    fn inversion_round_trips() {
        let mut read = reader("elligator inversion");
        for i in 0..60 {
            let mut b = [0u8; SER_BYTES];
            read(&mut b);
            // canonical, nonnegative preimages round-trip exactly
            b[SER_BYTES - 1] &= 0x3f;
            if i == 0 {
                b = [0u8; SER_BYTES];
            }
            let p = Point::from_nonuniform_hash(&b);

            let mut found_exact = false;
            for hint in 0..16u32 {
                let inv = p.invert_elligator_nonuniform(hint);
                if let Some(pre) = Option::<[u8; SER_BYTES]>::from(inv) {
                    assert_eq!(Point::from_nonuniform_hash(&pre), p);
                    found_exact |= pre == b;
                }
            }
            assert!(found_exact, "no hint recovered the original preimage");
        }
    }

    #[test]
    fn inversion_is_stable_under_torque_and_pscale() {
        let mut read = reader("elligator torque stability");
        for _ in 0..20 {
            let mut b = [0u8; SER_BYTES];
            read(&mut b);
            let p = Point::from_nonuniform_hash(&b);
            let mut factor = [0u8; SER_BYTES];
            read(&mut factor);
            factor[SER_BYTES - 1] &= 0x7f;
            let pp = p.torque().pscale(&factor);
            for hint in 0..16u32 {
                let a = p.invert_elligator_nonuniform(hint);
                let bb = pp.invert_elligator_nonuniform(hint);
                assert_eq!(bool::from(a.is_some()), bool::from(bb.is_some()));
                if let (Some(x), Some(y)) = (
                    Option::<[u8; SER_BYTES]>::from(a),
                    Option::<[u8; SER_BYTES]>::from(bb),
                ) {
                    assert_eq!(x, y);
                }
            }
        }
    }

    #[test]
    fn uniform_inversion_round_trips() {
        let mut read = reader("elligator uniform inversion");
        for _ in 0..20 {
            let mut b = [0u8; 2 * SER_BYTES];
            read(&mut b);
            let p = Point::from_uniform_hash(&b);
            let second: [u8; SER_BYTES] = b[SER_BYTES..].try_into().unwrap();
            let mut any = false;
            for hint in 0..16u32 {
                if let Some(pre) =
                    Option::<[u8; 2 * SER_BYTES]>::from(p.invert_elligator_uniform(&second, hint))
                {
                    assert_eq!(Point::from_uniform_hash(&pre), p);
                    any = true;
                }
            }
            assert!(any, "no hint inverted the uniform map");
        }
    }
}
