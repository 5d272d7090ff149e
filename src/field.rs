//! Constant-time arithmetic in the base field `GF(2^448 − 2^224 − 1)`.
//!
//! Elements are held in eight 64-bit limbs of radix `2^56`, a redundant
//! representation that admits lazy reduction: additions and subtractions may
//! leave limbs a few bits above the radix, and multiplication accepts such
//! inputs. `weak_reduce` brings every limb back to at most 56 bits;
//! `strong_reduce` produces the unique representative in `[0, p)`.
//!
//! All operations are constant-time in the values involved. Conditional
//! operations go through `subtle` masks; any branch on secret data is a bug.

use core::ops::{Add, Mul, Neg, Sub};

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroize;

use crate::constants::SER_BYTES;

pub(crate) const NLIMBS: usize = 8;
const LIMB_BITS: u32 = 56;
const MASK: u64 = (1u64 << LIMB_BITS) - 1;

/// `p = 2^448 − 2^224 − 1` in radix-2^56 limbs.
const MODULUS: [u64; NLIMBS] = [MASK, MASK, MASK, MASK, MASK - 1, MASK, MASK, MASK];

/// An element of the base field in redundant radix-2^56 representation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldElement(pub(crate) [u64; NLIMBS]);

impl FieldElement {
    pub(crate) const ZERO: FieldElement = FieldElement([0; NLIMBS]);
    pub(crate) const ONE: FieldElement = FieldElement([1, 0, 0, 0, 0, 0, 0, 0]);

    /// Limbwise sum with no reduction. Valid as long as the extra bits have
    /// not piled up enough to overflow a later multiplication; callers chain
    /// at most a couple of these before reducing.
    pub(crate) fn add_nr(&self, rhs: &FieldElement) -> FieldElement {
        let mut out = [0u64; NLIMBS];
        for i in 0..NLIMBS {
            out[i] = self.0[i] + rhs.0[i];
        }
        FieldElement(out)
    }

    /// Limbwise difference biased by `bias·p` so no limb underflows.
    /// The bias must dominate the magnitude of `rhs`'s limbs.
    pub(crate) fn subx_nr(&self, rhs: &FieldElement, bias: u64) -> FieldElement {
        let mut out = [0u64; NLIMBS];
        for i in 0..NLIMBS {
            out[i] = self.0[i] + bias * MODULUS[i] - rhs.0[i];
        }
        FieldElement(out)
    }

    /// Lazy subtraction with the default bias of 2, enough for weakly
    /// reduced operands.
    pub(crate) fn sub_nr(&self, rhs: &FieldElement) -> FieldElement {
        self.subx_nr(rhs, 2)
    }

    /// Reduced addition.
    pub(crate) fn add(&self, rhs: &FieldElement) -> FieldElement {
        let mut out = self.add_nr(rhs);
        out.weak_reduce();
        out
    }

    /// Reduced subtraction.
    pub(crate) fn sub(&self, rhs: &FieldElement) -> FieldElement {
        let mut out = self.sub_nr(rhs);
        out.weak_reduce();
        out
    }

    pub(crate) fn neg(&self) -> FieldElement {
        FieldElement::ZERO.sub(self)
    }

    /// Carry every limb down to at most 56 bits, folding the top carry back
    /// through `2^448 ≡ 2^224 + 1 (mod p)`.
    pub(crate) fn weak_reduce(&mut self) {
        let a = &mut self.0;
        let tmp = a[NLIMBS - 1] >> LIMB_BITS;
        a[4] += tmp;
        for i in (1..NLIMBS).rev() {
            a[i] = (a[i] & MASK) + (a[i - 1] >> LIMB_BITS);
        }
        a[0] = (a[0] & MASK) + tmp;
    }

    /// Reduce to the unique representative in `[0, p)`.
    pub(crate) fn strong_reduce(&mut self) {
        self.weak_reduce();
        let a = &mut self.0;

        // Clear the bit at 2^448; the total is now below 2p.
        let hi = a[NLIMBS - 1] >> LIMB_BITS;
        a[4] += hi;
        a[0] += hi;
        a[NLIMBS - 1] &= MASK;

        // Compute the value minus p. scarry ends at 0 (was >= p) or -1.
        let mut scarry: i128 = 0;
        for i in 0..NLIMBS {
            scarry = scarry + a[i] as i128 - MODULUS[i] as i128;
            a[i] = (scarry as u64) & MASK;
            scarry >>= LIMB_BITS;
        }
        debug_assert!(scarry == 0 || scarry == -1);

        // Add p back in exactly when the subtraction borrowed; the final
        // carry falls off the 2^448 boundary.
        let scarry_mask = (scarry as u64) & MASK;
        let mut carry: u64 = 0;
        for i in 0..NLIMBS {
            let t = carry + a[i] + (scarry_mask & MODULUS[i]);
            a[i] = t & MASK;
            carry = t >> LIMB_BITS;
        }
    }

    /// Full schoolbook multiplication with Solinas folding. Accepts lazily
    /// reduced inputs (limbs up to roughly 2^60) and produces a weakly
    /// reduced output.
    pub(crate) fn mul(&self, rhs: &FieldElement) -> FieldElement {
        let a = &self.0;
        let b = &rhs.0;
        let mut acc = [0u128; 2 * NLIMBS - 1];
        for i in 0..NLIMBS {
            for j in 0..NLIMBS {
                acc[i + j] += (a[i] as u128) * (b[j] as u128);
            }
        }

        // Fold positions >= 8 through 2^448 ≡ 2^224 + 1. Descending order
        // matters: positions 12..15 feed 8..10, which are handled afterwards.
        for k in (NLIMBS..2 * NLIMBS - 1).rev() {
            let v = acc[k];
            acc[k - NLIMBS] += v;
            acc[k - NLIMBS / 2] += v;
            acc[k] = 0;
        }

        let mut limbs = [0u64; NLIMBS];
        let mut carry: u128 = 0;
        for i in 0..NLIMBS {
            let t = acc[i] + carry;
            limbs[i] = (t as u64) & MASK;
            carry = t >> LIMB_BITS;
        }

        // The residual carry re-enters at 2^0 and 2^224.
        let mut carry2: u128 = 0;
        for i in 0..NLIMBS {
            let mut t = (limbs[i] as u128) + carry2;
            if i == 0 || i == NLIMBS / 2 {
                t += carry;
            }
            limbs[i] = (t as u64) & MASK;
            carry2 = t >> LIMB_BITS;
        }
        debug_assert!(carry2 <= 1);
        limbs[0] += carry2 as u64;
        limbs[NLIMBS / 2] += carry2 as u64;

        FieldElement(limbs)
    }

    pub(crate) fn square(&self) -> FieldElement {
        self.mul(self)
    }

    fn sqrn(&self, n: u32) -> FieldElement {
        let mut y = self.square();
        for _ in 1..n {
            y = y.square();
        }
        y
    }

    /// Multiply by a small unsigned word.
    fn mul_small_unsigned(&self, w: u64) -> FieldElement {
        let mut out = [0u64; NLIMBS];
        let mut carry: u128 = 0;
        for i in 0..NLIMBS {
            let t = (self.0[i] as u128) * (w as u128) + carry;
            out[i] = (t as u64) & MASK;
            carry = t >> LIMB_BITS;
        }
        let c = carry as u64;
        out[0] += c;
        out[NLIMBS / 2] += c;
        FieldElement(out)
    }

    /// Multiply by a small signed word. Not constant-time in the sign, which
    /// is always a compile-time curve constant.
    pub(crate) fn mul_small(&self, w: i64) -> FieldElement {
        if w >= 0 {
            self.mul_small_unsigned(w as u64)
        } else {
            self.mul_small_unsigned(w.unsigned_abs()).neg()
        }
    }

    /// High bit of the canonical representative, computed as the low bit of
    /// `2x mod p`.
    pub(crate) fn hibit(&self) -> Choice {
        let mut y = self.add_nr(self);
        y.strong_reduce();
        Choice::from((y.0[0] & 1) as u8)
    }

    /// Low bit of the canonical representative.
    pub(crate) fn lobit(&self) -> Choice {
        let mut y = *self;
        y.strong_reduce();
        Choice::from((y.0[0] & 1) as u8)
    }

    pub(crate) fn is_zero(&self) -> Choice {
        self.ct_eq(&FieldElement::ZERO)
    }

    /// Inverse square root with residue check: returns `y` with
    /// `y²·x ≡ ±1 (mod p)` and a flag that is set iff `x` is a nonzero
    /// square (or zero, when `allow_zero` is set).
    pub(crate) fn isqrt_chk(x: &FieldElement, allow_zero: Choice) -> (FieldElement, Choice) {
        let y = x.isr();
        let tmp = y.square().mul(x);
        let ok = tmp.ct_eq(&FieldElement::ONE) | (allow_zero & tmp.is_zero());
        (y, ok)
    }

    /// `x^((p−3)/4)`, the inverse square root up to sign, by an addition
    /// chain tailored to `2^448 − 2^224 − 1`.
    fn isr(&self) -> FieldElement {
        let x = self;
        let l1 = x.square();
        let l2 = x.mul(&l1);
        let l1 = l2.square();
        let l2 = x.mul(&l1); // x^(2^3 - 1)
        let l1 = l2.sqrn(3);
        let l0 = l2.mul(&l1); // x^(2^6 - 1)
        let l1 = l0.sqrn(3);
        let l0 = l2.mul(&l1); // x^(2^9 - 1)
        let l2 = l0.sqrn(9);
        let l1 = l0.mul(&l2); // x^(2^18 - 1)
        let l0 = l1.square();
        let l2 = x.mul(&l0); // x^(2^19 - 1)
        let l0 = l2.sqrn(18);
        let l2 = l1.mul(&l0); // x^(2^37 - 1)
        let l0 = l2.sqrn(37);
        let l1 = l2.mul(&l0); // x^(2^74 - 1)
        let l0 = l1.sqrn(37);
        let l1 = l2.mul(&l0); // x^(2^111 - 1)
        let l0 = l1.sqrn(111);
        let l2 = l1.mul(&l0); // x^(2^222 - 1)
        let l0 = l2.square();
        let l1 = x.mul(&l0); // x^(2^223 - 1)
        let l0 = l1.sqrn(223);
        l2.mul(&l0) // x^(2^446 - 2^222 - 1)
    }

    /// Multiplicative inverse; zero maps to zero.
    pub(crate) fn invert(&self) -> FieldElement {
        let t1 = self.square();
        let (t2, _) = FieldElement::isqrt_chk(&t1, Choice::from(0u8));
        // (±1/x)² · x = 1/x regardless of the square root's sign.
        t2.square().mul(self)
    }

    /// Canonical little-endian encoding, 56 bytes.
    pub(crate) fn serialize(&self) -> [u8; SER_BYTES] {
        let mut tmp = *self;
        tmp.strong_reduce();
        let mut out = [0u8; SER_BYTES];
        for i in 0..NLIMBS {
            out[7 * i..7 * i + 7].copy_from_slice(&tmp.0[i].to_le_bytes()[..7]);
        }
        out
    }

    /// Parse a little-endian encoding. The flag is set iff the value is a
    /// canonical representative, i.e. below `p`.
    pub(crate) fn deserialize(ser: &[u8; SER_BYTES]) -> (FieldElement, Choice) {
        let mut limbs = [0u64; NLIMBS];
        for i in 0..NLIMBS {
            let mut b8 = [0u8; 8];
            b8[..7].copy_from_slice(&ser[7 * i..7 * i + 7]);
            limbs[i] = u64::from_le_bytes(b8);
        }
        let mut accum: i128 = 0;
        for i in 0..NLIMBS {
            accum = (accum + limbs[i] as i128 - MODULUS[i] as i128) >> LIMB_BITS;
        }
        // accum is -1 exactly when the value borrowed against p.
        let ok = Choice::from((accum & 1) as u8);
        (FieldElement(limbs), ok)
    }

    /// Simultaneous inversion by Montgomery's trick: one field inversion for
    /// the whole batch. Inputs must be nonzero.
    pub(crate) fn batch_invert(inputs: &[FieldElement]) -> Vec<FieldElement> {
        let n = inputs.len();
        debug_assert!(n > 1);
        let mut out = vec![FieldElement::ZERO; n];
        out[1] = inputs[0];
        for i in 1..n - 1 {
            out[i + 1] = out[i].mul(&inputs[i]);
        }
        out[0] = out[n - 1].mul(&inputs[n - 1]);
        out[0] = out[0].invert();
        for i in (1..n).rev() {
            let t = out[i].mul(&out[0]);
            out[i] = t;
            let t = out[0].mul(&inputs[i]);
            out[0] = t;
        }
        out
    }
}

impl ConditionallySelectable for FieldElement {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut out = [0u64; NLIMBS];
        for i in 0..NLIMBS {
            out[i] = u64::conditional_select(&a.0[i], &b.0[i], choice);
        }
        FieldElement(out)
    }
}

impl ConstantTimeEq for FieldElement {
    fn ct_eq(&self, other: &Self) -> Choice {
        let mut d = self.sub(other);
        d.strong_reduce();
        let mut acc = 0u64;
        for limb in d.0 {
            acc |= limb;
        }
        acc.ct_eq(&0)
    }
}

impl PartialEq for FieldElement {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}
impl Eq for FieldElement {}

impl Default for FieldElement {
    fn default() -> Self {
        FieldElement::ZERO
    }
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Add<&FieldElement> for &FieldElement {
    type Output = FieldElement;
    fn add(self, rhs: &FieldElement) -> FieldElement {
        FieldElement::add(self, rhs)
    }
}

impl Sub<&FieldElement> for &FieldElement {
    type Output = FieldElement;
    fn sub(self, rhs: &FieldElement) -> FieldElement {
        FieldElement::sub(self, rhs)
    }
}

impl Mul<&FieldElement> for &FieldElement {
    type Output = FieldElement;
    fn mul(self, rhs: &FieldElement) -> FieldElement {
        FieldElement::mul(self, rhs)
    }
}

impl Neg for &FieldElement {
    type Output = FieldElement;
    fn neg(self) -> FieldElement {
        FieldElement::neg(self)
    }
}

impl Neg for FieldElement {
    type Output = FieldElement;
    fn neg(self) -> FieldElement {
        FieldElement::neg(&self)
    }
}
