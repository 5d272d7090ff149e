//! Constant-time arithmetic modulo the group order.
//!
//! Scalars are residues mod the prime order `q ≈ 2^446` of the
//! Ed448-Goldilocks group, held as seven 64-bit limbs in plain (non-Montgomery)
//! representation. Montgomery form is used internally by the multiplier:
//! `mul(a, b) = montmul(montmul(a, b), R²)` with `R = 2^448`, so no
//! precomputed magic beyond `R² mod q` is needed, and that is derived on
//! first use by repeated doubling.

use core::ops::{Add, Mul, Neg, Sub};

use once_cell::sync::Lazy;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, CtOption};
use zeroize::Zeroize;

use crate::constants::{MONTGOMERY_FACTOR, SCALAR_BITS, SCALAR_LIMBS, SCALAR_ORDER, SER_BYTES};

/// `R² mod q` where `R = 2^448`; `montmul` by this constant multiplies by `R`.
static R_SQUARED: Lazy<Scalar> = Lazy::new(|| {
    let mut x = Scalar::ONE;
    for _ in 0..2 * 64 * SCALAR_LIMBS {
        x = x.add(&x);
    }
    x
});

/// An integer modulo the prime group order `q`.
///
/// Values are always kept fully reduced. Scalars holding secret key material
/// should be wiped with [`zeroize::Zeroize`] when no longer needed; the
/// higher-level key types in this crate do so automatically.
#[derive(Clone, Copy, Debug)]
pub struct Scalar(pub(crate) [u64; SCALAR_LIMBS]);

impl Scalar {
    /// The scalar `0`.
    pub const ZERO: Scalar = Scalar([0; SCALAR_LIMBS]);
    /// The scalar `1`.
    pub const ONE: Scalar = Scalar([1, 0, 0, 0, 0, 0, 0]);

    const ORDER: Scalar = Scalar(SCALAR_ORDER);

    /// `{extra·2^448 + accum} − sub`, plus `q` if that went negative.
    fn sub_extra(accum: &[u64; SCALAR_LIMBS], sub: &Scalar, extra: u64) -> Scalar {
        let mut out = [0u64; SCALAR_LIMBS];
        let mut chain: i128 = 0;
        for i in 0..SCALAR_LIMBS {
            chain += accum[i] as i128 - sub.0[i] as i128;
            out[i] = chain as u64;
            chain >>= 64;
        }
        // 0 when the high part covered the borrow, all-ones otherwise.
        let borrow = (chain + extra as i128) as u64;

        let mut chain2: u128 = 0;
        for i in 0..SCALAR_LIMBS {
            chain2 += out[i] as u128 + (SCALAR_ORDER[i] & borrow) as u128;
            out[i] = chain2 as u64;
            chain2 >>= 64;
        }
        Scalar(out)
    }

    /// Montgomery product `a·b·R⁻¹ mod q`.
    fn montgomery_mul(a: &Scalar, b: &Scalar) -> Scalar {
        let mut accum = [0u64; SCALAR_LIMBS + 1];
        let mut hi_carry: u64 = 0;

        for i in 0..SCALAR_LIMBS {
            let mand = a.0[i];
            let mut chain: u128 = 0;
            for j in 0..SCALAR_LIMBS {
                chain += (mand as u128) * (b.0[j] as u128) + accum[j] as u128;
                accum[j] = chain as u64;
                chain >>= 64;
            }
            accum[SCALAR_LIMBS] = chain as u64;

            let mand = accum[0].wrapping_mul(MONTGOMERY_FACTOR);
            let mut chain: u128 = 0;
            for j in 0..SCALAR_LIMBS {
                chain += (mand as u128) * (SCALAR_ORDER[j] as u128) + accum[j] as u128;
                if j > 0 {
                    accum[j - 1] = chain as u64;
                }
                chain >>= 64;
            }
            chain += accum[SCALAR_LIMBS] as u128;
            chain += hi_carry as u128;
            accum[SCALAR_LIMBS - 1] = chain as u64;
            hi_carry = (chain >> 64) as u64;
        }

        let low: [u64; SCALAR_LIMBS] = accum[..SCALAR_LIMBS].try_into().expect("fixed split");
        Scalar::sub_extra(&low, &Scalar::ORDER, hi_carry)
    }

    /// Addition mod `q`.
    pub fn add(&self, rhs: &Scalar) -> Scalar {
        let mut accum = [0u64; SCALAR_LIMBS];
        let mut chain: u128 = 0;
        for i in 0..SCALAR_LIMBS {
            chain += self.0[i] as u128 + rhs.0[i] as u128;
            accum[i] = chain as u64;
            chain >>= 64;
        }
        Scalar::sub_extra(&accum, &Scalar::ORDER, chain as u64)
    }

    /// Subtraction mod `q`.
    pub fn sub(&self, rhs: &Scalar) -> Scalar {
        Scalar::sub_extra(&self.0, rhs, 0)
    }

    /// Multiplication mod `q`, fully reduced.
    pub fn mul(&self, rhs: &Scalar) -> Scalar {
        Scalar::montgomery_mul(&Scalar::montgomery_mul(self, rhs), &R_SQUARED)
    }

    /// `self/2 mod q`: add `q` when odd, then shift right.
    pub fn halve(&self) -> Scalar {
        let mask = (self.0[0] & 1).wrapping_neg();
        let mut out = [0u64; SCALAR_LIMBS];
        let mut chain: u128 = 0;
        for i in 0..SCALAR_LIMBS {
            chain += self.0[i] as u128 + (SCALAR_ORDER[i] & mask) as u128;
            out[i] = chain as u64;
            chain >>= 64;
        }
        for i in 0..SCALAR_LIMBS - 1 {
            out[i] = out[i] >> 1 | out[i + 1] << 63;
        }
        out[SCALAR_LIMBS - 1] = out[SCALAR_LIMBS - 1] >> 1 | (chain as u64) << 63;
        Scalar(out)
    }

    /// Constant-time inverse; `None` iff the input is zero. The loop reads
    /// exponent bits of the public modulus, so its branches are not
    /// secret-dependent.
    pub fn invert(&self) -> CtOption<Scalar> {
        let r2 = &*R_SQUARED;
        let mut b = Scalar::montgomery_mul(&Scalar::ONE, r2);
        let ma = Scalar::montgomery_mul(self, r2);
        for i in (0..SCALAR_BITS).rev() {
            b = Scalar::montgomery_mul(&b, &b);
            let mut w = SCALAR_ORDER[i / 64];
            if i < 64 {
                // exponent is q - 2
                w -= 2;
            }
            if (w >> (i % 64)) & 1 == 1 {
                b = Scalar::montgomery_mul(&b, &ma);
            }
        }
        let out = Scalar::montgomery_mul(&b, &Scalar::ONE);
        CtOption::new(out, !out.ct_eq(&Scalar::ZERO))
    }

    /// Canonical little-endian encoding.
    pub fn encode(&self) -> [u8; SER_BYTES] {
        let mut out = [0u8; SER_BYTES];
        for i in 0..SCALAR_LIMBS {
            out[8 * i..8 * i + 8].copy_from_slice(&self.0[i].to_le_bytes());
        }
        out
    }

    /// Little-endian decode of up to `SER_BYTES` bytes, zero-padded, with no
    /// range check.
    fn decode_short(ser: &[u8]) -> Scalar {
        debug_assert!(ser.len() <= SER_BYTES);
        let mut limbs = [0u64; SCALAR_LIMBS];
        let mut k = 0;
        for limb in limbs.iter_mut() {
            let mut w = 0u64;
            for j in 0..8 {
                if k < ser.len() {
                    w |= (ser[k] as u64) << (8 * j);
                    k += 1;
                }
            }
            *limb = w;
        }
        Scalar(limbs)
    }

    /// Raw decode: the flag is set iff the value was already below `q`; the
    /// returned scalar is reduced either way.
    pub(crate) fn decode_raw(ser: &[u8; SER_BYTES]) -> (Scalar, Choice) {
        let s = Scalar::decode_short(ser);
        let mut accum: i128 = 0;
        for i in 0..SCALAR_LIMBS {
            accum = (accum + s.0[i] as i128 - SCALAR_ORDER[i] as i128) >> 64;
        }
        let ok = Choice::from((accum & 1) as u8);
        (Scalar::mul(&s, &Scalar::ONE), ok)
    }

    /// Decode a canonical little-endian scalar; fails on values `>= q`.
    pub fn decode(ser: &[u8; SER_BYTES]) -> CtOption<Scalar> {
        let (s, ok) = Scalar::decode_raw(ser);
        CtOption::new(s, ok)
    }

    /// Decode a canonical scalar from wire data, mapping the failure onto
    /// the crate error taxonomy.
    pub fn from_bytes(ser: &[u8; SER_BYTES]) -> crate::Result<Scalar> {
        Option::<Scalar>::from(Scalar::decode(ser)).ok_or(crate::Error::InvalidScalarEncoding)
    }

    /// Reduce an arbitrary-length little-endian integer mod `q`, by Horner
    /// evaluation in base `2^448`: each step multiplies by `R` via one
    /// Montgomery multiplication by `R²`.
    pub fn decode_long(ser: &[u8]) -> Scalar {
        if ser.is_empty() {
            return Scalar::ZERO;
        }

        let mut i = ser.len() - (ser.len() % SER_BYTES);
        if i == ser.len() {
            i -= SER_BYTES;
        }
        let mut t1 = Scalar::decode_short(&ser[i..]);

        if ser.len() == SER_BYTES {
            return Scalar::mul(&t1, &Scalar::ONE);
        }

        while i > 0 {
            i -= SER_BYTES;
            t1 = Scalar::montgomery_mul(&t1, &R_SQUARED);
            let chunk: &[u8; SER_BYTES] = ser[i..i + SER_BYTES].try_into().expect("fixed chunk");
            let (t2, _) = Scalar::decode_raw(chunk);
            t1 = t1.add(&t2);
        }
        t1
    }
}

impl From<u64> for Scalar {
    fn from(w: u64) -> Scalar {
        let mut limbs = [0u64; SCALAR_LIMBS];
        limbs[0] = w;
        Scalar(limbs)
    }
}

impl From<i64> for Scalar {
    fn from(w: i64) -> Scalar {
        if w >= 0 {
            Scalar::from(w as u64)
        } else {
            Scalar::ZERO.sub(&Scalar::from(w.unsigned_abs()))
        }
    }
}

impl ConditionallySelectable for Scalar {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut out = [0u64; SCALAR_LIMBS];
        for i in 0..SCALAR_LIMBS {
            out[i] = u64::conditional_select(&a.0[i], &b.0[i], choice);
        }
        Scalar(out)
    }
}

impl ConstantTimeEq for Scalar {
    fn ct_eq(&self, other: &Self) -> Choice {
        let mut x = Choice::from(1u8);
        for i in 0..SCALAR_LIMBS {
            x &= self.0[i].ct_eq(&other.0[i]);
        }
        x
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}
impl Eq for Scalar {}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::ZERO
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Add<&Scalar> for &Scalar {
    type Output = Scalar;
    fn add(self, rhs: &Scalar) -> Scalar {
        Scalar::add(self, rhs)
    }
}

impl Sub<&Scalar> for &Scalar {
    type Output = Scalar;
    fn sub(self, rhs: &Scalar) -> Scalar {
        Scalar::sub(self, rhs)
    }
}

impl Mul<&Scalar> for &Scalar {
    type Output = Scalar;
    fn mul(self, rhs: &Scalar) -> Scalar {
        Scalar::mul(self, rhs)
    }
}

impl Neg for &Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar::ZERO.sub(self)
    }
}

impl Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::digest::{ExtendableOutput, Update, XofReader};
    use sha3::Shake256;

    fn rng(seed: &str) -> impl FnMut() -> Scalar {
        let mut h = Shake256::default();
        h.update(seed.as_bytes());
        let mut reader = h.finalize_xof();
        move || {
            let mut bytes = [0u8; SER_BYTES + 8];
            reader.read(&mut bytes);
            Scalar::decode_long(&bytes)
        }
    }

    fn order_bytes() -> [u8; SER_BYTES] {
        let mut out = [0u8; SER_BYTES];
        for i in 0..SCALAR_LIMBS {
            out[8 * i..8 * i + 8].copy_from_slice(&SCALAR_ORDER[i].to_le_bytes());
        }
        out
    }

    #[test]
    fn ring_axioms() {
        let mut next = rng("scalar ring axioms");
        for _ in 0..500 {
            let x = next();
            let y = next();
            let z = next();
            assert_eq!(x.add(&y), y.add(&x));
            assert_eq!(x.add(&y).add(&z), x.add(&y.add(&z)));
            assert_eq!(Scalar::mul(&x, &y), Scalar::mul(&y, &x));
            assert_eq!(
                Scalar::mul(&Scalar::mul(&x, &y), &z),
                Scalar::mul(&x, &Scalar::mul(&y, &z))
            );
            assert_eq!(
                Scalar::mul(&x, &y.add(&z)),
                Scalar::mul(&x, &y).add(&Scalar::mul(&x, &z))
            );
            assert_eq!(
                Scalar::mul(&x, &y.sub(&z)),
                Scalar::mul(&x, &y).sub(&Scalar::mul(&x, &z))
            );
            assert_eq!(Scalar::mul(&x, &Scalar::ONE), x);
            assert_eq!(Scalar::mul(&x, &Scalar::ZERO), Scalar::ZERO);
            assert_eq!(-x, Scalar::mul(&x, &Scalar::from(-1i64)));
            assert_eq!(x.add(&x), Scalar::mul(&x, &Scalar::from(2u64)));
            assert_eq!(x.sub(&y).add(&y), x);
        }
    }

    #[test]
    fn halving() {
        let mut next = rng("scalar halve");
        for _ in 0..200 {
            let x = next();
            let h = x.halve();
            assert_eq!(h.add(&h), x);
        }
    }

    #[test]
    fn inversion() {
        let mut next = rng("scalar invert");
        for _ in 0..30 {
            let x = next();
            let y = next();
            let yi = y.invert();
            if bool::from(y.ct_eq(&Scalar::ZERO)) {
                continue;
            }
            let yi = yi.unwrap();
            assert_eq!(Scalar::mul(&Scalar::mul(&x, &y), &yi), x);
        }
        assert!(bool::from(Scalar::ZERO.invert().is_none()));
    }

    #[test]
    fn encode_round_trip() {
        let mut next = rng("scalar encode");
        for _ in 0..200 {
            let x = next();
            let ser = x.encode();
            let back = Scalar::decode(&ser).unwrap();
            assert_eq!(back, x);
        }
    }

    #[test]
    fn decode_rejects_order() {
        let q = order_bytes();
        assert!(bool::from(Scalar::decode(&q).is_none()));

        // q - 1 decodes fine.
        let mut qm1 = q;
        qm1[0] -= 1;
        let s = Scalar::decode(&qm1).unwrap();
        assert_eq!(s.add(&Scalar::ONE), Scalar::ZERO);

        // Rejected decode still reduces: q ≡ 0.
        let (reduced, ok) = Scalar::decode_raw(&q);
        assert!(!bool::from(ok));
        assert_eq!(reduced, Scalar::ZERO);
    }

    #[test]
    fn decode_long_agrees_with_decode() {
        let mut next = rng("scalar decode long");
        for _ in 0..100 {
            let x = next();
            let ser = x.encode();
            assert_eq!(Scalar::decode_long(&ser), x);
        }
        assert_eq!(Scalar::decode_long(&[]), Scalar::ZERO);
        assert_eq!(Scalar::decode_long(&[3u8]), Scalar::from(3u64));
    }

    #[test]
    fn cast_bounds() {
        let max = Scalar::from(i64::MAX as u64);
        assert_eq!(
            max.add(&Scalar::ONE),
            Scalar::from(1u64 + i64::MAX as u64)
        );
        assert_eq!(
            Scalar::from(i64::MIN),
            -Scalar::from(1u64 + i64::MAX as u64)
        );
    }
}
