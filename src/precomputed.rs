//! Precomputed tables for fixed-base scalar multiplication.
//!
//! [`PrecomputedComb`] holds a signed-comb decomposition of a base point:
//! `n·2^(t−1)` affine Niels entries built with one point addition per slot by
//! walking the table indices in Gray-code order, then normalized to `z = 1`
//! in a single batched inversion. [`WnafTable`] holds the odd multiples used
//! by the variable-time verification path.
//!
//! Tables are immutable once built and freely shareable: they contain only
//! public data. The generator's tables are built lazily on first use.

use once_cell::sync::Lazy;
use subtle::Choice;

use crate::constants::{
    COMBS_N, COMBS_S, COMBS_T, ED448_BASEPOINT_BYTES, EDDSA_ENCODE_RATIO, SCALAR_BITS,
    WNAF_FIXED_TABLE_BITS,
};
use crate::field::FieldElement;
use crate::point::{Niels, Point};
use crate::scalar::Scalar;
use crate::scalar_mul;

/// The group generator: the decaf-domain image of the RFC 8032 Ed448 base
/// point, normalized so that the EdDSA bridge ratios hold exactly.
static GENERATOR: Lazy<Point> = Lazy::new(|| {
    let bridged = Point::decode_like_eddsa_and_mul_by_ratio(&ED448_BASEPOINT_BYTES);
    let bridged = Option::<Point>::from(bridged).expect("the Ed448 base point encoding is valid");
    // The isogeny pair composes to [4]; decoding contributed that factor
    // against the base point, and encoding will contribute the encode ratio,
    // so divide the remainder out.
    let divisor = Scalar::from(u64::from(4 / EDDSA_ENCODE_RATIO));
    let inv = Option::<Scalar>::from(divisor.invert()).expect("4/ratio is invertible mod q");
    scalar_mul::point_scalarmul(&bridged, &inv)
});

static GENERATOR_COMB: Lazy<PrecomputedComb> = Lazy::new(|| PrecomputedComb::new(&GENERATOR));

static GENERATOR_WNAF: Lazy<WnafTable> = Lazy::new(|| WnafTable::new(&GENERATOR));

pub(crate) fn generator() -> &'static Point {
    &GENERATOR
}

pub(crate) fn generator_comb() -> &'static PrecomputedComb {
    &GENERATOR_COMB
}

pub(crate) fn generator_wnaf() -> &'static WnafTable {
    &GENERATOR_WNAF
}

/// Normalize a table of projective Niels entries to affine form with one
/// shared inversion.
fn batch_normalize_niels(table: &mut [Niels], zs: &[FieldElement]) {
    let zis = FieldElement::batch_invert(zs);
    for (n, zi) in table.iter_mut().zip(&zis) {
        let mut product = n.a.mul(zi);
        product.strong_reduce();
        n.a = product;
        let mut product = n.b.mul(zi);
        product.strong_reduce();
        n.b = product;
        let mut product = n.c.mul(zi);
        product.strong_reduce();
        n.c = product;
    }
}

/// A signed-comb table for one base point.
pub struct PrecomputedComb {
    table: Vec<Niels>,
}

impl PrecomputedComb {
    /// Build the comb table for `base`.
    ///
    /// Each of the `n` lanes gets a sub-table of `2^(t−1)` entries holding
    /// every sign pattern of its teeth; consecutive Gray codes differ in one
    /// tooth, so each slot costs a single addition after the doubling phase.
    pub fn new(base: &Point) -> PrecomputedComb {
        let (n, t, s) = (COMBS_N, COMBS_T, COMBS_S);
        debug_assert!(n * t * s >= SCALAR_BITS);

        let mut table = vec![Niels::ZERO; n << (t - 1)];
        let mut zs = vec![FieldElement::ZERO; n << (t - 1)];

        let mut working = *base;
        let mut start = Point::IDENTITY;
        let mut doubles = [Point::IDENTITY; COMBS_T - 1];

        for i in 0..n {
            // Doubling phase: collect the lane's tooth points.
            for j in 0..t {
                if j > 0 {
                    start = start.add(&working);
                } else {
                    start = working;
                }
                if j == t - 1 && i == n - 1 {
                    break;
                }
                working = working.double_internal(false);
                if j < t - 1 {
                    doubles[j] = working;
                }
                for k in 0..s - 1 {
                    working = working.double_internal(k < s - 2);
                }
            }

            // Gray-code phase: one add or sub per slot.
            let mut j = 0usize;
            loop {
                let gray = j ^ (j >> 1);
                let idx = (((i + 1) << (t - 1)) - 1) ^ gray;

                let pn = start.to_pniels();
                table[idx] = pn.n;
                zs[idx] = pn.z;

                if j >= (1usize << (t - 1)) - 1 {
                    break;
                }
                let delta = (j + 1) ^ ((j + 1) >> 1) ^ gray;
                let mut k = 0usize;
                let mut d = delta;
                while d > 1 {
                    d >>= 1;
                    k += 1;
                }
                if gray & (1 << k) != 0 {
                    start = start.add(&doubles[k]);
                } else {
                    start = start.sub(&doubles[k]);
                }
                j += 1;
            }
        }

        batch_normalize_niels(&mut table, &zs);
        PrecomputedComb { table }
    }

    /// Constant-time fixed-base multiplication over this table.
    pub fn scalarmul(&self, scalar: &Scalar) -> Point {
        let (n, t, s) = (COMBS_N, COMBS_T, COMBS_S);
        let scalar1x = scalar.add(scalar_mul::comb_adjustment()).halve();

        let mut out = Point::IDENTITY;
        for i in (0..s).rev() {
            if i != s - 1 {
                out = out.double_internal(false);
            }

            for j in 0..n {
                let mut tab: u64 = 0;
                for k in 0..t {
                    let bit = i + s * (k + j * t);
                    if bit < SCALAR_BITS {
                        tab |= ((scalar1x.0[bit / 64] >> (bit % 64)) & 1) << k;
                    }
                }

                let invert = (tab >> (t - 1)).wrapping_sub(1);
                let tab = (tab ^ invert) & ((1 << (t - 1)) - 1);

                let lane = &self.table[j << (t - 1)..(j + 1) << (t - 1)];
                let mut ni = scalar_mul::lookup_niels(lane, tab);
                ni.conditional_negate(Choice::from((invert & 1) as u8));
                if i != s - 1 || j != 0 {
                    out.add_niels_assign(&ni, j == n - 1 && i != 0);
                } else {
                    out = ni.to_point();
                }
            }
        }
        out
    }
}

/// Odd multiples `{G, 3G, 5G, …}` of a base, normalized to affine, for the
/// variable-time verification path.
pub(crate) struct WnafTable {
    entries: Vec<Niels>,
}

impl WnafTable {
    pub(crate) fn new(base: &Point) -> WnafTable {
        let tbits = WNAF_FIXED_TABLE_BITS as u32;
        let pniels = scalar_mul::prepare_wnaf_table(base, tbits);
        let mut entries: Vec<Niels> = pniels.iter().map(|pn| pn.n).collect();
        let zs: Vec<FieldElement> = pniels.iter().map(|pn| pn.z).collect();
        batch_normalize_niels(&mut entries, &zs);
        WnafTable { entries }
    }

    /// Variable-time `s1·(this base) + s2·base2`.
    pub(crate) fn combo_non_secret(&self, s1: &Scalar, base2: &Point, s2: &Scalar) -> Point {
        scalar_mul::base_double_scalarmul_non_secret(
            &self.entries,
            WNAF_FIXED_TABLE_BITS as u32,
            s1,
            base2,
            s2,
        )
    }
}
