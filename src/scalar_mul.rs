//! Scalar multiplication schedules.
//!
//! Three strategies live here:
//!
//! * a constant-time signed-window ladder for variable bases (and its
//!   two-base variant), used wherever the scalar is secret;
//! * the signed-comb evaluation over a precomputed table, used for the fixed
//!   base (the table build itself is in [`crate::precomputed`]);
//! * a **variable-time** WNAF double-scalar multiplication for signature
//!   verification, where both scalars are public.
//!
//! The constant-time ladders recode the scalar as `(s + adjustment)/2` so
//! every window digit is odd and fits the signed recoding; the adjustment is
//! `2^450 − 1 mod q` for both the window and comb shapes, derived once from
//! the order rather than baked in. Table lookups scan the whole table and
//! blend entries under a mask.

use once_cell::sync::Lazy;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::constants::{
    COMBS_N, COMBS_S, COMBS_T, SCALAR_BITS, SCALAR_LIMBS, SER_BYTES, WINDOW_BITS,
};
use crate::point::{Niels, Point, ProjectiveNiels};
use crate::scalar::Scalar;

/// `2^bits − 1 mod q`, by doubling up from one.
fn all_ones_scalar(bits: usize) -> Scalar {
    let mut x = Scalar::ONE;
    for _ in 0..bits {
        x = x.add(&x);
    }
    x.sub(&Scalar::ONE)
}

/// Adjustment for the signed-window recoding: the window schedule spans
/// `ceil(SCALAR_BITS / W)·W = 450` bit positions.
static WINDOW_ADJUSTMENT: Lazy<Scalar> = Lazy::new(|| {
    let windows = (SCALAR_BITS + WINDOW_BITS - 1) / WINDOW_BITS;
    all_ones_scalar(windows * WINDOW_BITS)
});

/// Adjustment for the signed comb, spanning `n·t·s = 450` bit positions.
static COMB_ADJUSTMENT: Lazy<Scalar> = Lazy::new(|| all_ones_scalar(COMBS_N * COMBS_T * COMBS_S));

pub(crate) fn comb_adjustment() -> &'static Scalar {
    &COMB_ADJUSTMENT
}

/// Constant-time table lookup: scan every entry and blend under a mask.
fn lookup_pniels<const N: usize>(table: &[ProjectiveNiels; N], index: u64) -> ProjectiveNiels {
    let mut out = ProjectiveNiels::ZERO;
    for (j, entry) in table.iter().enumerate() {
        out.conditional_assign(entry, (j as u64).ct_eq(&index));
    }
    out
}

pub(crate) fn lookup_niels(table: &[Niels], index: u64) -> Niels {
    let mut out = Niels::ZERO;
    for (j, entry) in table.iter().enumerate() {
        out.conditional_assign(entry, (j as u64).ct_eq(&index));
    }
    out
}

/// Build the odd multiples `{b, 3b, …, (2^W − 1)·b}` in projective Niels
/// form.
fn prepare_fixed_window<const N: usize>(b: &Point) -> [ProjectiveNiels; N] {
    let two_b = b.double_internal(false).to_pniels();
    let mut multiples = [ProjectiveNiels::ZERO; N];
    multiples[0] = b.to_pniels();
    let mut tmp = *b;
    for m in multiples.iter_mut().skip(1) {
        tmp.add_pniels_assign(&two_b, false);
        *m = tmp.to_pniels();
    }
    multiples
}

/// Extract a window of bits starting at position `i`, crossing the limb
/// boundary when needed.
fn window_at(s: &Scalar, i: usize) -> u64 {
    let mut bits = s.0[i / 64] >> (i % 64);
    if i % 64 >= 64 - WINDOW_BITS && i / 64 < SCALAR_LIMBS - 1 {
        bits ^= s.0[i / 64 + 1] << (64 - (i % 64));
    }
    bits & ((1 << WINDOW_BITS) - 1)
}

/// Constant-time variable-base scalar multiplication.
pub(crate) fn point_scalarmul(b: &Point, scalar: &Scalar) -> Point {
    const NTABLE: usize = 1 << (WINDOW_BITS - 1);
    let window_t_mask: u64 = (1 << (WINDOW_BITS - 1)) - 1;

    let scalar1x = scalar.add(&WINDOW_ADJUSTMENT).halve();
    let multiples: [ProjectiveNiels; NTABLE] = prepare_fixed_window(b);

    let mut tmp = Point::IDENTITY;
    let mut first = true;
    let mut i = (SCALAR_BITS - ((SCALAR_BITS - 1) % WINDOW_BITS) - 1) as isize;

    while i >= 0 {
        let bits = window_at(&scalar1x, i as usize);
        let inv = (bits >> (WINDOW_BITS - 1)).wrapping_sub(1);
        let bits = bits ^ inv;

        let mut pn = lookup_pniels(&multiples, bits & window_t_mask);
        pn.n.conditional_negate(Choice::from((inv & 1) as u8));
        if first {
            tmp = pn.to_point();
            first = false;
        } else {
            // Double W times; only the last doubling produces T, which the
            // following mixed addition needs.
            for _ in 0..WINDOW_BITS - 1 {
                tmp = tmp.double_internal(true);
            }
            tmp = tmp.double_internal(false);
            tmp.add_pniels_assign(&pn, i != 0);
        }
        i -= WINDOW_BITS as isize;
    }
    tmp
}

/// Constant-time double variable-base multiplication `sb·b + sc·c`.
pub(crate) fn point_double_scalarmul(b: &Point, sb: &Scalar, c: &Point, sc: &Scalar) -> Point {
    const NTABLE: usize = 1 << (WINDOW_BITS - 1);
    let window_t_mask: u64 = (1 << (WINDOW_BITS - 1)) - 1;

    let scalar1x = sb.add(&WINDOW_ADJUSTMENT).halve();
    let scalar2x = sc.add(&WINDOW_ADJUSTMENT).halve();
    let multiples1: [ProjectiveNiels; NTABLE] = prepare_fixed_window(b);
    let multiples2: [ProjectiveNiels; NTABLE] = prepare_fixed_window(c);

    let mut tmp = Point::IDENTITY;
    let mut first = true;
    let mut i = (SCALAR_BITS - ((SCALAR_BITS - 1) % WINDOW_BITS) - 1) as isize;

    while i >= 0 {
        let bits1 = window_at(&scalar1x, i as usize);
        let bits2 = window_at(&scalar2x, i as usize);
        let inv1 = (bits1 >> (WINDOW_BITS - 1)).wrapping_sub(1);
        let inv2 = (bits2 >> (WINDOW_BITS - 1)).wrapping_sub(1);
        let bits1 = bits1 ^ inv1;
        let bits2 = bits2 ^ inv2;

        let mut pn = lookup_pniels(&multiples1, bits1 & window_t_mask);
        pn.n.conditional_negate(Choice::from((inv1 & 1) as u8));
        if first {
            tmp = pn.to_point();
            first = false;
        } else {
            for _ in 0..WINDOW_BITS - 1 {
                tmp = tmp.double_internal(true);
            }
            tmp = tmp.double_internal(false);
            tmp.add_pniels_assign(&pn, false);
        }
        let mut pn = lookup_pniels(&multiples2, bits2 & window_t_mask);
        pn.n.conditional_negate(Choice::from((inv2 & 1) as u8));
        tmp.add_pniels_assign(&pn, i != 0);
        i -= WINDOW_BITS as isize;
    }
    tmp
}

/// One entry of a variable-time multiplication schedule: add
/// `addend·2^power` (the addend is odd and signed).
#[derive(Clone, Copy, Debug)]
pub(crate) struct SmvtControl {
    pub(crate) power: i32,
    pub(crate) addend: i32,
}

/// Recode a scalar into sparse signed windows, most significant first,
/// terminated by a sentinel with negative power. Variable-time.
pub(crate) fn recode_wnaf(scalar: &Scalar, table_bits: u32) -> Vec<SmvtControl> {
    let mut control = Vec::with_capacity(SCALAR_BITS / (table_bits as usize + 1) + 3);
    let mut current: i64 = 0;

    for i in (0..SCALAR_BITS).rev() {
        let bit = ((scalar.0[i / 64] >> (i % 64)) & 1) as i64;
        current = 2 * current + bit;

        // Once |current| outgrows the table, peel off an odd digit at the
        // lowest set bit and keep scanning.
        if current >= (2 << table_bits) || current <= -1 - (2 << table_bits) {
            let mut delta = (current + 1) >> 1;
            current = -(current & 1);
            let mut j = i as i32;
            while delta & 1 == 0 {
                delta >>= 1;
                j += 1;
            }
            control.push(SmvtControl {
                power: j + 1,
                addend: delta as i32,
            });
        }
    }

    if current != 0 {
        let mut delta = current;
        let mut j = 0;
        while delta & 1 == 0 {
            delta >>= 1;
            j += 1;
        }
        control.push(SmvtControl {
            power: j,
            addend: delta as i32,
        });
    }

    control.push(SmvtControl {
        power: -1,
        addend: 0,
    });
    control
}

/// Build the WNAF table `{b, 3b, 5b, …}` in projective Niels form.
/// Variable-time.
pub(crate) fn prepare_wnaf_table(working: &Point, table_bits: u32) -> Vec<ProjectiveNiels> {
    let mut out = Vec::with_capacity(1 << table_bits);
    out.push(working.to_pniels());
    if table_bits == 0 {
        return out;
    }

    let mut tmp = working.double();
    let two_p = tmp.to_pniels();

    tmp = *working;
    tmp.add_pniels_assign(&two_p, false);
    out.push(tmp.to_pniels());

    for _ in 2..1usize << table_bits {
        tmp.add_pniels_assign(&two_p, false);
        out.push(tmp.to_pniels());
    }
    out
}

/// Variable-time `s1·(table base) + s2·base2`, for signature verification.
///
/// **Not constant-time.** Both scalars and both points must be public.
pub(crate) fn base_double_scalarmul_non_secret(
    wnaf_base: &[Niels],
    table_bits_pre: u32,
    s1: &Scalar,
    base2: &Point,
    s2: &Scalar,
) -> Point {
    let table_bits_var = crate::constants::WNAF_VAR_TABLE_BITS as u32;

    let control_pre = recode_wnaf(s1, table_bits_pre);
    let control_var = recode_wnaf(s2, table_bits_var);
    let precmp_var = prepare_wnaf_table(base2, table_bits_var);

    let mut contp = 0usize;
    let mut contv = 0usize;
    let mut combo;
    let mut i = control_var[0].power;

    if i < 0 {
        if control_pre[0].power < 0 {
            return Point::IDENTITY;
        }
        i = control_pre[0].power;
        combo = wnaf_base[(control_pre[0].addend >> 1) as usize].to_point();
        contp += 1;
    } else if i > control_pre[0].power {
        combo = precmp_var[(control_var[0].addend >> 1) as usize].to_point();
        contv += 1;
    } else if i == control_pre[0].power {
        combo = precmp_var[(control_var[0].addend >> 1) as usize].to_point();
        combo.add_niels_assign(&wnaf_base[(control_pre[0].addend >> 1) as usize], i != 0);
        contv += 1;
        contp += 1;
    } else {
        i = control_pre[0].power;
        combo = wnaf_base[(control_pre[0].addend >> 1) as usize].to_point();
        contp += 1;
    }

    i -= 1;
    while i >= 0 {
        let cv = i == control_var[contv].power;
        let cp = i == control_pre[contp].power;
        combo = combo.double_internal(i != 0 && !(cv || cp));

        if cv {
            debug_assert!(control_var[contv].addend != 0);
            if control_var[contv].addend > 0 {
                combo.add_pniels_assign(
                    &precmp_var[(control_var[contv].addend >> 1) as usize],
                    i != 0 && !cp,
                );
            } else {
                combo.sub_pniels_assign(
                    &precmp_var[((-control_var[contv].addend) >> 1) as usize],
                    i != 0 && !cp,
                );
            }
            contv += 1;
        }

        if cp {
            debug_assert!(control_pre[contp].addend != 0);
            if control_pre[contp].addend > 0 {
                combo.add_niels_assign(
                    &wnaf_base[(control_pre[contp].addend >> 1) as usize],
                    i != 0,
                );
            } else {
                combo.sub_niels_assign(
                    &wnaf_base[((-control_pre[contp].addend) >> 1) as usize],
                    i != 0,
                );
            }
            contp += 1;
        }
        i -= 1;
    }

    combo
}

impl Point {
    /// Constant-time `sb·b + sc·c`.
    pub fn double_scalarmul(b: &Point, sb: &Scalar, c: &Point, sc: &Scalar) -> Point {
        point_double_scalarmul(b, sb, c, sc)
    }

    /// Variable-time `s1·G + s2·self` against the generator's precomputed
    /// table.
    ///
    /// **Not constant-time.** For verification equations over public data
    /// only.
    pub fn non_secret_combo_with_base(&self, s1: &Scalar, s2: &Scalar) -> Point {
        crate::precomputed::generator_wnaf().combo_non_secret(s1, self, s2)
    }

    /// Decode `base`, multiply by `scalar` and re-encode.
    ///
    /// With `short_circuit` set, a decoding failure returns immediately
    /// (leaking the failure through timing, which is acceptable only when the
    /// input point is public); otherwise the multiplication runs on a dummy
    /// operand and the output is zeroed. The success flag must be checked
    /// either way.
    pub fn direct_scalarmul(
        base: &[u8; SER_BYTES],
        scalar: &Scalar,
        allow_identity: bool,
        short_circuit: bool,
    ) -> ([u8; SER_BYTES], Choice) {
        let decoded = Point::decode(base, allow_identity);
        let succ = decoded.is_some();
        if short_circuit && !bool::from(succ) {
            return ([0u8; SER_BYTES], succ);
        }
        let basep = decoded.unwrap_or(Point::IDENTITY);
        let scaled = point_scalarmul(&basep, scalar);
        let mut out = scaled.encode();
        for byte in out.iter_mut() {
            *byte &= u8::conditional_select(&0, &0xff, succ);
        }
        (out, succ)
    }
}
