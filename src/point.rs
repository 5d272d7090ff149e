//! Group elements and their arithmetic.
//!
//! A [`Point`] is a coset of the 2-torsion subgroup of the twisted
//! Ed448-Goldilocks curve, held in extended coordinates `(X:Y:Z:T)` with
//! `X·Y = Z·T`. Because equality, encoding and hashing all operate on the
//! coset, the exposed group is the prime-order quotient: there are no small
//! subgroups and no cofactor to manage.
//!
//! The addition, subtraction and doubling formulas are the unified extended
//! twisted Edwards formulas, with no branches. Doubling can skip the output
//! `T` coordinate when the next operation is another doubling; the scalar
//! multiplication ladders rely on that.

use core::ops::{Add, Mul, Neg, Sub};

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroize;

use crate::constants::{EFF_D, SER_BYTES, TWISTED_D};
use crate::field::FieldElement;
use crate::scalar::Scalar;

/// An element of the prime-order group.
#[derive(Clone, Copy, Debug)]
pub struct Point {
    pub(crate) x: FieldElement,
    pub(crate) y: FieldElement,
    pub(crate) z: FieldElement,
    pub(crate) t: FieldElement,
}

/// Affine Niels form `(y−x, y+x, 2d·t)`, the shape stored in precomputed
/// tables.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Niels {
    pub(crate) a: FieldElement,
    pub(crate) b: FieldElement,
    pub(crate) c: FieldElement,
}

/// Niels form with an explicit `z`, for points that are not normalized.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProjectiveNiels {
    pub(crate) n: Niels,
    pub(crate) z: FieldElement,
}

impl Point {
    /// The identity element.
    pub const IDENTITY: Point = Point {
        x: FieldElement::ZERO,
        y: FieldElement::ONE,
        z: FieldElement::ONE,
        t: FieldElement::ZERO,
    };

    /// The group generator.
    ///
    /// Chosen as the image of the RFC 8032 Ed448 base point under the EdDSA
    /// bridge, so that the fixed-base tables serve both the native group API
    /// and Ed448 signing.
    pub fn generator() -> Point {
        *crate::precomputed::generator()
    }

    /// Point addition.
    pub fn add(&self, other: &Point) -> Point {
        let b = self.y.sub_nr(&self.x);
        let c = other.y.sub_nr(&other.x);
        let d = other.y.add_nr(&other.x);
        let a = c.mul(&b);
        let b = self.y.add_nr(&self.x);
        let yy = d.mul(&b);
        let tt = other.t.mul(&self.t);
        let xx = tt.mul_small(2 * EFF_D as i64);
        let b = a.add_nr(&yy);
        let c = yy.sub_nr(&a);
        let zz = self.z.mul(&other.z);
        let a = zz.add_nr(&zz);
        // twisted d is negative, so the roles of sum and difference swap
        let y3 = a.add_nr(&xx);
        let a3 = a.sub_nr(&xx);
        Point {
            z: a3.mul(&y3),
            x: y3.mul(&c),
            y: a3.mul(&b),
            t: b.mul(&c),
        }
    }

    /// Point subtraction.
    pub fn sub(&self, other: &Point) -> Point {
        let b = self.y.sub_nr(&self.x);
        let d = other.y.sub_nr(&other.x);
        let c = other.y.add_nr(&other.x);
        let a = c.mul(&b);
        let b = self.y.add_nr(&self.x);
        let yy = d.mul(&b);
        let tt = other.t.mul(&self.t);
        let xx = tt.mul_small(2 * EFF_D as i64);
        let b = a.add_nr(&yy);
        let c = yy.sub_nr(&a);
        let zz = self.z.mul(&other.z);
        let a = zz.add_nr(&zz);
        let y3 = a.sub_nr(&xx);
        let a3 = a.add_nr(&xx);
        Point {
            z: a3.mul(&y3),
            x: y3.mul(&c),
            y: a3.mul(&b),
            t: b.mul(&c),
        }
    }

    /// Doubling, optionally skipping the output `T` when the next operation
    /// is another doubling.
    pub(crate) fn double_internal(&self, before_double: bool) -> Point {
        let c = self.x.square();
        let a = self.y.square();
        let d = c.add_nr(&a);
        let t = self.y.add_nr(&self.x);
        let b = t.square();
        let b = b.subx_nr(&d, 3);
        let t = a.sub_nr(&c);
        let x = self.z.square();
        let z = x.add_nr(&x);
        let a = z.subx_nr(&t, 4);
        Point {
            x: a.mul(&b),
            z: t.mul(&a),
            y: t.mul(&d),
            t: if before_double {
                FieldElement::ZERO
            } else {
                b.mul(&d)
            },
        }
    }

    /// Point doubling.
    pub fn double(&self) -> Point {
        self.double_internal(false)
    }

    /// Negation.
    pub fn negate(&self) -> Point {
        Point {
            x: self.x.neg(),
            y: self.y,
            z: self.z,
            t: self.t.neg(),
        }
    }

    /// Check the extended-coordinate invariants: `X·Y = Z·T`,
    /// `Y² − X² = Z² + d_tw·T²` and `Z ≠ 0`.
    pub fn valid(&self) -> Choice {
        let a = self.x.mul(&self.y);
        let b = self.z.mul(&self.t);
        let mut out = a.ct_eq(&b);
        let a = self.x.square();
        let b = self.y.square();
        let lhs = b.sub(&a);
        let b = self.t.square();
        let c = b.mul_small(TWISTED_D);
        let b = self.z.square();
        let rhs = b.add(&c);
        out &= lhs.ct_eq(&rhs);
        out &= !self.z.is_zero();
        out
    }

    /// Add a 2-torsion element. The coordinates change; the coset, and hence
    /// the encoding, does not. Exposed as a testing aid for the quotient.
    pub fn torque(&self) -> Point {
        Point {
            x: self.x.neg(),
            y: self.y.neg(),
            z: self.z,
            t: self.t,
        }
    }

    /// Rescale the projective coordinates by a nonzero factor parsed from
    /// `factor` (zero is replaced by one). The represented point is
    /// unchanged. Exposed as a testing aid for the quotient.
    pub fn pscale(&self, factor: &[u8; SER_BYTES]) -> Point {
        let (mut gfac, _) = FieldElement::deserialize(factor);
        gfac = FieldElement::conditional_select(&gfac, &FieldElement::ONE, gfac.is_zero());
        Point {
            x: self.x.mul(&gfac),
            y: self.y.mul(&gfac),
            z: self.z.mul(&gfac),
            t: self.t.mul(&gfac),
        }
    }

    pub(crate) fn to_pniels(self) -> ProjectiveNiels {
        ProjectiveNiels {
            n: Niels {
                a: self.y.sub(&self.x),
                b: self.x.add(&self.y),
                c: self.t.mul_small(2 * TWISTED_D),
            },
            z: self.z.add(&self.z),
        }
    }

    /// Mixed addition with an affine Niels point.
    pub(crate) fn add_niels_assign(&mut self, e: &Niels, before_double: bool) {
        let b = self.y.sub_nr(&self.x);
        let a = e.a.mul(&b);
        let b = self.x.add_nr(&self.y);
        self.y = e.b.mul(&b);
        self.x = e.c.mul(&self.t);
        let c = a.add_nr(&self.y);
        let b = self.y.sub_nr(&a);
        self.y = self.z.sub_nr(&self.x);
        let a = self.x.add_nr(&self.z);
        self.z = a.mul(&self.y);
        self.x = self.y.mul(&b);
        self.y = a.mul(&c);
        if !before_double {
            self.t = b.mul(&c);
        }
    }

    /// Mixed subtraction of an affine Niels point.
    pub(crate) fn sub_niels_assign(&mut self, e: &Niels, before_double: bool) {
        let b = self.y.sub_nr(&self.x);
        let a = e.b.mul(&b);
        let b = self.x.add_nr(&self.y);
        self.y = e.a.mul(&b);
        self.x = e.c.mul(&self.t);
        let c = a.add_nr(&self.y);
        let b = self.y.sub_nr(&a);
        self.y = self.z.add_nr(&self.x);
        let a = self.z.sub_nr(&self.x);
        self.z = a.mul(&self.y);
        self.x = self.y.mul(&b);
        self.y = a.mul(&c);
        if !before_double {
            self.t = b.mul(&c);
        }
    }

    pub(crate) fn add_pniels_assign(&mut self, pn: &ProjectiveNiels, before_double: bool) {
        self.z = self.z.mul(&pn.z);
        self.add_niels_assign(&pn.n, before_double);
    }

    pub(crate) fn sub_pniels_assign(&mut self, pn: &ProjectiveNiels, before_double: bool) {
        self.z = self.z.mul(&pn.z);
        self.sub_niels_assign(&pn.n, before_double);
    }
}

impl Niels {
    pub(crate) const ZERO: Niels = Niels {
        a: FieldElement::ZERO,
        b: FieldElement::ZERO,
        c: FieldElement::ZERO,
    };

    pub(crate) fn to_point(self) -> Point {
        let y = self.b.add(&self.a);
        let x = self.b.sub(&self.a);
        Point {
            t: y.mul(&x),
            x,
            y,
            z: FieldElement::ONE,
        }
    }

    /// Negate under a mask: swap the sum/difference coordinates and negate
    /// the `2d·t` term.
    pub(crate) fn conditional_negate(&mut self, neg: Choice) {
        FieldElement::conditional_swap(&mut self.a, &mut self.b, neg);
        let negated = self.c.neg();
        self.c = FieldElement::conditional_select(&self.c, &negated, neg);
    }
}

impl ProjectiveNiels {
    pub(crate) const ZERO: ProjectiveNiels = ProjectiveNiels {
        n: Niels::ZERO,
        z: FieldElement::ZERO,
    };

    pub(crate) fn to_point(self) -> Point {
        let eu = self.n.b.add(&self.n.a);
        let y = self.n.b.sub(&self.n.a);
        let t = y.mul(&eu);
        Point {
            x: self.z.mul(&y),
            y: self.z.mul(&eu),
            z: self.z.square(),
            t,
        }
    }
}

impl ConstantTimeEq for Point {
    /// Coset equality: `X_P·Y_Q == X_Q·Y_P`.
    fn ct_eq(&self, other: &Self) -> Choice {
        let a = self.y.mul(&other.x);
        let b = other.y.mul(&self.x);
        a.ct_eq(&b)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}
impl Eq for Point {}

impl Default for Point {
    fn default() -> Self {
        Point::IDENTITY
    }
}

impl ConditionallySelectable for Point {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Point {
            x: FieldElement::conditional_select(&a.x, &b.x, choice),
            y: FieldElement::conditional_select(&a.y, &b.y, choice),
            z: FieldElement::conditional_select(&a.z, &b.z, choice),
            t: FieldElement::conditional_select(&a.t, &b.t, choice),
        }
    }
}

impl ConditionallySelectable for Niels {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Niels {
            a: FieldElement::conditional_select(&a.a, &b.a, choice),
            b: FieldElement::conditional_select(&a.b, &b.b, choice),
            c: FieldElement::conditional_select(&a.c, &b.c, choice),
        }
    }
}

impl ConditionallySelectable for ProjectiveNiels {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        ProjectiveNiels {
            n: Niels::conditional_select(&a.n, &b.n, choice),
            z: FieldElement::conditional_select(&a.z, &b.z, choice),
        }
    }
}

impl Zeroize for Point {
    fn zeroize(&mut self) {
        self.x.zeroize();
        self.y.zeroize();
        self.z.zeroize();
        self.t.zeroize();
    }
}

impl Add<&Point> for &Point {
    type Output = Point;
    fn add(self, rhs: &Point) -> Point {
        Point::add(self, rhs)
    }
}

impl Add<Point> for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::add(&self, &rhs)
    }
}

impl Sub<&Point> for &Point {
    type Output = Point;
    fn sub(self, rhs: &Point) -> Point {
        Point::sub(self, rhs)
    }
}

impl Sub<Point> for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::sub(&self, &rhs)
    }
}

impl Neg for &Point {
    type Output = Point;
    fn neg(self) -> Point {
        self.negate()
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        self.negate()
    }
}

impl Mul<&Scalar> for &Point {
    type Output = Point;
    fn mul(self, scalar: &Scalar) -> Point {
        crate::scalar_mul::point_scalarmul(self, scalar)
    }
}

impl Mul<Scalar> for Point {
    type Output = Point;
    fn mul(self, scalar: Scalar) -> Point {
        &self * &scalar
    }
}

impl Mul<&Point> for &Scalar {
    type Output = Point;
    fn mul(self, point: &Point) -> Point {
        point * self
    }
}

impl Mul<Point> for Scalar {
    type Output = Point;
    fn mul(self, point: Point) -> Point {
        &point * &self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::digest::{ExtendableOutput, Update, XofReader};
    use sha3::Shake256;

    fn rng(seed: &str) -> impl FnMut() -> Point {
        let mut h = Shake256::default();
        h.update(seed.as_bytes());
        let mut reader = h.finalize_xof();
        move || {
            let mut bytes = [0u8; 2 * SER_BYTES];
            reader.read(&mut bytes);
            let p = Point::from_uniform_hash(&bytes);
            assert!(bool::from(p.valid()));
            p
        }
    }

    #[test]
    fn group_axioms() {
        let mut next = rng("point group axioms");
        for _ in 0..40 {
            let p = next();
            let q = next();
            let r = next();
            assert_eq!(Point::add(&p, &q), Point::add(&q, &p));
            assert_eq!(
                Point::add(&Point::add(&p, &q), &r),
                Point::add(&p, &Point::add(&q, &r))
            );
            assert_eq!(Point::add(&Point::sub(&p, &q), &q), p);
            assert_eq!(p.double(), Point::add(&p, &p));
            assert_eq!(Point::add(&p, &Point::IDENTITY), p);
            assert_eq!(Point::add(&p, &p.negate()), Point::IDENTITY);
            assert!(bool::from(Point::add(&p, &q).valid()));
            assert!(bool::from(p.double().valid()));
        }
    }

    #[test]
    fn torque_and_pscale_preserve_the_coset() {
        let mut next = rng("point torque");
        let mut h = Shake256::default();
        h.update(b"point pscale factors");
        let mut reader = h.finalize_xof();
        for _ in 0..40 {
            let p = next();
            let tq = p.torque();
            assert!(bool::from(tq.valid()));
            assert_eq!(p, tq);

            let mut factor = [0u8; SER_BYTES];
            reader.read(&mut factor);
            factor[SER_BYTES - 1] &= 0x7f;
            let ps = p.pscale(&factor);
            assert!(bool::from(ps.valid()));
            assert_eq!(p, ps);
            assert_eq!(p.encode(), tq.encode());
            assert_eq!(p.encode(), ps.encode());
        }
    }

    #[test]
    fn niels_round_trip() {
        let mut next = rng("point niels");
        for _ in 0..20 {
            let p = next();
            let pn = p.to_pniels();
            assert_eq!(pn.to_point(), p);

            let mut acc = p;
            acc.add_pniels_assign(&p.to_pniels(), false);
            assert_eq!(acc, p.double());
            assert!(bool::from(acc.valid()));

            let mut acc = p.double();
            acc.sub_pniels_assign(&p.to_pniels(), false);
            assert_eq!(acc, p);
        }
    }
}
