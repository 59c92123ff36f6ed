//! Interval domain over the extended integers.
//!
//! An [`Interval`] is a pair `[low, high]` with `low <= high`, where each end is a
//! [`Bound`]: `-∞`, a finite arbitrary-precision integer, or `+∞`.
//! The lower end is never `+∞` and the upper end is never `-∞`, so every
//! interval denotes a non-empty set of integers.
//!
//! All arithmetic here is *sound*: the result of `a.op(b)` contains `x op y`
//! for every `x ∈ a` and `y ∈ b`. Precision is best-effort.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Bound of an interval: -∞, finite value, or +∞.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound {
    NegInf,
    Finite(BigInt),
    PosInf,
}

impl Bound {
    pub fn finite(value: impl Into<BigInt>) -> Self {
        Bound::Finite(value.into())
    }

    pub fn zero() -> Self {
        Bound::Finite(BigInt::zero())
    }

    pub fn as_finite(&self) -> Option<&BigInt> {
        match self {
            Bound::Finite(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    fn signum(&self) -> Ordering {
        match self {
            Bound::NegInf => Ordering::Less,
            Bound::Finite(n) => n.cmp(&BigInt::zero()),
            Bound::PosInf => Ordering::Greater,
        }
    }

    fn infinity(sign: Ordering) -> Bound {
        match sign {
            Ordering::Less => Bound::NegInf,
            Ordering::Equal => Bound::zero(),
            Ordering::Greater => Bound::PosInf,
        }
    }

    /// Sum of two bounds.
    ///
    /// `-∞ + +∞` is undefined; it never arises from interval addition
    /// (lower ends are never `+∞`, upper ends never `-∞`), so it maps to `+∞`.
    pub fn add(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a + b),
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::PosInf,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        }
    }

    pub fn neg(&self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::Finite(n) => Bound::Finite(-n),
            Bound::PosInf => Bound::NegInf,
        }
    }

    pub fn sub(&self, other: &Bound) -> Bound {
        self.add(&other.neg())
    }

    /// Product of two bounds, with `0 * ±∞ = 0`.
    pub fn mul(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a * b),
            _ => Bound::infinity(mul_sign(self.signum(), other.signum())),
        }
    }

    /// Floor division by a non-zero finite divisor.
    fn floordiv(&self, divisor: &BigInt) -> Bound {
        debug_assert!(!divisor.is_zero());
        match self {
            Bound::Finite(n) => Bound::Finite(floor_div(n, divisor)),
            _ => Bound::infinity(mul_sign(self.signum(), divisor.cmp(&BigInt::zero()))),
        }
    }
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Bound::finite(value)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-∞"),
            Bound::Finite(n) => write!(f, "{}", n),
            Bound::PosInf => write!(f, "+∞"),
        }
    }
}

fn mul_sign(a: Ordering, b: Ordering) -> Ordering {
    match (a, b) {
        (Ordering::Equal, _) | (_, Ordering::Equal) => Ordering::Equal,
        _ if a == b => Ordering::Greater,
        _ => Ordering::Less,
    }
}

/// Python-style floor division.
pub(crate) fn floor_div(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    let r = a % b;
    if !r.is_zero() && (r.is_negative() != b.is_negative()) {
        q - BigInt::one()
    } else {
        q
    }
}

/// Python-style modulo: the result has the sign of the divisor.
pub(crate) fn floor_mod(a: &BigInt, b: &BigInt) -> BigInt {
    let r = a % b;
    if !r.is_zero() && (r.is_negative() != b.is_negative()) {
        r + b
    } else {
        r
    }
}

/// Interval: [low, high].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    low: Bound,
    high: Bound,
}

impl Interval {
    /// Creates the interval `[low, high]`.
    ///
    /// # Panics
    ///
    /// Panics if `low > high`, if `low` is `+∞`, or if `high` is `-∞`.
    pub fn new(low: Bound, high: Bound) -> Self {
        match Self::try_new(low, high) {
            Some(interval) => interval,
            None => panic!("Interval bounds must satisfy low <= high with finite-side infinities"),
        }
    }

    /// Creates `[low, high]`, or `None` if the bounds do not form a valid interval.
    pub fn try_new(low: Bound, high: Bound) -> Option<Self> {
        if low > high || low == Bound::PosInf || high == Bound::NegInf {
            None
        } else {
            Some(Self { low, high })
        }
    }

    /// The interval `[low, high]` with finite ends.
    pub fn range(low: i64, high: i64) -> Self {
        Self::new(Bound::finite(low), Bound::finite(high))
    }

    pub fn constant(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        Self {
            low: Bound::Finite(value.clone()),
            high: Bound::Finite(value),
        }
    }

    /// `(-∞, +∞)`: nothing is known about the value.
    pub fn unknown() -> Self {
        Self {
            low: Bound::NegInf,
            high: Bound::PosInf,
        }
    }

    /// `[0, +∞)`.
    pub fn nonnegative() -> Self {
        Self {
            low: Bound::zero(),
            high: Bound::PosInf,
        }
    }

    /// `[0, 1]`: the value of a predicate that may go either way.
    pub fn boolean() -> Self {
        Self::range(0, 1)
    }

    fn from_bool(value: bool) -> Self {
        Self::constant(value as i64)
    }

    pub fn low(&self) -> &Bound {
        &self.low
    }

    pub fn high(&self) -> &Bound {
        &self.high
    }

    pub fn is_unknown(&self) -> bool {
        self.low == Bound::NegInf && self.high == Bound::PosInf
    }

    pub fn is_singleton(&self) -> bool {
        self.low.is_finite() && self.low == self.high
    }

    /// The single value of a singleton interval.
    pub fn as_constant(&self) -> Option<&BigInt> {
        if self.is_singleton() {
            self.low.as_finite()
        } else {
            None
        }
    }

    pub fn contains(&self, value: &BigInt) -> bool {
        let value = Bound::Finite(value.clone());
        self.low <= value && value <= self.high
    }

    /// Whether every value of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        other.low <= self.low && self.high <= other.high
    }

    /// Intersection. `None` if the intervals are disjoint.
    pub fn tighten(&self, other: &Interval) -> Option<Interval> {
        Interval::try_new(
            self.low.clone().max(other.low.clone()),
            self.high.clone().min(other.high.clone()),
        )
    }

    /// Smallest interval containing both.
    pub fn join(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.clone().min(other.low.clone()),
            high: self.high.clone().max(other.high.clone()),
        }
    }

    fn hull(corners: Vec<Bound>) -> Interval {
        let low = corners.iter().min().cloned().unwrap_or(Bound::NegInf);
        let high = corners.iter().max().cloned().unwrap_or(Bound::PosInf);
        Interval::try_new(low, high).unwrap_or_else(Interval::unknown)
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.add(&other.low),
            high: self.high.add(&other.high),
        }
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.sub(&other.high),
            high: self.high.sub(&other.low),
        }
    }

    pub fn neg(&self) -> Interval {
        Interval {
            low: self.high.neg(),
            high: self.low.neg(),
        }
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        Interval::hull(vec![
            self.low.mul(&other.low),
            self.low.mul(&other.high),
            self.high.mul(&other.low),
            self.high.mul(&other.high),
        ])
    }

    pub fn square(&self) -> Interval {
        let product = self.mul(self);
        product.tighten(&Interval::nonnegative()).unwrap_or(product)
    }

    pub fn abs(&self) -> Interval {
        if self.low >= Bound::zero() {
            self.clone()
        } else if self.high <= Bound::zero() {
            self.neg()
        } else {
            Interval {
                low: Bound::zero(),
                high: self.low.neg().max(self.high.clone()),
            }
        }
    }

    /// Floor division. Unknown if the divisor may be zero or is unbounded.
    pub fn floordiv(&self, divisor: &Interval) -> Interval {
        let (Some(d_low), Some(d_high)) = (divisor.low.as_finite(), divisor.high.as_finite()) else {
            return Interval::unknown();
        };
        if divisor.contains(&BigInt::zero()) {
            return Interval::unknown();
        }
        // For a divisor of fixed sign, floor division is monotone in each
        // argument, so the corners bound the result.
        Interval::hull(vec![
            self.low.floordiv(d_low),
            self.low.floordiv(d_high),
            self.high.floordiv(d_low),
            self.high.floordiv(d_high),
        ])
    }

    /// Floor modulo (result has the sign of the divisor).
    pub fn modulo(&self, divisor: &Interval) -> Interval {
        let (Some(d_low), Some(d_high)) = (divisor.low.as_finite(), divisor.high.as_finite()) else {
            return Interval::unknown();
        };
        if d_low.is_positive() {
            let max_rem = Bound::Finite(d_high - BigInt::one());
            // x % d == x when 0 <= x < d.
            if self.low >= Bound::zero() && self.high < Bound::Finite(d_low.clone()) {
                return self.clone();
            }
            Interval::new(Bound::zero(), max_rem)
        } else if d_high.is_negative() {
            let min_rem = Bound::Finite(d_low + BigInt::one());
            if self.high <= Bound::zero() && self.low > Bound::Finite(d_high.clone()) {
                return self.clone();
            }
            Interval::new(min_rem, Bound::zero())
        } else {
            Interval::unknown()
        }
    }

    pub fn minimum(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.clone().min(other.low.clone()),
            high: self.high.clone().min(other.high.clone()),
        }
    }

    pub fn maximum(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.clone().max(other.low.clone()),
            high: self.high.clone().max(other.high.clone()),
        }
    }

    pub fn lt(&self, other: &Interval) -> Interval {
        if self.high < other.low {
            Interval::from_bool(true)
        } else if self.low >= other.high {
            Interval::from_bool(false)
        } else {
            Interval::boolean()
        }
    }

    pub fn le(&self, other: &Interval) -> Interval {
        if self.high <= other.low {
            Interval::from_bool(true)
        } else if self.low > other.high {
            Interval::from_bool(false)
        } else {
            Interval::boolean()
        }
    }

    pub fn gt(&self, other: &Interval) -> Interval {
        other.lt(self)
    }

    pub fn ge(&self, other: &Interval) -> Interval {
        other.le(self)
    }

    pub fn eq(&self, other: &Interval) -> Interval {
        if self.is_singleton() && self == other {
            Interval::from_bool(true)
        } else if self.tighten(other).is_none() {
            Interval::from_bool(false)
        } else {
            Interval::boolean()
        }
    }

    pub fn ne(&self, other: &Interval) -> Interval {
        self.eq(other).not()
    }

    fn truth(&self) -> Option<bool> {
        if !self.contains(&BigInt::zero()) {
            Some(true)
        } else if self.is_singleton() {
            Some(false)
        } else {
            None
        }
    }

    pub fn not(&self) -> Interval {
        match self.truth() {
            Some(value) => Interval::from_bool(!value),
            None => Interval::boolean(),
        }
    }

    pub fn and(&self, other: &Interval) -> Interval {
        match (self.truth(), other.truth()) {
            (Some(false), _) | (_, Some(false)) => Interval::from_bool(false),
            (Some(true), Some(true)) => Interval::from_bool(true),
            _ => Interval::boolean(),
        }
    }

    pub fn or(&self, other: &Interval) -> Interval {
        match (self.truth(), other.truth()) {
            (Some(true), _) | (_, Some(true)) => Interval::from_bool(true),
            (Some(false), Some(false)) => Interval::from_bool(false),
            _ => Interval::boolean(),
        }
    }

    /// Select `then` where `self` is non-zero and `otherwise` elsewhere.
    pub fn where_(&self, then: &Interval, otherwise: &Interval) -> Interval {
        match self.truth() {
            Some(true) => then.clone(),
            Some(false) => otherwise.clone(),
            None => then.join(otherwise),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn test_interval_operations() {
        let i1 = Interval::range(0, 10);
        let i2 = Interval::range(5, 15);

        assert_eq!(i1.join(&i2), Interval::range(0, 15));
        assert_eq!(i1.tighten(&i2), Some(Interval::range(5, 10)));
        assert_eq!(i1.tighten(&Interval::range(11, 12)), None);
        assert_eq!(i1.tighten(&Interval::unknown()), Some(i1.clone()));
    }

    #[test]
    #[should_panic(expected = "Interval bounds must satisfy")]
    fn test_inverted_bounds_panic() {
        Interval::range(3, 2);
    }

    #[test]
    fn test_invalid_infinities() {
        assert!(Interval::try_new(Bound::PosInf, Bound::PosInf).is_none());
        assert!(Interval::try_new(Bound::NegInf, Bound::NegInf).is_none());
        assert!(Interval::try_new(Bound::NegInf, Bound::finite(0)).is_some());
    }

    #[test]
    fn test_arithmetic() {
        let a = Interval::range(0, 128);
        assert_eq!(a.add(&Interval::constant(5)), Interval::range(5, 133));
        assert_eq!(a.mul(&Interval::constant(2)), Interval::range(0, 256));
        assert_eq!(a.sub(&Interval::range(1, 2)), Interval::range(-2, 127));
        assert_eq!(a.neg(), Interval::range(-128, 0));
        assert_eq!(Interval::range(-3, 2).mul(&Interval::range(-5, 4)), Interval::range(-12, 15));
        assert_eq!(Interval::range(-3, 2).abs(), Interval::range(0, 3));
        assert_eq!(Interval::range(-3, 2).square(), Interval::range(0, 9));
    }

    #[test]
    fn test_arithmetic_with_infinities() {
        let nonneg = Interval::nonnegative();
        assert_eq!(nonneg.add(&Interval::constant(1)), Interval::new(Bound::finite(1), Bound::PosInf));
        assert_eq!(nonneg.mul(&Interval::constant(0)), Interval::constant(0));
        assert_eq!(nonneg.mul(&Interval::range(-1, 1)), Interval::unknown());
        assert_eq!(nonneg.neg(), Interval::new(Bound::NegInf, Bound::zero()));
        assert!(Interval::unknown().add(&Interval::unknown()).is_unknown());
    }

    #[test]
    fn test_no_overflow() {
        let huge = Interval::constant(i64::MAX);
        let sum = huge.add(&huge);
        assert_eq!(sum.as_constant(), Some(&(big(i64::MAX) + big(i64::MAX))));
    }

    #[test]
    fn test_floordiv() {
        assert_eq!(Interval::range(0, 127).floordiv(&Interval::constant(4)), Interval::range(0, 31));
        assert_eq!(Interval::range(-7, 7).floordiv(&Interval::constant(2)), Interval::range(-4, 3));
        assert_eq!(Interval::range(-7, 7).floordiv(&Interval::constant(-2)), Interval::range(-4, 3));
        assert!(Interval::range(0, 7).floordiv(&Interval::range(-1, 1)).is_unknown());
        assert!(Interval::range(0, 7).floordiv(&Interval::nonnegative()).is_unknown());
        assert_eq!(
            Interval::nonnegative().floordiv(&Interval::constant(3)),
            Interval::nonnegative()
        );
    }

    #[test]
    fn test_modulo() {
        assert_eq!(Interval::range(0, 127).modulo(&Interval::constant(8)), Interval::range(0, 7));
        assert_eq!(Interval::range(2, 5).modulo(&Interval::constant(8)), Interval::range(2, 5));
        assert_eq!(Interval::range(-20, 20).modulo(&Interval::constant(8)), Interval::range(0, 7));
        assert_eq!(Interval::range(0, 20).modulo(&Interval::constant(-8)), Interval::range(-7, 0));
        assert!(Interval::range(0, 20).modulo(&Interval::range(-1, 1)).is_unknown());
    }

    #[test]
    fn test_floor_helpers() {
        assert_eq!(floor_div(&big(-7), &big(2)), big(-4));
        assert_eq!(floor_div(&big(7), &big(-2)), big(-4));
        assert_eq!(floor_div(&big(6), &big(2)), big(3));
        assert_eq!(floor_mod(&big(-7), &big(3)), big(2));
        assert_eq!(floor_mod(&big(7), &big(-3)), big(-2));
    }

    #[test]
    fn test_comparisons() {
        let low = Interval::range(0, 4);
        let high = Interval::range(5, 9);
        assert_eq!(low.lt(&high), Interval::constant(1));
        assert_eq!(high.lt(&low), Interval::constant(0));
        assert_eq!(low.lt(&Interval::range(3, 9)), Interval::boolean());
        assert_eq!(low.le(&Interval::range(4, 9)), Interval::constant(1));
        assert_eq!(high.ge(&low), Interval::constant(1));
        assert_eq!(low.eq(&high), Interval::constant(0));
        assert_eq!(Interval::constant(3).eq(&Interval::constant(3)), Interval::constant(1));
        assert_eq!(low.ne(&high), Interval::constant(1));
    }

    #[test]
    fn test_logic_and_where() {
        let t = Interval::constant(1);
        let f = Interval::constant(0);
        let maybe = Interval::boolean();
        assert_eq!(t.and(&maybe), maybe);
        assert_eq!(f.and(&maybe), f);
        assert_eq!(t.or(&maybe), t);
        assert_eq!(f.not(), t);
        assert_eq!(maybe.not(), maybe);

        let a = Interval::range(0, 3);
        let b = Interval::range(10, 12);
        assert_eq!(t.where_(&a, &b), a);
        assert_eq!(f.where_(&a, &b), b);
        assert_eq!(maybe.where_(&a, &b), Interval::range(0, 12));
    }

    #[test]
    fn test_subset() {
        assert!(Interval::range(1, 2).is_subset_of(&Interval::range(0, 5)));
        assert!(Interval::range(1, 2).is_subset_of(&Interval::unknown()));
        assert!(!Interval::unknown().is_subset_of(&Interval::range(0, 5)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::range(-1, 7).to_string(), "[-1, 7]");
        assert_eq!(Interval::unknown().to_string(), "[-∞, +∞]");
    }
}
