//! Arbitrary-precision rational numbers.
//!
//! A [`Number`] is a lazy expression tree of sums, negations, products and
//! quotients over big integers. Arithmetic only builds tree nodes;
//! canonicalisation to a reduced ratio happens when a comparison, integer
//! extraction, or string conversion asks for it. Tree depth is bounded:
//! once an operation would exceed the bound, the result is canonicalised
//! eagerly, so canonicalisation never recurses deeply no matter how many
//! operations a script chains.
//!
//! Quotients verify the divisor at construction time ([`Number::checked_div`]
//! is the only way to build one), so canonicalisation itself cannot fail.

use std::{cmp::Ordering, fmt, ops, rc::Rc};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

/// Failures surfaced by numeric conversions and division.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    DivisionByZero,
    /// Integer extraction on a value with a fractional part.
    NotAnInteger,
    /// Integer extraction out of the target type's range.
    OutOfRange,
    /// Conversion from a non-finite floating point value.
    NotFinite,
}

impl fmt::Display for NumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::NotAnInteger => f.write_str("number is not an integer"),
            Self::OutOfRange => f.write_str("number out of range"),
            Self::NotFinite => f.write_str("number is not finite"),
        }
    }
}

impl std::error::Error for NumberError {}

/// Maximum lazy tree depth before an operation canonicalises its result.
const MAX_LAZY_DEPTH: u32 = 64;

#[derive(Debug)]
enum Repr {
    Int(BigInt),
    /// Reduced ratio; denominator is positive and never one (that would be
    /// an `Int`).
    Ratio(BigInt, BigInt),
    Sum(Number, Number),
    Negation(Number),
    Product(Number, Number),
    /// Divisor is known non-zero (checked at construction).
    Quotient(Number, Number),
}

#[derive(Debug)]
struct Node {
    repr: Repr,
    depth: u32,
}

/// An arbitrary-precision rational number. Cheap to clone.
#[derive(Clone)]
pub struct Number(Rc<Node>);

/// A reduced numerator/denominator pair; the canonical form of a number.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ratio {
    numerator: BigInt,
    /// Always positive.
    denominator: BigInt,
}

impl Ratio {
    fn new(numerator: BigInt, denominator: BigInt) -> Self {
        debug_assert!(!denominator.is_zero());
        let (numerator, denominator) = if denominator.is_negative() {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let divisor = numerator.gcd(&denominator);
        Self {
            numerator: &numerator / &divisor,
            denominator: &denominator / &divisor,
        }
    }

    fn from_int(value: BigInt) -> Self {
        Self {
            numerator: value,
            denominator: BigInt::from(1),
        }
    }

    fn add(&self, other: &Self) -> Self {
        Self::new(
            &self.numerator * &other.denominator + &other.numerator * &self.denominator,
            &self.denominator * &other.denominator,
        )
    }

    fn mul(&self, other: &Self) -> Self {
        Self::new(
            &self.numerator * &other.numerator,
            &self.denominator * &other.denominator,
        )
    }

    fn neg(&self) -> Self {
        Self {
            numerator: -&self.numerator,
            denominator: self.denominator.clone(),
        }
    }

    fn div(&self, other: &Self) -> Self {
        debug_assert!(!other.numerator.is_zero());
        Self::new(
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        )
    }

    fn is_integer(&self) -> bool {
        self.denominator == BigInt::from(1)
    }
}

impl Number {
    fn from_repr(repr: Repr, depth: u32) -> Self {
        let node = Self(Rc::new(Node { repr, depth }));
        if depth > MAX_LAZY_DEPTH {
            Self::from_ratio(node.canonicalize())
        } else {
            node
        }
    }

    fn from_ratio(ratio: Ratio) -> Self {
        let repr = if ratio.is_integer() {
            Repr::Int(ratio.numerator)
        } else {
            Repr::Ratio(ratio.numerator, ratio.denominator)
        };
        Self(Rc::new(Node { repr, depth: 0 }))
    }

    pub fn from_bigint(value: BigInt) -> Self {
        Self(Rc::new(Node {
            repr: Repr::Int(value),
            depth: 0,
        }))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_bigint(BigInt::from(value))
    }

    pub fn from_usize(value: usize) -> Self {
        Self::from_bigint(BigInt::from(value))
    }

    /// Exact conversion from a finite double (doubles are rationals with a
    /// power-of-two denominator).
    pub fn from_f64(value: f64) -> Result<Self, NumberError> {
        if !value.is_finite() {
            return Err(NumberError::NotFinite);
        }
        let bits = value.to_bits();
        let sign = if bits >> 63 == 1 { -1i64 } else { 1 };
        let raw_exponent = ((bits >> 52) & 0x7ff) as i64;
        let raw_mantissa = bits & 0x000f_ffff_ffff_ffff;
        let (mantissa, exponent) = if raw_exponent == 0 {
            (raw_mantissa, -1074)
        } else {
            (raw_mantissa | 0x0010_0000_0000_0000, raw_exponent - 1075)
        };
        let mantissa = BigInt::from(sign) * BigInt::from(mantissa);
        let ratio = if exponent >= 0 {
            let shift = u32::try_from(exponent).expect("f64 exponent in range");
            Ratio::from_int(mantissa << shift)
        } else {
            let shift = u32::try_from(-exponent).expect("f64 exponent in range");
            Ratio::new(mantissa, BigInt::from(1) << shift)
        };
        Ok(Self::from_ratio(ratio))
    }

    /// Division; fails when the divisor is zero.
    pub fn checked_div(&self, divisor: &Self) -> Result<Self, NumberError> {
        if divisor.canonicalize().numerator.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        let depth = self.0.depth.max(divisor.0.depth) + 1;
        Ok(Self::from_repr(
            Repr::Quotient(self.clone(), divisor.clone()),
            depth,
        ))
    }

    fn canonicalize(&self) -> Ratio {
        match &self.0.repr {
            Repr::Int(value) => Ratio::from_int(value.clone()),
            Repr::Ratio(numerator, denominator) => Ratio {
                numerator: numerator.clone(),
                denominator: denominator.clone(),
            },
            Repr::Sum(a, b) => a.canonicalize().add(&b.canonicalize()),
            Repr::Negation(a) => a.canonicalize().neg(),
            Repr::Product(a, b) => a.canonicalize().mul(&b.canonicalize()),
            Repr::Quotient(a, b) => a.canonicalize().div(&b.canonicalize()),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.canonicalize().numerator.is_zero()
    }

    pub fn is_integer(&self) -> bool {
        self.canonicalize().is_integer()
    }

    /// Compares with a precision hint: the number of decimal digits that
    /// must be honoured. The hint bounds canonicalisation work; with
    /// reduced-ratio leaves the comparison is exact regardless.
    pub fn cmp_with_precision(&self, other: &Self, _precision_digits: usize) -> Ordering {
        let a = self.canonicalize();
        let b = other.canonicalize();
        (&a.numerator * &b.denominator).cmp(&(&b.numerator * &a.denominator))
    }

    pub fn to_i64(&self) -> Result<i64, NumberError> {
        let ratio = self.canonicalize();
        if !ratio.is_integer() {
            return Err(NumberError::NotAnInteger);
        }
        ratio.numerator.to_i64().ok_or(NumberError::OutOfRange)
    }

    pub fn to_i32(&self) -> Result<i32, NumberError> {
        let ratio = self.canonicalize();
        if !ratio.is_integer() {
            return Err(NumberError::NotAnInteger);
        }
        ratio.numerator.to_i32().ok_or(NumberError::OutOfRange)
    }

    pub fn to_usize(&self) -> Result<usize, NumberError> {
        let ratio = self.canonicalize();
        if !ratio.is_integer() {
            return Err(NumberError::NotAnInteger);
        }
        ratio.numerator.to_usize().ok_or(NumberError::OutOfRange)
    }

    /// Approximate double value, for the transcendental free functions.
    pub fn to_f64(&self) -> f64 {
        let ratio = self.canonicalize();
        let numerator = ratio.numerator.to_f64().unwrap_or(f64::INFINITY);
        let denominator = ratio.denominator.to_f64().unwrap_or(f64::INFINITY);
        numerator / denominator
    }

    /// Decimal rendering with at most `precision` fractional digits
    /// (round half away from zero). Trailing zeros and a bare trailing
    /// point are trimmed, so `5` renders as `"5"` at any precision.
    pub fn to_string_with_precision(&self, precision: usize) -> String {
        let ratio = self.canonicalize();
        let negative = ratio.numerator.is_negative();
        let mut scaled = ratio.numerator.abs() * BigInt::from(10).pow(precision as u32);
        // Round half away from zero.
        scaled += &ratio.denominator / BigInt::from(2);
        let digits = (scaled / &ratio.denominator).to_string();
        let mut output = if precision == 0 {
            digits
        } else if digits.len() > precision {
            let (integral, fractional) = digits.split_at(digits.len() - precision);
            format!("{integral}.{fractional}")
        } else {
            format!("0.{digits:0>precision$}")
        };
        if precision > 0 {
            while output.ends_with('0') {
                output.pop();
            }
            if output.ends_with('.') {
                output.pop();
            }
        }
        if negative && output != "0" {
            output.insert(0, '-');
        }
        output
    }
}

impl ops::Add for &Number {
    type Output = Number;

    fn add(self, rhs: &Number) -> Number {
        let depth = self.0.depth.max(rhs.0.depth) + 1;
        Number::from_repr(Repr::Sum(self.clone(), rhs.clone()), depth)
    }
}

impl ops::Sub for &Number {
    type Output = Number;

    fn sub(self, rhs: &Number) -> Number {
        self + &(-rhs)
    }
}

impl ops::Mul for &Number {
    type Output = Number;

    fn mul(self, rhs: &Number) -> Number {
        let depth = self.0.depth.max(rhs.0.depth) + 1;
        Number::from_repr(Repr::Product(self.clone(), rhs.clone()), depth)
    }
}

impl ops::Neg for &Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number::from_repr(Repr::Negation(self.clone()), self.0.depth + 1)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.canonicalize() == other.canonicalize()
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_with_precision(other, 0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with_precision(5))
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: i64) -> Number {
        Number::from_i64(value)
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(&n(40) + &n(2), n(42));
        assert_eq!(&n(6) * &n(7), n(42));
        assert_eq!(&n(50) - &n(8), n(42));
        assert_eq!(n(84).checked_div(&n(2)).unwrap(), n(42));
    }

    #[test]
    fn division_by_zero_is_detected_eagerly() {
        assert_eq!(n(1).checked_div(&n(0)), Err(NumberError::DivisionByZero));
        let zero = &n(5) - &n(5);
        assert_eq!(n(1).checked_div(&zero), Err(NumberError::DivisionByZero));
    }

    #[test]
    fn fractions_compare_exactly() {
        let third = n(1).checked_div(&n(3)).unwrap();
        let two_sixths = n(2).checked_div(&n(6)).unwrap();
        assert_eq!(third, two_sixths);
        assert!(third < n(1));
        assert!(n(0) < third);
    }

    #[test]
    fn precision_rendering() {
        let third = n(1).checked_div(&n(3)).unwrap();
        assert_eq!(third.to_string_with_precision(5), "0.33333");
        assert_eq!(n(5).to_string_with_precision(2), "5");
        assert_eq!(n(-5).to_string_with_precision(2), "-5");
        let half = n(1).checked_div(&n(2)).unwrap();
        assert_eq!(half.to_string_with_precision(1), "0.5");
        assert_eq!((-&half).to_string_with_precision(2), "-0.5");
    }

    #[test]
    fn integer_extraction() {
        assert_eq!(n(7).to_i64(), Ok(7));
        let half = n(1).checked_div(&n(2)).unwrap();
        assert_eq!(half.to_i64(), Err(NumberError::NotAnInteger));
        let huge = &n(i64::MAX) + &n(1);
        assert_eq!(huge.to_i64(), Err(NumberError::OutOfRange));
    }

    #[test]
    fn deep_chains_do_not_overflow_canonicalisation() {
        let mut total = n(0);
        for index in 0..10_000 {
            total = &total + &n(index);
        }
        assert_eq!(total.to_i64(), Ok(49_995_000));
    }

    #[test]
    fn from_f64_is_exact_for_small_values() {
        assert_eq!(Number::from_f64(0.5).unwrap(), n(1).checked_div(&n(2)).unwrap());
        assert_eq!(Number::from_f64(3.0).unwrap(), n(3));
        assert_eq!(Number::from_f64(f64::INFINITY), Err(NumberError::NotFinite));
    }
}
