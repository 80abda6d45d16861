//! Canonical affine polynomials over rationals.
//!
//! A polynomial maps index-variable names to rational coefficients, with the
//! constant term stored under the empty name. Everything the contraction
//! machinery produces is affine: non-constant monomials are degree 1 by
//! construction, and the arithmetic here only ever scales by constants.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_rational::Rational64;
use num_traits::{One, Signed, Zero};

/// Key under which the constant term lives.
const CONSTANT: &str = "";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polynomial {
    terms: BTreeMap<String, Rational64>,
}

impl Polynomial {
    /// The zero polynomial.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: Rational64) -> Self {
        let mut terms = BTreeMap::new();
        if !value.is_zero() {
            terms.insert(CONSTANT.to_string(), value);
        }
        Self { terms }
    }

    /// The degree-1 monomial `1 * name`.
    pub fn index(name: &str) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(name.to_string(), Rational64::one());
        Self { terms }
    }

    pub fn coeff(&self, name: &str) -> Rational64 {
        self.terms.get(name).copied().unwrap_or_else(Rational64::zero)
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when no non-constant monomial remains.
    pub fn is_constant(&self) -> bool {
        self.terms.keys().all(|name| name == CONSTANT)
    }

    pub fn constant_value(&self) -> Rational64 {
        self.coeff(CONSTANT)
    }

    /// Names of the non-constant monomials, in sorted order.
    pub fn indexes(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().filter(|name| !name.is_empty()).map(String::as_str)
    }
}

impl From<i64> for Polynomial {
    fn from(value: i64) -> Self {
        Self::constant(Rational64::from_integer(value))
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(mut self, rhs: Polynomial) -> Polynomial {
        for (name, value) in rhs.terms {
            let sum = self.coeff(&name) + value;
            if sum.is_zero() {
                self.terms.remove(&name);
            } else {
                self.terms.insert(name, sum);
            }
        }
        self
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(mut self) -> Polynomial {
        for value in self.terms.values_mut() {
            *value = -*value;
        }
        self
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: Polynomial) -> Polynomial {
        self + (-rhs)
    }
}

impl Mul<Rational64> for Polynomial {
    type Output = Polynomial;

    fn mul(mut self, rhs: Rational64) -> Polynomial {
        if rhs.is_zero() {
            return Polynomial::new();
        }
        for value in self.terms.values_mut() {
            *value *= rhs;
        }
        self
    }
}

impl Div<Rational64> for Polynomial {
    type Output = Polynomial;

    /// Scale by `1 / rhs`. The divisor must be non-zero; callers validate.
    fn div(mut self, rhs: Rational64) -> Polynomial {
        for value in self.terms.values_mut() {
            *value /= rhs;
        }
        self
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        // Monomials in name order, constant term last.
        let mut first = true;
        let ordered = self
            .terms
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .chain(self.terms.get_key_value(CONSTANT));
        for (name, value) in ordered {
            if first {
                if value.is_negative() {
                    write!(f, "-")?;
                }
                first = false;
            } else if value.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            let magnitude = value.abs();
            if name.is_empty() {
                write!(f, "{magnitude}")?;
            } else if magnitude.is_one() {
                write!(f, "{name}")?;
            } else {
                write!(f, "{magnitude}*{name}")?;
            }
        }
        Ok(())
    }
}

/// Inequality `poly < range` over the index variables of a contraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConstraint {
    pub poly: Polynomial,
    pub range: i64,
}

impl RangeConstraint {
    pub fn new(poly: Polynomial, range: i64) -> Self {
        Self { poly, range }
    }
}

impl fmt::Display for RangeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} < {}", self.poly, self.range)
    }
}
