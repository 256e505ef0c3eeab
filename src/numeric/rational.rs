//! Arbitrary-precision rational numeric type.
//!
//! Canonical form (gcd = 1, denominator positive, `0` as `0/1`) is exactly
//! what `num_rational::BigRatio`'s constructors already guarantee, so this
//! module is a thin wrapper rather than reimplemented gcd reduction.

use alloc::string::String;
use num_bigint::BigInt as NumBigInt;
use num_rational::BigRational as NumBigRational;
use num_traits::Zero;

use crate::arena::Arena;
use crate::numeric::integer::integer_to_value;
use crate::value::{tag_ptr, Object, Value};

/// Owns a canonical-form arbitrary-precision numerator/denominator pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rational(pub NumBigRational);

impl Rational {
    /// Parse the `INT/INT` rational literal form.
    pub fn parse(numerator: &str, denominator: &str) -> Option<Rational> {
        let n: NumBigInt = numerator.parse().ok()?;
        let d: NumBigInt = denominator.parse().ok()?;
        if d.is_zero() {
            return None;
        }
        Some(Rational(NumBigRational::new(n, d)))
    }

    /// Is this rational's denominator 1 (i.e. does it demote to Integer)?
    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }
}

impl core::fmt::Display for Rational {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.0.numer(), self.0.denom())
    }
}

/// Normalize a rational result into a `Value`: demote to `Integer`
/// (further demoted to `SmallInt` if it fits) when the denominator is 1,
/// otherwise allocate a `Rational` object. `num_rational` has already
/// reduced `value` to canonical form by the time it reaches here.
pub fn rational_to_value(arena: &mut Arena, value: NumBigRational) -> Value {
    if value.is_integer() {
        return integer_to_value(arena, value.into_numer_and_denom().0);
    }
    let address = arena.alloc_object(Object::Rational(Rational(value)));
    tag_ptr(address)
}

/// Render a rational's `num/den` decimal string form.
pub fn display(value: &NumBigRational) -> String {
    alloc::format!("{}/{}", value.numer(), value.denom())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Signed;

    #[test]
    fn parses_and_reduces() {
        let r = Rational::parse("6", "3").unwrap();
        assert!(r.is_integer());
        assert_eq!(r.0, NumBigRational::from_integer(NumBigInt::from(2)));
    }

    #[test]
    fn rejects_zero_denominator() {
        assert!(Rational::parse("1", "0").is_none());
    }

    #[test]
    fn canonical_sign_is_on_numerator() {
        let r = Rational::parse("1", "-2").unwrap();
        assert!(r.0.numer().is_negative());
        assert!(!r.0.denom().is_negative());
    }
}
