//! The arbitrary-precision numeric tower and its arena glue.

pub mod bignum;
pub mod decimal;
pub mod integer;
pub mod rational;

use num_bigint::BigInt as NumBigInt;
use num_rational::BigRational as NumBigRational;
use num_traits::Zero;

use crate::arena::Arena;
use crate::value::{get_ptr, untag_small, Object, Value};
use decimal::Decimal;

/// A dereferenced, dispatch-ready numeric value — the common form
/// [`crate::ops`] extracts every numeric [`Value`] into before applying the
/// promotion matrix.
#[derive(Debug, Clone)]
pub enum Numeric {
    /// `SmallInt` or `BigInt`, uniformly as an unbounded integer.
    Integer(NumBigInt),
    /// A canonical-form rational.
    Rational(NumBigRational),
    /// A decimal with its scale preserved.
    Decimal(Decimal),
}

impl Numeric {
    /// Extract the numeric payload of `v`, or `None` if `v` is not one of
    /// `SmallInt`/`BigInt`/`Rational`/`Decimal`.
    pub fn from_value(arena: &Arena, v: Value) -> Option<Numeric> {
        if v.is_small_int() {
            return Some(Numeric::Integer(NumBigInt::from(untag_small(v))));
        }
        let address = get_ptr(v)?;
        match arena.get(address)? {
            Object::BigInt(b) => Some(Numeric::Integer(b.0.clone())),
            Object::Rational(r) => Some(Numeric::Rational(r.0.clone())),
            Object::Decimal(d) => Some(Numeric::Decimal(d.clone())),
            _ => None,
        }
    }

    /// Normalize and allocate this numeric back into a `Value`.
    pub fn into_value(self, arena: &mut Arena) -> Value {
        match self {
            Numeric::Integer(i) => integer::integer_to_value(arena, i),
            Numeric::Rational(r) => rational::rational_to_value(arena, r),
            Numeric::Decimal(d) => decimal::decimal_to_value(arena, d),
        }
    }

    /// This numeric's exact mathematical value as a rational — the common
    /// ground cross-variant comparison (by mathematical value, not
    /// representation) is defined over.
    pub fn as_rational(&self) -> NumBigRational {
        match self {
            Numeric::Integer(i) => NumBigRational::from_integer(i.clone()),
            Numeric::Rational(r) => r.clone(),
            Numeric::Decimal(d) => d.to_rational(),
        }
    }

    /// Is the underlying mathematical value zero?
    pub fn is_zero(&self) -> bool {
        match self {
            Numeric::Integer(i) => i.is_zero(),
            Numeric::Rational(r) => r.is_zero(),
            Numeric::Decimal(d) => d.is_zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tag_small;

    #[test]
    fn small_int_round_trips_through_numeric() {
        let arena = Arena::new(256);
        let v = tag_small(42);
        let n = Numeric::from_value(&arena, v).unwrap();
        assert!(matches!(n, Numeric::Integer(i) if i == NumBigInt::from(42)));
    }

    #[test]
    fn cross_type_rational_equality() {
        let mut arena = Arena::new(256);
        let int_val = Numeric::Integer(NumBigInt::from(6)).into_value(&mut arena);
        let rat_val = Numeric::Rational(NumBigRational::new(6.into(), 1.into())).into_value(&mut arena);
        let dec_val = Numeric::Decimal(Decimal::parse("6.0").unwrap()).into_value(&mut arena);

        let a = Numeric::from_value(&arena, int_val).unwrap().as_rational();
        let b = Numeric::from_value(&arena, rat_val).unwrap().as_rational();
        let c = Numeric::from_value(&arena, dec_val).unwrap().as_rational();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
