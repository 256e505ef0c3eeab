//! Arbitrary-precision integer: the `BigInt` heap representation of the
//! Integer numeric type (the `SmallInt` inline case lives entirely in
//! [`crate::value::Value`]).

use alloc::string::String;
use num_bigint::BigInt as NumBigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::arena::Arena;
use crate::value::{tag_ptr, tag_small, small_fits, Object, Value};

/// Owns an arbitrary-precision integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BigInt(pub NumBigInt);

impl BigInt {
    /// Parse an integer literal: optional sign, decimal digits.
    pub fn parse(s: &str) -> Option<BigInt> {
        s.parse::<NumBigInt>().ok().map(BigInt)
    }

    /// Is this value negative?
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Is this value zero?
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl core::fmt::Display for BigInt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a (possibly large) integer result into a `Value`: demote to
/// `SmallInt` when it fits the inline range, otherwise allocate a `BigInt`
/// object in `arena`.
pub fn integer_to_value(arena: &mut Arena, value: NumBigInt) -> Value {
    if let Some(small) = to_i64_if_fits(&value) {
        return tag_small(small);
    }
    let address = arena.alloc_object(Object::BigInt(BigInt(value)));
    tag_ptr(address)
}

fn to_i64_if_fits(value: &NumBigInt) -> Option<i64> {
    let as_i64 = value.to_i64()?;
    small_fits(as_i64).then_some(as_i64)
}

/// Render an integer value's decimal string form (used by `sys` writes of
/// numeric results and diagnostics).
pub fn display_small(i: i64) -> String {
    alloc::format!("{i}")
}
