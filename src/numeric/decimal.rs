//! Exact base-ten decimal numeric type.
//!
//! Represented as an unscaled arbitrary-precision integer plus a `scale`
//! (number of fractional digits), so `1.50` (`unscaled=150, scale=2`) and
//! `1.5` (`unscaled=15, scale=1`) stay distinguishable for display even
//! though they are mathematically equal. Arithmetic never auto-canonicalizes
//! the scale away.

use alloc::format;
use alloc::string::{String, ToString};
use num_bigint::BigInt as NumBigInt;
use num_integer::Integer;
use num_rational::BigRational as NumBigRational;
use num_traits::{One, Signed, Zero};

use crate::arena::Arena;
use crate::value::{tag_ptr, Object, Value};

/// `unscaled / 10^scale`, with `scale` preserved verbatim across arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    /// Numerator over the implicit power-of-ten denominator.
    pub unscaled: NumBigInt,
    /// Number of fractional digits this value displays with.
    pub scale: u32,
}

fn pow10(scale: u32) -> NumBigInt {
    num_traits::pow::pow(NumBigInt::from(10), scale as usize)
}

impl Decimal {
    /// Parse the decimal literal form: optional sign, `digits.digits`,
    /// preserving the exact scale written.
    pub fn parse(s: &str) -> Option<Decimal> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let scale = frac_part.len() as u32;
        let digits = format!(
            "{}{}",
            if int_part.is_empty() { "0" } else { int_part },
            frac_part
        );
        let magnitude: NumBigInt = digits.parse().ok()?;
        let unscaled = if negative { -magnitude } else { magnitude };
        Some(Decimal { unscaled, scale })
    }

    /// This decimal's exact mathematical value, as a (reduced) rational —
    /// used only for cross-type comparison/promotion, never stored back.
    pub fn to_rational(&self) -> NumBigRational {
        NumBigRational::new(self.unscaled.clone(), pow10(self.scale))
    }

    /// Is the underlying value zero (regardless of scale)?
    pub fn is_zero(&self) -> bool {
        self.unscaled.is_zero()
    }
}

impl core::fmt::Display for Decimal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let negative = self.unscaled.is_negative();
        let magnitude = self.unscaled.abs().to_string();
        let scale = self.scale as usize;
        let padded = if magnitude.len() <= scale {
            format!("{:0>width$}", magnitude, width = scale + 1)
        } else {
            magnitude
        };
        let split_at = padded.len() - scale;
        let (int_part, frac_part) = padded.split_at(split_at);
        write!(
            f,
            "{}{int_part}.{frac_part}",
            if negative { "-" } else { "" }
        )
    }
}

/// Add two decimals, extending both to their common (larger) scale.
pub fn add(a: &Decimal, b: &Decimal) -> Decimal {
    let scale = a.scale.max(b.scale);
    let lhs = &a.unscaled * pow10(scale - a.scale);
    let rhs = &b.unscaled * pow10(scale - b.scale);
    Decimal {
        unscaled: lhs + rhs,
        scale,
    }
}

/// Subtract two decimals, extending both to their common (larger) scale.
pub fn sub(a: &Decimal, b: &Decimal) -> Decimal {
    let scale = a.scale.max(b.scale);
    let lhs = &a.unscaled * pow10(scale - a.scale);
    let rhs = &b.unscaled * pow10(scale - b.scale);
    Decimal {
        unscaled: lhs - rhs,
        scale,
    }
}

/// Multiply two decimals: scales add, unscaled values multiply.
pub fn mul(a: &Decimal, b: &Decimal) -> Decimal {
    Decimal {
        unscaled: &a.unscaled * &b.unscaled,
        scale: a.scale + b.scale,
    }
}

/// Negate a decimal, preserving scale.
pub fn neg(a: &Decimal) -> Decimal {
    Decimal {
        unscaled: -&a.unscaled,
        scale: a.scale,
    }
}

/// Outcome of dividing two decimals: resolved by a prime-factor check on
/// the reduced denominator.
pub enum DivOutcome {
    /// Exact and power-of-ten-denominator: stays `Decimal`.
    Decimal(Decimal),
    /// Exact but not power-of-ten-denominator: demotes to `Rational`.
    Rational(NumBigRational),
    /// Divisor was zero.
    DivisionByZero,
}

/// Divide `a / b`. If either operand is `Decimal`, the result is `Decimal`
/// when the reduced denominator's only prime factors are 2 and 5, else it
/// demotes to `Rational`.
pub fn div(a: &Decimal, b: &Decimal) -> DivOutcome {
    if b.unscaled.is_zero() {
        return DivOutcome::DivisionByZero;
    }
    let num = &a.unscaled * pow10(b.scale);
    let den = &b.unscaled * pow10(a.scale);
    let ratio = NumBigRational::new(num, den);
    let (reduced_num, reduced_den) = ratio.clone().into_numer_and_denom();
    match terminating_scale(&reduced_den) {
        Some(scale) => {
            let unscaled = (&reduced_num * pow10(scale)) / &reduced_den;
            DivOutcome::Decimal(Decimal { unscaled, scale })
        }
        None => DivOutcome::Rational(ratio),
    }
}

/// Public wrapper over [`terminating_scale`], used by [`crate::ops`] to
/// widen a `Rational` into a `Decimal` when it meets a `Decimal` operand.
pub fn terminating_scale_pub(den: &NumBigInt) -> Option<u32> {
    terminating_scale(den)
}

/// If `den`'s only prime factors are 2 and 5, return the scale
/// (`max(count_of_2, count_of_5)`) at which `num/den` terminates exactly;
/// else `None`.
fn terminating_scale(den: &NumBigInt) -> Option<u32> {
    let mut remaining = den.abs();
    let two = NumBigInt::from(2);
    let five = NumBigInt::from(5);
    let mut twos = 0u32;
    let mut fives = 0u32;
    while remaining.is_multiple_of(&two) {
        remaining /= &two;
        twos += 1;
    }
    while remaining.is_multiple_of(&five) {
        remaining /= &five;
        fives += 1;
    }
    if remaining == NumBigInt::one() {
        Some(twos.max(fives))
    } else {
        None
    }
}

/// Allocate a `Decimal` object. Never demoted to `Integer`/`Rational`
/// regardless of value — a Decimal is never auto-demoted.
pub fn decimal_to_value(arena: &mut Arena, d: Decimal) -> Value {
    let address = arena.alloc_object(Object::Decimal(d));
    tag_ptr(address)
}

/// Render a decimal result as its display string (used by `sys` writes).
pub fn display(d: &Decimal) -> String {
    format!("{d}")
}
