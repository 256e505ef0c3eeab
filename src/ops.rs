//! Operator dispatch across Integer/Rational/Decimal, coercion and
//! comparison.
//!
//! Dispatch is a `match` over a small closed set of operand shapes rather
//! than `dyn Trait` indirection: the operand space is closed and the hot
//! path benefits from a function table keyed by variant pairs rather than
//! virtual calls.

use num_bigint::BigInt as NumBigInt;
use num_rational::BigRational as NumBigRational;
use num_traits::{Signed, Zero};

use crate::arena::Arena;
use crate::numeric::{decimal, decimal::Decimal, Numeric};
use crate::table::Table;
use crate::value::{type_of, Object, Value, ValueType};

/// Attempt to coerce `v` to a numeric value for use as an arithmetic
/// operand: a String coerces to its codepoint length, a Table to its entry
/// count, booleans to `0`/`1`. Returns `None` for non-coercible, non-numeric
/// operands (Closure, ResourceDef, ...).
pub fn coerce_numeric(arena: &Arena, v: Value) -> Option<Numeric> {
    if let Some(n) = Numeric::from_value(arena, v) {
        return Some(n);
    }
    if v.is_boolean() {
        return Some(Numeric::Integer(NumBigInt::from(v.as_bool() as i64)));
    }
    match type_of(arena, v) {
        ValueType::String => {
            let address = crate::value::get_ptr(v)?;
            match arena.get(address)? {
                Object::String(s) => Some(Numeric::Integer(NumBigInt::from(s.codepoint_count()))),
                _ => None,
            }
        }
        ValueType::Table => {
            let address = crate::value::get_ptr(v)?;
            match arena.get(address)? {
                Object::Table(t) => Some(Numeric::Integer(NumBigInt::from(t.count()))),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `left + right`.
pub fn add(arena: &mut Arena, left: Value, right: Value) -> Value {
    binary_arith(arena, left, right, |a, b| a + b, |a, b| a + b, |a, b| decimal::add(a, b))
}

/// `left - right`.
pub fn sub(arena: &mut Arena, left: Value, right: Value) -> Value {
    binary_arith(arena, left, right, |a, b| a - b, |a, b| a - b, |a, b| decimal::sub(a, b))
}

/// `left * right`.
pub fn mul(arena: &mut Arena, left: Value, right: Value) -> Value {
    binary_arith(arena, left, right, |a, b| a * b, |a, b| a * b, |a, b| decimal::mul(a, b))
}

/// `-right` (unary negation).
pub fn neg(arena: &mut Arena, right: Value) -> Value {
    let Some(n) = coerce_numeric(arena, right) else {
        return Value::ERROR;
    };
    let result = match n {
        Numeric::Integer(i) => Numeric::Integer(-i),
        Numeric::Rational(r) => Numeric::Rational(-r),
        Numeric::Decimal(d) => Numeric::Decimal(decimal::neg(&d)),
    };
    result.into_value(arena)
}

fn binary_arith(
    arena: &mut Arena,
    left: Value,
    right: Value,
    int_op: impl FnOnce(NumBigInt, NumBigInt) -> NumBigInt,
    rat_op: impl FnOnce(NumBigRational, NumBigRational) -> NumBigRational,
    dec_op: impl FnOnce(&Decimal, &Decimal) -> Decimal,
) -> Value {
    if left.is_error() || right.is_error() {
        return Value::ERROR;
    }
    let (Some(l), Some(r)) = (coerce_numeric(arena, left), coerce_numeric(arena, right)) else {
        return Value::ERROR;
    };
    // Promotion: Integer+Integer stays Integer, anything paired with a
    // Rational promotes to Rational (unless a Decimal is also present), and
    // anything paired with a Decimal promotes to Decimal.
    let result = match (l, r) {
        (Numeric::Integer(a), Numeric::Integer(b)) => Numeric::Integer(int_op(a, b)),
        (Numeric::Decimal(a), Numeric::Decimal(b)) => Numeric::Decimal(dec_op(&a, &b)),
        (Numeric::Decimal(a), b) => Numeric::Decimal(dec_op(&a, &as_decimal(b))),
        (a, Numeric::Decimal(b)) => Numeric::Decimal(dec_op(&as_decimal(a), &b)),
        (a, b) => Numeric::Rational(rat_op(a.as_rational(), b.as_rational())),
    };
    result.into_value(arena)
}

/// Widen a non-`Decimal` numeric into a `Decimal` with scale 0 (rationals
/// that aren't exact at scale 0 are out of scope here — mixed
/// Decimal/Rational arithmetic is intentionally narrow: see
/// `as_decimal`'s callers, which only reach this path once one operand is
/// already `Decimal`).
fn as_decimal(n: Numeric) -> Decimal {
    match n {
        Numeric::Decimal(d) => d,
        Numeric::Integer(i) => Decimal { unscaled: i, scale: 0 },
        Numeric::Rational(r) => {
            // Best-effort exact widening: multiply out the denominator if
            // the rational is itself integral; otherwise fall back to a
            // scale-0 truncated representation is wrong, so instead widen
            // via the smallest terminating scale, mirroring `decimal::div`'s
            // own prime-factor check.
            let (num, den) = r.into_raw();
            match crate::numeric::decimal::terminating_scale_pub(&den) {
                Some(scale) => {
                    let factor = num_traits::pow::pow(NumBigInt::from(10), scale as usize) / &den;
                    Decimal {
                        unscaled: num * factor,
                        scale,
                    }
                }
                None => Decimal {
                    unscaled: num / &den,
                    scale: 0,
                },
            }
        }
    }
}

/// `left / right`. Division by zero yields `Error`, never a panic and never
/// a sentinel numeric.
pub fn div(arena: &mut Arena, left: Value, right: Value) -> Value {
    if left.is_error() || right.is_error() {
        return Value::ERROR;
    }
    let (Some(l), Some(r)) = (coerce_numeric(arena, left), coerce_numeric(arena, right)) else {
        return Value::ERROR;
    };
    if r.is_zero() {
        return Value::ERROR;
    }
    let result = match (l, r) {
        (Numeric::Integer(a), Numeric::Integer(b)) => {
            if (&a % &b).is_zero() {
                Numeric::Integer(a / b)
            } else {
                Numeric::Rational(NumBigRational::new(a, b))
            }
        }
        (Numeric::Decimal(a), b) => decimal_div(&a, &as_decimal(b)),
        (a, Numeric::Decimal(b)) => decimal_div(&as_decimal(a), &b),
        (a, b) => Numeric::Rational(a.as_rational() / b.as_rational()),
    };
    result.into_value(arena)
}

fn decimal_div(a: &Decimal, b: &Decimal) -> Numeric {
    match decimal::div(a, b) {
        decimal::DivOutcome::Decimal(d) => Numeric::Decimal(d),
        decimal::DivOutcome::Rational(r) => Numeric::Rational(r),
        decimal::DivOutcome::DivisionByZero => unreachable!("caller already checked r.is_zero()"),
    }
}

/// `left % right`. Defined for Integer operands only; non-integer operands
/// or a zero divisor yield `Error`.
pub fn rem(arena: &mut Arena, left: Value, right: Value) -> Value {
    if left.is_error() || right.is_error() {
        return Value::ERROR;
    }
    let (Some(Numeric::Integer(a)), Some(Numeric::Integer(b))) =
        (coerce_numeric(arena, left), coerce_numeric(arena, right))
    else {
        return Value::ERROR;
    };
    if b.is_zero() {
        return Value::ERROR;
    }
    Numeric::Integer(a % b).into_value(arena)
}

/// `left ** right`. The exponent must be a non-negative Integer; the base
/// may be any numeric type and the result is the same variant as the base.
pub fn pow(arena: &mut Arena, left: Value, right: Value) -> Value {
    if left.is_error() || right.is_error() {
        return Value::ERROR;
    }
    let Some(base) = coerce_numeric(arena, left) else {
        return Value::ERROR;
    };
    let Some(Numeric::Integer(exponent)) = coerce_numeric(arena, right) else {
        return Value::ERROR;
    };
    if exponent.is_negative() {
        return Value::ERROR;
    }
    let Some(exponent) = num_traits::ToPrimitive::to_u64(&exponent) else {
        return Value::ERROR;
    };
    let result = match base {
        Numeric::Integer(b) => Numeric::Integer(num_traits::pow::pow(b, exponent as usize)),
        Numeric::Rational(b) => Numeric::Rational(num_traits::pow::pow(b, exponent as usize)),
        Numeric::Decimal(b) => {
            let mut acc = Decimal {
                unscaled: NumBigInt::from(1),
                scale: 0,
            };
            for _ in 0..exponent {
                acc = decimal::mul(&acc, &b);
            }
            Numeric::Decimal(acc)
        }
    };
    result.into_value(arena)
}

/// Numeric/object equality: numeric values compare by mathematical value
/// across variants; non-numeric heap values compare by object identity;
/// booleans/Error/Unused compare by the singleton itself.
///
/// Uses [`Numeric::from_value`], not [`coerce_numeric`]: the coercion rules
/// (String → codepoint length, Table → entry count, boolean → 0/1) are
/// "applied when mixing with a numeric operand" (spec.md §4.3), and neither
/// operand here is numeric just because the other happens to be a String or
/// Table of some length — two distinct equal-length strings must stay
/// unequal (object identity), not collapse to equal through their shared
/// coerced length.
pub fn eq(arena: &Arena, left: Value, right: Value) -> Value {
    if left.is_error() || right.is_error() {
        return Value::ERROR;
    }
    match (Numeric::from_value(arena, left), Numeric::from_value(arena, right)) {
        (Some(a), Some(b)) => Value::boolean(a.as_rational() == b.as_rational()),
        _ => Value::boolean(left == right),
    }
}

/// `left != right`.
pub fn neq(arena: &Arena, left: Value, right: Value) -> Value {
    match eq(arena, left, right) {
        v if v.is_error() => Value::ERROR,
        v => Value::boolean(!v.as_bool()),
    }
}

/// Ordering comparator shared by `<`, `<=`, `>`, `>=`. Non-numeric,
/// non-boolean operands yield `Error` (spec.md §4.3); a boolean operand
/// coerces to `0`/`1` (`True`→1, `False`→0), same as an arithmetic operand,
/// but String/Table do not — their length coercion is scoped to mixing with
/// an already-numeric operand, and neither side of an ordering comparison is
/// numeric just by virtue of the other being numeric.
fn ordering(arena: &Arena, left: Value, right: Value) -> Option<core::cmp::Ordering> {
    if left.is_error() || right.is_error() {
        return None;
    }
    let a = numeric_or_boolean(arena, left)?;
    let b = numeric_or_boolean(arena, right)?;
    Some(a.as_rational().cmp(&b.as_rational()))
}

fn numeric_or_boolean(arena: &Arena, v: Value) -> Option<Numeric> {
    if let Some(n) = Numeric::from_value(arena, v) {
        return Some(n);
    }
    if v.is_boolean() {
        return Some(Numeric::Integer(NumBigInt::from(v.as_bool() as i64)));
    }
    None
}

/// `left < right`.
pub fn lt(arena: &Arena, left: Value, right: Value) -> Value {
    match ordering(arena, left, right) {
        Some(core::cmp::Ordering::Less) => Value::TRUE,
        Some(_) => Value::FALSE,
        None => Value::ERROR,
    }
}

/// `left <= right`.
pub fn le(arena: &Arena, left: Value, right: Value) -> Value {
    match ordering(arena, left, right) {
        Some(core::cmp::Ordering::Greater) => Value::FALSE,
        Some(_) => Value::TRUE,
        None => Value::ERROR,
    }
}

/// `left > right`.
pub fn gt(arena: &Arena, left: Value, right: Value) -> Value {
    match ordering(arena, left, right) {
        Some(core::cmp::Ordering::Greater) => Value::TRUE,
        Some(_) => Value::FALSE,
        None => Value::ERROR,
    }
}

/// `left >= right`.
pub fn ge(arena: &Arena, left: Value, right: Value) -> Value {
    match ordering(arena, left, right) {
        Some(core::cmp::Ordering::Less) => Value::FALSE,
        Some(_) => Value::TRUE,
        None => Value::ERROR,
    }
}

/// `left ?? right`: the coalescing form. Consumes an `Error` left operand
/// and returns `right`; otherwise returns `left` unchanged. The one
/// exception to "if either operand is `Error`, the result is `Error`".
pub fn coalesce(left: Value, right: Value) -> Value {
    if left.is_error() {
        right
    } else {
        left
    }
}

/// `left ?: right`: returns `right` if `left` is "falsy" (empty
/// string/table, numeric zero, `False`, `Error`), else `left`.
pub fn falsy_coalesce(arena: &Arena, left: Value, right: Value) -> Value {
    if is_falsy(arena, left) {
        right
    } else {
        left
    }
}

fn is_falsy(arena: &Arena, v: Value) -> bool {
    if v.is_error() {
        return true;
    }
    if v.is_boolean() {
        return !v.as_bool();
    }
    if let Some(n) = Numeric::from_value(arena, v) {
        return n.is_zero();
    }
    match type_of(arena, v) {
        ValueType::String => {
            let address = crate::value::get_ptr(v).expect("string value must be a heap pointer");
            matches!(arena.get(address), Some(Object::String(s)) if s.codepoint_count() == 0)
        }
        ValueType::Table => {
            let address = crate::value::get_ptr(v).expect("table value must be a heap pointer");
            matches!(arena.get(address), Some(Object::Table(t)) if t.count() == 0)
        }
        _ => false,
    }
}

/// Coerce `v` to its entry count (Table) or codepoint length (String) for
/// `->` flow iteration bookkeeping; used by `scheduler`/`flow`.
pub fn entry_count(arena: &Arena, table: &Table) -> usize {
    let _ = arena;
    table.count()
}
