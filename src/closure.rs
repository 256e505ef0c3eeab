//! The captured-scope callable: every user-defined operator, thunk and
//! resource hook compiles down to one of these.
//!
//! A `Closure` pairs a function pointer (emitted by the compiler) with an
//! `env` Value — the lexical scope it closes over, itself a Table pointer.
//! The function pointer's signature is fixed and uniform across every
//! arity: `(arena, env, left, right) -> Value`, with `Unused` filling
//! whichever of `left`/`right` the call site's arity leaves unfilled.

use crate::arena::Arena;
use crate::value::Value;

/// The three call shapes a closure's underlying function can have. Encoded
/// explicitly (rather than inferred from which of `left`/`right` the
/// function reads) so `Table::force` can recognize a thunk — a closure of
/// `Arity::Nullary` — without invoking it speculatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Takes no operands; both `left` and `right` are `Unused`. A thunk is
    /// exactly a closure of this arity whose body reads neither.
    Nullary,
    /// Takes one operand, delivered as `right`; `left` is `Unused`.
    Unary,
    /// Takes two operands, `left` and `right`.
    Binary,
}

/// The function pointer shape every compiled operator body, thunk, and
/// resource hook implements.
pub type ClosureFn = fn(arena: &mut Arena, env: Value, left: Value, right: Value) -> Value;

/// A reference to target code plus a captured scope.
#[derive(Clone, Copy)]
pub struct Closure {
    function: ClosureFn,
    env: Value,
    arity: Arity,
}

impl core::fmt::Debug for Closure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Closure")
            .field("function", &(self.function as usize))
            .field("env", &self.env)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Closure {
    /// Build a closure from a compiler-emitted function pointer, its
    /// captured environment, and its declared arity.
    pub const fn new(function: ClosureFn, env: Value, arity: Arity) -> Self {
        Closure {
            function,
            env,
            arity,
        }
    }

    /// Is this closure a thunk (a zero-parameter deferred value, stored as
    /// a Table entry and forced on first access)?
    pub const fn is_thunk(&self) -> bool {
        matches!(self.arity, Arity::Nullary)
    }

    /// This closure's captured scope.
    pub const fn env(&self) -> Value {
        self.env
    }

    /// Invoke the closure. `left`/`right` are clamped to `Unused` where the
    /// closure's arity doesn't use them, so callers need not special-case
    /// arity themselves — calling a `Unary` closure with a `left` the body
    /// never reads is harmless.
    pub fn invoke(&self, arena: &mut Arena, left: Value, right: Value) -> Value {
        let (left, right) = match self.arity {
            Arity::Nullary => (Value::UNUSED, Value::UNUSED),
            Arity::Unary => (Value::UNUSED, right),
            Arity::Binary => (left, right),
        };
        (self.function)(arena, self.env, left, right)
    }

    /// Resolve `this` for a recursive call: calling a closure through its
    /// own `this` binding is an ordinary invocation, not a tail call.
    pub fn invoke_as_this(&self, arena: &mut Arena, left: Value, right: Value) -> Value {
        self.invoke(arena, left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn constant_fn(_arena: &mut Arena, _env: Value, _left: Value, _right: Value) -> Value {
        Value::TRUE
    }

    fn echo_right_fn(_arena: &mut Arena, _env: Value, _left: Value, right: Value) -> Value {
        right
    }

    #[test]
    fn nullary_closure_is_a_thunk() {
        let closure = Closure::new(constant_fn, Value::UNUSED, Arity::Nullary);
        assert!(closure.is_thunk());
        let mut arena = Arena::new(256);
        assert_eq!(closure.invoke(&mut arena, Value::TRUE, Value::FALSE), Value::TRUE);
    }

    #[test]
    fn unary_closure_ignores_left() {
        let closure = Closure::new(echo_right_fn, Value::UNUSED, Arity::Unary);
        assert!(!closure.is_thunk());
        let mut arena = Arena::new(256);
        let result = closure.invoke(&mut arena, Value::TRUE, Value::FALSE);
        assert_eq!(result, Value::FALSE);
    }

    #[test]
    fn binary_closure_sees_both_operands() {
        let closure = Closure::new(echo_right_fn, Value::UNUSED, Arity::Binary);
        let mut arena = Arena::new(256);
        let result = closure.invoke(&mut arena, Value::TRUE, Value::ERROR);
        assert!(result.is_error());
    }
}
