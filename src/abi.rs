//! The compiler ABI: the contract an OrgLang ahead-of-time compiler lowers
//! emitted target code into (spec.md §4.9/§6). Grounded on `fuel-vm`'s
//! `prelude` module -- a curated, stable re-export surface for downstream
//! consumers -- adapted here to a free-function surface since the
//! front-end/back-end split is out of scope (§1): emitted code is modeled
//! as calling these functions directly rather than through an FFI layer.

use alloc::vec::Vec;

use crate::arena::Arena;
use crate::closure::{Arity, Closure, ClosureFn};
use crate::config::RuntimeParams;
use crate::fault::Fault;
use crate::flow;
use crate::numeric::{decimal::Decimal, integer::BigInt as RtBigInt, rational::Rational, Numeric};
use crate::resource::ResourceDef;
use crate::scheduler::{Fiber, Scheduler};
use crate::sys;
use crate::table::Table;
use crate::value::{get_ptr, tag_ptr, Object, OrgString, Value};

// --- Value constructors ---------------------------------------------------

/// `integer-from-decimal-string`: optional sign, decimal digits.
pub fn integer_from_decimal_string(arena: &mut Arena, s: &str) -> Value {
    match RtBigInt::parse(s) {
        Some(b) => Numeric::Integer(b.0).into_value(arena),
        None => Value::ERROR,
    }
}

/// `rational-from-two-decimal-strings`: two `INT` literals, numerator then
/// denominator.
pub fn rational_from_two_decimal_strings(arena: &mut Arena, numerator: &str, denominator: &str) -> Value {
    match Rational::parse(numerator, denominator) {
        Some(r) => Numeric::Rational(r.0).into_value(arena),
        None => Value::ERROR,
    }
}

/// `decimal-from-decimal-string`, preserving the literal's scale.
pub fn decimal_from_decimal_string(arena: &mut Arena, s: &str) -> Value {
    match Decimal::parse(s) {
        Some(d) => Numeric::Decimal(d).into_value(arena),
        None => Value::ERROR,
    }
}

/// `string-from-bytes`: the runtime trusts well-formed UTF-8 at this
/// boundary (spec.md §6).
pub fn string_from_bytes(arena: &mut Arena, bytes: Vec<u8>) -> Value {
    tag_ptr(arena.alloc_object(Object::String(OrgString::from_bytes(bytes))))
}

/// `boolean`.
pub const fn boolean(b: bool) -> Value {
    Value::boolean(b)
}

/// `table-new`.
pub fn table_new(arena: &mut Arena) -> Value {
    tag_ptr(arena.alloc_object(Object::Table(Table::new())))
}

/// `closure-new`: function pointer plus captured environment.
pub fn closure_new(arena: &mut Arena, function: ClosureFn, env: Value, arity: Arity) -> Value {
    tag_ptr(arena.alloc_object(Object::Closure(Closure::new(function, env, arity))))
}

/// `resource-def`: inspect a Table literal (the `@:` syntax's operand),
/// extracting the well-known `create`/`next`/`destroy` keys. `Error` if
/// `table_value` isn't a Table, or its `next` key is missing or not a
/// `Closure`.
pub fn resource_def(arena: &mut Arena, table_value: Value) -> Value {
    let Some(table_address) = get_ptr(table_value) else {
        return Value::ERROR;
    };
    let Some(Object::Table(table)) = arena.get(table_address) else {
        return Value::ERROR;
    };
    match ResourceDef::from_table(arena, table) {
        Some(def) => tag_ptr(arena.alloc_object(Object::ResourceDef(def))),
        None => Value::ERROR,
    }
}

/// `resource-inst`: the `@Name` expression, given the already-resolved
/// `ResourceDef` value bound to `Name`. Invokes `create` (if present),
/// allocates the instance, and registers it with the current arena.
pub fn resource_inst(arena: &mut Arena, def_value: Value) -> Value {
    let Some(address) = get_ptr(def_value) else {
        return Value::ERROR;
    };
    let def = match arena.get(address) {
        Some(Object::ResourceDef(d)) => *d,
        _ => return Value::ERROR,
    };
    def.instantiate(arena)
}

// --- Operator dispatchers --------------------------------------------------
//
// One entry point per built-in binary/unary operator (spec.md §4.9), kept
// as direct re-exports of `ops`'s free functions -- there is no additional
// ABI-layer behavior to add on top of what `ops` already does.

pub use crate::ops::{add, coalesce, div, eq, falsy_coalesce, ge, gt, le, lt, mul, neg, neq, pow, rem, sub};

/// `->`.
pub fn flow_arrow(arena: &mut Arena, left: Value, right: Value) -> Value {
    flow::arrow(arena, left, right)
}

/// `-<`.
pub fn flow_balanced(arena: &mut Arena, left: Value, right: Value) -> Value {
    flow::balanced(arena, left, right)
}

/// `-<>`.
pub fn flow_sync_join(arena: &mut Arena, left: Value, right: Value) -> Value {
    flow::sync_join(arena, left, right)
}

// --- Scope access ----------------------------------------------------------

/// `table-get-by-name`: the hot path for lexical lookup. `scope_address`
/// must name a live Table object.
pub fn table_get_by_name(arena: &mut Arena, scope_address: u64, name: &str) -> Value {
    arena.with_table_mut(scope_address, |table, arena| table.get_cstr(arena, name))
}

/// `table-set-by-name`: the hot path for binding.
pub fn table_set_by_name(arena: &mut Arena, scope_address: u64, name: &str, value: Value) -> Value {
    let key = string_from_bytes(arena, name.as_bytes().to_vec());
    arena.with_table_mut(scope_address, |table, arena| table.set(arena, key, value))
}

// --- Scheduler --------------------------------------------------------------

/// `spawn`.
pub fn spawn(scheduler: &mut Scheduler, fiber: Fiber) {
    scheduler.spawn(fiber);
}

/// `run`: drain the ready queue until the program terminates.
pub fn run(scheduler: &mut Scheduler) {
    scheduler.run();
}

/// The bootstrap root fiber's continuation: `state` is a two-entry Table
/// holding `[main-closure-as-value, args-table]` (see [`org_init_program`]).
/// It invokes `main` with the `@args` table as its single (`right`)
/// operand, the seed the root fiber carries (spec.md §4.8 "the seed").
/// `main`'s result, if `Error`, is surfaced to stderr -- the top-level
/// propagation policy of spec.md §7.
fn run_main(arena: &mut Arena, _scheduler: &mut Scheduler, state: Value) -> Value {
    let Some(bootstrap_address) = get_ptr(state) else {
        return Value::ERROR;
    };
    let (closure_value, args_value) = match arena.get(bootstrap_address) {
        Some(Object::Table(t)) => (t.get_raw(arena, crate::value::tag_small(0)), t.get_raw(arena, crate::value::tag_small(1))),
        _ => return Value::ERROR,
    };
    let Some(closure_address) = get_ptr(closure_value) else {
        return Value::ERROR;
    };
    let closure = match arena.get(closure_address) {
        Some(Object::Closure(c)) => *c,
        _ => return Value::ERROR,
    };
    let result = closure.invoke(arena, Value::UNUSED, args_value);
    if result.is_error() {
        std::eprintln!("runtime: unhandled-error: main returned Error");
    }
    result
}

/// Program entry: `org_init_program` (spec.md §4.9). Builds the root scope
/// Table, binds the one hard-coded resource (`sys`), hands control to
/// `register_roots` -- standing in for what the (out-of-scope) compiler's
/// emitted entry point does: calling [`table_set_by_name`] for every
/// top-level binding, `main` included -- then resolves `main` and spawns it
/// as the root fiber, seeded with an implicit `@args` Table built from
/// `argv`.
///
/// Returns `Err(Fault::NoMain)` without spawning anything if `register_roots`
/// didn't bind a `main` Closure; the caller (the out-of-scope CLI driver)
/// is expected to print [`Fault::diagnostic_line`] to stderr and exit
/// non-zero, per spec.md §8 scenario 6.
pub fn org_init_program(
    scheduler: &mut Scheduler,
    params: RuntimeParams,
    register_roots: impl FnOnce(&mut Arena, u64),
    argv: &[&str],
) -> Result<(), Fault> {
    let mut arena = Arena::new(params.arena_page_size);
    let scope_address = arena.alloc_object(Object::Table(Table::new_sized(params.table_default_capacity)));

    let sys_def = tag_ptr(arena.alloc_object(Object::ResourceDef(sys::def())));
    table_set_by_name(&mut arena, scope_address, "sys", sys_def);

    register_roots(&mut arena, scope_address);

    let main = table_get_by_name(&mut arena, scope_address, "main");
    let Some(main_address) = get_ptr(main) else {
        return Err(Fault::NoMain);
    };
    let main_closure = match arena.get(main_address) {
        Some(Object::Closure(c)) => *c,
        _ => return Err(Fault::NoMain),
    };

    let mut args_table = Table::new_sized(argv.len());
    for arg in argv {
        let value = string_from_bytes(&mut arena, arg.as_bytes().to_vec());
        args_table.push(&mut arena, value);
    }
    let args_value = tag_ptr(arena.alloc_object(Object::Table(args_table)));

    let closure_value = tag_ptr(arena.alloc_object(Object::Closure(main_closure)));
    let mut bootstrap = Table::new_sized(2);
    bootstrap.push(&mut arena, closure_value);
    bootstrap.push(&mut arena, args_value);
    let bootstrap_value = tag_ptr(arena.alloc_object(Object::Table(bootstrap)));

    scheduler.spawn(Fiber::new(arena, run_main, bootstrap_value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tag_small;

    fn echo_args(arena: &mut Arena, _env: Value, _left: Value, args: Value) -> Value {
        let _ = arena;
        args
    }

    #[test]
    fn missing_main_is_a_fault_before_anything_spawns() {
        let mut scheduler = Scheduler::new();
        let result = org_init_program(&mut scheduler, RuntimeParams::default(), |_arena, _scope| {}, &[]);
        assert_eq!(result, Err(Fault::NoMain));
        assert_eq!(scheduler.ready_count(), 0);
    }

    #[test]
    fn no_main_diagnostic_matches_spec_wording() {
        assert_eq!(Fault::NoMain.diagnostic_line(), "runtime: no-main: main key not found");
    }

    #[test]
    fn main_is_invoked_with_the_args_seed() {
        let mut scheduler = Scheduler::new();
        let result = org_init_program(
            &mut scheduler,
            RuntimeParams::default(),
            |arena, scope_address| {
                let main = closure_new(arena, echo_args, Value::UNUSED, Arity::Unary);
                table_set_by_name(arena, scope_address, "main", main);
            },
            &["a", "b"],
        );
        assert!(result.is_ok());
        assert_eq!(scheduler.ready_count(), 1);
        scheduler.run();
        assert_eq!(scheduler.ready_count(), 0);
    }

    #[test]
    fn resource_def_requires_a_next_closure() {
        let mut arena = Arena::new(1024);
        let empty_table = table_new(&mut arena);
        assert!(resource_def(&mut arena, empty_table).is_error());
    }

    #[test]
    fn integer_literal_round_trips() {
        let mut arena = Arena::new(256);
        let v = integer_from_decimal_string(&mut arena, "42");
        assert_eq!(crate::value::untag_small(v), 42);
        assert!(integer_from_decimal_string(&mut arena, "4.2").is_error());
    }

    #[test]
    fn scope_set_then_get_round_trips() {
        let mut arena = Arena::new(1024);
        let scope = arena.alloc_object(Object::Table(Table::new()));
        table_set_by_name(&mut arena, scope, "answer", tag_small(42));
        assert_eq!(table_get_by_name(&mut arena, scope, "answer"), tag_small(42));
    }
}
