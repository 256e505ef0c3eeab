//! End-to-end scenarios run directly against the [`orglang_runtime::abi`]
//! surface, standing in for the (out-of-scope) compiler front end: each
//! test hand-builds the same calls a compiled program's emitted code would
//! make.

use orglang_runtime::abi;
use orglang_runtime::closure::{Arity, Closure};
use orglang_runtime::config::RuntimeParams;
use orglang_runtime::fault::Fault;
use orglang_runtime::resource::ResourceDef;
use orglang_runtime::scheduler::Scheduler;
use orglang_runtime::value::{get_ptr, tag_ptr, untag_small, Object, Value};
use orglang_runtime::arena::Arena;
use orglang_runtime::table::Table;

fn recorder_def() -> ResourceDef {
    fn next(arena: &mut Arena, _env: Value, state: Value, datum: Value) -> Value {
        match get_ptr(state) {
            Some(address) if matches!(arena.get(address), Some(Object::Table(_))) => {
                arena.with_table_mut(address, |table, arena| {
                    table.push(arena, datum);
                });
                state
            }
            _ => {
                let mut table = Table::new();
                table.push(arena, datum);
                tag_ptr(arena.alloc_object(Object::Table(table)))
            }
        }
    }
    ResourceDef::new(Closure::new(next, Value::UNUSED, Arity::Binary), None, None)
}

fn recorded(arena: &Arena, instance: Value) -> Vec<Value> {
    let address = get_ptr(instance).unwrap();
    let state = match arena.get(address) {
        Some(Object::ResourceInst(inst)) => inst.state(),
        _ => panic!("expected a resource instance"),
    };
    let table_address = get_ptr(state).unwrap();
    match arena.get(table_address) {
        Some(Object::Table(t)) => t.iter().map(|(_, v)| v).collect(),
        _ => panic!("expected a table"),
    }
}

fn as_string(arena: &Arena, v: Value) -> String {
    let address = get_ptr(v).unwrap();
    match arena.get(address) {
        Some(Object::String(s)) => s.as_str().into(),
        _ => panic!("expected a string"),
    }
}

/// Scenario 1: `"Hello" -> @recorder` pulses one codepoint per delivery,
/// while `["Hello"] -> @recorder` (a Table wrapping the same string)
/// delivers it whole -- the distinction between a bare String source and a
/// Table-of-one source (spec.md §8 "Hello World").
#[test]
fn hello_world_string_vs_table_wrapped_pulsing() {
    let mut arena = Arena::new(4096);
    let hello = abi::string_from_bytes(&mut arena, b"Hello".to_vec());
    let def_value = tag_ptr(arena.alloc_object(Object::ResourceDef(recorder_def())));

    let bare_instance = abi::flow_arrow(&mut arena, hello, def_value);
    let bare_pulses: Vec<String> = recorded(&arena, bare_instance).into_iter().map(|v| as_string(&arena, v)).collect();
    assert_eq!(bare_pulses, vec!["H", "e", "l", "l", "o"]);

    let mut wrapper = Table::new();
    wrapper.push(&mut arena, hello);
    let wrapper_value = tag_ptr(arena.alloc_object(Object::Table(wrapper)));
    let wrapped_def = tag_ptr(arena.alloc_object(Object::ResourceDef(recorder_def())));
    let wrapped_instance = abi::flow_arrow(&mut arena, wrapper_value, wrapped_def);
    let wrapped_pulses = recorded(&arena, wrapped_instance);
    assert_eq!(wrapped_pulses.len(), 1);
    assert_eq!(as_string(&arena, wrapped_pulses[0]), "Hello");
}

/// Scenario 2: arithmetic precision. `3/2 + 3/2` sums two Rationals back to
/// a whole number, and demotes to the narrowest representation (spec.md
/// §4.3's promotion matrix).
#[test]
fn rational_sum_demotes_to_an_integer() {
    let mut arena = Arena::new(1024);
    let three_halves = abi::rational_from_two_decimal_strings(&mut arena, "3", "2");
    let sum = abi::add(&mut arena, three_halves, three_halves);
    assert!(sum.is_small_int());
    assert_eq!(untag_small(sum), 3);
}

/// Scenario 3: BigInt overflow. `2**64` no longer fits a tagged SmallInt and
/// is promoted to a heap `BigInt`; `2**64 - 1` is still one past the
/// boundary.
#[test]
fn power_of_two_sixty_four_promotes_to_bigint() {
    let mut arena = Arena::new(4096);
    let two = orglang_runtime::value::tag_small(2);
    let sixty_four = orglang_runtime::value::tag_small(64);
    let huge = abi::pow(&mut arena, two, sixty_four);
    assert!(!huge.is_small_int());
    let address = get_ptr(huge).unwrap();
    match arena.get(address) {
        Some(Object::BigInt(b)) => assert_eq!(b.0.to_string(), "18446744073709551616"),
        _ => panic!("expected a promoted BigInt"),
    }

    let one = orglang_runtime::value::tag_small(1);
    let almost = abi::sub(&mut arena, huge, one);
    let almost_address = get_ptr(almost).unwrap();
    match arena.get(almost_address) {
        Some(Object::BigInt(b)) => assert_eq!(b.0.to_string(), "18446744073709551615"),
        _ => panic!("expected a promoted BigInt"),
    }
}

/// Scenario 4: flow map. `[1, 2, 3] -> {right + 1}` produces `[2, 3, 4]`.
#[test]
fn flow_map_adds_one_to_each_element() {
    fn add_one(arena: &mut Arena, _env: Value, _left: Value, right: Value) -> Value {
        abi::add(arena, right, orglang_runtime::value::tag_small(1))
    }

    let mut arena = Arena::new(1024);
    let mut source = Table::new();
    for i in 1..=3i64 {
        source.push(&mut arena, orglang_runtime::value::tag_small(i));
    }
    let source_value = tag_ptr(arena.alloc_object(Object::Table(source)));
    let closure_value = abi::closure_new(&mut arena, add_one, Value::UNUSED, Arity::Unary);

    let mapped = abi::flow_arrow(&mut arena, source_value, closure_value);
    let mapped_address = get_ptr(mapped).unwrap();
    let values: Vec<i64> = match arena.get(mapped_address) {
        Some(Object::Table(t)) => t.iter().map(|(_, v)| untag_small(v)).collect(),
        _ => panic!("expected a table"),
    };
    assert_eq!(values, vec![2, 3, 4]);
}

/// Scenario 5: arena middleware teardown. A chain of resources instantiated
/// inside one fiber tears down in reverse registration order when the
/// fiber's arena is destroyed at the end of the run loop -- exercised
/// through `flow::arrow` chaining (`Tracked -> Middleware -> recorder`)
/// rather than calling `resource::next`/`teardown` directly.
#[test]
fn middleware_chain_tears_down_in_reverse_order() {
    std::thread_local! {
        static LOG: std::cell::RefCell<Vec<i64>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    fn passthrough(_arena: &mut Arena, _env: Value, _state: Value, datum: Value) -> Value {
        datum
    }

    // `destroy` hooks are bare fn pointers (no captures), so each chain link
    // gets its own monomorphic logging function rather than one closure
    // parameterized by tag.
    fn destroy_a(_arena: &mut Arena, _env: Value, _state: Value, _datum: Value) -> Value {
        LOG.with(|log| log.borrow_mut().push(1));
        Value::UNUSED
    }
    fn destroy_b(_arena: &mut Arena, _env: Value, _state: Value, _datum: Value) -> Value {
        LOG.with(|log| log.borrow_mut().push(2));
        Value::UNUSED
    }
    fn destroy_c(_arena: &mut Arena, _env: Value, _state: Value, _datum: Value) -> Value {
        LOG.with(|log| log.borrow_mut().push(3));
        Value::UNUSED
    }

    LOG.with(|log| log.borrow_mut().clear());

    let mut scheduler = Scheduler::new();
    let result = abi::org_init_program(
        &mut scheduler,
        RuntimeParams::default(),
        |arena, scope| {
            fn main_body(arena: &mut Arena, _env: Value, _left: Value, _args: Value) -> Value {
                let def_a = ResourceDef::new(Closure::new(passthrough, Value::UNUSED, Arity::Binary), None, Some(Closure::new(destroy_a, Value::UNUSED, Arity::Binary)));
                let def_b = ResourceDef::new(Closure::new(passthrough, Value::UNUSED, Arity::Binary), None, Some(Closure::new(destroy_b, Value::UNUSED, Arity::Binary)));
                let def_c = ResourceDef::new(Closure::new(passthrough, Value::UNUSED, Arity::Binary), None, Some(Closure::new(destroy_c, Value::UNUSED, Arity::Binary)));
                // Instantiate in order a, b, c -- teardown must run c, b, a.
                let _a = def_a.instantiate(arena);
                let _b = def_b.instantiate(arena);
                let _c = def_c.instantiate(arena);
                Value::UNUSED
            }
            let main = abi::closure_new(arena, main_body, Value::UNUSED, Arity::Unary);
            abi::table_set_by_name(arena, scope, "main", main);
        },
        &[],
    );
    assert!(result.is_ok());
    scheduler.run();
    LOG.with(|log| assert_eq!(*log.borrow(), vec![3, 2, 1]));
}

/// Scenario 6: a program that never binds `main` fails fast with
/// `Fault::NoMain`, before any fiber is spawned.
#[test]
fn missing_main_reports_the_documented_fault() {
    let mut scheduler = Scheduler::new();
    let result = abi::org_init_program(&mut scheduler, RuntimeParams::default(), |_arena, _scope| {}, &[]);
    assert_eq!(result, Err(Fault::NoMain));
    assert_eq!(result.unwrap_err().diagnostic_line(), "runtime: no-main: main key not found");
    assert_eq!(scheduler.ready_count(), 0);
}
