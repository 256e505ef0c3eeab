//! The three pull-based flow operators: `->`, `-<`, `-<>`.
//!
//! All three share one notion of a *source*: something that can be pulled
//! from one datum at a time. A Table or String source is bounded and known
//! up front; a Resource source is pulled via repeated `next(Unused)` calls
//! until it signals exhaustion by returning the `Error` singleton
//! (spec.md §9's resolved "source exhaustion signal" open question). A bare
//! scalar value is a one-shot source of itself.

use alloc::string::String as RustString;
use alloc::vec::Vec;

use crate::arena::Arena;
use crate::closure::Closure;
use crate::resource;
use crate::table::Table;
use crate::value::{get_ptr, tag_ptr, type_of, Object, OrgString, Value, ValueType};

enum Source {
    /// A Table's entries, keys snapshotted at open time (so a sink that
    /// mutates the same table mid-flow can't desync the iteration) and
    /// forced on each pull, per `table.rs`'s note that flow iteration, not
    /// plain reads, is what forces thunks.
    Table { address: u64, keys: Vec<Value>, index: usize },
    /// A String's codepoints, split up front into single-scalar Rust
    /// strings; each pull allocates a fresh one-codepoint `OrgString`.
    StringChars { chars: Vec<RustString>, index: usize },
    /// A live resource instance, pulled via repeated `next(Unused)` calls.
    Resource { address: u64 },
    /// A single scalar value, exhausted after one pull.
    Scalar(Option<Value>),
}

fn open_source(arena: &mut Arena, value: Value) -> Source {
    match type_of(arena, value) {
        ValueType::Table => {
            let address = get_ptr(value).expect("table value is a heap pointer");
            let keys = match arena.get(address) {
                Some(Object::Table(t)) => t.iter().map(|(k, _)| k).collect(),
                _ => Vec::new(),
            };
            Source::Table { address, keys, index: 0 }
        }
        ValueType::String => {
            let address = get_ptr(value).expect("string value is a heap pointer");
            let chars = match arena.get(address) {
                Some(Object::String(s)) => s.codepoints().collect(),
                _ => Vec::new(),
            };
            Source::StringChars { chars, index: 0 }
        }
        ValueType::ResourceDef => match instantiate_def(arena, value) {
            Some(address) => Source::Resource { address },
            None => Source::Scalar(None),
        },
        ValueType::ResourceInst => {
            let address = get_ptr(value).expect("resource-inst value is a heap pointer");
            Source::Resource { address }
        }
        _ => Source::Scalar(Some(value)),
    }
}

fn instantiate_def(arena: &mut Arena, def_value: Value) -> Option<u64> {
    let def_address = get_ptr(def_value)?;
    let def = match arena.get(def_address)? {
        Object::ResourceDef(d) => *d,
        _ => return None,
    };
    let instance = def.instantiate(arena);
    get_ptr(instance)
}

fn pull(arena: &mut Arena, source: &mut Source) -> Option<Value> {
    match source {
        Source::Table { address, keys, index } => {
            if *index >= keys.len() {
                return None;
            }
            let key = keys[*index];
            *index += 1;
            Some(arena.with_table_mut(*address, |table, arena| table.get(arena, key)))
        }
        Source::StringChars { chars, index } => {
            if *index >= chars.len() {
                return None;
            }
            let ch = chars[*index].clone();
            *index += 1;
            let address = arena.alloc_object(Object::String(OrgString::from_bytes(ch.into_bytes())));
            Some(tag_ptr(address))
        }
        Source::Resource { address } => {
            let result = resource::next(arena, *address, Value::UNUSED);
            if result.is_error() {
                None
            } else {
                Some(result)
            }
        }
        Source::Scalar(slot) => slot.take(),
    }
}

fn closure_of(arena: &Arena, v: Value) -> Option<Closure> {
    let address = get_ptr(v)?;
    match arena.get(address)? {
        Object::Closure(c) => Some(*c),
        _ => None,
    }
}

/// `left -> right`.
///
/// *Pure path*: `right` is a `Closure`. A scalar `left` is applied once,
/// synchronously. A Table/String `left` is mapped across: the closure runs
/// once per element and the results are collected into a fresh Table (see
/// DESIGN.md for why this is eager rather than genuinely lazy -- a `Closure`
/// is a bare function pointer, not a boxed continuation, so there is no
/// runtime representation for "a thunk over this specific pulled value"
/// without compiler-emitted code to build one).
///
/// *Sink path*: `right` is a Resource (definition or instance). A
/// `ResourceDef` is implicitly instantiated and registered with the current
/// arena (the "scoped middleware" pattern: its `destroy` runs when the
/// arena tears down, whether or not the program keeps a reference). Each
/// datum pulled from `left` is delivered via `next`; the sink's own
/// instance value is returned, so `->` chains compose (`a -> @Sink -> @Next`).
pub fn arrow(arena: &mut Arena, left: Value, right: Value) -> Value {
    match type_of(arena, right) {
        ValueType::Closure => apply_pure(arena, left, right),
        ValueType::ResourceDef | ValueType::ResourceInst => apply_sink(arena, left, right),
        _ => Value::ERROR,
    }
}

fn apply_pure(arena: &mut Arena, left: Value, right: Value) -> Value {
    let Some(closure) = closure_of(arena, right) else {
        return Value::ERROR;
    };
    if !matches!(type_of(arena, left), ValueType::Table | ValueType::String) {
        return closure.invoke(arena, Value::UNUSED, left);
    }
    let mut source = open_source(arena, left);
    let mut results = Table::new();
    while let Some(datum) = pull(arena, &mut source) {
        let mapped = closure.invoke(arena, Value::UNUSED, datum);
        results.push(arena, mapped);
    }
    tag_ptr(arena.alloc_object(Object::Table(results)))
}

fn apply_sink(arena: &mut Arena, left: Value, right: Value) -> Value {
    let address = match type_of(arena, right) {
        ValueType::ResourceInst => get_ptr(right).expect("resource-inst is a heap pointer"),
        ValueType::ResourceDef => match instantiate_def(arena, right) {
            Some(address) => address,
            None => return Value::ERROR,
        },
        _ => return Value::ERROR,
    };
    let mut source = open_source(arena, left);
    while let Some(datum) = pull(arena, &mut source) {
        resource::next(arena, address, datum);
    }
    tag_ptr(address)
}

/// `left -< right`: balanced dispatch. `right` must be a Table of sinks
/// (resources and/or closures); each datum pulled from `left` is delivered
/// to exactly one sink, chosen by round-robin over `right`. A single-sink
/// `right` degenerates to plain `->`.
pub fn balanced(arena: &mut Arena, left: Value, right: Value) -> Value {
    if !matches!(type_of(arena, right), ValueType::Table) {
        return Value::ERROR;
    }
    let Some(sinks_address) = get_ptr(right) else {
        return Value::ERROR;
    };
    let sink_values: Vec<Value> = match arena.get(sinks_address) {
        Some(Object::Table(t)) => t.iter().map(|(_, v)| v).collect(),
        _ => return Value::ERROR,
    };
    if sink_values.is_empty() {
        return Value::ERROR;
    }
    if sink_values.len() == 1 {
        return arrow(arena, left, sink_values[0]);
    }

    enum Target {
        Closure(Closure),
        Resource(u64),
    }

    let mut targets = Vec::with_capacity(sink_values.len());
    for sink in &sink_values {
        let target = match type_of(arena, *sink) {
            ValueType::Closure => match closure_of(arena, *sink) {
                Some(c) => Target::Closure(c),
                None => return Value::ERROR,
            },
            ValueType::ResourceInst => {
                Target::Resource(get_ptr(*sink).expect("resource-inst is a heap pointer"))
            }
            ValueType::ResourceDef => match instantiate_def(arena, *sink) {
                Some(address) => Target::Resource(address),
                None => return Value::ERROR,
            },
            _ => return Value::ERROR,
        };
        targets.push(target);
    }

    let mut source = open_source(arena, left);
    let mut next_target = 0usize;
    while let Some(datum) = pull(arena, &mut source) {
        match &targets[next_target] {
            Target::Closure(c) => {
                c.invoke(arena, Value::UNUSED, datum);
            }
            Target::Resource(address) => {
                resource::next(arena, *address, datum);
            }
        }
        next_target = (next_target + 1) % targets.len();
    }
    tag_ptr(sinks_address)
}

/// `left -<> right`: synchronized join. `left` must be a Table of sources.
/// Each round pulls one datum from every source and delivers the gathered
/// Table as a single pulse to `right`; a round where any source exhausts is
/// not delivered, and the join stops there.
///
/// `right` is resolved to a single target *once*, before the round loop --
/// not via a fresh `arrow` call per pulse, which would instantiate a
/// `ResourceDef` right operand anew every round and lose its accumulated
/// state between pulses. Every joined pulse this call produces reaches that
/// one target, mirroring `balanced`'s up-front sink resolution.
pub fn sync_join(arena: &mut Arena, left: Value, right: Value) -> Value {
    if !matches!(type_of(arena, left), ValueType::Table) {
        return Value::ERROR;
    }
    let Some(sources_address) = get_ptr(left) else {
        return Value::ERROR;
    };
    let source_values: Vec<Value> = match arena.get(sources_address) {
        Some(Object::Table(t)) => t.iter().map(|(_, v)| v).collect(),
        _ => return Value::ERROR,
    };
    if source_values.is_empty() {
        return Value::ERROR;
    }

    enum Target {
        Closure(Closure),
        Resource(u64),
    }

    let target = match type_of(arena, right) {
        ValueType::Closure => match closure_of(arena, right) {
            Some(c) => Target::Closure(c),
            None => return Value::ERROR,
        },
        ValueType::ResourceInst => {
            Target::Resource(get_ptr(right).expect("resource-inst is a heap pointer"))
        }
        ValueType::ResourceDef => match instantiate_def(arena, right) {
            Some(address) => Target::Resource(address),
            None => return Value::ERROR,
        },
        _ => return Value::ERROR,
    };

    let mut sources: Vec<Source> = source_values.into_iter().map(|v| open_source(arena, v)).collect();
    let mut last = Value::UNUSED;
    'rounds: loop {
        let mut pulse = Table::new_sized(sources.len());
        for source in sources.iter_mut() {
            match pull(arena, source) {
                Some(datum) => {
                    pulse.push(arena, datum);
                }
                None => break 'rounds,
            }
        }
        let pulse_value = tag_ptr(arena.alloc_object(Object::Table(pulse)));
        last = match &target {
            Target::Closure(c) => c.invoke(arena, Value::UNUSED, pulse_value),
            Target::Resource(address) => resource::next(arena, *address, pulse_value),
        };
    }
    last
}
