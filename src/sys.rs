//! The one primitive resource the runtime itself defines: `sys`
//! (spec.md §6). Every higher-level standard resource -- `stdout`,
//! `stderr`, `stdin` -- is defined by the compiler's emitted prelude in
//! terms of `sys`; this module knows nothing about those names.
//!
//! `next` is invoked with a Table whose first positional entry is a command
//! string: `"write"`, `"read"`, `"arena_create"`, `"arena_release"`.
//!
//! Because this crate `#![deny(unsafe_code)]`, `write`/`read` can only
//! reach file descriptors Rust's standard library already hands out a safe
//! handle for -- [`FD_STDIN`]/[`FD_STDOUT`]/[`FD_STDERR`]. Any other `fd`
//! yields `Error`: there is no safe stable-Rust way to wrap an arbitrary
//! raw descriptor without `std::os::fd::FromRawFd`, which is an `unsafe
//! fn`. Documented in DESIGN.md as a deliberate scope limit, not an
//! oversight.

use alloc::string::String as RustString;
use alloc::vec::Vec;
use std::io::{Read, Write};

use num_bigint::BigInt as NumBigInt;
use num_traits::ToPrimitive;

use crate::arena::Arena;
use crate::closure::{Arity, Closure};
use crate::numeric::{integer::integer_to_value, Numeric};
use crate::resource::{self, ResourceDef};
use crate::table::Table;
use crate::value::{get_ptr, tag_ptr, tag_small, Object, OrgString, Value};

/// File descriptor constant for standard input.
pub const FD_STDIN: i64 = 0;
/// File descriptor constant for standard output.
pub const FD_STDOUT: i64 = 1;
/// File descriptor constant for standard error.
pub const FD_STDERR: i64 = 2;

/// Build the `sys` `ResourceDef`. Constructed once by
/// [`crate::abi::org_init_program`] and bound under the name `sys` in the
/// root scope -- the runtime hard-codes only this one resource.
pub fn def() -> ResourceDef {
    ResourceDef::new(Closure::new(next, Value::UNUSED, Arity::Binary), None, None)
}

fn next(arena: &mut Arena, _env: Value, _state: Value, command: Value) -> Value {
    let Some(address) = get_ptr(command) else {
        return Value::ERROR;
    };
    let count = match arena.get(address) {
        Some(Object::Table(t)) => t.count(),
        _ => return Value::ERROR,
    };
    let entries: Vec<Value> = arena.with_table_mut(address, |table, arena| {
        (0..count).map(|i| table.get(arena, tag_small(i as i64))).collect()
    });
    let Some(op) = entries.first().and_then(|v| string_at(arena, *v)) else {
        return Value::ERROR;
    };
    match op.as_str() {
        "write" => do_write(arena, &entries),
        "read" => do_read(arena, &entries),
        "arena_create" => do_arena_create(arena),
        "arena_release" => do_arena_release(arena, &entries),
        _ => Value::ERROR,
    }
}

fn string_at(arena: &Arena, v: Value) -> Option<RustString> {
    let address = get_ptr(v)?;
    match arena.get(address)? {
        Object::String(s) => Some(s.as_str().into()),
        _ => None,
    }
}

fn integer_at(arena: &Arena, v: Value) -> Option<i64> {
    match Numeric::from_value(arena, v)? {
        Numeric::Integer(i) => i.to_i64(),
        _ => None,
    }
}

/// Serialize `data` to bytes for a `write` call: a String contributes its
/// UTF-8 bytes directly; a Table is treated as a table-of-codepoints (the
/// shape `->` pulsing over a String produces) and its forced entries'
/// string contents are concatenated.
fn serialize(arena: &mut Arena, data: Value) -> Option<Vec<u8>> {
    let address = get_ptr(data)?;
    match arena.get(address)? {
        Object::String(s) => Some(s.as_str().as_bytes().to_vec()),
        Object::Table(_) => {
            let count = match arena.get(address) {
                Some(Object::Table(t)) => t.count(),
                _ => return None,
            };
            let mut out = RustString::new();
            let forced: Vec<Value> =
                arena.with_table_mut(address, |table, arena| (0..count).map(|i| table.get(arena, tag_small(i as i64))).collect());
            for v in forced {
                out.push_str(&string_at(arena, v)?);
            }
            Some(out.into_bytes())
        }
        _ => None,
    }
}

fn do_write(arena: &mut Arena, entries: &[Value]) -> Value {
    let (Some(&fd_value), Some(&data_value)) = (entries.get(1), entries.get(2)) else {
        return Value::ERROR;
    };
    let Some(fd) = integer_at(arena, fd_value) else {
        return Value::ERROR;
    };
    let Some(bytes) = serialize(arena, data_value) else {
        return Value::ERROR;
    };
    let requested = entries.get(3).copied().and_then(|v| integer_at(arena, v));
    let n = match requested {
        Some(len) if len >= 0 => (len as usize).min(bytes.len()),
        _ => bytes.len(),
    };
    let slice = &bytes[..n];
    let written = match fd {
        FD_STDOUT => std::io::stdout().write_all(slice).map(|_| n),
        FD_STDERR => std::io::stderr().write_all(slice).map(|_| n),
        _ => return Value::ERROR,
    };
    match written {
        Ok(count) => tag_small(count as i64),
        Err(_) => Value::ERROR,
    }
}

fn do_read(arena: &mut Arena, entries: &[Value]) -> Value {
    let (Some(&fd_value), Some(&length_value)) = (entries.get(1), entries.get(3)) else {
        return Value::ERROR;
    };
    let Some(fd) = integer_at(arena, fd_value) else {
        return Value::ERROR;
    };
    let Some(length) = integer_at(arena, length_value) else {
        return Value::ERROR;
    };
    if fd != FD_STDIN || length < 0 {
        return Value::ERROR;
    }
    let mut buf = alloc::vec![0u8; length as usize];
    let n = match std::io::stdin().read(&mut buf) {
        Ok(n) => n,
        Err(_) => return Value::ERROR,
    };
    buf.truncate(n);

    if let Some(&dest) = entries.get(2) {
        if let Some(dest_address) = get_ptr(dest) {
            if matches!(arena.get(dest_address), Some(Object::Table(_))) {
                if let Ok(text) = RustString::from_utf8(buf) {
                    arena.with_table_mut(dest_address, |table, arena| {
                        for ch in text.chars() {
                            let mut one = [0u8; 4];
                            let bytes = ch.encode_utf8(&mut one).as_bytes().to_vec();
                            let address = arena.alloc_object(Object::String(OrgString::from_bytes(bytes)));
                            table.push(arena, tag_ptr(address));
                        }
                    });
                }
            }
        }
    }
    integer_to_value(arena, NumBigInt::from(n))
}

fn do_arena_create(arena: &mut Arena) -> Value {
    let handle = arena.create_child(crate::consts::ARENA_DEFAULT_PAGE_SIZE);
    tag_small(handle as i64)
}

fn do_arena_release(arena: &mut Arena, entries: &[Value]) -> Value {
    let Some(&handle_value) = entries.get(1) else {
        return Value::ERROR;
    };
    let Some(handle) = integer_at(arena, handle_value) else {
        return Value::ERROR;
    };
    if handle < 0 {
        return Value::ERROR;
    }
    Value::boolean(arena.release_child(handle as usize, resource::teardown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tag_ptr;

    fn command(arena: &mut Arena, parts: &[Value]) -> Value {
        let mut table = Table::new();
        for &p in parts {
            table.push(arena, p);
        }
        tag_ptr(arena.alloc_object(Object::Table(table)))
    }

    fn string_val(arena: &mut Arena, s: &str) -> Value {
        tag_ptr(arena.alloc_object(Object::String(OrgString::from_bytes(s.as_bytes().to_vec()))))
    }

    #[test]
    fn write_to_stdout_reports_byte_count() {
        let mut arena = Arena::new(1024);
        let instance = def().instantiate(&mut arena);
        let address = get_ptr(instance).unwrap();
        let op = string_val(&mut arena, "write");
        let data = string_val(&mut arena, "hi");
        let cmd = command(&mut arena, &[op, tag_small(FD_STDOUT), data, tag_small(-1)]);
        let result = resource::next(&mut arena, address, cmd);
        assert_eq!(crate::value::untag_small(result), 2);
    }

    #[test]
    fn write_to_unsupported_fd_is_error() {
        let mut arena = Arena::new(1024);
        let instance = def().instantiate(&mut arena);
        let address = get_ptr(instance).unwrap();
        let op = string_val(&mut arena, "write");
        let data = string_val(&mut arena, "hi");
        let cmd = command(&mut arena, &[op, tag_small(99), data, tag_small(-1)]);
        let result = resource::next(&mut arena, address, cmd);
        assert!(result.is_error());
    }

    #[test]
    fn unrecognized_command_is_error() {
        let mut arena = Arena::new(1024);
        let instance = def().instantiate(&mut arena);
        let address = get_ptr(instance).unwrap();
        let op = string_val(&mut arena, "frobnicate");
        let cmd = command(&mut arena, &[op]);
        let result = resource::next(&mut arena, address, cmd);
        assert!(result.is_error());
    }

    #[test]
    fn arena_create_then_release_round_trips() {
        let mut arena = Arena::new(1024);
        let instance = def().instantiate(&mut arena);
        let address = get_ptr(instance).unwrap();

        let op_create = string_val(&mut arena, "arena_create");
        let cmd_create = command(&mut arena, &[op_create]);
        let handle = resource::next(&mut arena, address, cmd_create);
        assert!(handle.is_small_int());

        let op_release = string_val(&mut arena, "arena_release");
        let cmd_release = command(&mut arena, &[op_release, handle]);
        let result = resource::next(&mut arena, address, cmd_release);
        assert_eq!(result, Value::TRUE);

        // Releasing the same handle twice fails the second time.
        let cmd_release_again = command(&mut arena, &[op_release, handle]);
        let result_again = resource::next(&mut arena, address, cmd_release_again);
        assert_eq!(result_again, Value::FALSE);
    }
}
