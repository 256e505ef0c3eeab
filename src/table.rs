//! The Table: the one compound data structure, a hybrid of auto-indexed
//! positional entries and explicit String/Integer keyed entries under one
//! identity.
//!
//! Open-addressed with linear probing and no tombstones (the core defines
//! no removal operation, so a tombstone scheme would be unused complexity)
//! rather than backed by `hashbrown::HashMap` directly: the hybrid contract
//! here — `push` claiming the next positional index, explicit keys
//! advancing that same counter, insertion-order iteration surviving a
//! resize — doesn't map onto `HashMap`'s entry API without fighting it, so
//! probing is hand-rolled in this module. `hashbrown` earns its keep
//! elsewhere, as the arena's own object side-table (see `arena.rs`).

use alloc::vec;
use alloc::vec::Vec;
use num_bigint::BigInt as NumBigInt;

use crate::arena::Arena;
use crate::consts::{TABLE_DEFAULT_CAPACITY, TABLE_MAX_LOAD_FACTOR_PERCENT};
use crate::numeric::Numeric;
use crate::value::{get_ptr, tag_small, type_of, untag_small, Object, Value, ValueType};

#[derive(Clone, Copy)]
struct Slot {
    key: Value,
    value: Value,
    hash: u64,
    occupied: bool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        key: Value::UNUSED,
        value: Value::UNUSED,
        hash: 0,
        occupied: false,
    };
}

/// FNV-1a: simple, dependency-free, good enough distribution for the small
/// tables this runtime's programs build.
struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> Self {
        FnvHasher(0xcbf2_9ce4_8422_2325)
    }
}

impl core::hash::Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= byte as u64;
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
}

/// The one compound data structure.
pub struct Table {
    slots: Vec<Slot>,
    order: Vec<usize>,
    count: usize,
    next_index: i64,
}

impl Table {
    /// An empty table at the default capacity.
    pub fn new() -> Self {
        Self::new_sized(TABLE_DEFAULT_CAPACITY)
    }

    /// An empty table sized to hold at least `hint` entries before its
    /// first resize (rounded up to a power of two, floored at the default
    /// capacity).
    pub fn new_sized(hint: usize) -> Self {
        let capacity = hint.max(TABLE_DEFAULT_CAPACITY).next_power_of_two();
        Table {
            slots: vec![Slot::EMPTY; capacity],
            order: Vec::new(),
            count: 0,
            next_index: 0,
        }
    }

    /// Number of entries currently stored.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Is `key` present? `False` on an inadmissible key type as well as on
    /// genuine absence — `has` never itself reports the type mismatch.
    pub fn has(&self, arena: &Arena, key: Value) -> bool {
        self.find_slot(arena, key).is_some()
    }

    /// Look up `key`, forcing a thunk value on first access and memoizing
    /// the forced result back into the slot. `Error` if `key` is absent or
    /// not an admissible key type.
    pub fn get(&mut self, arena: &mut Arena, key: Value) -> Value {
        match self.find_slot(arena, key) {
            Some(index) => self.force(arena, index),
            None => Value::ERROR,
        }
    }

    /// Convenience path for a plain Rust string key, hashing/comparing its
    /// bytes directly as a String key — the scope-lookup hot path.
    pub fn get_cstr(&mut self, arena: &mut Arena, key: &str) -> Value {
        match self.find_str_slot(arena, key) {
            Some(index) => self.force(arena, index),
            None => Value::ERROR,
        }
    }

    /// Look up `key` without forcing a thunk, returning whatever `Value`
    /// is actually stored (a `Closure` pointer included). Used where the
    /// stored value itself, not its forced result, is what's wanted — a
    /// `ResourceDef` literal's `create`/`next`/`destroy` keys name hooks to
    /// invoke later, not lazy data to evaluate on read (see
    /// `resource::ResourceDef::from_table`).
    pub fn get_raw(&self, arena: &Arena, key: Value) -> Value {
        match self.find_slot(arena, key) {
            Some(index) => self.slots[index].value,
            None => Value::ERROR,
        }
    }

    /// [`Table::get_raw`] via the plain-Rust-string hot path.
    pub fn get_cstr_raw(&self, arena: &Arena, key: &str) -> Value {
        match self.find_str_slot(arena, key) {
            Some(index) => self.slots[index].value,
            None => Value::ERROR,
        }
    }

    /// Insert or overwrite `key` → `value`. Returns `Error` on an
    /// inadmissible key type, else the value set.
    pub fn set(&mut self, arena: &mut Arena, key: Value, value: Value) -> Value {
        let Some(hash) = Self::hash_key(arena, key) else {
            return Value::ERROR;
        };
        self.maybe_grow(arena);
        let index = self.probe_for_key(arena, key, hash);
        if self.slots[index].occupied {
            self.slots[index].value = value;
        } else {
            self.slots[index] = Slot {
                key,
                value,
                hash,
                occupied: true,
            };
            self.order.push(index);
            self.count += 1;
            self.advance_next_index_past(arena, key);
        }
        value
    }

    /// Assign `value` to the key equal to the table's current `next_index`
    /// and advance it. Positional keys never collide with explicit keyed
    /// entries: every integer-keyed `set` also advances `next_index` past
    /// the key it used, keeping the positional prefix contiguous.
    pub fn push(&mut self, arena: &mut Arena, value: Value) -> Value {
        let key = tag_small(self.next_index);
        self.set(arena, key, value)
    }

    /// Iterate `(key, value)` pairs in insertion order without forcing
    /// thunks — used by flow iteration, which forces each datum itself as
    /// it's pulled.
    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.order.iter().map(move |&i| {
            let slot = &self.slots[i];
            (slot.key, slot.value)
        })
    }

    fn advance_next_index_past(&mut self, arena: &Arena, key: Value) {
        if !matches!(type_of(arena, key), ValueType::SmallInt | ValueType::BigInt) {
            return;
        }
        let Some(Numeric::Integer(i)) = Numeric::from_value(arena, key) else {
            return;
        };
        if i >= NumBigInt::from(self.next_index) {
            let successor = &i + 1;
            self.next_index = num_traits::ToPrimitive::to_i64(&successor).unwrap_or(i64::MAX);
        }
    }

    fn force(&mut self, arena: &mut Arena, index: usize) -> Value {
        let stored = self.slots[index].value;
        let Some(address) = get_ptr(stored) else {
            return stored;
        };
        let closure = match arena.get(address) {
            Some(Object::Closure(c)) if c.is_thunk() => *c,
            _ => return stored,
        };
        let forced = closure.invoke(arena, Value::UNUSED, Value::UNUSED);
        self.slots[index].value = forced;
        forced
    }

    fn find_slot(&self, arena: &Arena, key: Value) -> Option<usize> {
        let hash = Self::hash_key(arena, key)?;
        let mask = self.slots.len() - 1;
        let mut index = (hash as usize) & mask;
        for _ in 0..self.slots.len() {
            let slot = &self.slots[index];
            if !slot.occupied {
                return None;
            }
            if slot.hash == hash && Self::keys_equal(arena, slot.key, key) {
                return Some(index);
            }
            index = (index + 1) & mask;
        }
        None
    }

    fn find_str_slot(&self, arena: &Arena, key: &str) -> Option<usize> {
        let hash = Self::hash_bytes(key.as_bytes());
        let mask = self.slots.len() - 1;
        let mut index = (hash as usize) & mask;
        for _ in 0..self.slots.len() {
            let slot = &self.slots[index];
            if !slot.occupied {
                return None;
            }
            if slot.hash == hash {
                if let Some(address) = get_ptr(slot.key) {
                    if let Some(Object::String(s)) = arena.get(address) {
                        if s.as_str() == key {
                            return Some(index);
                        }
                    }
                }
            }
            index = (index + 1) & mask;
        }
        None
    }

    fn probe_for_key(&self, arena: &Arena, key: Value, hash: u64) -> usize {
        let mask = self.slots.len() - 1;
        let mut index = (hash as usize) & mask;
        loop {
            let slot = &self.slots[index];
            if !slot.occupied || (slot.hash == hash && Self::keys_equal(arena, slot.key, key)) {
                return index;
            }
            index = (index + 1) & mask;
        }
    }

    fn maybe_grow(&mut self, arena: &Arena) {
        let load_after_insert = (self.count + 1) * 100;
        if load_after_insert <= self.slots.len() * TABLE_MAX_LOAD_FACTOR_PERCENT {
            return;
        }
        let new_capacity = self.slots.len() * 2;
        let mut grown = Table {
            slots: vec![Slot::EMPTY; new_capacity],
            order: Vec::new(),
            count: 0,
            next_index: self.next_index,
        };
        for &index in &self.order {
            let slot = self.slots[index];
            if slot.occupied {
                let new_index = grown.probe_for_key(arena, slot.key, slot.hash);
                grown.slots[new_index] = slot;
                grown.order.push(new_index);
                grown.count += 1;
            }
        }
        *self = grown;
    }

    fn hash_key(arena: &Arena, key: Value) -> Option<u64> {
        match type_of(arena, key) {
            ValueType::SmallInt => Some(Self::hash_integer(&NumBigInt::from(untag_small(key)))),
            ValueType::BigInt => {
                let address = get_ptr(key)?;
                match arena.get(address)? {
                    Object::BigInt(b) => Some(Self::hash_integer(&b.0)),
                    _ => None,
                }
            }
            ValueType::String => {
                let address = get_ptr(key)?;
                match arena.get(address)? {
                    Object::String(s) => Some(Self::hash_bytes(s.as_str().as_bytes())),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn hash_integer(i: &NumBigInt) -> u64 {
        use core::hash::{Hash, Hasher};
        let mut hasher = FnvHasher::default();
        i.hash(&mut hasher);
        hasher.finish()
    }

    fn hash_bytes(bytes: &[u8]) -> u64 {
        use core::hash::Hasher;
        let mut hasher = FnvHasher::default();
        hasher.write(bytes);
        hasher.finish()
    }

    /// Two keys are equal if: both Integer (any mix of SmallInt/BigInt) and
    /// equal by value, or both String and equal by byte content. Any other
    /// pairing (including a type mismatch) is unequal.
    fn keys_equal(arena: &Arena, a: Value, b: Value) -> bool {
        match (type_of(arena, a), type_of(arena, b)) {
            (ValueType::SmallInt | ValueType::BigInt, ValueType::SmallInt | ValueType::BigInt) => {
                match (Numeric::from_value(arena, a), Numeric::from_value(arena, b)) {
                    (Some(Numeric::Integer(x)), Some(Numeric::Integer(y))) => x == y,
                    _ => false,
                }
            }
            (ValueType::String, ValueType::String) => {
                let (Some(ax), Some(bx)) = (get_ptr(a), get_ptr(b)) else {
                    return false;
                };
                matches!(
                    (arena.get(ax), arena.get(bx)),
                    (Some(Object::String(x)), Some(Object::String(y))) if x.as_str() == y.as_str()
                )
            }
            _ => false,
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table")
            .field("count", &self.count)
            .field("next_index", &self.next_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::{Arity, Closure};
    use crate::value::tag_ptr;

    fn thunk_fn(_arena: &mut Arena, _env: Value, _left: Value, _right: Value) -> Value {
        Value::TRUE
    }

    #[test]
    fn push_assigns_contiguous_positional_keys() {
        let mut arena = Arena::new(1024);
        let mut table = Table::new();
        table.push(&mut arena, tag_small(10));
        table.push(&mut arena, tag_small(20));
        table.push(&mut arena, tag_small(30));
        assert_eq!(table.count(), 3);
        assert_eq!(table.get(&mut arena, tag_small(0)), tag_small(10));
        assert_eq!(table.get(&mut arena, tag_small(1)), tag_small(20));
        assert_eq!(table.get(&mut arena, tag_small(2)), tag_small(30));
    }

    #[test]
    fn explicit_integer_key_advances_next_index() {
        let mut arena = Arena::new(1024);
        let mut table = Table::new();
        table.set(&mut arena, tag_small(5), tag_small(500));
        table.push(&mut arena, tag_small(999));
        assert_eq!(table.get(&mut arena, tag_small(6)), tag_small(999));
    }

    #[test]
    fn get_on_missing_key_is_error() {
        let mut arena = Arena::new(1024);
        let mut table = Table::new();
        assert!(table.get(&mut arena, tag_small(0)).is_error());
        assert!(!table.has(&arena, tag_small(0)));
    }

    #[test]
    fn invalid_key_type_is_error_not_panic() {
        let mut arena = Arena::new(1024);
        let mut table = Table::new();
        assert!(table.set(&mut arena, Value::TRUE, tag_small(1)).is_error());
        assert!(table.get(&mut arena, Value::TRUE).is_error());
    }

    #[test]
    fn resize_preserves_insertion_order() {
        let mut arena = Arena::new(4096);
        let mut table = Table::new_sized(2);
        for i in 0..20 {
            table.push(&mut arena, tag_small(i));
        }
        let observed: alloc::vec::Vec<i64> = table
            .iter()
            .map(|(_, v)| crate::value::untag_small(v))
            .collect();
        assert_eq!(observed, (0..20).collect::<alloc::vec::Vec<i64>>());
    }

    #[test]
    fn thunk_is_forced_once_and_memoized() {
        let mut arena = Arena::new(1024);
        let mut table = Table::new();
        let closure = Closure::new(thunk_fn, Value::UNUSED, Arity::Nullary);
        let address = arena.alloc_object(Object::Closure(closure));
        table.set(&mut arena, tag_small(0), tag_ptr(address));
        let forced = table.get(&mut arena, tag_small(0));
        assert_eq!(forced, Value::TRUE);
        // Memoized: the slot now holds the forced boolean directly, not a
        // pointer to the closure object.
        assert!(forced.is_boolean());
    }

    #[test]
    fn string_keys_compare_by_content() {
        let mut arena = Arena::new(1024);
        let mut table = Table::new();
        let key_a = tag_ptr(arena.alloc_object(Object::String(
            crate::value::OrgString::from_bytes(alloc::vec![b'h', b'i']),
        )));
        let key_b = tag_ptr(arena.alloc_object(Object::String(
            crate::value::OrgString::from_bytes(alloc::vec![b'h', b'i']),
        )));
        table.set(&mut arena, key_a, tag_small(42));
        assert_eq!(table.get(&mut arena, key_b), tag_small(42));
    }
}
