//! Tagged 64-bit value representation.
//!
//! A [`Value`] is one machine word whose low two bits discriminate its
//! category: `00` heap pointer, `01` small integer, `10` a singleton
//! (`True`/`False`/`Error`/`Unused`), `11` reserved. This mirrors the
//! bit-packed encodings `fuel-asm`'s instruction words use (a handful of
//! low/high bit fields, `const fn` accessors, no heap allocation for the
//! common case).

use crate::arena::Arena;
use crate::closure::Closure;
use crate::consts::{SMALL_INT_MAX, SMALL_INT_MIN, TAG_MASK};
use crate::numeric::{decimal::Decimal, integer::BigInt, rational::Rational};
use crate::resource::{ResourceDef, ResourceInst};
use crate::table::Table;
use alloc::string::ToString;

const TAG_PTR: u64 = 0b00;
const TAG_SMALL: u64 = 0b01;
const TAG_SPECIAL: u64 = 0b10;

const SPECIAL_FALSE: u64 = 0;
const SPECIAL_TRUE: u64 = 1;
const SPECIAL_ERROR: u64 = 2;
const SPECIAL_UNUSED: u64 = 3;

/// A tagged value word: the universal currency of OrgLang computation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value(u64);

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 & TAG_MASK {
            TAG_PTR => write!(f, "Value::HeapPointer({:#x})", self.0),
            TAG_SMALL => write!(f, "Value::SmallInt({})", untag_small(*self)),
            TAG_SPECIAL => match self.0 >> 2 {
                SPECIAL_FALSE => write!(f, "Value::False"),
                SPECIAL_TRUE => write!(f, "Value::True"),
                SPECIAL_ERROR => write!(f, "Value::Error"),
                SPECIAL_UNUSED => write!(f, "Value::Unused"),
                other => write!(f, "Value::ReservedSpecial({other})"),
            },
            _ => write!(f, "Value::Reserved({:#x})", self.0),
        }
    }
}

/// Can `i` be represented as a `SmallInt` without promotion to `BigInt`?
pub const fn small_fits(i: i64) -> bool {
    i >= SMALL_INT_MIN && i <= SMALL_INT_MAX
}

/// Tag a small integer. Panics (in debug builds) if `!small_fits(i)`; call
/// sites are expected to check `small_fits` first and promote to `BigInt`
/// otherwise.
pub const fn tag_small(i: i64) -> Value {
    debug_assert!(small_fits(i));
    Value(((i << 2) as u64) | TAG_SMALL)
}

/// Recover the payload of a `SmallInt` value. Undefined result if `v` is not
/// a `SmallInt` (callers must check `type_of` first).
pub const fn untag_small(v: Value) -> i64 {
    (v.0 as i64) >> 2
}

/// Tag a heap address (as returned by [`Arena::alloc_object`]) as a `Value`.
pub const fn tag_ptr(address: u64) -> Value {
    debug_assert!(address & TAG_MASK == 0);
    Value(address)
}

/// Recover the heap address of a pointer-tagged value, or `None` if `v` is
/// not a heap pointer.
pub const fn get_ptr(v: Value) -> Option<u64> {
    if v.0 & TAG_MASK == TAG_PTR {
        Some(v.0)
    } else {
        None
    }
}

impl Value {
    /// The `True` singleton.
    pub const TRUE: Value = Value((SPECIAL_TRUE << 2) | TAG_SPECIAL);
    /// The `False` singleton.
    pub const FALSE: Value = Value((SPECIAL_FALSE << 2) | TAG_SPECIAL);
    /// The `Error` singleton.
    pub const ERROR: Value = Value((SPECIAL_ERROR << 2) | TAG_SPECIAL);
    /// The `Unused` singleton ("no operand supplied").
    pub const UNUSED: Value = Value((SPECIAL_UNUSED << 2) | TAG_SPECIAL);

    /// Build a boolean value from a Rust `bool`.
    pub const fn boolean(b: bool) -> Value {
        if b {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }

    /// Build a `SmallInt`, or `None` if `i` doesn't fit (caller should
    /// promote to `BigInt` in that case).
    pub const fn small_int(i: i64) -> Option<Value> {
        if small_fits(i) {
            Some(tag_small(i))
        } else {
            None
        }
    }

    /// Is this the `Error` singleton?
    pub const fn is_error(&self) -> bool {
        self.0 == Value::ERROR.0
    }

    /// Is this the `Unused` singleton?
    pub const fn is_unused(&self) -> bool {
        self.0 == Value::UNUSED.0
    }

    /// Is this `True` or `False`?
    pub const fn is_boolean(&self) -> bool {
        self.0 == Value::TRUE.0 || self.0 == Value::FALSE.0
    }

    /// Is this a `SmallInt`?
    pub const fn is_small_int(&self) -> bool {
        self.0 & TAG_MASK == TAG_SMALL
    }

    /// Is this a heap pointer?
    pub const fn is_heap_pointer(&self) -> bool {
        self.0 & TAG_MASK == TAG_PTR
    }

    /// Raw bit pattern, for diagnostics and identity hashing.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// `True`/`False` as a native `bool`. Panics if not a boolean.
    pub fn as_bool(&self) -> bool {
        debug_assert!(self.is_boolean());
        self.0 == Value::TRUE.0
    }
}

/// The kinds a [`Value`] can carry, including the heap `Object` variants —
/// the full enumeration `type_of` can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Inline signed integer.
    SmallInt,
    /// `True` or `False`.
    Boolean,
    /// The `Error` singleton.
    Error,
    /// The `Unused` singleton.
    Unused,
    /// Arbitrary-precision integer.
    BigInt,
    /// Arbitrary-precision rational.
    Rational,
    /// Exact base-ten rational with a preserved display scale.
    Decimal,
    /// Immutable UTF-8 string.
    String,
    /// The one compound data structure.
    Table,
    /// A captured-scope callable.
    Closure,
    /// A resource blueprint.
    ResourceDef,
    /// A live resource instance.
    ResourceInst,
}

impl ValueType {
    /// Diagnostic name, used in error messages and trace logging.
    pub const fn type_name(&self) -> &'static str {
        match self {
            ValueType::SmallInt => "integer",
            ValueType::Boolean => "boolean",
            ValueType::Error => "error",
            ValueType::Unused => "unused",
            ValueType::BigInt => "integer",
            ValueType::Rational => "rational",
            ValueType::Decimal => "decimal",
            ValueType::String => "string",
            ValueType::Table => "table",
            ValueType::Closure => "closure",
            ValueType::ResourceDef => "resource-definition",
            ValueType::ResourceInst => "resource",
        }
    }

    /// Is this one of the three numeric representations (or a `SmallInt`)?
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::SmallInt | ValueType::BigInt | ValueType::Rational | ValueType::Decimal
        )
    }
}

/// Determine a value's type. Heap pointers require looking up the
/// referenced [`Object`]'s kind in `arena` — conceptually the same cost as
/// dereferencing a real pointer's header.
pub fn type_of(arena: &Arena, v: Value) -> ValueType {
    match v.0 & TAG_MASK {
        TAG_SMALL => ValueType::SmallInt,
        TAG_SPECIAL => match v.0 >> 2 {
            SPECIAL_TRUE | SPECIAL_FALSE => ValueType::Boolean,
            SPECIAL_ERROR => ValueType::Error,
            SPECIAL_UNUSED => ValueType::Unused,
            other => unreachable!("reserved special pattern {other}"),
        },
        TAG_PTR => {
            let object = arena
                .get(v.0)
                .expect("dangling heap pointer: value outlived its arena");
            object.kind()
        }
        _ => unreachable!("reserved tag pattern"),
    }
}

/// Diagnostic name for a value.
pub fn type_name(arena: &Arena, v: Value) -> &'static str {
    type_of(arena, v).type_name()
}

/// Arena-allocated object header + payload. Implemented as a Rust enum
/// rather than a manual byte header/payload pair: see `arena.rs`'s module
/// doc for why this stays within `#![deny(unsafe_code)]` while preserving
/// the alignment/zero-tag invariants a real heap pointer would need.
#[derive(Debug)]
pub enum Object {
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    /// Arbitrary-precision rational in canonical form.
    Rational(Rational),
    /// Exact base-ten rational with a preserved scale.
    Decimal(Decimal),
    /// Immutable UTF-8 string with a cached codepoint count.
    String(OrgString),
    /// The one compound data structure.
    Table(Table),
    /// A captured-scope callable.
    Closure(Closure),
    /// A resource blueprint.
    ResourceDef(ResourceDef),
    /// A live resource instance.
    ResourceInst(ResourceInst),
}

impl Object {
    /// This object's [`ValueType`].
    pub const fn kind(&self) -> ValueType {
        match self {
            Object::BigInt(_) => ValueType::BigInt,
            Object::Rational(_) => ValueType::Rational,
            Object::Decimal(_) => ValueType::Decimal,
            Object::String(_) => ValueType::String,
            Object::Table(_) => ValueType::Table,
            Object::Closure(_) => ValueType::Closure,
            Object::ResourceDef(_) => ValueType::ResourceDef,
            Object::ResourceInst(_) => ValueType::ResourceInst,
        }
    }
}

/// Immutable UTF-8 string with a cached Unicode scalar value count: an
/// OrgLang string is a sequence of Unicode scalar values, not bytes and not
/// grapheme clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgString {
    bytes: alloc::string::String,
    codepoint_count: usize,
}

impl OrgString {
    /// Build a string from UTF-8 bytes, trusting well-formedness at the ABI
    /// boundary.
    pub fn from_bytes(bytes: alloc::vec::Vec<u8>) -> Self {
        let bytes = alloc::string::String::from_utf8(bytes)
            .expect("ABI contract: all strings crossing the boundary are well-formed UTF-8");
        let codepoint_count = bytes.chars().count();
        Self {
            bytes,
            codepoint_count,
        }
    }

    /// Number of Unicode scalar values (not bytes, not grapheme clusters).
    pub const fn codepoint_count(&self) -> usize {
        self.codepoint_count
    }

    /// The underlying UTF-8 bytes.
    pub fn as_str(&self) -> &str {
        &self.bytes
    }

    /// Iterate codepoints in order, as owned single-scalar strings — the
    /// unit a `->` flow pulses over a bare string source.
    pub fn codepoints(&self) -> impl Iterator<Item = alloc::string::String> + '_ {
        self.bytes.chars().map(|c| c.to_string())
    }
}
