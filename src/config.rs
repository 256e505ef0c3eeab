//! Runtime configuration.
//!
//! A plain struct with a [`Default`] impl, constructed once by an embedder
//! (or by [`crate::abi::org_init_program`]) and threaded through explicitly,
//! the way `fuel-vm`'s `InterpreterParams` is built once and carried by the
//! `Interpreter` rather than read from a global.

use crate::consts::{ARENA_DEFAULT_PAGE_SIZE, TABLE_DEFAULT_CAPACITY};

/// Tunables for one runtime instance.
///
/// The table load factor is deliberately not configurable here: it is a
/// backing-storage implementation detail of [`crate::table::Table`]'s open
/// addressing, not a program-visible tunable, so it stays a plain constant
/// in `consts.rs` rather than a field every caller would have to thread
/// through for no behavioral difference they can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeParams {
    /// Default page size for arenas created by this runtime.
    pub arena_page_size: usize,
    /// Initial capacity hint for tables created without an explicit hint.
    pub table_default_capacity: usize,
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self {
            arena_page_size: ARENA_DEFAULT_PAGE_SIZE,
            table_default_capacity: TABLE_DEFAULT_CAPACITY,
        }
    }
}
