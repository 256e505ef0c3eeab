//! OrgLang runtime core.
//!
//! This crate is the subsystem an OrgLang ahead-of-time compiler lowers
//! programs into: a chained-page arena allocator, a tagged value
//! representation, an arbitrary-precision numeric tower, the one compound
//! data structure (the Table), closures, lifecycle-managed resources, and
//! the cooperative fiber scheduler that drives `->`, `-<` and `-<>` flows.
//!
//! The source-to-IR compiler front end, the CLI driver, build orchestration
//! and module resolution are external collaborators; this crate only
//! defines their interface to the runtime (see [`abi`]).
#![deny(unsafe_code)]
#![warn(missing_docs)]

// This runtime does not advertise `no_std`: the scheduler's current-arena
// handoff uses `std::thread_local!`, and the `sys` primitive resource talks
// to real file descriptors via `std::io`. `alloc` is still named explicitly
// (rather than relying on the std prelude's `Vec`/`String`) to keep the
// arena/value/table modules' provenance honest about what's heap-allocated.
#[doc(hidden)]
pub extern crate alloc;

pub mod abi;
pub mod arena;
pub mod closure;
pub mod config;
pub mod consts;
pub mod fault;
pub mod flow;
pub mod numeric;
pub mod ops;
pub mod resource;
pub mod scheduler;
pub mod sys;
pub mod table;
pub mod value;

pub mod prelude {
    //! A curated re-export surface for generated (compiler-emitted) code and
    //! for embedders driving the runtime directly.

    pub use crate::abi;
    pub use crate::arena::{Arena, Checkpoint};
    pub use crate::closure::Closure;
    pub use crate::config::RuntimeParams;
    pub use crate::fault::Fault;
    pub use crate::resource::{ResourceDef, ResourceInst};
    pub use crate::scheduler::{Fiber, Scheduler};
    pub use crate::table::Table;
    pub use crate::value::{Value, ValueType};
}
