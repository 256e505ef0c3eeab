//! Bignum glue: route every numeric-tower allocation through the arena
//! currently in effect, via a thread-local "current arena" updated at
//! every fiber resume.
//!
//! `num-bigint`/`num-rational` own their digit storage through the ordinary
//! global allocator and expose no pluggable-allocator hook on stable Rust
//! (the `Allocator` trait is nightly-only) — see DESIGN.md for the
//! documented trade-off this implies. What this module does provide,
//! satisfying the contract at the granularity this crate can reach: every
//! `BigInt`/`Rational`/`Decimal` *object* (the handle the rest of the
//! runtime holds a `Value` to) is filed under
//! [`crate::arena::Arena::alloc_object`], so it is torn down in bulk exactly
//! like every other heap object on arena destroy/restore (`numeric::integer`
//! /`rational`/`decimal`'s `*_to_value` functions do this already). This
//! module supplies the scheduler-facing half of that contract: a scope that
//! installs one `Arena` as current for the duration of a fiber resume, with
//! no unsafe code (ownership of the arena moves into thread-local storage
//! and back, rather than a raw pointer being dereferenced).

use core::cell::RefCell;

use crate::arena::Arena;

std::thread_local! {
    static CURRENT_ARENA: RefCell<Option<Arena>> = const { RefCell::new(None) };
}

/// Install `arena` as the current arena for the duration of `f`, then hand
/// both the arena and `f`'s result back to the caller. Called by
/// [`crate::scheduler::Scheduler`] at every fiber resume.
///
/// # Panics
/// Panics if called while another `enter` scope is already active on this
/// thread: nested fiber resumes are not part of this core's execution
/// model (no preemption, no mid-function yield).
pub fn enter<R>(arena: Arena, f: impl FnOnce() -> R) -> (Arena, R) {
    let previous = CURRENT_ARENA.with(|cell| cell.borrow_mut().replace(arena));
    assert!(
        previous.is_none(),
        "bignum::enter called re-entrantly: nested fiber resumes are unsupported"
    );
    let result = f();
    let arena = CURRENT_ARENA
        .with(|cell| cell.borrow_mut().take())
        .expect("current arena missing after enter(): was it taken by with_current_arena?");
    (arena, result)
}

/// Run `f` with mutable access to the current arena.
///
/// # Panics
/// Panics if called outside an [`enter`] scope.
pub fn with_current_arena<R>(f: impl FnOnce(&mut Arena) -> R) -> R {
    CURRENT_ARENA.with(|cell| {
        let mut guard = cell.borrow_mut();
        let arena = guard
            .as_mut()
            .expect("no current arena: allocation attempted outside a fiber resume");
        f(arena)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_installs_and_returns_the_arena() {
        let arena = Arena::new(256);
        let (arena, doubled) = enter(arena, || with_current_arena(|a| a.alloc(8, 8) * 2));
        assert!(doubled > 0);
        drop(arena);
    }

    #[test]
    #[should_panic(expected = "outside a fiber resume")]
    fn with_current_arena_outside_enter_panics() {
        with_current_arena(|_| ());
    }
}
