//! The cooperative, single-threaded fiber scheduler: a FIFO ready queue
//! driving every program from its root fiber (`main`, seeded by
//! [`crate::abi::org_init_program`]) to completion.
//!
//! Grounded on `fuel-vm`'s executor loop (a run-to-completion driver over a
//! queue of units of work): no preemption, no mid-function yield, each
//! resume runs its fiber's continuation to completion (spec.md §4.8/§5).

use alloc::collections::VecDeque;

use crate::arena::Arena;
use crate::numeric::bignum;
use crate::resource;
use crate::value::Value;

/// The function shape a fiber's continuation takes: the arena the fiber
/// owns (installed as the thread-local "current arena" for the duration of
/// the call, see [`crate::numeric::bignum`]), the scheduler (so the
/// continuation can spawn further fibers before completing), and its
/// captured state. A concrete function pointer, not a boxed `dyn FnOnce`,
/// matching this runtime's closure-dispatch convention (spec.md §9
/// "dynamic dispatch": avoid indirection at call sites the compiler emits
/// densely).
pub type FiberFn = fn(arena: &mut Arena, scheduler: &mut Scheduler, state: Value) -> Value;

/// A schedulable unit: an owning arena, a continuation, and its captured
/// state.
pub struct Fiber {
    arena: Arena,
    continuation: FiberFn,
    state: Value,
}

impl Fiber {
    /// Build a fiber that owns `arena` and resumes by calling
    /// `continuation(arena, scheduler, state)` to completion.
    pub fn new(arena: Arena, continuation: FiberFn, state: Value) -> Self {
        Fiber { arena, continuation, state }
    }
}

impl core::fmt::Debug for Fiber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fiber").field("state", &self.state).finish()
    }
}

/// The FIFO ready queue.
#[derive(Debug, Default)]
pub struct Scheduler {
    ready: VecDeque<Fiber>,
}

impl Scheduler {
    /// An empty scheduler.
    pub fn new() -> Self {
        Scheduler { ready: VecDeque::new() }
    }

    /// Enqueue a fiber. Safe to call from inside a running fiber's own
    /// continuation (which holds `&mut Scheduler`) -- this is how a fiber
    /// "spawns additional fibers before completing" (spec.md §4.8).
    pub fn spawn(&mut self, fiber: Fiber) {
        self.ready.push_back(fiber);
    }

    /// How many fibers are currently queued (including one about to run).
    /// Exposed for tests and diagnostics.
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Drain the ready queue. Before each resume, the fiber's arena becomes
    /// the thread-local "current arena" (§4.4/§4.8/§9) so bignum and table
    /// allocation performed by the continuation lands there. When the
    /// continuation returns, its arena is torn down: every tracked
    /// resource's `destroy` fires in reverse registration order, including
    /// ones the continuation stopped referencing before finishing ("leaked"
    /// resources still close, spec.md §4.7). The loop ends when the ready
    /// queue empties.
    pub fn run(&mut self) {
        while let Some(fiber) = self.ready.pop_front() {
            let Fiber { arena, continuation, state } = fiber;
            let (arena, result) = bignum::enter(arena, || bignum::with_current_arena(|a| continuation(a, self, state)));
            if result.is_error() {
                tracing::warn!("fiber completed with an unhandled Error result");
            }
            arena.destroy(resource::teardown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tag_small;

    fn identity(_arena: &mut Arena, _scheduler: &mut Scheduler, state: Value) -> Value {
        state
    }

    fn spawns_one_child(arena: &mut Arena, scheduler: &mut Scheduler, state: Value) -> Value {
        let child_arena = Arena::new(256);
        scheduler.spawn(Fiber::new(child_arena, identity, tag_small(99)));
        let _ = arena;
        state
    }

    #[test]
    fn run_drains_the_ready_queue() {
        let mut scheduler = Scheduler::new();
        scheduler.spawn(Fiber::new(Arena::new(256), identity, tag_small(1)));
        scheduler.spawn(Fiber::new(Arena::new(256), identity, tag_small(2)));
        assert_eq!(scheduler.ready_count(), 2);
        scheduler.run();
        assert_eq!(scheduler.ready_count(), 0);
    }

    #[test]
    fn a_fiber_may_spawn_another_before_completing() {
        let mut scheduler = Scheduler::new();
        scheduler.spawn(Fiber::new(Arena::new(256), spawns_one_child, Value::UNUSED));
        scheduler.run();
        assert_eq!(scheduler.ready_count(), 0);
    }
}
