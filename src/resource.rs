//! Reified side effects: a `ResourceDef` blueprint of optional lifecycle
//! hooks, and the live `ResourceInst` an `@Name` expression produces from
//! one.
//!
//! Grounded on `fuel-storage`'s trait-with-required-and-optional-methods
//! shape (`StorageInspect` required, `StorageMutate` layered on top) and
//! spec.md §4.7's explicit "this is not inheritance — struct with
//! defaults" design note: `create`/`destroy` default to no-ops, `next` is
//! the one hook every `ResourceDef` must supply.

use crate::arena::Arena;
use crate::closure::Closure;
use crate::table::Table;
use crate::value::{get_ptr, tag_ptr, Object, Value};

/// A blueprint: `next` is required, `create`/`destroy` default to no-ops.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDef {
    create: Option<Closure>,
    next: Closure,
    destroy: Option<Closure>,
}

impl ResourceDef {
    /// Build a `ResourceDef` directly from its hooks — the path the `sys`
    /// primitive (the one resource the runtime itself defines) uses,
    /// bypassing the `@:` table-literal inspection below.
    pub const fn new(next: Closure, create: Option<Closure>, destroy: Option<Closure>) -> Self {
        ResourceDef { create, next, destroy }
    }

    /// Inspect a Table literal (the `@:` syntax's operand) once, extracting
    /// the well-known `create`/`next`/`destroy` keys. `None` if `next` is
    /// missing or not a `Closure` — the only required hook.
    ///
    /// Reads via [`Table::get_cstr_raw`], not the forcing `get_cstr`: these
    /// keys name hooks to invoke later, not lazy values to evaluate by
    /// being read out of the table (a `create` hook is routinely a
    /// zero-parameter `Closure`, which is exactly what the Table's
    /// lazy-thunk convention would otherwise force on first access).
    pub fn from_table(arena: &Arena, table: &Table) -> Option<ResourceDef> {
        let next = closure_at(arena, table, "next")?;
        let create = closure_at(arena, table, "create");
        let destroy = closure_at(arena, table, "destroy");
        Some(ResourceDef { create, next, destroy })
    }

    /// Produce a live instance: invoke `create` (if present) for the
    /// initial state, allocate the instance in `arena`, and register it
    /// with `arena`'s tracked-resources list — registration happens here,
    /// at instantiation time, not at first use.
    pub fn instantiate(self, arena: &mut Arena) -> Value {
        let state = match self.create {
            Some(create) => create.invoke(arena, Value::UNUSED, Value::UNUSED),
            None => Value::UNUSED,
        };
        let address = arena.alloc_object(Object::ResourceInst(ResourceInst { def: self, state }));
        arena.register_resource(address);
        tracing::trace!(address, "resource: instantiated");
        tag_ptr(address)
    }
}

fn closure_at(arena: &Arena, table: &Table, key: &str) -> Option<Closure> {
    let value = table.get_cstr_raw(arena, key);
    let address = get_ptr(value)?;
    match arena.get(address)? {
        Object::Closure(c) => Some(*c),
        _ => None,
    }
}

/// A live resource instance: a back-reference to its `ResourceDef` and a
/// mutable state slot, threaded through return values only (spec.md §9:
/// "resource state mutation" is resolved as return-value threading, no
/// mutable cell).
#[derive(Debug, Clone, Copy)]
pub struct ResourceInst {
    def: ResourceDef,
    state: Value,
}

impl ResourceInst {
    /// The instance's current state.
    pub const fn state(&self) -> Value {
        self.state
    }
}

/// Deliver `datum` to the resource instance at `address`, calling its
/// `next` hook and threading the returned value back in as the instance's
/// new state. Used both as a sink (datum is incoming data) and as a source
/// (datum is `Value::UNUSED`, requesting the next pulled value — exhaustion
/// is signaled by the `Error` singleton, spec.md §9's resolution of the
/// source-exhaustion open question).
///
/// Returns `Error` if `address` doesn't resolve to a live `ResourceInst`.
pub fn next(arena: &mut Arena, address: u64, datum: Value) -> Value {
    let Some(Object::ResourceInst(inst)) = arena.get(address) else {
        return Value::ERROR;
    };
    let def = inst.def;
    let state = inst.state;
    let result = def.next.invoke(arena, state, datum);
    if let Some(Object::ResourceInst(inst)) = arena.get_mut(address) {
        inst.state = result;
    }
    result
}

/// Invoke `destroy` (a no-op if absent) on the resource instance at
/// `address`. Signature matches [`crate::arena::Arena::restore`] and
/// [`crate::arena::Arena::destroy`]'s teardown callback — this is the
/// function their `destroy` parameter is, for every arena in this runtime.
pub fn teardown(arena: &mut Arena, address: u64) {
    let Some(Object::ResourceInst(inst)) = arena.get(address) else {
        return;
    };
    let def = inst.def;
    let state = inst.state;
    if let Some(destroy) = def.destroy {
        tracing::trace!(address, "resource: tearing down");
        destroy.invoke(arena, state, Value::UNUSED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::Arity;
    use crate::ops;
    use crate::value::tag_small;

    fn create_zero(_arena: &mut Arena, _env: Value, _left: Value, _right: Value) -> Value {
        tag_small(0)
    }

    fn accumulate(arena: &mut Arena, _env: Value, state: Value, datum: Value) -> Value {
        ops::add(arena, state, datum)
    }

    std::thread_local! {
        // Destroy hooks only ever see an arena about to be torn down, so
        // tests that want to observe teardown order record it here
        // instead of in an arena-resident Table.
        static TEARDOWN_LOG: core::cell::RefCell<alloc::vec::Vec<i64>> =
            const { core::cell::RefCell::new(alloc::vec::Vec::new()) };
    }

    fn log_teardown(_arena: &mut Arena, _env: Value, state: Value, _datum: Value) -> Value {
        TEARDOWN_LOG.with(|log| log.borrow_mut().push(crate::value::untag_small(state)));
        Value::UNUSED
    }

    #[test]
    fn instantiate_invokes_create_and_registers() {
        let mut arena = Arena::new(1024);
        let def = ResourceDef::new(
            Closure::new(accumulate, Value::UNUSED, Arity::Binary),
            Some(Closure::new(create_zero, Value::UNUSED, Arity::Nullary)),
            None,
        );
        let inst_value = def.instantiate(&mut arena);
        let address = get_ptr(inst_value).unwrap();
        match arena.get(address) {
            Some(Object::ResourceInst(inst)) => assert_eq!(inst.state, tag_small(0)),
            _ => panic!("expected a resource instance"),
        }
    }

    #[test]
    fn next_threads_state_through_return_value() {
        let mut arena = Arena::new(1024);
        let def = ResourceDef::new(Closure::new(accumulate, Value::UNUSED, Arity::Binary), None, None);
        let inst_value = def.instantiate(&mut arena);
        let address = get_ptr(inst_value).unwrap();
        next(&mut arena, address, tag_small(5));
        next(&mut arena, address, tag_small(7));
        match arena.get(address) {
            Some(Object::ResourceInst(inst)) => assert_eq!(inst.state, tag_small(12)),
            _ => panic!("expected a resource instance"),
        }
    }

    #[test]
    fn leaked_resource_is_still_torn_down_on_arena_destroy() {
        TEARDOWN_LOG.with(|log| log.borrow_mut().clear());
        let mut arena = Arena::new(1024);
        let def = ResourceDef::new(
            Closure::new(accumulate, Value::UNUSED, Arity::Binary),
            Some(Closure::new(create_zero, Value::UNUSED, Arity::Nullary)),
            Some(Closure::new(log_teardown, Value::UNUSED, Arity::Binary)),
        );
        // Instantiated, but the resulting instance value is never used
        // again — still torn down on arena destroy.
        let _ = def.instantiate(&mut arena);
        arena.destroy(teardown);
        TEARDOWN_LOG.with(|log| assert_eq!(*log.borrow(), alloc::vec![0]));
    }

    #[test]
    fn reverse_teardown_order_across_a_chain() {
        TEARDOWN_LOG.with(|log| log.borrow_mut().clear());
        let mut arena = Arena::new(1024);
        let destroy = Closure::new(log_teardown, Value::UNUSED, Arity::Binary);
        for tag in [1i64, 2, 3] {
            let def = ResourceDef::new(Closure::new(accumulate, Value::UNUSED, Arity::Binary), None, Some(destroy));
            // Each instance's state becomes `tag` via one `next` call
            // right after instantiation, so `destroy` reports it back.
            let inst = def.instantiate(&mut arena);
            let address = get_ptr(inst).unwrap();
            next(&mut arena, address, tag_small(tag));
        }
        arena.destroy(teardown);
        TEARDOWN_LOG.with(|log| assert_eq!(*log.borrow(), alloc::vec![3, 2, 1]));
    }
}
