//! Chained-page bump allocator with checkpointing.
//!
//! Every dynamic OrgLang object — `BigInt`, `Rational`, `Decimal`, `String`,
//! `Table`, `Closure`, `ResourceDef`, `ResourceInst` — is tracked by the
//! arena as one handle: a bump-allocated virtual address, with the
//! accounting (page, alignment, large-object placement) kept exact, while
//! the handle's actual Rust payload (a `Vec<u8>`, a hash table's entries, a
//! bignum's digit vector) is owned by ordinary, safe Rust collections
//! stored in a side table keyed by that address. This mirrors how
//! `fuel-vm`'s `Memory` keeps stack/heap regions as growable `Vec<u8>`
//! under `#![deny(unsafe_code)]` rather than raw pointer arithmetic: the
//! bump-pointer *bookkeeping* is real and testable (alignment, page
//! overflow, large-object placement, checkpoint/restore addresses), while
//! the backing storage for variable-length payloads is the allocator Rust
//! already gives us. See DESIGN.md for the documented trade-off this
//! implies for the bignum glue.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::consts::{
    ARENA_LARGE_OBJECT_THRESHOLD_DIVISOR, ARENA_MIN_PAGE_SIZE, ARENA_PAGE_ALIGNMENT,
};
use crate::fault::Fault;
use crate::table::Table;
use crate::value::Object;

/// One page of the arena's virtual bump space.
#[derive(Debug)]
struct Page {
    /// Address of the first byte of this page in the arena's virtual space.
    base: u64,
    /// Total capacity, in bytes.
    capacity: usize,
    /// Bump offset of the next free byte within this page.
    used: usize,
}

impl Page {
    fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

/// A single, arena-tracked resource instance awaiting teardown, in
/// registration order.
#[derive(Debug, Clone, Copy)]
struct TrackedResource {
    /// Address (in the `objects` side table) of the `ResourceInst` Object.
    address: u64,
}

/// A chained-page bump allocator: the runtime's sole mechanism for dynamic
/// memory.
#[derive(Debug)]
pub struct Arena {
    pages: Vec<Page>,
    /// Index of the current (bump-target) page in `pages`.
    current: usize,
    /// Next virtual address a fresh page will be assigned. Always
    /// monotonically increasing so address comparisons double as
    /// "allocated before/after" comparisons.
    next_page_base: u64,
    /// Default page size for fresh non-dedicated pages.
    default_page_size: usize,
    /// Backing storage for every heap object, keyed by its virtual address.
    objects: HashMap<u64, Object>,
    /// Resources registered with this arena, in registration order.
    resources: Vec<TrackedResource>,
    /// Child arenas opened by the `sys` primitive's `arena_create` command
    /// (spec.md §6). A released slot is left `None` rather than reused —
    /// the handle returned to a program is that slot's index, and reusing
    /// it would let a stale handle address a different arena.
    children: Vec<Option<Arena>>,
}

/// A saved allocation position, usable with [`Arena::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    page_index: usize,
    used: usize,
    resource_count: usize,
    /// Address threshold: any object at or past this address was allocated
    /// after the checkpoint and must be dropped on restore.
    address_mark: u64,
}

impl Arena {
    /// Create a fresh arena. `default_page_size` is clamped to
    /// [`crate::consts::ARENA_MIN_PAGE_SIZE`] and otherwise respected.
    pub fn new(default_page_size: usize) -> Self {
        let default_page_size = default_page_size.max(ARENA_MIN_PAGE_SIZE);
        let mut arena = Self {
            pages: Vec::new(),
            current: 0,
            next_page_base: ARENA_PAGE_ALIGNMENT as u64,
            default_page_size,
            objects: HashMap::new(),
            resources: Vec::new(),
            children: Vec::new(),
        };
        arena.push_page(default_page_size);
        arena
    }

    fn push_page(&mut self, capacity: usize) -> usize {
        let capacity = round_up(capacity, ARENA_PAGE_ALIGNMENT);
        let base = self.next_page_base;
        self.next_page_base = base
            .checked_add(capacity as u64)
            .expect("arena virtual address space exhausted");
        self.pages.push(Page {
            base,
            capacity,
            used: 0,
        });
        self.pages.len() - 1
    }

    /// Bump-allocate `size` bytes of virtual address space aligned to
    /// `alignment`, returning the address. This does not allocate any real
    /// memory by itself — it is the handle an [`Object`] (or a numeric
    /// wrapper, see `numeric::bignum`) is filed under.
    ///
    /// A request larger than half the default page size is served by a
    /// dedicated page sized to the request.
    pub fn alloc(&mut self, size: usize, alignment: usize) -> u64 {
        debug_assert!(alignment.is_power_of_two());
        debug_assert!(alignment >= 1);

        if size > self.default_page_size / ARENA_LARGE_OBJECT_THRESHOLD_DIVISOR {
            let index = self.push_page(size);
            self.pages[index].used = size;
            return self.pages[index].base;
        }

        let aligned_used = round_up(self.pages[self.current].used, alignment);
        if aligned_used + size > self.pages[self.current].capacity {
            self.current = self.push_page(self.default_page_size);
            let page = &mut self.pages[self.current];
            let aligned_used = round_up(page.used, alignment);
            page.used = aligned_used + size;
            tracing::trace!(page = self.current, size, "arena: linked new page");
            return page.base + aligned_used as u64;
        }

        let page = &mut self.pages[self.current];
        page.used = aligned_used + size;
        page.base + aligned_used as u64
    }

    /// Allocate and file an [`Object`], returning the address it is now
    /// reachable at.
    pub fn alloc_object(&mut self, object: Object) -> u64 {
        let address = self.alloc(core::mem::size_of::<Object>(), ARENA_PAGE_ALIGNMENT);
        self.objects.insert(address, object);
        address
    }

    /// Look up an object by address.
    pub fn get(&self, address: u64) -> Option<&Object> {
        self.objects.get(&address)
    }

    /// Look up an object by address, mutably.
    pub fn get_mut(&mut self, address: u64) -> Option<&mut Object> {
        self.objects.get_mut(&address)
    }

    /// Operate on the `Table` object at `address` with both `&mut Table`
    /// and `&mut Arena` in hand at once. `Table`'s own methods need both
    /// (hashing a non-string key forces a lookup through `Numeric`, which
    /// needs the arena) but once a `Table` is filed under an address it
    /// lives *inside* `objects`, so an ordinary `arena.get_mut(address)`
    /// can't also hand out a second, independent `&mut Arena` — that would
    /// alias. This temporarily swaps the table out for
    /// [`Table::default`]'s empty placeholder, runs `f` against the owned
    /// table and the now-unaliased arena, and swaps the (possibly mutated)
    /// table back. Every ABI entry point that mutates a table already
    /// reachable from the heap (the global scope, a resource's captured
    /// env, a `write`'s destination buffer) goes through this.
    ///
    /// # Panics
    /// Panics if `address` is not a `Table` object.
    pub fn with_table_mut<R>(&mut self, address: u64, f: impl FnOnce(&mut Table, &mut Arena) -> R) -> R {
        let mut table = match self.objects.get_mut(&address) {
            Some(Object::Table(t)) => core::mem::take(t),
            _ => panic!("with_table_mut: address {address:#x} is not a Table object"),
        };
        let result = f(&mut table, self);
        match self.objects.get_mut(&address) {
            Some(slot @ Object::Table(_)) => *slot = Object::Table(table),
            _ => panic!("with_table_mut: table object at {address:#x} vanished during f"),
        }
        result
    }

    /// Open a child arena (the `sys` `arena_create` command, spec.md §6),
    /// returning its handle: an index into this arena's child-arena slots,
    /// stable for the handle's lifetime.
    pub fn create_child(&mut self, default_page_size: usize) -> usize {
        self.children.push(Some(Arena::new(default_page_size)));
        self.children.len() - 1
    }

    /// Release a child arena by handle (`arena_release`): tears down its
    /// tracked resources in reverse order and drops its pages. Returns
    /// `false` if `index` is out of range or already released (the
    /// handle's slot was already taken).
    pub fn release_child(&mut self, index: usize, destroy: impl FnMut(&mut Arena, u64)) -> bool {
        let Some(slot) = self.children.get_mut(index) else {
            return false;
        };
        match slot.take() {
            Some(child) => {
                child.destroy(destroy);
                true
            }
            None => false,
        }
    }

    /// Register a `ResourceInst` (by its object address) with this arena's
    /// tracked-resources list, appended in call order. Registration happens
    /// at instantiation time, not at first use.
    pub fn register_resource(&mut self, address: u64) {
        self.resources.push(TrackedResource { address });
    }

    /// Save the current allocation position.
    pub fn save(&self) -> Checkpoint {
        let page = &self.pages[self.current];
        Checkpoint {
            page_index: self.current,
            used: page.used,
            resource_count: self.resources.len(),
            address_mark: page.base + page.used as u64,
        }
    }

    /// Restore to a prior checkpoint: invoke `destroy` on every resource
    /// registered since, in reverse order, release pages newer than the
    /// checkpoint's page, and reset the bump offset.
    ///
    /// The `destroy` callback receives the resource's object address and
    /// its current state `Value`; see `resource::teardown_from_checkpoint`
    /// for the caller that actually invokes `destroy` closures (this
    /// module only owns the bookkeeping, not resource semantics).
    pub fn restore(&mut self, checkpoint: Checkpoint, mut destroy: impl FnMut(&mut Arena, u64)) {
        while self.resources.len() > checkpoint.resource_count {
            let resource = self
                .resources
                .pop()
                .expect("resources.len() > resource_count implies pop() succeeds");
            destroy(self, resource.address);
        }

        self.objects.retain(|address, _| *address < checkpoint.address_mark);
        self.pages.truncate(checkpoint.page_index + 1);
        self.pages[checkpoint.page_index].used = checkpoint.used;
        self.current = checkpoint.page_index;
    }

    /// Destroy the arena: restore to the initial checkpoint (tearing down
    /// every tracked resource, in reverse order), then release the final
    /// page.
    pub fn destroy(mut self, destroy: impl FnMut(&mut Arena, u64)) {
        let initial = Checkpoint {
            page_index: 0,
            used: 0,
            resource_count: 0,
            address_mark: self.pages[0].base,
        };
        self.restore(initial, destroy);
    }

    /// Number of pages currently linked. Exposed for tests and diagnostics.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bytes used in the current page. Exposed for tests and diagnostics.
    pub fn current_page_used(&self) -> usize {
        self.pages[self.current].used
    }

    /// Bytes remaining in the current page. Exposed for tests and
    /// diagnostics.
    pub fn current_page_remaining(&self) -> usize {
        self.pages[self.current].remaining()
    }
}

fn round_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Report an unrecoverable OS allocation failure. The only failure this
/// allocator recognizes — double-destroy and use-after-restore are left
/// undefined, guaranteed against only by single ownership upstream.
pub fn out_of_memory(detail: impl core::fmt::Display) -> Fault {
    Fault::OutOfMemory(format!("{detail}"))
}
