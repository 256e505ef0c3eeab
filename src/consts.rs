//! Runtime tuning constants.

/// Number of low bits of a [`crate::value::Value`] word used for tag
/// discrimination.
pub const TAG_BITS: u32 = 2;

/// Mask isolating the tag bits of a value word.
pub const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

/// Number of bits available to a `SmallInt` payload (word width minus the
/// tag bits).
pub const SMALL_INT_BITS: u32 = u64::BITS - TAG_BITS;

/// Largest representable `SmallInt`.
pub const SMALL_INT_MAX: i64 = (1i64 << (SMALL_INT_BITS - 1)) - 1;

/// Smallest representable `SmallInt`.
pub const SMALL_INT_MIN: i64 = -(1i64 << (SMALL_INT_BITS - 1));

/// Minimum page size an [`crate::arena::Arena`] will honor; a smaller
/// request is clamped up to this floor rather than rejected.
pub const ARENA_MIN_PAGE_SIZE: usize = 64;

/// Default page size used when an embedder doesn't pick one explicitly.
pub const ARENA_DEFAULT_PAGE_SIZE: usize = 4096;

/// Alignment every arena page base is chosen to satisfy. Must be a power of
/// two and at least 4 so that pointer-tagged [`crate::value::Value`]s always
/// have zero low tag bits.
pub const ARENA_PAGE_ALIGNMENT: usize = 16;

/// A request larger than this fraction of the default page size is served
/// from a dedicated page sized to the request, rather than fragmenting the
/// current page.
pub const ARENA_LARGE_OBJECT_THRESHOLD_DIVISOR: usize = 2;

/// Load factor (entries / capacity, as a percentage) past which
/// [`crate::table::Table`] grows its backing storage.
pub const TABLE_MAX_LOAD_FACTOR_PERCENT: usize = 70;

/// Initial capacity used by [`crate::table::Table::new`].
pub const TABLE_DEFAULT_CAPACITY: usize = 8;

static_assertions::const_assert!(SMALL_INT_MAX > 0);
static_assertions::const_assert!(SMALL_INT_MIN < 0);
static_assertions::const_assert!(ARENA_PAGE_ALIGNMENT >= 4);
static_assertions::const_assert!(ARENA_PAGE_ALIGNMENT.is_power_of_two());
static_assertions::const_assert!(TABLE_DEFAULT_CAPACITY.is_power_of_two());
