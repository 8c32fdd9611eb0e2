//! Compile-time tunables of the heap.

/// Granularity of every payload size and every payload address.
pub const ALIGNMENT: usize = 8;

/// Largest request any allocating entry point accepts.
pub const MAX_REQUEST: usize = 100_000_000;

/// Number of size-class bins for resident blocks.
pub const BIN_COUNT: usize = 128;

/// Width in bytes of the size range one bin covers.
pub const BIN_SPAN: usize = 1000;

/// Requests up to and including this size are served from the break.
/// Anything larger takes the mapped large-block path.
pub const LARGE_CLASS_EDGE: usize = BIN_COUNT * BIN_SPAN;
