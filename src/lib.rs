//! # segalloc - A Segregated Free-List Heap Allocator
//!
//! This crate provides a general-purpose heap built directly on the program
//! break (`sbrk`) and anonymous mappings (`mmap`), without delegating to any
//! existing allocator.
//!
//! ## Overview
//!
//! Every block carved from the break is tracked twice: once in an
//! address-ordered list, to find physical neighbours, and, while free, in one
//! of 128 size-class bins, to find a fit:
//!
//! ```text
//!   Break-Extendable Region:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌────┬──────┐ ┌────┬────────────┐ ┌────┬────┐ ┌────┬──────────────┐  │
//!   │ │ H  │ used │ │ H  │    free    │ │ H  │used│ │ H  │  wilderness  │  │
//!   │ └────┴──────┘ └────┴────────────┘ └────┴────┘ └────┴──────────────┘  │
//!   │    ◄──────────────► ◄──────────────► ◄──────────►               ▲    │
//!   │            address-ordered list (every block)                   │    │
//!   │                                                              Program │
//!   │                                                               Break  │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Size-Class Bins (free blocks only, ascending by size):
//!
//!   bin   0 [   0 ..  999] ─► 104 ─► 560
//!   bin   1 [1000 .. 1999] ─► (empty)
//!   bin   2 [2000 .. 2999] ─► 2504 ─► 2800
//!   ...
//!   bin 127 [127000 ..   ] ─► 128000 ─► 200048
//! ```
//!
//! Requests above 128000 bytes never touch the break: each one gets its own
//! mapping, which is handed back to the OS as soon as the block is released.
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align         - align! macro (8-byte grid)
//!   ├── config        - alignment, request ceiling, bin geometry
//!   ├── block         - BlockHeader and payload offset arithmetic (internal)
//!   ├── address_list  - address-ordered block list, tail = wilderness (internal)
//!   ├── bins          - size classes and sorted free lists (internal)
//!   ├── large         - mapped large-block path (internal)
//!   ├── source        - HeapSource: SystemSource, ReservedSource
//!   ├── stats         - HeapStats counters
//!   ├── heap          - Heap engine, audit
//!   ├── error         - HeapError, IntegrityError
//!   └── global        - SpinLockedHeap GlobalAlloc adapter (feature "global")
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use segalloc::Heap;
//!
//! fn main() {
//!     let mut heap = Heap::new();
//!
//!     let ptr = heap.allocate(100) as *mut u64;
//!     unsafe {
//!         *ptr = 42;
//!         let ptr = heap.reallocate(ptr as *mut u8, 5000);
//!         heap.release(ptr);
//!     }
//!
//!     assert_eq!(heap.free_blocks(), 1);
//! }
//! ```
//!
//! ## How It Works
//!
//! ```text
//!   allocate(size):
//!
//!   size == 0 or > 1e8 ──► null
//!          │
//!          ▼ round up to 8
//!   size > 128000 ──► mmap(header + size)
//!          │
//!          ▼
//!   bins[class(size)..128] ──hit──► occupy, split off surplus
//!          │ miss
//!          ▼
//!   wilderness free? ──yes──► sbrk(size - wilderness.size), occupy
//!          │ no
//!          ▼
//!   sbrk(header + size) ──► new wilderness
//! ```
//!
//! Releasing a block files it in its bin and merges it with free neighbours,
//! so no two adjacent blocks are ever both free. Reallocation tries, in
//! order: shrinking in place, absorbing the left, right or both free
//! neighbours, extending the wilderness, and finally moving to a new block.
//!
//! Every payload is preceded by its header:
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    BlockHeader        │         User Data              │
//!   │  size, is_free,       │                                │
//!   │  mapped,              │     size bytes usable          │
//!   │  addr_prev/addr_next, │     (multiple of 8)            │
//!   │  bin_prev/bin_next    │                                │
//!   │      48 bytes         │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded**: a `Heap` must not be shared; `SpinLockedHeap`
//!   serializes callers when one is needed
//! - **8-byte alignment only**: stricter layouts are refused
//! - **The break never shrinks**: released resident blocks are kept for reuse
//! - **Unix-only**: requires `libc`, `sbrk` and `mmap`
//!
//! ## Safety
//!
//! Releasing or reallocating trusts the caller's pointer: it must be one this
//! heap handed out and still live. Freeing a pointer twice is tolerated only
//! while its block has not been reused or merged away.

pub mod align;
pub mod config;

mod address_list;
mod bins;
mod block;
mod error;
mod heap;
mod large;
mod source;
mod stats;

#[cfg(feature = "global")]
mod global;

pub use error::{HeapError, IntegrityError};
pub use heap::Heap;
pub use source::{HeapSource, ReservedSource, SystemSource};
pub use stats::HeapStats;

#[cfg(feature = "global")]
pub use global::SpinLockedHeap;
