use thiserror::Error;

use crate::config::MAX_REQUEST;

/// Why an allocating call could not be served.
///
/// The null-returning entry points collapse every variant into a null
/// pointer; the `try_*` forms hand it back as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
  #[error("request of {0} bytes is outside 1..={MAX_REQUEST}")]
  InvalidSize(usize),

  #[error("element count times element size overflows")]
  Overflow,

  #[error("program break could not be extended by {0} bytes")]
  BreakExhausted(usize),

  #[error("anonymous mapping of {0} bytes failed")]
  MapFailed(usize),
}

/// A structural defect found by [`Heap::audit`](crate::Heap::audit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntegrityError {
  #[error("block {addr:#x} is linked out of address order")]
  Unordered { addr: usize },

  #[error("block {addr:#x} has a broken back link")]
  BrokenLink { addr: usize },

  #[error("block {addr:#x} holds {size} bytes, not a multiple of the alignment")]
  Misaligned { addr: usize, size: usize },

  #[error("mapped block {addr:#x} is linked into the address-ordered list")]
  StrayMapping { addr: usize },

  #[error("adjacent blocks {left:#x} and {right:#x} are both free")]
  Uncoalesced { left: usize, right: usize },

  #[error("bin {bin} is not sorted by size at block {addr:#x}")]
  BinUnsorted { bin: usize, addr: usize },

  #[error("block {addr:#x} sits in bin {found}, expected bin {expected}")]
  Misfiled {
    addr: usize,
    found: usize,
    expected: usize,
  },

  #[error("occupied block {addr:#x} sits in bin {bin}")]
  OccupiedInBin { addr: usize, bin: usize },

  #[error("{binned} blocks are binned but {free} resident blocks are free")]
  Unbinned { binned: usize, free: usize },

  #[error("{counter} reads {recorded} but the heap holds {actual}")]
  CounterDrift {
    counter: &'static str,
    recorded: usize,
    actual: usize,
  },
}
