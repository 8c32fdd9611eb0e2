use std::ptr;

use crate::{
  block::BlockHeader,
  config::{BIN_COUNT, BIN_SPAN, LARGE_CLASS_EDGE},
};

/// Where a request of a given (aligned) size is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
  Bin(usize),
  Large,
}

impl SizeClass {
  pub fn of(size: usize) -> Self {
    if size == LARGE_CLASS_EDGE {
      return SizeClass::Bin(BIN_COUNT - 1);
    }

    match size / BIN_SPAN {
      index if index >= BIN_COUNT => SizeClass::Large,
      index => SizeClass::Bin(index),
    }
  }
}

/// Bin of a free resident block. Coalescing may grow a resident block past
/// the large-class edge; such blocks stay in the last bin.
pub fn bin_index(size: usize) -> usize {
  (size / BIN_SPAN).min(BIN_COUNT - 1)
}

/// Per-class free lists, each sorted ascending by block size.
pub struct SizeClassBins {
  heads: [*mut BlockHeader; BIN_COUNT],
}

impl SizeClassBins {
  pub const fn new() -> Self {
    Self {
      heads: [ptr::null_mut(); BIN_COUNT],
    }
  }

  pub fn head(
    &self,
    bin: usize,
  ) -> *mut BlockHeader {
    self.heads[bin]
  }

  /// Files `block` in front of the first strictly larger block of its bin.
  pub unsafe fn insert(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let size = (*block).size;
      let bin = bin_index(size);

      let mut prev: *mut BlockHeader = ptr::null_mut();
      let mut next = self.heads[bin];

      while !next.is_null() && (*next).size <= size {
        prev = next;
        next = (*next).bin_next;
      }

      (*block).bin_prev = prev;
      (*block).bin_next = next;

      if prev.is_null() {
        self.heads[bin] = block;
      } else {
        (*prev).bin_next = block;
      }

      if !next.is_null() {
        (*next).bin_prev = block;
      }
    }
  }

  /// Unlinks `block`; its size must not have changed since it was inserted.
  pub unsafe fn remove(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let bin = bin_index((*block).size);
      let prev = (*block).bin_prev;
      let next = (*block).bin_next;

      if prev.is_null() {
        debug_assert_eq!(self.heads[bin], block);
        self.heads[bin] = next;
      } else {
        (*prev).bin_next = next;
      }

      if !next.is_null() {
        (*next).bin_prev = prev;
      }

      (*block).bin_prev = ptr::null_mut();
      (*block).bin_next = ptr::null_mut();
    }
  }

  /// Classed best fit: the smallest sufficient block of the first bin, at or
  /// above the request's own, that has one.
  pub unsafe fn find_fit(
    &self,
    size: usize,
  ) -> *mut BlockHeader {
    unsafe {
      for bin in bin_index(size)..BIN_COUNT {
        let mut current = self.heads[bin];

        while !current.is_null() {
          if (*current).size >= size {
            return current;
          }
          current = (*current).bin_next;
        }
      }

      ptr::null_mut()
    }
  }
}
