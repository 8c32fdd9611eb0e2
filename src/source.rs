use std::ptr::{self, NonNull};

use libc::{c_void, intptr_t, sbrk};
use log::warn;

use crate::error::HeapError;

/// The two raw OS primitives the heap is built on: monotonic growth of a
/// break and one-shot anonymous mappings.
///
/// # Safety
///
/// Implementors must hand out memory that is readable, writable, aligned to
/// at least [`ALIGNMENT`](crate::config::ALIGNMENT) for mappings, and not
/// used by anyone else. Consecutive break extensions return consecutive
/// addresses unless a third party moved the break in between.
pub unsafe trait HeapSource {
  /// The current break.
  fn current_break(&self) -> *mut u8;

  /// Moves the break up by `increment` bytes and returns the previous break.
  unsafe fn extend_break(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError>;

  /// Maps `len` bytes of fresh, zeroed memory.
  unsafe fn map(
    &mut self,
    len: usize,
  ) -> Result<NonNull<u8>, HeapError>;

  /// Returns a region obtained from [`HeapSource::map`] to the OS.
  unsafe fn unmap(
    &mut self,
    region: NonNull<u8>,
    len: usize,
  );
}

unsafe fn os_map(len: usize) -> Result<NonNull<u8>, HeapError> {
  let address = unsafe {
    libc::mmap(
      ptr::null_mut(),
      len,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    )
  };

  if address == libc::MAP_FAILED {
    warn!("mmap of {} bytes failed", len);
    return Err(HeapError::MapFailed(len));
  }

  NonNull::new(address as *mut u8).ok_or(HeapError::MapFailed(len))
}

unsafe fn os_unmap(
  region: NonNull<u8>,
  len: usize,
) {
  if unsafe { libc::munmap(region.as_ptr() as *mut c_void, len) } != 0 {
    warn!("munmap of {} bytes at {:?} failed", len, region);
  }
}

/// The process break via `sbrk(2)` and anonymous `mmap(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSource;

unsafe impl HeapSource for SystemSource {
  fn current_break(&self) -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }

  unsafe fn extend_break(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let Ok(delta) = intptr_t::try_from(increment) else {
      return Err(HeapError::BreakExhausted(increment));
    };

    let address = unsafe { sbrk(delta) };

    if address == usize::MAX as *mut c_void {
      warn!("sbrk({}) failed", increment);
      return Err(HeapError::BreakExhausted(increment));
    }

    NonNull::new(address as *mut u8).ok_or(HeapError::BreakExhausted(increment))
  }

  unsafe fn map(
    &mut self,
    len: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    unsafe { os_map(len) }
  }

  unsafe fn unmap(
    &mut self,
    region: NonNull<u8>,
    len: usize,
  ) {
    unsafe { os_unmap(region, len) }
  }
}

/// A break emulated inside one fixed anonymous reservation.
///
/// Gives every heap its own contiguous, deterministic region, which the
/// process break cannot offer to several heaps at once. Extending past the
/// reservation fails the way `sbrk` fails when the data segment is exhausted.
#[derive(Debug)]
pub struct ReservedSource {
  base: NonNull<u8>,
  capacity: usize,
  top: usize,
  live_mappings: usize,
  mapping_limit: usize,
}

unsafe impl Send for ReservedSource {}

impl ReservedSource {
  pub fn new(capacity: usize) -> Result<Self, HeapError> {
    let base = unsafe { os_map(capacity)? };

    Ok(Self {
      base,
      capacity,
      top: 0,
      live_mappings: 0,
      mapping_limit: usize::MAX,
    })
  }

  /// Caps how many large-block mappings may be live at once.
  pub fn with_mapping_limit(
    mut self,
    limit: usize,
  ) -> Self {
    self.mapping_limit = limit;
    self
  }

  pub fn base(&self) -> *mut u8 {
    self.base.as_ptr()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes between the base and the break.
  pub fn used(&self) -> usize {
    self.top
  }

  pub fn live_mappings(&self) -> usize {
    self.live_mappings
  }
}

unsafe impl HeapSource for ReservedSource {
  fn current_break(&self) -> *mut u8 {
    unsafe { self.base.as_ptr().add(self.top) }
  }

  unsafe fn extend_break(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if increment > self.capacity - self.top {
      warn!(
        "reserved break exhausted: {} of {} bytes used, {} requested",
        self.top, self.capacity, increment
      );
      return Err(HeapError::BreakExhausted(increment));
    }

    let previous = unsafe { NonNull::new_unchecked(self.current_break()) };
    self.top += increment;
    Ok(previous)
  }

  unsafe fn map(
    &mut self,
    len: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if self.live_mappings >= self.mapping_limit {
      warn!("mapping limit of {} reached", self.mapping_limit);
      return Err(HeapError::MapFailed(len));
    }

    let region = unsafe { os_map(len)? };
    self.live_mappings += 1;
    Ok(region)
  }

  unsafe fn unmap(
    &mut self,
    region: NonNull<u8>,
    len: usize,
  ) {
    unsafe { os_unmap(region, len) };
    self.live_mappings -= 1;
  }
}

impl Drop for ReservedSource {
  fn drop(&mut self) {
    unsafe { os_unmap(self.base, self.capacity) };
  }
}
