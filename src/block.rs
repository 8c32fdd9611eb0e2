use std::{mem, ptr, ptr::NonNull};

use crate::config::ALIGNMENT;

/// Metadata stored immediately before every payload.
///
/// `addr_prev`/`addr_next` are valid for every resident block. `bin_prev`/
/// `bin_next` are valid only while a resident block is free.
#[repr(C)]
pub struct BlockHeader {
  pub size: usize,
  pub is_free: bool,
  pub mapped: bool,
  pub addr_prev: *mut BlockHeader,
  pub addr_next: *mut BlockHeader,
  pub bin_prev: *mut BlockHeader,
  pub bin_next: *mut BlockHeader,
}

pub const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);

impl BlockHeader {
  /// An occupied, unlinked header.
  pub const fn new(
    size: usize,
    mapped: bool,
  ) -> Self {
    Self {
      size,
      is_free: false,
      mapped,
      addr_prev: ptr::null_mut(),
      addr_next: ptr::null_mut(),
      bin_prev: ptr::null_mut(),
      bin_next: ptr::null_mut(),
    }
  }

  /// Recovers the header sitting at the fixed offset before `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been handed out by the heap and still be live.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> *mut BlockHeader {
    unsafe { payload.as_ptr().sub(HEADER_SIZE) as *mut BlockHeader }
  }

  /// # Safety
  ///
  /// `block` must point at a header the heap wrote.
  pub unsafe fn payload(block: *mut BlockHeader) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked((block as *mut u8).add(HEADER_SIZE)) }
  }

  /// One past the last payload byte.
  ///
  /// # Safety
  ///
  /// `block` must point at a header the heap wrote.
  pub unsafe fn end(block: *mut BlockHeader) -> *mut u8 {
    unsafe { (block as *mut u8).add(HEADER_SIZE + (*block).size) }
  }

  /// Whether `right` starts exactly where `left`'s payload ends.
  ///
  /// # Safety
  ///
  /// `left` must point at a header the heap wrote.
  pub unsafe fn borders(
    left: *mut BlockHeader,
    right: *mut BlockHeader,
  ) -> bool {
    unsafe { Self::end(left) == right as *mut u8 }
  }
}
