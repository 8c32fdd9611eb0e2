use std::{marker::PhantomData, ptr};

use crate::block::BlockHeader;

/// Every resident block in ascending address order.
///
/// The tail is the wilderness. Mapped blocks are never members.
pub struct AddressList {
  head: *mut BlockHeader,
  tail: *mut BlockHeader,
  len: usize,
}

impl AddressList {
  pub const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      len: 0,
    }
  }

  pub fn head(&self) -> *mut BlockHeader {
    self.head
  }

  /// The highest-address resident block, or null on an empty heap.
  pub fn wilderness(&self) -> *mut BlockHeader {
    self.tail
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Appends a block carved above every existing one.
  pub unsafe fn push_back(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      (*block).addr_prev = self.tail;
      (*block).addr_next = ptr::null_mut();

      if self.tail.is_null() {
        self.head = block;
      } else {
        (*self.tail).addr_next = block;
      }

      self.tail = block;
      self.len += 1;
    }
  }

  /// Links `block` directly after `anchor`.
  pub unsafe fn insert_after(
    &mut self,
    anchor: *mut BlockHeader,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let next = (*anchor).addr_next;

      (*block).addr_prev = anchor;
      (*block).addr_next = next;
      (*anchor).addr_next = block;

      if next.is_null() {
        self.tail = block;
      } else {
        (*next).addr_prev = block;
      }

      self.len += 1;
    }
  }

  pub unsafe fn remove(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let prev = (*block).addr_prev;
      let next = (*block).addr_next;

      if prev.is_null() {
        self.head = next;
      } else {
        (*prev).addr_next = next;
      }

      if next.is_null() {
        self.tail = prev;
      } else {
        (*next).addr_prev = prev;
      }

      (*block).addr_prev = ptr::null_mut();
      (*block).addr_next = ptr::null_mut();
      self.len -= 1;
    }
  }

  pub fn iter(&self) -> Blocks<'_> {
    Blocks {
      next: self.head(),
      _list: PhantomData,
    }
  }
}

pub struct Blocks<'a> {
  next: *mut BlockHeader,
  _list: PhantomData<&'a AddressList>,
}

impl Iterator for Blocks<'_> {
  type Item = *mut BlockHeader;

  fn next(&mut self) -> Option<Self::Item> {
    if self.next.is_null() {
      return None;
    }

    let current = self.next;
    // SAFETY: members stay valid for as long as the list is borrowed.
    self.next = unsafe { (*current).addr_next };
    Some(current)
  }
}
