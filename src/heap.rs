use std::{cmp, ptr, ptr::NonNull};

use log::{debug, trace};

use crate::{
  address_list::AddressList,
  align,
  bins::{SizeClass, SizeClassBins},
  block::{BlockHeader, HEADER_SIZE},
  config::{ALIGNMENT, MAX_REQUEST},
  error::HeapError,
  large,
  source::{HeapSource, SystemSource},
  stats::HeapStats,
};

mod audit;

/// Whether an allocation may grow the wilderness while it is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtendPolicy {
  /// Bins first, then the wilderness if it is free, then a fresh carve.
  Search,
  /// The caller owns the wilderness and wants it grown where it stands.
  InPlace,
}

/// Which free neighbours a merge absorbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
  Left,
  Right,
  Both,
}

/// The allocator engine: size-class bins for reuse, an address-ordered list
/// for coalescing, and a mapped path for large requests.
///
/// A fresh `Heap` owns no memory; the first allocation touches the OS.
pub struct Heap<S: HeapSource = SystemSource> {
  source: S,
  blocks: AddressList,
  bins: SizeClassBins,
  stats: HeapStats,
}

// SAFETY: every pointer the heap holds refers to memory it owns exclusively.
unsafe impl<S: HeapSource + Send> Send for Heap<S> {}

impl Heap<SystemSource> {
  pub const fn new() -> Self {
    Self::with_source(SystemSource)
  }
}

impl Default for Heap<SystemSource> {
  fn default() -> Self {
    Self::new()
  }
}

fn checked_request(size: usize) -> Result<usize, HeapError> {
  if size == 0 || size > MAX_REQUEST {
    return Err(HeapError::InvalidSize(size));
  }

  Ok(align!(size))
}

impl<S: HeapSource> Heap<S> {
  pub const fn with_source(source: S) -> Self {
    Self {
      source,
      blocks: AddressList::new(),
      bins: SizeClassBins::new(),
      stats: HeapStats::new(),
    }
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Allocates at least `size` bytes, or returns null.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    match self.try_allocate(size) {
      Ok(payload) => payload.as_ptr(),
      Err(err) => {
        debug!("allocate({}) failed: {}", size, err);
        ptr::null_mut()
      }
    }
  }

  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let size = checked_request(size)?;

    unsafe {
      let block = self.allocate_block(size, ExtendPolicy::Search)?;
      Ok(BlockHeader::payload(block))
    }
  }

  /// Allocates room for `count` elements of `size` bytes, zero-filled.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    match self.try_zero_allocate(count, size) {
      Ok(payload) => payload.as_ptr(),
      Err(err) => {
        debug!("zero_allocate({}, {}) failed: {}", count, size, err);
        ptr::null_mut()
      }
    }
  }

  pub fn try_zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let total = count.checked_mul(size).ok_or(HeapError::Overflow)?;
    let payload = self.try_allocate(total)?;

    unsafe {
      let block = BlockHeader::from_payload(payload);
      // fresh mappings arrive zeroed
      if !(*block).mapped {
        ptr::write_bytes(payload.as_ptr(), 0, (*block).size);
      }
    }

    Ok(payload)
  }

  /// Gives a block back. Null and already-free pointers are ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a payload pointer handed out by this heap whose
  /// block has not been merged away or unmapped since.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    let Some(payload) = NonNull::new(ptr) else {
      return;
    };

    unsafe {
      let block = BlockHeader::from_payload(payload);

      if (*block).is_free {
        trace!("release({:?}) ignored, block already free", ptr);
        return;
      }

      if (*block).mapped {
        let size = (*block).size;
        large::unmap_block(&mut self.source, block);
        self.stats.unmapped(size);
        return;
      }

      trace!("release({:?}) of {} bytes", ptr, (*block).size);
      self.vacate(block);
      self.coalesce(block);
    }
  }

  /// Resizes the block behind `ptr`, in place whenever a neighbour or the
  /// break allows it. On failure returns null and leaves `ptr` untouched.
  ///
  /// # Safety
  ///
  /// Same contract as [`Heap::release`].
  pub unsafe fn reallocate(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    match unsafe { self.try_reallocate(ptr, new_size) } {
      Ok(payload) => payload.as_ptr(),
      Err(err) => {
        debug!("reallocate({:?}, {}) failed: {}", ptr, new_size, err);
        ptr::null_mut()
      }
    }
  }

  /// # Safety
  ///
  /// Same contract as [`Heap::release`].
  pub unsafe fn try_reallocate(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let Some(payload) = NonNull::new(ptr) else {
      return self.try_allocate(new_size);
    };
    let size = checked_request(new_size)?;

    unsafe {
      let block = BlockHeader::from_payload(payload);

      if (*block).mapped {
        return self.relocate(block, size);
      }

      let current = (*block).size;

      if current >= size {
        self.trim(block, size);
        return Ok(payload);
      }

      let left = self.free_left(block).map(|left| (*left).size + HEADER_SIZE);
      let right = self.free_right(block).map(|right| (*right).size + HEADER_SIZE);

      let merge = match (left, right) {
        (Some(left), _) if current + left >= size => Some(Merge::Left),
        (_, Some(right)) if current + right >= size => Some(Merge::Right),
        (Some(left), Some(right)) if current + left + right >= size => Some(Merge::Both),
        _ => None,
      };

      if let Some(merge) = merge {
        let merged = self.merge_neighbors(block, merge);
        let target = BlockHeader::payload(merged);

        if merged != block {
          ptr::copy(payload.as_ptr(), target.as_ptr(), current);
        }

        trace!("reallocate({:?}) grew into {:?} neighbour", ptr, merge);
        self.trim(merged, size);
        return Ok(target);
      }

      // large-class sizes are never served from the break
      if SizeClass::of(size) != SizeClass::Large
        && block == self.blocks.wilderness()
        && self.wilderness_at_break()
      {
        self.allocate_block(size, ExtendPolicy::InPlace)?;
        return Ok(payload);
      }

      self.relocate(block, size)
    }
  }

  /// Payload capacity of a live block; at least what was requested.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live payload pointer handed out by this heap.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    unsafe { (*BlockHeader::from_payload(ptr)).size }
  }

  pub fn stats(&self) -> HeapStats {
    self.stats
  }

  pub fn free_blocks(&self) -> usize {
    self.stats.free_blocks
  }

  pub fn free_bytes(&self) -> usize {
    self.stats.free_bytes
  }

  pub fn allocated_blocks(&self) -> usize {
    self.stats.allocated_blocks
  }

  pub fn allocated_bytes(&self) -> usize {
    self.stats.allocated_bytes
  }

  pub const fn header_size() -> usize {
    HEADER_SIZE
  }

  pub fn metadata_bytes(&self) -> usize {
    self.stats.metadata_bytes()
  }

  unsafe fn allocate_block(
    &mut self,
    size: usize,
    policy: ExtendPolicy,
  ) -> Result<*mut BlockHeader, HeapError> {
    unsafe {
      if SizeClass::of(size) == SizeClass::Large {
        let block = large::map_block(&mut self.source, size)?;
        self.stats.mapped(size);
        return Ok(block);
      }

      if policy == ExtendPolicy::Search {
        let fit = self.bins.find_fit(size);

        if !fit.is_null() {
          trace!("bin hit: {} bytes at {:?} for {}", (*fit).size, fit, size);
          self.occupy(fit);
          self.trim(fit, size);
          return Ok(fit);
        }
      }

      let wilderness = self.blocks.wilderness();

      if !wilderness.is_null()
        && self.wilderness_at_break()
        && (policy == ExtendPolicy::InPlace || (*wilderness).is_free)
      {
        return self.grow_wilderness(size);
      }

      self.carve(size)
    }
  }

  fn wilderness_at_break(&self) -> bool {
    let wilderness = self.blocks.wilderness();
    !wilderness.is_null() && unsafe { BlockHeader::end(wilderness) } == self.source.current_break()
  }

  /// Stretches the wilderness to exactly `size` bytes and occupies it.
  unsafe fn grow_wilderness(
    &mut self,
    size: usize,
  ) -> Result<*mut BlockHeader, HeapError> {
    unsafe {
      let wilderness = self.blocks.wilderness();
      let current = (*wilderness).size;

      if size > current {
        let delta = size - current;
        self.source.extend_break(delta)?;
        self.stats.extended(delta);
        debug!("wilderness {:?} grew by {} to {} bytes", wilderness, delta, size);
      }

      if (*wilderness).is_free {
        self.occupy(wilderness);
      }

      (*wilderness).size = cmp::max(size, current);
      Ok(wilderness)
    }
  }

  /// Carves a brand-new block above the break and makes it the wilderness.
  unsafe fn carve(
    &mut self,
    size: usize,
  ) -> Result<*mut BlockHeader, HeapError> {
    unsafe {
      let padding = (self.source.current_break() as usize).wrapping_neg() & (ALIGNMENT - 1);
      let start = self.source.extend_break(padding + HEADER_SIZE + size)?;

      let block = start.as_ptr().add(padding) as *mut BlockHeader;
      block.write(BlockHeader::new(size, false));
      self.blocks.push_back(block);
      self.stats.carved(size);

      debug!("carved block {:?} of {} bytes from the break", block, size);
      Ok(block)
    }
  }

  /// Moves the contents into a fresh block and releases the old one.
  unsafe fn relocate(
    &mut self,
    block: *mut BlockHeader,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    unsafe {
      let fresh = self.allocate_block(size, ExtendPolicy::Search)?;
      let from = BlockHeader::payload(block);
      let to = BlockHeader::payload(fresh);

      ptr::copy_nonoverlapping(from.as_ptr(), to.as_ptr(), cmp::min((*block).size, size));
      self.release(from.as_ptr());

      trace!("relocated {:?} to {:?}", from, to);
      Ok(to)
    }
  }

  /// Takes a free block out of its bin and marks it occupied.
  unsafe fn occupy(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      debug_assert!((*block).is_free);
      self.bins.remove(block);
      (*block).is_free = false;
      self.stats.claimed((*block).size);
    }
  }

  /// Marks an occupied resident block free and files it in its bin.
  unsafe fn vacate(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      debug_assert!(!(*block).is_free && !(*block).mapped);
      (*block).is_free = true;
      self.stats.freed((*block).size);
      self.bins.insert(block);
    }
  }

  /// Folds `absorbed` and its header into `survivor`. Both must be occupied.
  unsafe fn absorb(
    &mut self,
    survivor: *mut BlockHeader,
    absorbed: *mut BlockHeader,
  ) {
    unsafe {
      debug_assert!(BlockHeader::borders(survivor, absorbed));
      self.blocks.remove(absorbed);
      (*survivor).size += HEADER_SIZE + (*absorbed).size;
      self.stats.header_reclaimed();
    }
  }

  /// Shrinks an occupied resident block to `first_size` and turns the rest
  /// into a free block right after it, provided the rest has a positive
  /// payload. The remainder is binned but not coalesced.
  unsafe fn split(
    &mut self,
    block: *mut BlockHeader,
    first_size: usize,
  ) -> Option<*mut BlockHeader> {
    unsafe {
      debug_assert!(!(*block).is_free && !(*block).mapped);

      let size = (*block).size;

      if size <= first_size + HEADER_SIZE {
        return None;
      }

      let rest = (block as *mut u8).add(HEADER_SIZE + first_size) as *mut BlockHeader;
      rest.write(BlockHeader::new(size - first_size - HEADER_SIZE, false));
      (*block).size = first_size;

      self.blocks.insert_after(block, rest);
      self.stats.header_carved();
      self.vacate(rest);

      trace!("split {:?} into {} + {} bytes", block, first_size, (*rest).size);
      Some(rest)
    }
  }

  /// Splits off the surplus beyond `size` and merges it with whatever free
  /// block follows.
  unsafe fn trim(
    &mut self,
    block: *mut BlockHeader,
    size: usize,
  ) {
    unsafe {
      if let Some(rest) = self.split(block, size) {
        self.coalesce(rest);
      }
    }
  }

  unsafe fn free_left(
    &self,
    block: *mut BlockHeader,
  ) -> Option<*mut BlockHeader> {
    unsafe {
      let left = (*block).addr_prev;
      (!left.is_null() && (*left).is_free && BlockHeader::borders(left, block)).then_some(left)
    }
  }

  unsafe fn free_right(
    &self,
    block: *mut BlockHeader,
  ) -> Option<*mut BlockHeader> {
    unsafe {
      let right = (*block).addr_next;
      (!right.is_null() && (*right).is_free && BlockHeader::borders(block, right)).then_some(right)
    }
  }

  /// Absorbs the chosen free neighbours into an occupied block. The lowest
  /// header survives and is returned, occupied.
  unsafe fn merge_neighbors(
    &mut self,
    block: *mut BlockHeader,
    merge: Merge,
  ) -> *mut BlockHeader {
    unsafe {
      let mut survivor = block;

      if matches!(merge, Merge::Right | Merge::Both) {
        let right = (*block).addr_next;
        self.occupy(right);
        self.absorb(block, right);
      }

      if matches!(merge, Merge::Left | Merge::Both) {
        let left = (*block).addr_prev;
        self.occupy(left);
        self.absorb(left, block);
        survivor = left;
      }

      survivor
    }
  }

  /// Merges a free block with its free neighbours into one maximal free
  /// block and returns its header.
  unsafe fn coalesce(
    &mut self,
    block: *mut BlockHeader,
  ) -> *mut BlockHeader {
    unsafe {
      let merge = match (self.free_left(block), self.free_right(block)) {
        (Some(_), Some(_)) => Merge::Both,
        (Some(_), None) => Merge::Left,
        (None, Some(_)) => Merge::Right,
        (None, None) => return block,
      };

      self.occupy(block);
      let merged = self.merge_neighbors(block, merge);
      self.vacate(merged);

      trace!("coalesced {:?} into {} bytes", merged, (*merged).size);
      merged
    }
  }
}
