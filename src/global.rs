use core::alloc::{GlobalAlloc, Layout};

use crate::{
  config::ALIGNMENT,
  heap::Heap,
  source::{HeapSource, SystemSource},
  stats::HeapStats,
};

/// A spin locked [`Heap`] that can be used as the global allocator.
///
/// ```rust,ignore
/// #[global_allocator]
/// static HEAP: segalloc::SpinLockedHeap = segalloc::SpinLockedHeap::new();
/// ```
///
/// Layouts aligned beyond [`ALIGNMENT`] are refused with null, as are
/// requests the heap itself rejects. A logger installed while this is the
/// global allocator must not allocate at `debug` level or below.
pub struct SpinLockedHeap<S: HeapSource = SystemSource>(spin::Mutex<Heap<S>>);

impl SpinLockedHeap<SystemSource> {
  pub const fn new() -> Self {
    Self(spin::Mutex::new(Heap::new()))
  }
}

impl Default for SpinLockedHeap<SystemSource> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: HeapSource> SpinLockedHeap<S> {
  pub const fn with_source(source: S) -> Self {
    Self(spin::Mutex::new(Heap::with_source(source)))
  }

  pub fn stats(&self) -> HeapStats {
    self.0.lock().stats()
  }

  pub fn lock(&self) -> spin::MutexGuard<'_, Heap<S>> {
    self.0.lock()
  }
}

unsafe impl<S: HeapSource + Send> GlobalAlloc for SpinLockedHeap<S> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return core::ptr::null_mut();
    }

    self.0.lock().allocate(layout.size())
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.0.lock().release(ptr) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return core::ptr::null_mut();
    }

    unsafe { self.0.lock().reallocate(ptr, new_size) }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return core::ptr::null_mut();
    }

    self.0.lock().zero_allocate(1, layout.size())
  }
}
