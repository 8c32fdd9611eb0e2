/*
 * system_break.rs
 *
 * heaps backed by the real program break.
 * the break is process-wide, so every test here holds BREAK for its whole
 * body and asserts nothing about where foreign allocations leave it.
 */

use std::{
  ptr::{self, NonNull},
  sync::Mutex,
};

use segalloc::{Heap, HeapSource, SystemSource};

static BREAK: Mutex<()> = Mutex::new(());

fn current_break() -> usize {
  SystemSource.current_break() as usize
}

#[test]
fn test_allocations_live_below_the_break() {
  let _guard = BREAK.lock().unwrap();
  let mut heap = Heap::new();

  let p = heap.allocate(100);
  assert!(!p.is_null());
  assert_eq!(p as usize % 8, 0);
  assert!(p as usize + 104 <= current_break());

  unsafe {
    ptr::write_bytes(p, 0x5A, 100);

    let grown = heap.reallocate(p, 4000);
    assert!(!grown.is_null());
    assert!(std::slice::from_raw_parts(grown, 100).iter().all(|&b| b == 0x5A));
    assert!(heap.usable_size(NonNull::new(grown).unwrap()) >= 4000);

    heap.release(grown);
  }

  assert_eq!(heap.audit(), Ok(()));
  assert!(heap.free_bytes() <= heap.allocated_bytes());
}

#[test]
fn test_large_blocks_bypass_the_break() {
  let _guard = BREAK.lock().unwrap();
  let mut heap = Heap::new();

  let p = heap.zero_allocate(1, 500_000);
  assert!(!p.is_null());

  let stats = heap.stats();
  assert_eq!(stats.mapped_blocks, 1);
  assert_eq!(stats.mapped_bytes, 500_000);
  assert_eq!(stats.allocated_blocks, 1);

  unsafe {
    assert!(std::slice::from_raw_parts(p, 500_000).iter().all(|&b| b == 0));
    heap.release(p);
  }

  assert_eq!(heap.stats(), Default::default());
  assert_eq!(heap.audit(), Ok(()));
}

#[test]
fn test_reuse_after_release() {
  let _guard = BREAK.lock().unwrap();
  let mut heap = Heap::new();

  let a = heap.allocate(2_500);
  let _b = heap.allocate(64);

  unsafe { heap.release(a) };
  let again = heap.allocate(2_000);

  assert_eq!(again, a);
  assert_eq!(heap.audit(), Ok(()));
}

#[cfg(feature = "global")]
#[test]
fn test_spin_locked_heap_on_the_break() {
  use std::alloc::{GlobalAlloc, Layout};

  use segalloc::SpinLockedHeap;

  let _guard = BREAK.lock().unwrap();
  let heap = SpinLockedHeap::new();

  unsafe {
    let layout = Layout::array::<u32>(256).unwrap();
    let p = heap.alloc(layout) as *mut u32;
    assert!(!p.is_null());

    for i in 0..256 {
      p.add(i).write(i as u32);
    }
    for i in 0..256 {
      assert_eq!(*p.add(i), i as u32);
    }

    heap.dealloc(p as *mut u8, layout);
  }

  assert_eq!(heap.stats().free_blocks, 1);
  assert_eq!(heap.lock().audit(), Ok(()));
}
