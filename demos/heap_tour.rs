use std::{io::Read, ptr};

use libc::sbrk;
use segalloc::Heap;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `gdb`, or just visually track how the program break moves.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break and the heap's counters.
fn print_state(
  label: &str,
  heap: &Heap,
) {
  let stats = heap.stats();
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
  println!(
    "      blocks: {} allocated / {} free, bytes: {} allocated / {} free, mapped: {}, headers: {} bytes",
    stats.allocated_blocks,
    stats.free_blocks,
    stats.allocated_bytes,
    stats.free_bytes,
    stats.mapped_blocks,
    stats.metadata_bytes(),
  );
}

fn main() {
  let mut heap = Heap::new();

  print_state("start", &heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Two small blocks: each is carved from the break, 100 rounds to 104.
  // --------------------------------------------------------------------
  let first = heap.allocate(100);
  let second = heap.allocate(100);
  println!("\n[1] allocate(100) twice -> {:?}, {:?}", first, second);
  print_state("1", &heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Releasing both merges them into one free block.
  // --------------------------------------------------------------------
  unsafe {
    heap.release(first);
    heap.release(second);
  }
  println!("\n[2] released both, they coalesce");
  print_state("2", &heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) A smaller request reuses the free block and splits off the rest.
  // --------------------------------------------------------------------
  let third = heap.allocate(64);
  println!("\n[3] allocate(64) -> {:?}, reused = {}", third, third == first);
  print_state("3", &heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Grow the wilderness in place.
  // --------------------------------------------------------------------
  let tail = heap.allocate(200);
  unsafe { ptr::write_bytes(tail, 0xAB, 200) };
  let grown = unsafe { heap.reallocate(tail, 64 * 1024) };
  println!("\n[4] reallocate(tail, 64 KiB) -> {:?}, same pointer = {}", grown, grown == tail);
  print_state("4", &heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) A large request is mapped; the break does not move.
  // --------------------------------------------------------------------
  let large = heap.zero_allocate(1000, 256);
  println!("\n[5] zero_allocate(1000, 256) -> {:?}", large);
  print_state("5", &heap);
  block_until_enter_pressed();

  unsafe { heap.release(large) };
  println!("\n[6] released the mapping, it goes straight back to the OS");
  print_state("6", &heap);

  match heap.audit() {
    Ok(()) => println!("\n[7] audit: heap is consistent"),
    Err(err) => println!("\n[7] audit: {}", err),
  }
}
